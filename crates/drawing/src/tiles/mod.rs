//! Page bitmap with tiled dirty tracking
//!
//! The bitmap is the visible slice of the page in view pixels. Rendering
//! marks the tiles it touches; the presenter drains them as one repaint
//! rectangle and the persist worker copies the whole bitmap out.

mod data_access;
mod dirty_tracking;

use std::collections::HashSet;

use tracing::debug;

use crate::constants::DEFAULT_TILE_SIZE;
use crate::surface::CpuSurface;
use crate::types::argb_to_rgba_f32;

/// Tile coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileCoord {
    pub x: u32,
    pub y: u32,
}

/// Visible page content as pixels, with dirty tile tracking
pub struct PageBitmap {
    pub(crate) surface: CpuSurface,
    pub(crate) tile_size: u32,
    tiles_x: u32,
    tiles_y: u32,
    pub(crate) dirty_tiles: HashSet<TileCoord>,
    background: [f32; 4],
}

impl PageBitmap {
    /// Create a bitmap filled with the ARGB `background`
    pub fn new(width: u32, height: u32, background: u32) -> Self {
        Self::with_tile_size(width, height, background, DEFAULT_TILE_SIZE)
    }

    pub fn with_tile_size(width: u32, height: u32, background: u32, tile_size: u32) -> Self {
        let tile_size = tile_size.max(1);
        let background = argb_to_rgba_f32(background);
        let mut surface = CpuSurface::new(width, height);
        surface.clear(background);

        Self {
            surface,
            tile_size,
            tiles_x: width.div_ceil(tile_size),
            tiles_y: height.div_ceil(tile_size),
            dirty_tiles: HashSet::new(),
            background,
        }
    }

    /// A bitmap with no pixels cannot be drawn into
    #[inline]
    pub fn is_available(&self) -> bool {
        self.surface.width > 0 && self.surface.height > 0
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.surface.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.surface.height
    }

    #[inline]
    pub fn background(&self) -> [f32; 4] {
        self.background
    }

    #[inline]
    pub fn tile_size(&self) -> u32 {
        self.tile_size
    }

    #[inline]
    pub fn tiles_x(&self) -> u32 {
        self.tiles_x
    }

    #[inline]
    pub fn tiles_y(&self) -> u32 {
        self.tiles_y
    }

    /// Reallocate for a new view size; all content is cleared and marked dirty.
    /// Returns false if the size did not change.
    pub fn resize(&mut self, width: u32, height: u32) -> bool {
        if width == self.surface.width && height == self.surface.height {
            return false;
        }
        debug!(
            "PageBitmap::resize: {}x{} -> {}x{}",
            self.surface.width, self.surface.height, width, height
        );
        self.surface = CpuSurface::new(width, height);
        self.surface.clear(self.background);
        self.tiles_x = width.div_ceil(self.tile_size);
        self.tiles_y = height.div_ceil(self.tile_size);
        self.dirty_tiles.clear();
        let bounds = self.surface.bounds();
        self.mark_region_dirty(bounds);
        true
    }

    #[inline]
    pub fn surface(&self) -> &CpuSurface {
        &self.surface
    }

    #[inline]
    pub fn surface_mut(&mut self) -> &mut CpuSurface {
        &mut self.surface
    }
}
