//! Tile data access and snapshots

use super::{PageBitmap, TileCoord};
use crate::geometry::PixelRect;
use crate::persist::PageSnapshot;

impl PageBitmap {
    /// Tile bounds in pixel coordinates, smaller at the right and bottom edges
    pub fn get_tile_bounds(&self, coord: TileCoord) -> PixelRect {
        let tile_start_x = coord.x * self.tile_size;
        let tile_start_y = coord.y * self.tile_size;

        let tile_width = self.tile_size.min(self.surface.width.saturating_sub(tile_start_x));
        let tile_height = self.tile_size.min(self.surface.height.saturating_sub(tile_start_y));

        PixelRect::new(tile_start_x, tile_start_y, tile_width, tile_height)
    }

    /// 8-bit RGBA pixels of one tile, row-major
    pub fn get_tile_data(&self, coord: TileCoord) -> Vec<u8> {
        self.surface.region_rgba8(self.get_tile_bounds(coord))
    }

    /// Bounding box of the given tiles, or None if no tiles provided
    pub fn compute_tiles_bounding_box(&self, tiles: &[TileCoord]) -> Option<PixelRect> {
        tiles
            .iter()
            .map(|&tile| self.get_tile_bounds(tile))
            .filter(|rect| !rect.is_empty())
            .reduce(|acc, rect| acc.union(&rect))
    }

    /// Owned RGBA8 copy of the whole bitmap
    pub fn snapshot(&self) -> PageSnapshot {
        PageSnapshot {
            width: self.surface.width,
            height: self.surface.height,
            rgba: self.surface.to_rgba8(),
        }
    }
}
