//! Dirty tile tracking for incremental repaint

use tracing::trace;

use super::{PageBitmap, TileCoord};
use crate::geometry::PixelRect;

impl PageBitmap {
    /// Mark a pixel as modified (marks containing tile dirty)
    #[inline]
    pub fn mark_dirty(&mut self, x: u32, y: u32) {
        if x >= self.surface.width || y >= self.surface.height {
            return;
        }
        self.dirty_tiles.insert(TileCoord {
            x: x / self.tile_size,
            y: y / self.tile_size,
        });
    }

    /// Mark every tile overlapping `rect` as dirty
    pub fn mark_region_dirty(&mut self, rect: PixelRect) {
        let Some(rect) = rect.intersection(&self.surface.bounds()) else {
            return;
        };

        let tile_x_start = rect.x / self.tile_size;
        let tile_y_start = rect.y / self.tile_size;
        let tile_x_end = (rect.x_end() - 1) / self.tile_size;
        let tile_y_end = (rect.y_end() - 1) / self.tile_size;

        let tiles_before = self.dirty_tiles.len();
        for ty in tile_y_start..=tile_y_end {
            for tx in tile_x_start..=tile_x_end {
                self.dirty_tiles.insert(TileCoord { x: tx, y: ty });
            }
        }

        trace!(
            "mark_region_dirty: {:?} -> {} new tiles (total {})",
            rect,
            self.dirty_tiles.len() - tiles_before,
            self.dirty_tiles.len()
        );
    }

    /// Get all dirty tiles and clear the dirty set
    pub fn take_dirty_tiles(&mut self) -> Vec<TileCoord> {
        self.dirty_tiles.drain().collect()
    }

    /// Drain the dirty set as a single bounding rectangle
    pub fn take_dirty_region(&mut self) -> Option<PixelRect> {
        let tiles = self.take_dirty_tiles();
        self.compute_tiles_bounding_box(&tiles)
    }

    #[inline]
    pub fn has_dirty_tiles(&self) -> bool {
        !self.dirty_tiles.is_empty()
    }

    #[inline]
    pub fn dirty_tile_count(&self) -> usize {
        self.dirty_tiles.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mark_dirty() {
        let mut bitmap = PageBitmap::with_tile_size(256, 256, 0xFFFF_FFFF, 128);

        bitmap.mark_dirty(0, 0);
        assert!(bitmap.has_dirty_tiles());
        assert_eq!(bitmap.dirty_tile_count(), 1);

        bitmap.mark_dirty(130, 130);
        assert_eq!(bitmap.dirty_tile_count(), 2);

        // Out of bounds is ignored
        bitmap.mark_dirty(1000, 0);
        assert_eq!(bitmap.dirty_tile_count(), 2);

        let tiles = bitmap.take_dirty_tiles();
        assert_eq!(tiles.len(), 2);
        assert!(!bitmap.has_dirty_tiles());
    }

    #[test]
    fn test_mark_region_dirty() {
        let mut bitmap = PageBitmap::with_tile_size(256, 256, 0xFFFF_FFFF, 128);

        // Region spans all 4 tiles
        bitmap.mark_region_dirty(PixelRect::new(100, 100, 56, 56));
        assert_eq!(bitmap.dirty_tile_count(), 4);
    }

    #[test]
    fn test_take_dirty_region_is_tile_aligned() {
        let mut bitmap = PageBitmap::with_tile_size(150, 150, 0xFFFF_FFFF, 64);
        bitmap.mark_region_dirty(PixelRect::new(70, 10, 5, 5));
        bitmap.mark_region_dirty(PixelRect::new(140, 140, 50, 50));

        let region = bitmap.take_dirty_region().unwrap();
        assert_eq!(region, PixelRect::new(64, 0, 86, 150));
        assert_eq!(bitmap.take_dirty_region(), None);
    }
}
