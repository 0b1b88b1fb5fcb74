//! Dirty-region rendering
//!
//! Only the requested view rectangle is repainted: it is cleared to the
//! page background and every stroke whose box overlaps it is redrawn,
//! clipped to it, in insertion order.

use glam::Vec2;
use inkpad_config::{EngineConfig, PenStyleTable};
use tracing::{debug, trace};

use crate::constants::{EXPORT_BAND_HEIGHT, REPAINT_MARGIN};
use crate::error::DrawingError;
use crate::geometry::{PixelRect, Rect};
use crate::pen::{PenParams, render_pen};
use crate::persist::PageSnapshot;
use crate::raster;
use crate::store::PageStore;
use crate::surface::CpuSurface;
use crate::tiles::PageBitmap;
use crate::types::{Stroke, argb_to_rgba_f32};
use crate::viewport::Viewport;

/// Paints page strokes into bitmaps
#[derive(Debug, Clone)]
pub struct Renderer {
    background: u32,
    pens: PenStyleTable,
    jump_threshold: f32,
}

impl Default for Renderer {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}

impl Renderer {
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            background: config.background,
            pens: config.pens,
            jump_threshold: config.jump_threshold,
        }
    }

    #[inline]
    pub fn background(&self) -> u32 {
        self.background
    }

    /// Repaint `area` (view coordinates) of the bitmap.
    ///
    /// Strokes whose id is in `ignored` are left out. Returns the pixel
    /// rectangle that was repainted, None if `area` misses the bitmap.
    pub fn draw_area(
        &self,
        bitmap: &mut PageBitmap,
        store: &PageStore,
        viewport: &Viewport,
        area: Rect,
        ignored: &[&str],
    ) -> Result<Option<PixelRect>, DrawingError> {
        if !bitmap.is_available() {
            return Err(DrawingError::CanvasUnavailable(format!(
                "bitmap is {}x{}",
                bitmap.width(),
                bitmap.height()
            )));
        }
        let Some(clip) = area
            .outset(REPAINT_MARGIN)
            .to_pixel_rect(bitmap.width(), bitmap.height())
        else {
            trace!("draw_area: {:?} outside the bitmap", area);
            return Ok(None);
        };

        bitmap.surface_mut().clear_rect(clip, argb_to_rgba_f32(self.background));

        let page_clip = viewport.view_rect_to_page(&clip.to_rect());
        let mut drawn = 0usize;
        for stroke in store.visible_strokes(viewport) {
            if ignored.contains(&stroke.id.as_str()) {
                continue;
            }
            if !stroke.bounding_rect().intersects(&page_clip) {
                continue;
            }
            self.draw_stroke(bitmap.surface_mut(), stroke, viewport, clip);
            drawn += 1;
        }

        bitmap.mark_region_dirty(clip);
        debug!("draw_area: repainted {:?} with {} strokes", clip, drawn);
        Ok(Some(clip))
    }

    /// Repaint the whole visible bitmap
    pub fn draw_full(
        &self,
        bitmap: &mut PageBitmap,
        store: &PageStore,
        viewport: &Viewport,
    ) -> Result<Option<PixelRect>, DrawingError> {
        let area = Rect::from_size(bitmap.width() as f32, bitmap.height() as f32);
        self.draw_area(bitmap, store, viewport, area, &[])
    }

    /// Paint one stroke with its pen, touching only pixels inside `clip`
    pub fn draw_stroke(
        &self,
        surface: &mut CpuSurface,
        stroke: &Stroke,
        viewport: &Viewport,
        clip: PixelRect,
    ) -> Option<PixelRect> {
        let zoom = viewport.zoom();
        let points: Vec<Vec2> = stroke
            .points()
            .iter()
            .map(|p| viewport.page_to_view(p.position()))
            .collect();
        let params = PenParams {
            width: stroke.size * zoom,
            jump_threshold: self.jump_threshold * zoom,
        };
        let rendering = render_pen(stroke.pen, &points, params, &self.pens);
        raster::rasterize(surface, &rendering, argb_to_rgba_f32(stroke.color), clip)
    }

    /// Render a whole page at zoom 1 into an RGBA8 snapshot, for export.
    ///
    /// The page is painted in bands of `EXPORT_BAND_HEIGHT` rows so the
    /// float surface stays bounded however long the page grows.
    pub fn render_page_rgba8(&self, store: &PageStore, width: u32) -> Result<PageSnapshot, DrawingError> {
        let height = store.height().ceil().max(0.0) as u32;
        if width == 0 || height == 0 {
            return Err(DrawingError::CanvasUnavailable(format!("page is {}x{}", width, height)));
        }

        let mut rgba = Vec::with_capacity((width as usize) * (height as usize) * 4);
        let mut band_top = 0u32;
        while band_top < height {
            let band_height = EXPORT_BAND_HEIGHT.min(height - band_top);
            let mut band = PageBitmap::new(width, band_height, self.background);
            let mut viewport = Viewport::new(width as f32, band_height as f32);
            viewport.update_document_height(store.height());
            viewport.set_scroll_y(band_top as f32);
            self.draw_full(&mut band, store, &viewport)?;
            rgba.extend(band.surface().to_rgba8());
            band_top += band_height;
        }
        debug!("render_page_rgba8: {}x{} page", width, height);

        Ok(PageSnapshot { width, height, rgba })
    }
}
