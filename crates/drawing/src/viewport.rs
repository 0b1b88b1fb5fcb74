//! Page viewport: scroll, zoom, and coordinate conversion
//!
//! Page space is the unscaled coordinate system strokes are stored in. View
//! space is the pixel grid of the backing bitmap. The mapping is
//!
//! ```text
//! view = (page - (0, scroll_y) - center) * zoom + center + pan
//! ```
//!
//! where `center` is the middle of the view. Zoom is uniform and happens
//! about the view center; `pan` is a view-space offset that only exists
//! while zoomed in or out.

use glam::Vec2;
use inkpad_config::EngineConfig;
use tracing::debug;

use crate::constants::MIN_ZOOM_FLOOR;
use crate::geometry::Rect;

/// Scrollable, zoomable window onto one page.
#[derive(Debug, Clone, PartialEq)]
pub struct Viewport {
    view_width: f32,
    view_height: f32,
    scroll_y: f32,
    zoom: f32,
    pan: Vec2,
    document_height: f32,
    min_zoom: f32,
    max_zoom: f32,
}

impl Viewport {
    /// Create a viewport at scroll 0 and zoom 1.0 with default zoom limits
    pub fn new(view_width: f32, view_height: f32) -> Self {
        let config = EngineConfig::default();
        Self::with_zoom_limits(view_width, view_height, config.min_zoom, config.max_zoom)
    }

    pub fn with_zoom_limits(view_width: f32, view_height: f32, min_zoom: f32, max_zoom: f32) -> Self {
        let min_zoom = min_zoom.max(MIN_ZOOM_FLOOR).min(1.0);
        let max_zoom = max_zoom.max(1.0);
        Self {
            view_width,
            view_height,
            scroll_y: 0.0,
            zoom: 1.0,
            pan: Vec2::ZERO,
            document_height: view_height,
            min_zoom,
            max_zoom,
        }
    }

    #[inline]
    pub fn view_width(&self) -> f32 {
        self.view_width
    }

    #[inline]
    pub fn view_height(&self) -> f32 {
        self.view_height
    }

    #[inline]
    pub fn scroll_y(&self) -> f32 {
        self.scroll_y
    }

    #[inline]
    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    #[inline]
    pub fn pan(&self) -> Vec2 {
        self.pan
    }

    #[inline]
    pub fn document_height(&self) -> f32 {
        self.document_height
    }

    #[inline]
    fn center(&self) -> Vec2 {
        Vec2::new(self.view_width * 0.5, self.view_height * 0.5)
    }

    /// Largest allowed scroll offset: the last content row may reach the top of the view
    pub fn max_scroll(&self) -> f32 {
        self.document_height.max(0.0)
    }

    /// Convert a view-space point into page space
    pub fn view_to_page(&self, view: Vec2) -> Vec2 {
        let c = self.center();
        (view - self.pan - c) / self.zoom + c + Vec2::new(0.0, self.scroll_y)
    }

    /// Convert a page-space point into view space
    pub fn page_to_view(&self, page: Vec2) -> Vec2 {
        let c = self.center();
        (page - Vec2::new(0.0, self.scroll_y) - c) * self.zoom + c + self.pan
    }

    pub fn page_rect_to_view(&self, rect: &Rect) -> Rect {
        Rect::from_corners(
            self.page_to_view(Vec2::new(rect.left, rect.top)),
            self.page_to_view(Vec2::new(rect.right, rect.bottom)),
        )
    }

    pub fn view_rect_to_page(&self, rect: &Rect) -> Rect {
        Rect::from_corners(
            self.view_to_page(Vec2::new(rect.left, rect.top)),
            self.view_to_page(Vec2::new(rect.right, rect.bottom)),
        )
    }

    /// The whole view in view space
    pub fn view_rect(&self) -> Rect {
        Rect::from_size(self.view_width, self.view_height)
    }

    /// The page-space rectangle currently on screen
    pub fn visible_page_rect(&self) -> Rect {
        self.view_rect_to_page(&self.view_rect())
    }

    /// True iff `rect` (page space) intersects the visible page rectangle
    pub fn is_rect_visible(&self, rect: &Rect) -> bool {
        rect.intersects(&self.visible_page_rect())
    }

    /// Record the total content height used for scroll clamping
    pub fn update_document_height(&mut self, height: f32) {
        self.document_height = height.max(0.0);
        self.scroll_y = self.scroll_y.clamp(0.0, self.max_scroll());
    }

    /// Set the scroll offset, clamped to `[0, max_scroll]`
    pub fn set_scroll_y(&mut self, scroll_y: f32) {
        let clamped = if scroll_y.is_finite() {
            scroll_y.clamp(0.0, self.max_scroll())
        } else {
            0.0
        };
        if clamped != scroll_y {
            debug!("Viewport: scroll {} clamped to {}", scroll_y, clamped);
        }
        self.scroll_y = clamped;
    }

    pub fn scroll_by(&mut self, delta: f32) {
        self.set_scroll_y(self.scroll_y + delta);
    }

    /// Set the zoom factor, silently clamped to the configured range.
    ///
    /// Returning to 1.0 resets the pan offset.
    pub fn set_zoom(&mut self, zoom: f32) {
        let zoom = if zoom.is_finite() { zoom } else { 1.0 };
        let clamped = zoom.clamp(self.min_zoom, self.max_zoom);
        if (clamped - 1.0).abs() < 1e-4 {
            self.zoom = 1.0;
            self.pan = Vec2::ZERO;
        } else {
            self.zoom = clamped;
        }
    }

    /// Offset the zoomed view; ignored at zoom 1.0
    pub fn pan_by(&mut self, delta: Vec2) {
        if self.zoom == 1.0 {
            return;
        }
        self.pan += delta;
    }

    pub fn resize(&mut self, view_width: f32, view_height: f32) {
        self.view_width = view_width;
        self.view_height = view_height;
        if self.document_height < view_height {
            self.document_height = view_height;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: Vec2, b: Vec2) {
        assert!(
            (a - b).length() < 1e-3,
            "expected {:?} to be close to {:?}",
            a,
            b
        );
    }

    #[test]
    fn test_identity_at_rest() {
        let vp = Viewport::new(800.0, 600.0);
        let p = Vec2::new(123.0, 456.0);
        assert_close(vp.page_to_view(p), p);
        assert_close(vp.view_to_page(p), p);
    }

    #[test]
    fn test_scroll_offsets_page_y() {
        let mut vp = Viewport::new(800.0, 600.0);
        vp.update_document_height(5000.0);
        vp.set_scroll_y(250.0);
        assert_close(vp.view_to_page(Vec2::new(10.0, 10.0)), Vec2::new(10.0, 260.0));
        assert_close(vp.page_to_view(Vec2::new(10.0, 260.0)), Vec2::new(10.0, 10.0));
    }

    #[test]
    fn test_round_trip_under_scroll_zoom_and_pan() {
        let mut vp = Viewport::new(1000.0, 800.0);
        vp.update_document_height(4000.0);
        let points = [
            Vec2::new(0.0, 0.0),
            Vec2::new(500.0, 400.0),
            Vec2::new(-37.5, 1999.25),
            Vec2::new(999.0, 3.0),
        ];
        for (scroll, zoom, pan) in [
            (0.0, 1.0, Vec2::ZERO),
            (320.0, 2.0, Vec2::new(15.0, -40.0)),
            (1200.0, 0.5, Vec2::new(-3.0, 7.0)),
            (77.7, 2.75, Vec2::new(100.0, 100.0)),
        ] {
            vp.set_scroll_y(scroll);
            vp.set_zoom(zoom);
            vp.pan_by(pan);
            for p in points {
                assert_close(vp.view_to_page(vp.page_to_view(p)), p);
                assert_close(vp.page_to_view(vp.view_to_page(p)), p);
            }
        }
    }

    #[test]
    fn test_zoom_is_clamped() {
        let mut vp = Viewport::with_zoom_limits(800.0, 600.0, 0.5, 3.0);
        vp.set_zoom(10.0);
        assert_eq!(vp.zoom(), 3.0);
        vp.set_zoom(0.01);
        assert_eq!(vp.zoom(), 0.5);
        vp.set_zoom(f32::NAN);
        assert_eq!(vp.zoom(), 1.0);
    }

    #[test]
    fn test_zero_min_zoom_is_floored() {
        let mut viewport = Viewport::with_zoom_limits(400.0, 800.0, 0.0, 4.0);
        viewport.set_zoom(0.0);
        assert_eq!(viewport.zoom(), MIN_ZOOM_FLOOR);
        let page = viewport.view_to_page(Vec2::new(10.0, 10.0));
        assert!(page.is_finite());
    }

    #[test]
    fn test_zoom_back_to_one_resets_pan() {
        let mut vp = Viewport::new(800.0, 600.0);
        vp.pan_by(Vec2::new(10.0, 10.0));
        assert_eq!(vp.pan(), Vec2::ZERO);

        vp.set_zoom(2.0);
        vp.pan_by(Vec2::new(10.0, -5.0));
        assert_eq!(vp.pan(), Vec2::new(10.0, -5.0));

        vp.set_zoom(1.0);
        assert_eq!(vp.pan(), Vec2::ZERO);
    }

    #[test]
    fn test_zoom_about_center() {
        let mut vp = Viewport::new(800.0, 600.0);
        vp.set_zoom(2.0);
        // Center stays fixed
        assert_close(vp.page_to_view(Vec2::new(400.0, 300.0)), Vec2::new(400.0, 300.0));
        // Visible page rect halves around the center
        let visible = vp.visible_page_rect();
        assert!((visible.left - 200.0).abs() < 1e-3);
        assert!((visible.right - 600.0).abs() < 1e-3);
        assert!((visible.top - 150.0).abs() < 1e-3);
        assert!((visible.bottom - 450.0).abs() < 1e-3);
    }

    #[test]
    fn test_rect_visibility() {
        let mut vp = Viewport::new(800.0, 600.0);
        assert!(vp.is_rect_visible(&Rect::new(0.0, 0.0, 800.0, 600.0)));
        assert!(vp.is_rect_visible(&Rect::new(100.0, 100.0, 200.0, 150.0)));

        vp.update_document_height(3000.0);
        vp.set_scroll_y(1000.0);
        // Entirely above the scroll offset
        assert!(!vp.is_rect_visible(&Rect::new(0.0, 100.0, 50.0, 900.0)));
        // Entirely below scroll + view height
        assert!(!vp.is_rect_visible(&Rect::new(0.0, 1700.0, 50.0, 1800.0)));
        // Straddles the top edge
        assert!(vp.is_rect_visible(&Rect::new(0.0, 950.0, 50.0, 1050.0)));
    }

    #[test]
    fn test_scroll_clamped_to_document() {
        let mut vp = Viewport::new(800.0, 600.0);
        vp.set_scroll_y(-50.0);
        assert_eq!(vp.scroll_y(), 0.0);

        vp.update_document_height(900.0);
        vp.set_scroll_y(5000.0);
        assert_eq!(vp.scroll_y(), 900.0);

        // Shrinking the document pulls the scroll back in
        vp.update_document_height(700.0);
        assert_eq!(vp.scroll_y(), 700.0);
    }
}
