use glam::Vec2;
use inkpad_ipc::PenKind;
use serde::{Deserialize, Serialize};

use crate::geometry::Rect;

/// One sampled pen position in page space
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StrokePoint {
    pub x: f32,
    pub y: f32,
    pub pressure: f32,
    /// Device-reported contact size
    pub size: f32,
    pub tilt_x: i32,
    pub tilt_y: i32,
    /// Monotonic device clock
    pub timestamp: u64,
}

impl StrokePoint {
    #[inline]
    pub fn position(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }
}

/// Bounding box of a stroke in page coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct StrokeBounds {
    pub top: f32,
    pub bottom: f32,
    pub left: f32,
    pub right: f32,
}

impl StrokeBounds {
    pub fn to_rect(&self) -> Rect {
        Rect::new(self.left, self.top, self.right, self.bottom)
    }
}

impl From<Rect> for StrokeBounds {
    fn from(rect: Rect) -> Self {
        Self {
            top: rect.top,
            bottom: rect.bottom,
            left: rect.left,
            right: rect.right,
        }
    }
}

/// One completed pen gesture.
///
/// Strokes are immutable once built. Anything that would change the points
/// (a pagination shift) produces a new `Stroke` through [`Stroke::translated`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stroke {
    pub id: String,
    pub pen: PenKind,
    /// Base stroke width in page units
    pub size: f32,
    /// Packed ARGB
    pub color: u32,
    bounds: StrokeBounds,
    points: Vec<StrokePoint>,
    pub page_id: String,
    /// Unix milliseconds
    pub created_at: u64,
    /// Unix milliseconds
    pub updated_at: u64,
    /// Viewport scroll offset when the stroke was drawn
    pub created_scroll_y: f32,
}

impl Stroke {
    /// Build a stroke from finished points, computing its bounding box.
    ///
    /// Returns None for an empty point list; a stroke always has at least one point.
    pub fn new(
        id: String,
        page_id: String,
        pen: PenKind,
        size: f32,
        color: u32,
        points: Vec<StrokePoint>,
        created_scroll_y: f32,
    ) -> Option<Self> {
        let bounds = compute_bounds(&points, size)?;
        let now = now_ms();
        Some(Self {
            id,
            pen,
            size,
            color,
            bounds,
            points,
            page_id,
            created_at: now,
            updated_at: now,
            created_scroll_y,
        })
    }

    /// Fresh unique stroke identifier
    pub fn generate_id() -> String {
        uuid::Uuid::new_v4().to_string()
    }

    #[inline]
    pub fn points(&self) -> &[StrokePoint] {
        &self.points
    }

    #[inline]
    pub fn bounds(&self) -> StrokeBounds {
        self.bounds
    }

    #[inline]
    pub fn bounding_rect(&self) -> Rect {
        self.bounds.to_rect()
    }

    #[inline]
    pub fn top(&self) -> f32 {
        self.bounds.top
    }

    #[inline]
    pub fn bottom(&self) -> f32 {
        self.bounds.bottom
    }

    /// Point positions in page space
    pub fn positions(&self) -> Vec<Vec2> {
        self.points.iter().map(StrokePoint::position).collect()
    }

    /// Copy of this stroke moved vertically by `dy`.
    ///
    /// Keeps the id, so stores and persistence treat it as the same stroke.
    pub fn translated(&self, dy: f32) -> Stroke {
        let points = self
            .points
            .iter()
            .map(|p| StrokePoint { y: p.y + dy, ..*p })
            .collect();
        let mut bounds = self.bounds;
        bounds.top += dy;
        bounds.bottom += dy;
        Stroke {
            bounds,
            points,
            updated_at: now_ms(),
            ..self.clone()
        }
    }
}

/// Union of the points, grown by half the stroke width on every side
fn compute_bounds(points: &[StrokePoint], size: f32) -> Option<StrokeBounds> {
    let positions: Vec<Vec2> = points.iter().map(StrokePoint::position).collect();
    let rect = Rect::from_points(&positions)?;
    Some(rect.outset(size.max(0.0) / 2.0).into())
}

/// Unpack ARGB into `[r, g, b, a]` floats
pub fn argb_to_rgba_f32(color: u32) -> [f32; 4] {
    let a = ((color >> 24) & 0xFF) as f32 / 255.0;
    let r = ((color >> 16) & 0xFF) as f32 / 255.0;
    let g = ((color >> 8) & 0xFF) as f32 / 255.0;
    let b = (color & 0xFF) as f32 / 255.0;
    [r, g, b, a]
}

/// Milliseconds since the unix epoch, 0 if the clock is before it
pub fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(x: f32, y: f32) -> StrokePoint {
        StrokePoint {
            x,
            y,
            pressure: 1.0,
            size: 1.0,
            tilt_x: 0,
            tilt_y: 0,
            timestamp: 0,
        }
    }

    fn stroke(points: Vec<StrokePoint>, size: f32) -> Option<Stroke> {
        Stroke::new(
            Stroke::generate_id(),
            "page".to_string(),
            PenKind::Ballpoint,
            size,
            0xFF00_0000,
            points,
            0.0,
        )
    }

    #[test]
    fn test_empty_points_rejected() {
        assert!(stroke(Vec::new(), 5.0).is_none());
    }

    #[test]
    fn test_bounds_cover_points_plus_half_width() {
        let s = stroke(vec![point(10.0, 100.0), point(40.0, 150.0)], 5.0).unwrap();
        let b = s.bounds();
        assert_eq!(b.top, 97.5);
        assert_eq!(b.bottom, 152.5);
        assert_eq!(b.left, 7.5);
        assert_eq!(b.right, 42.5);
        for p in s.points() {
            assert!(s.bounding_rect().contains_point(p.position()));
        }
    }

    #[test]
    fn test_single_point_has_area() {
        let s = stroke(vec![point(20.0, 20.0)], 4.0).unwrap();
        assert_eq!(s.points().len(), 1);
        let r = s.bounding_rect();
        assert_eq!(r.width(), 4.0);
        assert_eq!(r.height(), 4.0);
    }

    #[test]
    fn test_translated_keeps_id_and_moves_points() {
        let s = stroke(vec![point(0.0, 10.0), point(5.0, 20.0)], 2.0).unwrap();
        let moved = s.translated(100.0);
        assert_eq!(moved.id, s.id);
        assert_eq!(moved.top(), s.top() + 100.0);
        assert_eq!(moved.bottom(), s.bottom() + 100.0);
        assert_eq!(moved.points()[1].y, 120.0);
        assert_eq!(moved.points()[1].x, 5.0);
    }

    #[test]
    fn test_unique_ids() {
        assert_ne!(Stroke::generate_id(), Stroke::generate_id());
    }

    #[test]
    fn test_argb_unpack() {
        assert_eq!(argb_to_rgba_f32(0xFFFF_0000), [1.0, 0.0, 0.0, 1.0]);
        assert_eq!(argb_to_rgba_f32(0x0000_00FF), [0.0, 0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_stroke_serde() {
        let s = stroke(vec![point(1.0, 2.0)], 3.0).unwrap();
        let json = serde_json::to_string(&s).unwrap();
        let back: Stroke = serde_json::from_str(&json).unwrap();
        assert_eq!(back, s);
    }
}
