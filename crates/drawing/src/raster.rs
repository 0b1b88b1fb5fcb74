//! Stroke rasterization
//!
//! A [`PenRendering`] is flattened into polylines and stamped into a
//! [`StrokeMask`]: per-pixel coverage of round-capped thick segments, where
//! overlapping segments of the same stroke keep the maximum coverage rather
//! than accumulating. The mask is then composited onto the surface once, so
//! a translucent marker stays evenly translucent along its whole length.

use glam::Vec2;

use crate::constants::{FLATTEN_TOLERANCE, MAX_CURVE_SEGMENTS};
use crate::geometry::{PixelRect, Rect, segment_distance_sq};
use crate::pen::{PathOp, PenPath, PenRendering};
use crate::surface::CpuSurface;

/// Thinnest radius drawn, so hairlines stay visible
const MIN_RADIUS: f32 = 0.5;

/// Flatten path ops into polylines, one per subpath.
///
/// A subpath of a single point (MoveTo then LineTo to the same spot) is
/// kept as a one-point polyline so it can be drawn as a dot.
pub fn flatten(ops: &[PathOp]) -> Vec<Vec<Vec2>> {
    let mut polylines: Vec<Vec<Vec2>> = Vec::new();
    let mut current: Vec<Vec2> = Vec::new();
    let mut cursor = Vec2::ZERO;

    for op in ops {
        match *op {
            PathOp::MoveTo(p) => {
                if !current.is_empty() {
                    polylines.push(std::mem::take(&mut current));
                }
                current.push(p);
                cursor = p;
            }
            PathOp::LineTo(p) => {
                if current.is_empty() {
                    current.push(cursor);
                }
                if current.last() != Some(&p) {
                    current.push(p);
                }
                cursor = p;
            }
            PathOp::QuadTo(control, end) => {
                if current.is_empty() {
                    current.push(cursor);
                }
                let start = cursor;
                let segments = quad_segments(start, control, end);
                for i in 1..=segments {
                    let t = i as f32 / segments as f32;
                    let p = quad_point(start, control, end, t);
                    if current.last() != Some(&p) {
                        current.push(p);
                    }
                }
                cursor = end;
            }
        }
    }
    if !current.is_empty() {
        polylines.push(current);
    }
    polylines
}

#[inline]
fn quad_point(p0: Vec2, c: Vec2, p1: Vec2, t: f32) -> Vec2 {
    let mt = 1.0 - t;
    p0 * (mt * mt) + c * (2.0 * mt * t) + p1 * (t * t)
}

/// Uniform subdivision count keeping the flattening error under tolerance
fn quad_segments(p0: Vec2, c: Vec2, p1: Vec2) -> u32 {
    let dd = (p0 - 2.0 * c + p1).length();
    let n = (dd / (8.0 * FLATTEN_TOLERANCE)).sqrt().ceil();
    (n as u32).clamp(1, MAX_CURVE_SEGMENTS)
}

/// Per-pixel coverage of one stroke inside a pixel rectangle
#[derive(Debug, Clone)]
pub struct StrokeMask {
    rect: PixelRect,
    coverage: Vec<f32>,
}

impl StrokeMask {
    pub fn new(rect: PixelRect) -> Self {
        Self {
            rect,
            coverage: vec![0.0; (rect.width as usize) * (rect.height as usize)],
        }
    }

    #[inline]
    pub fn rect(&self) -> PixelRect {
        self.rect
    }

    /// Coverage at absolute pixel `(x, y)`, 0.0 outside the mask
    pub fn coverage_at(&self, x: u32, y: u32) -> f32 {
        if x < self.rect.x || y < self.rect.y || x >= self.rect.x_end() || y >= self.rect.y_end() {
            return 0.0;
        }
        let index = ((y - self.rect.y) as usize) * (self.rect.width as usize) + (x - self.rect.x) as usize;
        self.coverage[index]
    }

    /// Stamp a round-capped segment of the given radius
    pub fn stamp_segment(&mut self, a: Vec2, b: Vec2, radius: f32) {
        let radius = radius.max(MIN_RADIUS);
        let reach = radius + 1.0;
        let bounds = Rect::from_corners(a, b).outset(reach);
        let Some(area) = bounds
            .to_pixel_rect(u32::MAX, u32::MAX)
            .and_then(|r| r.intersection(&self.rect))
        else {
            return;
        };

        for py in area.y..area.y_end() {
            for px in area.x..area.x_end() {
                let center = Vec2::new(px as f32 + 0.5, py as f32 + 0.5);
                let distance = segment_distance_sq(center, a, b).sqrt();
                let coverage = (radius + 0.5 - distance).clamp(0.0, 1.0);
                if coverage > 0.0 {
                    let index = ((py - self.rect.y) as usize) * (self.rect.width as usize)
                        + (px - self.rect.x) as usize;
                    let slot = &mut self.coverage[index];
                    if coverage > *slot {
                        *slot = coverage;
                    }
                }
            }
        }
    }

    /// Stamp every subpath of a pen path
    pub fn stamp_path(&mut self, path: &PenPath) {
        let radius = path.width / 2.0;
        for polyline in flatten(&path.ops) {
            match polyline.len() {
                0 => {}
                1 => self.stamp_segment(polyline[0], polyline[0], radius),
                _ => {
                    for w in polyline.windows(2) {
                        self.stamp_segment(w[0], w[1], radius);
                    }
                }
            }
        }
    }

    /// Blend `color` onto the surface weighted by coverage and `opacity`
    pub fn composite(&self, surface: &mut CpuSurface, color: [f32; 4], opacity: f32) {
        for py in self.rect.y..self.rect.y_end() {
            let row = ((py - self.rect.y) as usize) * (self.rect.width as usize);
            for px in self.rect.x..self.rect.x_end() {
                let coverage = self.coverage[row + (px - self.rect.x) as usize];
                if coverage > 0.0 {
                    surface.blend_pixel(px, py, color, coverage * opacity);
                }
            }
        }
    }
}

/// View-space extent of a rendering, grown by half its widest path
pub fn rendering_bounds(rendering: &PenRendering) -> Option<Rect> {
    let mut bounds: Option<Rect> = None;
    for path in &rendering.paths {
        let half = path.width.max(MIN_RADIUS * 2.0) / 2.0 + 1.0;
        for op in &path.ops {
            let points: &[Vec2] = match op {
                PathOp::MoveTo(p) | PathOp::LineTo(p) => std::slice::from_ref(p),
                PathOp::QuadTo(c, p) => &[*c, *p],
            };
            for &p in points {
                let r = Rect::from_point(p).outset(half);
                bounds = Some(match bounds {
                    Some(b) => b.union(&r),
                    None => r,
                });
            }
        }
    }
    bounds
}

/// Paint a rendering onto `surface`, touching only pixels inside `clip`.
///
/// Returns the pixel rectangle that was painted, or None if the stroke
/// misses the clip entirely.
pub fn rasterize(
    surface: &mut CpuSurface,
    rendering: &PenRendering,
    color: [f32; 4],
    clip: PixelRect,
) -> Option<PixelRect> {
    if rendering.is_empty() || rendering.opacity <= 0.0 {
        return None;
    }
    let area = rendering_bounds(rendering)?
        .to_pixel_rect(surface.width, surface.height)?
        .intersection(&clip)?;

    let mut mask = StrokeMask::new(area);
    for path in &rendering.paths {
        mask.stamp_path(path);
    }
    mask.composite(surface, color, rendering.opacity);
    Some(area)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BLACK: [f32; 4] = [0.0, 0.0, 0.0, 1.0];
    const WHITE: [f32; 4] = [1.0, 1.0, 1.0, 1.0];

    fn white_surface(w: u32, h: u32) -> CpuSurface {
        let mut s = CpuSurface::new(w, h);
        s.clear(WHITE);
        s
    }

    fn full(s: &CpuSurface) -> PixelRect {
        PixelRect::new(0, 0, s.width, s.height)
    }

    #[test]
    fn test_flatten_lines_and_dot() {
        let p = Vec2::new(1.0, 1.0);
        let polylines = flatten(&[PathOp::MoveTo(p), PathOp::LineTo(p)]);
        assert_eq!(polylines, vec![vec![p]]);

        let polylines = flatten(&[
            PathOp::MoveTo(Vec2::ZERO),
            PathOp::LineTo(Vec2::new(10.0, 0.0)),
            PathOp::MoveTo(Vec2::new(0.0, 5.0)),
            PathOp::LineTo(Vec2::new(10.0, 5.0)),
        ]);
        assert_eq!(polylines.len(), 2);
    }

    #[test]
    fn test_flatten_quad_stays_near_curve() {
        let start = Vec2::new(0.0, 0.0);
        let control = Vec2::new(50.0, 100.0);
        let end = Vec2::new(100.0, 0.0);
        let polylines = flatten(&[PathOp::MoveTo(start), PathOp::QuadTo(control, end)]);
        let line = &polylines[0];
        assert!(line.len() > 3);
        assert_eq!(line[0], start);
        assert_eq!(*line.last().unwrap(), end);
        // Apex of this curve is at y=50
        let max_y = line.iter().map(|p| p.y).fold(f32::MIN, f32::max);
        assert!((max_y - 50.0).abs() < 1.0);
    }

    #[test]
    fn test_dot_rasterizes() {
        let mut surface = white_surface(20, 20);
        let rendering = PenRendering {
            paths: vec![PenPath {
                ops: vec![PathOp::MoveTo(Vec2::new(10.0, 10.0)), PathOp::LineTo(Vec2::new(10.0, 10.0))],
                width: 6.0,
            }],
            opacity: 1.0,
        };
        let clip = full(&surface);
        let painted = rasterize(&mut surface, &rendering, BLACK, clip);
        assert!(painted.is_some());
        let center = surface.get_pixel(10, 10).unwrap();
        assert!(center[0] < 0.05);
        // Well outside the radius stays white
        assert_eq!(surface.get_pixel(1, 1), Some(WHITE));
    }

    #[test]
    fn test_clip_is_respected() {
        let mut surface = white_surface(40, 20);
        let rendering = PenRendering {
            paths: vec![PenPath {
                ops: vec![PathOp::MoveTo(Vec2::new(2.0, 10.0)), PathOp::LineTo(Vec2::new(38.0, 10.0))],
                width: 4.0,
            }],
            opacity: 1.0,
        };
        let clip = PixelRect::new(0, 0, 20, 20);
        let painted = rasterize(&mut surface, &rendering, BLACK, clip).unwrap();
        assert!(painted.x_end() <= 20);
        assert!(surface.get_pixel(10, 10).unwrap()[0] < 0.05);
        assert_eq!(surface.get_pixel(30, 10), Some(WHITE));
    }

    #[test]
    fn test_translucent_overlap_does_not_darken() {
        let mut surface = white_surface(40, 40);
        // Path doubles back over itself
        let rendering = PenRendering {
            paths: vec![PenPath {
                ops: vec![
                    PathOp::MoveTo(Vec2::new(5.0, 20.0)),
                    PathOp::LineTo(Vec2::new(35.0, 20.0)),
                    PathOp::LineTo(Vec2::new(5.0, 20.0)),
                ],
                width: 8.0,
            }],
            opacity: 0.4,
        };
        let clip = full(&surface);
        rasterize(&mut surface, &rendering, BLACK, clip);
        let p = surface.get_pixel(20, 20).unwrap();
        assert!((p[0] - 0.6).abs() < 0.01, "got {:?}", p);
    }

    #[test]
    fn test_outside_clip_returns_none() {
        let mut surface = white_surface(10, 10);
        let rendering = PenRendering {
            paths: vec![PenPath {
                ops: vec![PathOp::MoveTo(Vec2::new(100.0, 100.0)), PathOp::LineTo(Vec2::new(120.0, 100.0))],
                width: 2.0,
            }],
            opacity: 1.0,
        };
        let clip = full(&surface);
        assert!(rasterize(&mut surface, &rendering, BLACK, clip).is_none());
    }

    #[test]
    fn test_mask_keeps_max_coverage() {
        let mut mask = StrokeMask::new(PixelRect::new(0, 0, 10, 10));
        mask.stamp_segment(Vec2::new(5.0, 5.0), Vec2::new(5.0, 5.0), 3.0);
        let once = mask.coverage_at(5, 5);
        mask.stamp_segment(Vec2::new(5.0, 5.0), Vec2::new(5.0, 5.0), 3.0);
        assert_eq!(mask.coverage_at(5, 5), once);
        assert_eq!(mask.coverage_at(50, 50), 0.0);
    }
}
