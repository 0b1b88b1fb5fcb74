//! Erase hit-testing
//!
//! An erase gesture becomes an [`EraseRegion`]:
//! - [`EraserKind::Pen`]: the path widened by the eraser tip width.
//! - [`EraserKind::Select`]: the path closed into a lasso polygon.
//!
//! Strokes are then selected in two phases. Phase one rejects any stroke
//! whose bounding box misses the region's bounding box. Phase two tests a
//! sample of each remaining stroke's points for containment in the region.
//!
//! Sampling is a deliberate approximation: a thin stroke that only grazes
//! the region between two sampled points can be missed. Testing every point
//! of long strokes dominates the cost of interactive erasing, so the trade
//! is accepted.

use glam::Vec2;
use inkpad_config::{ERASER_WIDTH, EraseSampling};
use inkpad_ipc::EraserKind;
use tracing::debug;

use crate::geometry::{Rect, segment_distance_sq};
use crate::types::Stroke;

/// Page-space test region built from an erase path
#[derive(Debug, Clone)]
pub enum EraseRegion {
    /// Polyline widened to `half_width` on each side, round caps
    Band { points: Vec<Vec2>, half_width: f32 },
    /// Closed polygon; the closing edge from last to first point is implied
    Lasso { points: Vec<Vec2> },
}

impl EraseRegion {
    /// Build a region, or None if the path cannot enclose anything.
    ///
    /// A lasso needs at least three points; a band needs one.
    pub fn new(points: &[Vec2], kind: EraserKind, eraser_width: f32) -> Option<Self> {
        match kind {
            EraserKind::Pen if !points.is_empty() => Some(EraseRegion::Band {
                points: points.to_vec(),
                half_width: eraser_width.max(0.0) / 2.0,
            }),
            EraserKind::Select if points.len() >= 3 => Some(EraseRegion::Lasso {
                points: points.to_vec(),
            }),
            _ => None,
        }
    }

    /// Bounding box of the whole region
    pub fn bounds(&self) -> Rect {
        match self {
            EraseRegion::Band { points, half_width } => Rect::from_points(points)
                .unwrap_or_default()
                .outset(*half_width),
            EraseRegion::Lasso { points } => Rect::from_points(points).unwrap_or_default(),
        }
    }

    /// True if `p` lies inside the region
    pub fn contains(&self, p: Vec2) -> bool {
        match self {
            EraseRegion::Band { points, half_width } => {
                let limit = half_width * half_width;
                if points.len() == 1 {
                    return p.distance_squared(points[0]) <= limit;
                }
                points
                    .windows(2)
                    .any(|w| segment_distance_sq(p, w[0], w[1]) <= limit)
            }
            EraseRegion::Lasso { points } => winding_number(points, p) != 0,
        }
    }
}

/// Non-zero winding number of a closed polygon around `p`
fn winding_number(polygon: &[Vec2], p: Vec2) -> i32 {
    let mut winding = 0;
    let n = polygon.len();
    for i in 0..n {
        let a = polygon[i];
        let b = polygon[(i + 1) % n];
        let cross = (b.x - a.x) * (p.y - a.y) - (p.x - a.x) * (b.y - a.y);
        if a.y <= p.y {
            if b.y > p.y && cross > 0.0 {
                winding += 1;
            }
        } else if b.y <= p.y && cross < 0.0 {
            winding -= 1;
        }
    }
    winding
}

/// How many points of a stroke of `len` points are tested in phase two
pub fn sample_count(len: usize, sampling: &EraseSampling) -> usize {
    if len < sampling.all_below {
        return len;
    }
    let raw = if len < sampling.third_below {
        len / 3
    } else if len < sampling.tenth_below {
        len / 10
    } else {
        sampling.max_samples
    };
    raw.clamp(sampling.min_samples, sampling.max_samples).min(len)
}

/// Evenly spaced point indices to test, always including both ends
pub fn sample_indices(len: usize, sampling: &EraseSampling) -> Vec<usize> {
    let count = sample_count(len, sampling);
    match count {
        0 => Vec::new(),
        1 => vec![0],
        _ if count == len => (0..len).collect(),
        _ => (0..count).map(|i| i * (len - 1) / (count - 1)).collect(),
    }
}

/// Hit-tester configured with an eraser width and sampling thresholds
#[derive(Debug, Clone, Copy)]
pub struct Eraser {
    pub width: f32,
    pub sampling: EraseSampling,
}

impl Default for Eraser {
    fn default() -> Self {
        Self {
            width: ERASER_WIDTH,
            sampling: EraseSampling::default(),
        }
    }
}

impl Eraser {
    pub fn new(width: f32, sampling: EraseSampling) -> Self {
        Self { width, sampling }
    }

    /// Select the strokes an erase path touches.
    ///
    /// `path` is in page space. An empty or degenerate path selects nothing.
    pub fn select_strokes_from_path<'a, I>(&self, strokes: I, path: &[Vec2], kind: EraserKind) -> Vec<Stroke>
    where
        I: IntoIterator<Item = &'a Stroke>,
    {
        let Some(region) = EraseRegion::new(path, kind, self.width) else {
            debug!("Eraser: degenerate {:?} path ({} points)", kind, path.len());
            return Vec::new();
        };
        let region_bounds = region.bounds();

        let mut candidates = 0usize;
        let selected: Vec<Stroke> = strokes
            .into_iter()
            .filter(|stroke| stroke.bounding_rect().intersects(&region_bounds))
            .inspect(|_| candidates += 1)
            .filter(|stroke| {
                let points = stroke.points();
                sample_indices(points.len(), &self.sampling)
                    .into_iter()
                    .any(|i| region.contains(points[i].position()))
            })
            .cloned()
            .collect();

        debug!(
            "Eraser: {:?} path of {} points, {} candidates, {} selected",
            kind,
            path.len(),
            candidates,
            selected.len()
        );
        selected
    }
}

/// [`Eraser::select_strokes_from_path`] with default width and sampling
pub fn select_strokes_from_path<'a, I>(strokes: I, path: &[Vec2], kind: EraserKind) -> Vec<Stroke>
where
    I: IntoIterator<Item = &'a Stroke>,
{
    Eraser::default().select_strokes_from_path(strokes, path, kind)
}
