//! Pen rendering algorithms
//!
//! Each pen turns a point sequence into path operations plus the width and
//! opacity to stroke them with. These are pure functions; rasterization
//! lives in [`crate::raster`].
//!
//! - Ballpoint: quadratic smoothing through segment midpoints, dropping
//!   samples that jump vertically past the threshold.
//! - Marker: straight polyline, drawn translucent.
//! - Fountain: ballpoint smoothing, one path per point pair, width tapering
//!   linearly toward the tail.
//!
//! Zero points produce nothing. One point produces a zero-length path that
//! rasterizes as a dot.

use glam::Vec2;
use inkpad_config::{JUMP_THRESHOLD, PenStyle, PenStyleTable};
use inkpad_ipc::PenKind;

/// One path command
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PathOp {
    MoveTo(Vec2),
    LineTo(Vec2),
    /// Control point, end point
    QuadTo(Vec2, Vec2),
}

/// A path stroked at a single width
#[derive(Debug, Clone, PartialEq)]
pub struct PenPath {
    pub ops: Vec<PathOp>,
    pub width: f32,
}

/// Everything needed to paint one stroke
#[derive(Debug, Clone, PartialEq)]
pub struct PenRendering {
    pub paths: Vec<PenPath>,
    /// Applied once to the whole stroke
    pub opacity: f32,
}

impl PenRendering {
    fn empty(opacity: f32) -> Self {
        Self {
            paths: Vec::new(),
            opacity,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

/// Parameters shared by all pens
#[derive(Debug, Clone, Copy)]
pub struct PenParams {
    pub width: f32,
    pub jump_threshold: f32,
}

impl PenParams {
    pub fn new(width: f32) -> Self {
        Self {
            width,
            jump_threshold: JUMP_THRESHOLD,
        }
    }
}

/// Dispatch to the algorithm for `pen`
pub fn render_pen(pen: PenKind, points: &[Vec2], params: PenParams, styles: &PenStyleTable) -> PenRendering {
    match pen {
        PenKind::Ballpoint => ballpoint(points, params, &styles.ballpoint),
        PenKind::Marker => marker(points, params, &styles.marker),
        PenKind::Fountain => fountain(points, params, &styles.fountain),
    }
}

/// Drop points whose vertical distance from the last kept point exceeds the threshold
fn reject_jumps(points: &[Vec2], threshold: f32) -> Vec<Vec2> {
    let mut kept: Vec<Vec2> = Vec::with_capacity(points.len());
    for &p in points {
        match kept.last() {
            Some(last) if (p.y - last.y).abs() > threshold => continue,
            _ => kept.push(p),
        }
    }
    kept
}

fn dot(p: Vec2, width: f32) -> PenPath {
    PenPath {
        ops: vec![PathOp::MoveTo(p), PathOp::LineTo(p)],
        width,
    }
}

/// Smoothed path through `points`: quads to segment midpoints, line to the end
fn smoothed_ops(points: &[Vec2]) -> Vec<PathOp> {
    let mut ops = Vec::with_capacity(points.len() + 1);
    let Some((&first, rest)) = points.split_first() else {
        return ops;
    };
    ops.push(PathOp::MoveTo(first));
    let mut prev = first;
    for &p in rest {
        ops.push(PathOp::QuadTo(prev, (prev + p) * 0.5));
        prev = p;
    }
    ops.push(PathOp::LineTo(prev));
    ops
}

/// Ballpoint pen
pub fn ballpoint(points: &[Vec2], params: PenParams, style: &PenStyle) -> PenRendering {
    let points = if style.reject_jumps {
        reject_jumps(points, params.jump_threshold)
    } else {
        points.to_vec()
    };
    match points.len() {
        0 => PenRendering::empty(style.opacity),
        1 => PenRendering {
            paths: vec![dot(points[0], params.width)],
            opacity: style.opacity,
        },
        _ => {
            let ops = if style.smooth {
                smoothed_ops(&points)
            } else {
                polyline_ops(&points)
            };
            PenRendering {
                paths: vec![PenPath {
                    ops,
                    width: params.width,
                }],
                opacity: style.opacity,
            }
        }
    }
}

fn polyline_ops(points: &[Vec2]) -> Vec<PathOp> {
    let mut ops = Vec::with_capacity(points.len());
    if let Some((&first, rest)) = points.split_first() {
        ops.push(PathOp::MoveTo(first));
        ops.extend(rest.iter().map(|&p| PathOp::LineTo(p)));
    }
    ops
}

/// Highlighter-style marker
pub fn marker(points: &[Vec2], params: PenParams, style: &PenStyle) -> PenRendering {
    match points.len() {
        0 => PenRendering::empty(style.opacity),
        1 => PenRendering {
            paths: vec![dot(points[0], params.width)],
            opacity: style.opacity,
        },
        _ => PenRendering {
            paths: vec![PenPath {
                ops: polyline_ops(points),
                width: params.width,
            }],
            opacity: style.opacity,
        },
    }
}

/// Width factor for segment `index` of `count`, falling linearly from 1.0 to `floor`
#[inline]
pub fn taper(index: usize, count: usize, floor: f32) -> f32 {
    if count <= 1 {
        return 1.0;
    }
    let t = index as f32 / (count - 1) as f32;
    (1.0 - t * (1.0 - floor)).max(floor)
}

/// Tapering fountain pen
pub fn fountain(points: &[Vec2], params: PenParams, style: &PenStyle) -> PenRendering {
    let points = if style.reject_jumps {
        reject_jumps(points, params.jump_threshold)
    } else {
        points.to_vec()
    };
    match points.len() {
        0 => PenRendering::empty(style.opacity),
        1 => PenRendering {
            paths: vec![dot(points[0], params.width)],
            opacity: style.opacity,
        },
        n => {
            let segments = n - 1;
            let mut paths = Vec::with_capacity(segments + 1);
            let mut start = points[0];
            for i in 1..n {
                let prev = points[i - 1];
                let p = points[i];
                let width = params.width * taper(i - 1, segments, style.min_width_factor);
                let end = if i == n - 1 { p } else { (prev + p) * 0.5 };
                let ops = if style.smooth {
                    vec![PathOp::MoveTo(start), PathOp::QuadTo(prev, end)]
                } else {
                    vec![PathOp::MoveTo(prev), PathOp::LineTo(p)]
                };
                paths.push(PenPath { ops, width });
                start = end;
            }
            PenRendering {
                paths,
                opacity: style.opacity,
            }
        }
    }
}
