//! Input batching and stroke construction
//!
//! The digitizer delivers one gesture as a run of timed batches. The
//! [`GestureBuffer`] collects them until the pen lifts, then
//! [`build_stroke`] turns the whole run into one immutable [`Stroke`].

use inkpad_ipc::{GesturePhase, PenSettings, PointerBatch, RawSample};
use tracing::debug;

use crate::types::{Stroke, StrokePoint};
use crate::viewport::Viewport;

/// Collects sample batches for the gesture in progress
#[derive(Debug, Default)]
pub struct GestureBuffer {
    samples: Vec<RawSample>,
    active: bool,
}

impl GestureBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// True between a Begin batch and the matching End
    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn pending_len(&self) -> usize {
        self.samples.len()
    }

    /// Feed one delivery; returns the full gesture once it ends.
    ///
    /// A Begin or Tap batch discards anything left over from an
    /// unterminated gesture. An End batch with nothing buffered yields an
    /// empty Vec.
    pub fn push(&mut self, batch: PointerBatch) -> Option<Vec<RawSample>> {
        match batch.phase {
            GesturePhase::Begin => {
                if !self.samples.is_empty() {
                    debug!(
                        "GestureBuffer: dropping {} samples from unterminated gesture",
                        self.samples.len()
                    );
                }
                self.samples = batch.samples;
                self.active = true;
                None
            }
            GesturePhase::Move => {
                self.samples.extend(batch.samples);
                self.active = true;
                None
            }
            GesturePhase::End => {
                self.samples.extend(batch.samples);
                self.active = false;
                Some(std::mem::take(&mut self.samples))
            }
            GesturePhase::Tap => {
                if !self.samples.is_empty() {
                    debug!(
                        "GestureBuffer: dropping {} samples from unterminated gesture",
                        self.samples.len()
                    );
                }
                self.samples.clear();
                self.active = false;
                Some(batch.samples)
            }
        }
    }

    /// Forget the gesture in progress
    pub fn clear(&mut self) {
        self.samples.clear();
        self.active = false;
    }
}

/// Build a stroke from one gesture's samples.
///
/// Samples are in view coordinates and are converted to page space with
/// `viewport`. Pressure, size, tilt, and timestamp are copied unchanged.
/// Returns None for an empty gesture. A single sample still yields a stroke,
/// which renders as a dot.
pub fn build_stroke(
    samples: &[RawSample],
    viewport: &Viewport,
    settings: &PenSettings,
    page_id: &str,
) -> Option<Stroke> {
    if samples.is_empty() {
        return None;
    }

    let points: Vec<StrokePoint> = samples
        .iter()
        .map(|sample| {
            let page = viewport.view_to_page(glam::Vec2::new(sample.x, sample.y));
            StrokePoint {
                x: page.x,
                y: page.y,
                pressure: sample.pressure,
                size: sample.size,
                tilt_x: sample.tilt_x,
                tilt_y: sample.tilt_y,
                timestamp: sample.timestamp,
            }
        })
        .collect();

    let stroke = Stroke::new(
        Stroke::generate_id(),
        page_id.to_string(),
        settings.pen,
        settings.size,
        settings.color,
        points,
        viewport.scroll_y(),
    )?;
    debug!(
        "build_stroke: {} points, pen={:?}, bounds={:?}",
        stroke.points().len(),
        stroke.pen,
        stroke.bounds()
    );
    Some(stroke)
}
