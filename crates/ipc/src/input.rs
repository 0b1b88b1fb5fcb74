//! Raw digitizer input types.

use serde::{Deserialize, Serialize};

/// One raw pointer sample as delivered by the digitizer driver.
///
/// `x`/`y` are in view (device) pixels; the engine converts them into page
/// space when a gesture is committed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawSample {
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

impl RawSample {
    /// Sample at a position with full pressure and no tilt
    pub fn at(x: f32, y: f32, timestamp: u64) -> Self {
        Self {
            x,
            y,
            pressure: 1.0,
            size: 1.0,
            tilt_x: 0,
            tilt_y: 0,
            timestamp,
        }
    }
}

/// Where a batch of samples sits within one pen-down-to-pen-up gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GesturePhase {
    /// Pen touched down; the batch opens a new gesture
    Begin,
    /// Pen moved; the batch continues the open gesture
    Move,
    /// Pen lifted; the batch closes the gesture
    End,
    /// Pen touched and lifted within one delivery; the batch is the whole gesture
    Tap,
}

/// A timed delivery of samples from the digitizer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointerBatch {
    pub phase: GesturePhase,
    pub samples: Vec<RawSample>,
}

impl PointerBatch {
    pub fn new(phase: GesturePhase, samples: Vec<RawSample>) -> Self {
        Self { phase, samples }
    }

    /// A batch that opens and closes a gesture in one delivery
    pub fn complete(samples: Vec<RawSample>) -> Self {
        Self::new(GesturePhase::Tap, samples)
    }
}
