//! Error types for the drawing engine.

use std::time::Duration;

use thiserror::Error;

/// Failures inside the drawing engine.
///
/// None of these reach the input path: callers log them and skip the
/// affected operation.
#[derive(Debug, Error)]
pub enum DrawingError {
    #[error("Drawing lock not acquired within {waited:?}")]
    LockTimeout { waited: Duration },
    #[error("Canvas unavailable: {0}")]
    CanvasUnavailable(String),
    #[error("Failed to encode page bitmap: {0}")]
    Persist(#[from] image::ImageError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Drawing session has shut down")]
    SessionClosed,
}
