//! Commands from the host into a drawing session.

use serde::{Deserialize, Serialize};

use crate::commands::{EraserKind, PenSettings, ViewportChange};
use crate::error::IpcError;
use crate::input::PointerBatch;

/// Everything a host can ask of a drawing session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum InputCommand {
    /// Digitizer delivery for the current gesture
    PointerBatch(PointerBatch),

    /// Pen variant, width, or color changed
    PenSettingsChanged(PenSettings),

    /// Page view scrolled or zoomed
    ViewportChanged(ViewportChange),

    /// Switch between drawing and erasing; `None` returns to drawing
    EraseModeToggled { eraser: Option<EraserKind> },

    /// Stroke options panel opened or closed
    StrokeOptionsToggled { open: bool },

    /// Revert the last committed operation
    Undo,

    /// Re-apply the last reverted operation
    Redo,
}

impl InputCommand {
    /// Encode as a JSON string
    pub fn to_json(&self) -> Result<String, IpcError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decode from a JSON string
    pub fn from_json(json: &str) -> Result<Self, IpcError> {
        if json.trim().is_empty() {
            return Err(IpcError::InvalidFormat("empty message".to_string()));
        }
        Ok(serde_json::from_str(json)?)
    }
}
