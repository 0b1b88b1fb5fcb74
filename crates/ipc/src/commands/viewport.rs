//! Viewport change notifications.

use serde::{Deserialize, Serialize};

/// The host scrolled or zoomed the page view.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewportChange {
    /// Vertical offset into page space
    pub scroll_y: f32,
    /// Uniform zoom factor; clamped by the engine
    pub zoom: f32,
}

impl Default for ViewportChange {
    fn default() -> Self {
        Self {
            scroll_y: 0.0,
            zoom: 1.0,
        }
    }
}
