//! Pen and eraser selection types.

use serde::{Deserialize, Serialize};

/// Pen variant used to render a stroke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum PenKind {
    #[default]
    Ballpoint = 0,
    Marker = 1,
    Fountain = 2,
}

impl PenKind {
    pub const ALL: [PenKind; 3] = [PenKind::Ballpoint, PenKind::Marker, PenKind::Fountain];

    /// Stable lowercase name, as stored by persistence collaborators
    pub fn name(self) -> &'static str {
        match self {
            PenKind::Ballpoint => "ballpoint",
            PenKind::Marker => "marker",
            PenKind::Fountain => "fountain",
        }
    }
}

/// Eraser variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EraserKind {
    /// Wide-tipped path eraser
    #[default]
    Pen,
    /// Closed lasso; strokes inside the loop are erased
    Select,
}

/// Active tool configuration for new strokes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PenSettings {
    pub pen: PenKind,
    /// Base stroke width in page units
    pub size: f32,
    /// Packed ARGB
    pub color: u32,
}

impl Default for PenSettings {
    fn default() -> Self {
        Self {
            pen: PenKind::Ballpoint,
            size: 5.0,
            color: 0xFF00_0000,
        }
    }
}

impl PenSettings {
    pub fn new(pen: PenKind, size: f32, color: u32) -> Self {
        Self { pen, size, color }
    }
}
