//! Shared configuration for inkpad
//!
//! This crate is the single source of truth for view dimensions, the
//! pen-style visual table, and the tunables of the drawing engine
//! (timeouts, padding, eraser width, zoom limits).
//!
//! Nothing here is read from a user-editable file; the values are fixed
//! tables with serde support so a host can snapshot or override them.

use serde::{Deserialize, Serialize};

/// Default view width in pixels (portrait e-ink tablet)
pub const DEFAULT_WIDTH: u32 = 1404;

/// Default view height in pixels
pub const DEFAULT_HEIGHT: u32 = 1872;

/// Default scale factor (1.0 = no scaling)
pub const DEFAULT_SCALE: f32 = 1.0;

/// Blank space kept below the lowest stroke of a page
pub const PAGE_PADDING: f32 = 50.0;

/// Vertical jump (page units) above which a sample is treated as a sensor glitch
pub const JUMP_THRESHOLD: f32 = 30.0;

/// Width of the pen eraser tip in page units
pub const ERASER_WIDTH: f32 = 30.0;

/// Bounded wait for a draw commit to take the drawing lock
pub const DRAW_LOCK_TIMEOUT_MS: u64 = 500;

/// Bounded wait for a UI refresh before it proceeds anyway
pub const REFRESH_WAIT_MS: u64 = 3000;

/// Debounce window for persisting the page bitmap
pub const PERSIST_DEBOUNCE_MS: u64 = 1000;

/// Page background, packed ARGB
pub const BACKGROUND_COLOR: u32 = 0xFFFF_FFFF;

/// Display configuration for the drawing view
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    /// View width in pixels
    pub width: u32,
    /// View height in pixels
    pub height: u32,
    /// Scale factor for DPI scaling
    pub scale: f32,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            scale: DEFAULT_SCALE,
        }
    }
}

impl DisplayConfig {
    /// Create a new display config with the given dimensions
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            scale: DEFAULT_SCALE,
        }
    }

    /// Get width as f32 for calculations
    pub fn width_f32(&self) -> f32 {
        self.width as f32
    }

    /// Get height as f32 for calculations
    pub fn height_f32(&self) -> f32 {
        self.height as f32
    }
}

/// Visual parameters for one pen variant
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PenStyle {
    /// Opacity applied to the whole stroke (0.0-1.0)
    pub opacity: f32,
    /// Smallest width at the tail of a tapering stroke, as a fraction of the base width
    pub min_width_factor: f32,
    /// Whether consecutive points are joined with quadratic curves
    pub smooth: bool,
    /// Whether samples that jump vertically past the threshold are dropped
    pub reject_jumps: bool,
}

/// Fixed pen-variant to visual-parameter table
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PenStyleTable {
    pub ballpoint: PenStyle,
    pub marker: PenStyle,
    pub fountain: PenStyle,
}

impl Default for PenStyleTable {
    fn default() -> Self {
        Self {
            ballpoint: PenStyle {
                opacity: 1.0,
                min_width_factor: 1.0,
                smooth: true,
                reject_jumps: true,
            },
            marker: PenStyle {
                opacity: 0.4,
                min_width_factor: 1.0,
                smooth: false,
                reject_jumps: false,
            },
            fountain: PenStyle {
                opacity: 1.0,
                min_width_factor: 0.5,
                smooth: true,
                reject_jumps: true,
            },
        }
    }
}

/// Point-count thresholds for sampling a stroke during erase hit-testing.
///
/// Empirical values; tune freely, correctness does not depend on them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EraseSampling {
    /// Strokes shorter than this test every point
    pub all_below: usize,
    /// Strokes shorter than this test a third of their points
    pub third_below: usize,
    /// Strokes shorter than this test a tenth of their points
    pub tenth_below: usize,
    /// Fewest points tested on a sampled stroke
    pub min_samples: usize,
    /// Most points tested on any stroke
    pub max_samples: usize,
}

impl Default for EraseSampling {
    fn default() -> Self {
        Self {
            all_below: 10,
            third_below: 50,
            tenth_below: 200,
            min_samples: 3,
            max_samples: 20,
        }
    }
}

/// Tunables for the drawing engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    pub page_padding: f32,
    pub jump_threshold: f32,
    pub eraser_width: f32,
    pub draw_lock_timeout_ms: u64,
    pub refresh_wait_ms: u64,
    pub persist_debounce_ms: u64,
    pub min_zoom: f32,
    pub max_zoom: f32,
    pub max_undo_levels: usize,
    /// Page background, packed ARGB
    pub background: u32,
    pub erase_sampling: EraseSampling,
    pub pens: PenStyleTable,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            page_padding: PAGE_PADDING,
            jump_threshold: JUMP_THRESHOLD,
            eraser_width: ERASER_WIDTH,
            draw_lock_timeout_ms: DRAW_LOCK_TIMEOUT_MS,
            refresh_wait_ms: REFRESH_WAIT_MS,
            persist_debounce_ms: PERSIST_DEBOUNCE_MS,
            min_zoom: 0.5,
            max_zoom: 3.0,
            max_undo_levels: 100,
            background: BACKGROUND_COLOR,
            erase_sampling: EraseSampling::default(),
            pens: PenStyleTable::default(),
        }
    }
}
