//! inkpad drawing engine - strokes, viewport, and dirty-region rendering
//!
//! This crate provides the engine behind one open notebook page:
//! - [`types`] - Stroke and point data
//! - [`geometry`] / [`viewport`] - Rectangles and page/view coordinate mapping
//! - [`store`] - Ordered stroke storage with derived page height
//! - [`builder`] - Gesture batching and stroke construction
//! - [`eraser`] - Two-phase stroke hit testing
//! - [`pen`] / [`raster`] - Pen path algorithms and their rasterization
//! - [`surface`] / [`tiles`] - Pixel storage with dirty tile tracking
//! - [`render`] - Dirty-region renderer
//! - [`history`] - Undo/redo of stroke edits
//! - [`persist`] - Debounced PNG persistence
//! - [`session`] - The per-page session tying it all together

pub mod builder;
pub mod constants;
pub mod eraser;
pub mod error;
pub mod events;
pub mod geometry;
pub mod history;
pub mod lock;
pub mod logging;
pub mod pen;
pub mod persist;
pub mod raster;
pub mod render;
pub mod session;
pub mod store;
pub mod surface;
pub mod tiles;
pub mod types;
pub mod viewport;

pub use builder::{GestureBuffer, build_stroke};
pub use constants::*;
pub use eraser::{EraseRegion, Eraser, select_strokes_from_path};
pub use error::DrawingError;
pub use events::{EventBus, SessionEvent};
pub use geometry::{PixelRect, Rect};
pub use history::{History, HistoryAction, Operation};
pub use lock::{DrawGuard, DrawLock};
pub use persist::{PageSnapshot, PersistHandle, PersistScheduler};
pub use render::Renderer;
pub use session::{DrawOutcome, DrawingSession};
pub use store::PageStore;
pub use surface::CpuSurface;
pub use tiles::{PageBitmap, TileCoord};
pub use types::{Stroke, StrokeBounds, StrokePoint};
pub use viewport::Viewport;
