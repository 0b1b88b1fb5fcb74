//! Message types for inkpad
//!
//! Defines the values that cross the boundary between the drawing engine
//! and its host: raw digitizer samples, pen settings, viewport changes, and
//! the commands that drive a drawing session.

mod commands;
mod error;
mod input;
mod messages;

pub use commands::*;
pub use error::IpcError;
pub use input::*;
pub use messages::*;
