//! Command payload types.

mod pen;
mod viewport;

pub use pen::*;
pub use viewport::*;
