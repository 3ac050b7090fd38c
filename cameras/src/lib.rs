//! Cameras

#[macro_use]
extern crate log;

mod perspective;

// Re-export
pub use perspective::*;
