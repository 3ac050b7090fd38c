//! Common numeric helpers

mod common;

// Re-export
pub use common::*;
