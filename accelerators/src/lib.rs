//! Ray intersection acceleration data structures.

#[macro_use]
extern crate log;

mod primitive_list;

// Re-export
pub use primitive_list::*;
