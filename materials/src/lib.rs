//! Materials

mod diffuse;

// Re-export
pub use diffuse::*;
