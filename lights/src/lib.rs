//! Light sources

mod background;
mod diffuse;

// Re-export
pub use background::*;
pub use diffuse::*;
