//! Geometry

mod quad;
mod sphere;

// Re-export
pub use quad::*;
pub use sphere::*;
