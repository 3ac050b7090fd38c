//! Geometry

mod bounds3;
mod common;
mod frame;
mod normal;
mod point2;
mod point3;
mod ray;
mod vector3;

// Re-export.
pub use bounds3::*;
pub use common::*;
pub use frame::*;
pub use normal::*;
pub use point2::*;
pub use point3::*;
pub use ray::*;
pub use vector3::*;
