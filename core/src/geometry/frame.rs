//! Shading frame

use super::*;
use crate::pbrt::*;

/// An orthonormal basis around a normal, used to move directions between
/// world space and a local space where the normal is +z.
#[derive(Copy, Clone, Debug)]
pub struct Frame {
    s: Vector3f,
    t: Vector3f,
    n: Vector3f,
}

impl Frame {
    /// Create a frame around a unit normal.
    ///
    /// * `n` - The unit normal.
    pub fn from_normal(n: &Normal3f) -> Self {
        let n = Vector3f::from(*n);
        let (s, t) = coordinate_system(&n);
        Self { s, t, n }
    }

    /// Transform a world direction into the local frame.
    ///
    /// * `v` - The direction.
    pub fn to_local(&self, v: &Vector3f) -> Vector3f {
        Vector3f::new(v.dot(&self.s), v.dot(&self.t), v.dot(&self.n))
    }

    /// Transform a local direction into world space.
    ///
    /// * `v` - The direction.
    pub fn to_world(&self, v: &Vector3f) -> Vector3f {
        self.s * v.x + self.t * v.y + self.n * v.z
    }
}

/// Returns the cosine of the angle between a local direction and the +z axis.
///
/// * `w` - Local direction.
#[inline(always)]
pub fn cos_theta(w: &Vector3f) -> Float {
    w.z
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn local_world_round_trip(
            nx in -1.0..1.0f32, ny in -1.0..1.0f32, nz in -1.0..1.0f32,
            vx in -1.0..1.0f32, vy in -1.0..1.0f32, vz in -1.0..1.0f32,
        ) {
            let n = Vector3f::new(nx, ny, nz);
            prop_assume!(n.length() > 1e-2);
            let frame = Frame::from_normal(&Normal3f::from(n.normalize()));
            let v = Vector3f::new(vx, vy, vz);
            let back = frame.to_world(&frame.to_local(&v));
            prop_assert!((back - v).length() < 1e-4);
            prop_assert!((cos_theta(&frame.to_local(&n.normalize())) - 1.0).abs() < 1e-4);
        }
    }
}
