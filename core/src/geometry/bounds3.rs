//! 3-D axis aligned bounding box

use super::*;
use crate::pbrt::*;

/// 3-D axis aligned bounding box of `Float` coordinates.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Bounds3f {
    /// Minimum bounding point.
    pub p_min: Point3f,

    /// Maximum bounding point.
    pub p_max: Point3f,
}

impl Default for Bounds3f {
    /// Returns an empty (inverted) bounding box so that any union grows it.
    fn default() -> Self {
        Self {
            p_min: Point3f::new(INFINITY, INFINITY, INFINITY),
            p_max: Point3f::new(-INFINITY, -INFINITY, -INFINITY),
        }
    }
}

impl Bounds3f {
    /// Creates a bounding box from two corner points.
    ///
    /// * `p1` - First corner.
    /// * `p2` - Second corner.
    pub fn new(p1: Point3f, p2: Point3f) -> Self {
        Self {
            p_min: p1.min(&p2),
            p_max: p1.max(&p2),
        }
    }

    /// Returns true if no point has been added yet.
    pub fn is_empty(&self) -> bool {
        self.p_min.x > self.p_max.x || self.p_min.y > self.p_max.y || self.p_min.z > self.p_max.z
    }

    /// Returns a bounding box grown to contain the given point.
    ///
    /// * `p` - The point.
    pub fn union_point(&self, p: &Point3f) -> Self {
        Self {
            p_min: self.p_min.min(p),
            p_max: self.p_max.max(p),
        }
    }

    /// Returns a bounding box grown to contain another bounding box.
    ///
    /// * `other` - The other bounding box.
    pub fn union(&self, other: &Self) -> Self {
        Self {
            p_min: self.p_min.min(&other.p_min),
            p_max: self.p_max.max(&other.p_max),
        }
    }

    /// Returns the vector from the minimum to the maximum corner.
    pub fn diagonal(&self) -> Vector3f {
        self.p_max - self.p_min
    }

    /// Returns a bounding box padded by `delta` on all sides.
    ///
    /// * `delta` - Padding.
    pub fn expand(&self, delta: Float) -> Self {
        let d = Vector3f::new(delta, delta, delta);
        Self {
            p_min: self.p_min - d,
            p_max: self.p_max + d,
        }
    }

    /// Returns true if the point is inside the bounds (inclusive).
    ///
    /// * `p` - The point.
    pub fn inside(&self, p: &Point3f) -> bool {
        p.x >= self.p_min.x
            && p.x <= self.p_max.x
            && p.y >= self.p_min.y
            && p.y <= self.p_max.y
            && p.z >= self.p_min.z
            && p.z <= self.p_max.z
    }

    /// Returns `true` if the ray enters the bounds within `(0, t_max)` (slab test).
    ///
    /// * `ray` - The ray.
    pub fn intersect_p(&self, ray: &Ray) -> bool {
        let mut t0 = 0.0;
        let mut t1 = ray.t_max;
        for axis in 0..3 {
            let inv_d = 1.0 / ray.d[axis];
            let mut t_near = (self.p_min[axis] - ray.o[axis]) * inv_d;
            let mut t_far = (self.p_max[axis] - ray.o[axis]) * inv_d;
            if t_near > t_far {
                std::mem::swap(&mut t_near, &mut t_far);
            }
            // NaN from 0 * inf keeps the current interval.
            if t_near > t0 {
                t0 = t_near;
            }
            if t_far < t1 {
                t1 = t_far;
            }
            if t0 > t1 {
                return false;
            }
        }
        true
    }

    /// Returns the center and radius of a sphere enclosing the bounds.
    pub fn bounding_sphere(&self) -> (Point3f, Float) {
        if self.is_empty() {
            return (Point3f::ORIGIN, 0.0);
        }
        let center = self.p_min + self.diagonal() * 0.5;
        (center, center.distance(&self.p_max))
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
