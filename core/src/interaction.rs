//! Surface points

use crate::geometry::*;
use crate::pbrt::*;

/// Sentinel primitive index for points that are not on scene geometry (camera
/// positions, sampled emitter points before the scene resolves them).
pub const NO_PRIMITIVE: usize = usize::MAX;

/// A point on a surface, either found by intersecting a ray with the scene or
/// sampled directly on a shape.
#[derive(Copy, Clone, Debug)]
pub struct SurfacePoint {
    /// Position.
    pub p: Point3f,

    /// Geometric normal.
    pub n: Normal3f,

    /// Shading normal.
    pub ns: Normal3f,

    /// The uv coordinates from surface parametrization.
    pub uv: Point2f,

    /// Distance along the ray that found this point; 0 for sampled points.
    pub distance: Float,

    /// Index of the primitive in the scene.
    pub prim_id: usize,
}

impl Default for SurfacePoint {
    fn default() -> Self {
        Self {
            p: Point3f::ORIGIN,
            n: Normal3f::ZERO,
            ns: Normal3f::ZERO,
            uv: Point2f::default(),
            distance: 0.0,
            prim_id: NO_PRIMITIVE,
        }
    }
}

impl SurfacePoint {
    /// Create a new surface point whose shading normal equals the geometric
    /// normal.
    ///
    /// * `p`  - Position.
    /// * `n`  - Unit geometric normal.
    /// * `uv` - Surface parametrization.
    pub fn new(p: Point3f, n: Normal3f, uv: Point2f) -> Self {
        Self {
            p,
            n,
            ns: n,
            uv,
            distance: 0.0,
            prim_id: NO_PRIMITIVE,
        }
    }

    /// Returns the ratio of the shading and geometric cosines of `d`. Light
    /// transport cosines only cancel with the area jacobian when both normals
    /// agree, so adjoint estimates are scaled by this factor.
    ///
    /// * `d` - Unit direction.
    pub fn shading_correction(&self, d: &Vector3f) -> Float {
        let cos_geometric = abs_dot(&self.n, d);
        if cos_geometric == 0.0 {
            return 0.0;
        }
        abs_dot(&self.ns, d) / cos_geometric
    }

    /// Returns the origin offset along the geometric normal towards the side
    /// of the surface `d` points to.
    ///
    /// * `d` - Direction leaving the surface.
    pub fn offset_origin(&self, d: &Vector3f) -> Point3f {
        if self.n.is_zero() {
            return self.p;
        }
        let offset = Vector3f::from(self.n) * RAY_OFFSET_EPSILON;
        if self.n.dot(d) < 0.0 {
            self.p - offset
        } else {
            self.p + offset
        }
    }

    /// Spawn's a new ray in the given direction.
    ///
    /// * `d` - The new direction.
    pub fn spawn_ray(&self, d: &Vector3f) -> Ray {
        Ray::new(self.offset_origin(d), d.normalize(), INFINITY)
    }

    /// Spawn's a shadow ray towards a point. The ray stops just short of the
    /// target so that the target surface itself does not occlude.
    ///
    /// * `target` - The target point.
    pub fn spawn_ray_to(&self, target: &Point3f) -> Ray {
        let origin = self.offset_origin(&(*target - self.p));
        let d = *target - origin;
        let dist = d.length();
        Ray::new(origin, d / dist, dist * (1.0 - SHADOW_EPSILON))
    }

    /// Spawn's a shadow ray towards another surface point, offsetting both
    /// ends away from their surfaces.
    ///
    /// * `other` - The other surface point.
    pub fn spawn_ray_to_surface(&self, other: &SurfacePoint) -> Ray {
        let origin = self.offset_origin(&(other.p - self.p));
        let target = other.offset_origin(&(origin - other.p));
        let d = target - origin;
        let dist = d.length();
        Ray::new(origin, d / dist, dist * (1.0 - SHADOW_EPSILON))
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spawned_rays_leave_the_surface() {
        let sp = SurfacePoint::new(Point3f::ORIGIN, Normal3f::new(0.0, 0.0, 1.0), Point2f::default());

        let up = sp.spawn_ray(&Vector3f::new(0.0, 0.0, 2.0));
        assert!(up.o.z > 0.0);
        assert!((up.d.length() - 1.0).abs() < 1e-5);

        let down = sp.spawn_ray(&Vector3f::new(0.0, 0.0, -1.0));
        assert!(down.o.z < 0.0);
    }

    #[test]
    fn shadow_ray_stops_short() {
        let sp = SurfacePoint::new(Point3f::ORIGIN, Normal3f::new(0.0, 0.0, 1.0), Point2f::default());
        let target = Point3f::new(0.0, 0.0, 3.0);
        let ray = sp.spawn_ray_to(&target);
        assert!(ray.t_max < target.distance(&ray.o));
        assert!(ray.at(ray.t_max).z < 3.0);
    }

    #[test]
    fn shading_correction_compares_cosines() {
        let mut sp = SurfacePoint::new(Point3f::ORIGIN, Normal3f::new(0.0, 0.0, 1.0), Point2f::default());
        let d = Vector3f::new(1.0, 0.0, 1.0).normalize();
        assert!((sp.shading_correction(&d) - 1.0).abs() < 1e-6);

        sp.ns = Normal3f::new(1.0, 0.0, 0.0);
        assert!((sp.shading_correction(&d) - 1.0).abs() < 1e-5);

        sp.ns = Normal3f::new(0.6, 0.0, 0.8);
        let expected = (0.6 + 0.8) / 1.0;
        assert!((sp.shading_correction(&d) - expected).abs() < 1e-5);

        let grazing = Vector3f::new(1.0, 0.0, 0.0);
        assert!(sp.shading_correction(&grazing) == 0.0);
    }
}
