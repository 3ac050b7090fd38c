//! Spheres

use render_core::geometry::*;
use render_core::interaction::*;
use render_core::pbrt::*;
use render_core::sampling::uniform_sample_sphere;
use render_core::shape::*;

/// A full sphere in world space.
#[derive(Clone, Debug)]
pub struct Sphere {
    /// Center.
    pub center: Point3f,

    /// Radius.
    pub radius: Float,

    /// Indicates whether the surface normals point inwards.
    pub reverse_orientation: bool,
}

impl Sphere {
    /// Create a new sphere.
    ///
    /// * `center`              - Center.
    /// * `radius`              - Radius.
    /// * `reverse_orientation` - Indicates whether the surface normals point
    ///                           inwards.
    pub fn new(center: Point3f, radius: Float, reverse_orientation: bool) -> Self {
        Self {
            center,
            radius,
            reverse_orientation,
        }
    }

    fn point_at(&self, p: Point3f) -> SurfacePoint {
        let mut n = Normal3f::from((p - self.center).normalize());
        if self.reverse_orientation {
            n = -n;
        }
        let d = (p - self.center) / self.radius;
        let mut phi = d.y.atan2(d.x);
        if phi < 0.0 {
            phi += TWO_PI;
        }
        let theta = clamp(d.z, -1.0, 1.0).acos();
        SurfacePoint::new(p, n, Point2f::new(phi / TWO_PI, theta * INV_PI))
    }
}

impl Shape for Sphere {
    fn get_type(&self) -> &'static str {
        "sphere"
    }

    fn world_bound(&self) -> Bounds3f {
        let r = Vector3f::new(self.radius, self.radius, self.radius);
        Bounds3f::new(self.center - r, self.center + r)
    }

    /// Returns the nearest root of the ray-sphere quadratic in `(0, t_max)`.
    ///
    /// * `r` - The ray.
    fn intersect(&self, r: &Ray) -> Option<SurfacePoint> {
        let oc = r.o - self.center;
        let a = r.d.length_squared();
        let half_b = oc.dot(&r.d);
        let c = oc.length_squared() - self.radius * self.radius;
        let discriminant = half_b * half_b - a * c;
        if discriminant < 0.0 {
            return None;
        }

        let root = discriminant.sqrt();
        let t0 = (-half_b - root) / a;
        let t1 = (-half_b + root) / a;
        let t = if t0 > 0.0 && t0 < r.t_max {
            t0
        } else if t1 > 0.0 && t1 < r.t_max {
            t1
        } else {
            return None;
        };

        // Project the hit back onto the surface to limit error.
        let p = self.center + (r.at(t) - self.center).normalize() * self.radius;
        let mut point = self.point_at(p);
        point.distance = t;
        Some(point)
    }

    fn area(&self) -> Float {
        4.0 * PI * self.radius * self.radius
    }

    fn sample_area(&self, u: &Point2f) -> SurfaceSample {
        let d = uniform_sample_sphere(u);
        SurfaceSample {
            point: self.point_at(self.center + d * self.radius),
            pdf: 1.0 / self.area(),
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::approx_eq;

    #[test]
    fn hit_from_outside_and_inside() {
        let sphere = Sphere::new(Point3f::new(0.0, 0.0, 5.0), 1.0, false);

        let outside = Ray::new(Point3f::ORIGIN, Vector3f::new(0.0, 0.0, 1.0), INFINITY);
        let hit = sphere.intersect(&outside).expect("hit");
        assert!(approx_eq!(f32, hit.distance, 4.0, epsilon = 1e-4));
        assert!(hit.n.z < 0.0);

        let inside = Ray::new(Point3f::new(0.0, 0.0, 5.0), Vector3f::new(1.0, 0.0, 0.0), INFINITY);
        let hit = sphere.intersect(&inside).expect("hit");
        assert!(approx_eq!(f32, hit.distance, 1.0, epsilon = 1e-4));
    }

    #[test]
    fn reversed_normals_point_inwards() {
        let sphere = Sphere::new(Point3f::ORIGIN, 2.0, true);
        let sample = sphere.sample_area(&Point2f::new(0.3, 0.7));
        let outward = (sample.point.p - Point3f::ORIGIN).normalize();
        assert!(sample.point.n.dot(&outward) < 0.0);
        assert!(approx_eq!(f32, sample.pdf, 1.0 / (16.0 * PI), epsilon = 1e-6));
    }

    #[test]
    fn miss() {
        let sphere = Sphere::new(Point3f::new(0.0, 0.0, 5.0), 1.0, false);
        let ray = Ray::new(Point3f::new(0.0, 2.0, 0.0), Vector3f::new(0.0, 0.0, 1.0), INFINITY);
        assert!(sphere.intersect(&ray).is_none());
    }
}
