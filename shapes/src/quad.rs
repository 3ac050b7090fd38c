//! Quads

use render_core::geometry::*;
use render_core::interaction::*;
use render_core::pbrt::*;
use render_core::shape::*;

/// A parallelogram spanned by two edges from a corner. The normal is
/// `normalize(edge_u × edge_v)`, so swapping the edges flips the surface.
#[derive(Clone, Debug)]
pub struct Quad {
    /// Corner at uv = (0, 0).
    pub corner: Point3f,

    /// Edge towards uv = (1, 0).
    pub edge_u: Vector3f,

    /// Edge towards uv = (0, 1).
    pub edge_v: Vector3f,

    /// Unit normal.
    normal: Normal3f,

    /// Surface area.
    area: Float,
}

impl Quad {
    /// Create a new quad.
    ///
    /// * `corner` - Corner at uv = (0, 0).
    /// * `edge_u` - Edge towards uv = (1, 0).
    /// * `edge_v` - Edge towards uv = (0, 1).
    pub fn new(corner: Point3f, edge_u: Vector3f, edge_v: Vector3f) -> Self {
        let cross = edge_u.cross(&edge_v);
        let area = cross.length();
        Self {
            corner,
            edge_u,
            edge_v,
            normal: Normal3f::from(cross / area),
            area,
        }
    }

    /// Create an axis aligned square in the plane z = `height`, centered on the
    /// z-axis and facing +z or -z.
    ///
    /// * `height`    - z-coordinate of the plane.
    /// * `half_size` - Half of the edge length.
    /// * `facing_up` - Whether the normal is +z.
    pub fn horizontal(height: Float, half_size: Float, facing_up: bool) -> Self {
        let corner = Point3f::new(-half_size, -half_size, height);
        let ex = Vector3f::new(2.0 * half_size, 0.0, 0.0);
        let ey = Vector3f::new(0.0, 2.0 * half_size, 0.0);
        if facing_up {
            Self::new(corner, ex, ey)
        } else {
            Self::new(corner, ey, ex)
        }
    }

    fn point_at(&self, u: Float, v: Float) -> SurfacePoint {
        let p = self.corner + self.edge_u * u + self.edge_v * v;
        SurfacePoint::new(p, self.normal, Point2f::new(u, v))
    }
}

impl Shape for Quad {
    fn get_type(&self) -> &'static str {
        "quad"
    }

    fn world_bound(&self) -> Bounds3f {
        Bounds3f::new(self.corner, self.corner + self.edge_u + self.edge_v)
            .union_point(&(self.corner + self.edge_u))
            .union_point(&(self.corner + self.edge_v))
    }

    /// Intersects the supporting plane and checks the parametric coordinates.
    ///
    /// * `r` - The ray.
    fn intersect(&self, r: &Ray) -> Option<SurfacePoint> {
        let denom = self.normal.dot(&r.d);
        if denom.abs() < 1e-8 {
            return None;
        }
        let t = self.normal.dot(&(self.corner - r.o)) / denom;
        if t <= 0.0 || t >= r.t_max {
            return None;
        }

        // Solve for (u, v) using the dual basis of the edges.
        let rel = r.at(t) - self.corner;
        let n = Vector3f::from(self.normal);
        let inv = 1.0 / (self.area * self.area);
        let u = rel.cross(&self.edge_v).dot(&(n * self.area)) * inv;
        let v = self.edge_u.cross(&rel).dot(&(n * self.area)) * inv;
        if !(0.0..=1.0).contains(&u) || !(0.0..=1.0).contains(&v) {
            return None;
        }

        let mut point = self.point_at(u, v);
        point.distance = t;
        Some(point)
    }

    fn area(&self) -> Float {
        self.area
    }

    fn sample_area(&self, u: &Point2f) -> SurfaceSample {
        SurfaceSample {
            point: self.point_at(u.x, u.y),
            pdf: 1.0 / self.area,
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
    use proptest::prelude::*;

    #[test]
    fn horizontal_orientation() {
        assert_eq!(Quad::horizontal(0.0, 1.0, true).normal, Normal3f::new(0.0, 0.0, 1.0));
        assert_eq!(Quad::horizontal(0.0, 1.0, false).normal, Normal3f::new(0.0, 0.0, -1.0));
        assert!(approx_eq!(f32, Quad::horizontal(0.0, 0.5, true).area(), 1.0, ulps = 2));
    }

    #[test]
    fn ray_misses_outside_and_behind() {
        let quad = Quad::horizontal(0.0, 1.0, true);
        let outside = Ray::new(Point3f::new(2.0, 0.0, 1.0), Vector3f::new(0.0, 0.0, -1.0), INFINITY);
        assert!(quad.intersect(&outside).is_none());
        let behind = Ray::new(Point3f::new(0.0, 0.0, 1.0), Vector3f::new(0.0, 0.0, 1.0), INFINITY);
        assert!(quad.intersect(&behind).is_none());
        let short = Ray::new(Point3f::new(0.0, 0.0, 1.0), Vector3f::new(0.0, 0.0, -1.0), 0.5);
        assert!(quad.intersect(&short).is_none());
    }

    proptest! {
        #[test]
        fn sampled_points_are_hit(u in 0.01..0.99f32, v in 0.01..0.99f32) {
            let quad = Quad::new(
                Point3f::new(-1.0, 0.5, 2.0),
                Vector3f::new(2.0, 0.0, 0.5),
                Vector3f::new(0.0, 1.5, 0.0),
            );
            let sample = quad.sample_area(&Point2f::new(u, v));
            let origin = sample.point.p + Vector3f::from(sample.point.n) * 3.0;
            let ray = Ray::new(origin, -Vector3f::from(sample.point.n), INFINITY);
            let hit = quad.intersect(&ray);
            prop_assert!(hit.is_some());
            if let Some(hit) = hit {
                prop_assert!(hit.p.distance(&sample.point.p) < 1e-3);
                prop_assert!((hit.distance - 3.0).abs() < 1e-3);
                prop_assert!((hit.uv.x - u).abs() < 1e-3 && (hit.uv.y - v).abs() < 1e-3);
            }
        }
    }
}
