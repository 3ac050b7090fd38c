//! Primitive list

use render_core::geometry::*;
use render_core::interaction::*;
use render_core::scene::*;
use render_core::shape::*;

/// Brute force `Raytracer` that tests every shape whose bounds the ray enters.
/// Shape `i` reports `prim_id = i`.
pub struct PrimitiveList {
    /// The shapes, in primitive order.
    shapes: Vec<ArcShape>,

    /// World bounds of each shape.
    bounds: Vec<Bounds3f>,

    /// Union of all bounds.
    world_bound: Bounds3f,
}

impl PrimitiveList {
    /// Create a new primitive list.
    ///
    /// * `shapes` - The shapes, in primitive order.
    pub fn new(shapes: Vec<ArcShape>) -> Self {
        // Pad flat shapes so the slab test does not reject grazing rays.
        let bounds: Vec<Bounds3f> = shapes.iter().map(|s| s.world_bound().expand(1e-4)).collect();
        let world_bound = bounds.iter().fold(Bounds3f::default(), |acc, b| acc.union(b));
        debug!("PrimitiveList with {} shapes", shapes.len());
        Self {
            shapes,
            bounds,
            world_bound,
        }
    }

    /// Create a primitive list over the shapes of the given primitives.
    ///
    /// * `primitives` - The primitives.
    pub fn from_primitives(primitives: &[Primitive]) -> Self {
        Self::new(primitives.iter().map(|p| p.shape.clone()).collect())
    }
}

impl Raytracer for PrimitiveList {
    fn trace(&self, ray: &Ray) -> Option<SurfacePoint> {
        let mut closest: Option<SurfacePoint> = None;
        let mut r = *ray;
        for (i, shape) in self.shapes.iter().enumerate() {
            if !self.bounds[i].intersect_p(&r) {
                continue;
            }
            if let Some(mut hit) = shape.intersect(&r) {
                hit.prim_id = i;
                r.t_max = hit.distance;
                closest = Some(hit);
            }
        }
        closest
    }

    fn intersect_p(&self, ray: &Ray) -> bool {
        self.shapes
            .iter()
            .zip(self.bounds.iter())
            .any(|(shape, bounds)| bounds.intersect_p(ray) && shape.intersect_p(ray))
    }

    fn world_bound(&self) -> Bounds3f {
        self.world_bound
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use render_core::pbrt::*;
    use shapes::*;
    use std::sync::Arc;

    fn two_planes() -> PrimitiveList {
        PrimitiveList::new(vec![
            Arc::new(Quad::horizontal(0.0, 1.0, true)),
            Arc::new(Quad::horizontal(1.0, 1.0, true)),
        ])
    }

    #[test]
    fn closest_hit_wins() {
        let list = two_planes();
        let ray = Ray::new(Point3f::new(0.0, 0.0, 3.0), Vector3f::new(0.0, 0.0, -1.0), INFINITY);
        let hit = list.trace(&ray).expect("hit");
        assert_eq!(hit.prim_id, 1);
        assert!((hit.distance - 2.0).abs() < 1e-4);

        let below = Ray::new(Point3f::new(0.0, 0.0, 0.5), Vector3f::new(0.0, 0.0, -1.0), INFINITY);
        assert_eq!(list.trace(&below).map(|h| h.prim_id), Some(0));
    }

    #[test]
    fn occlusion_respects_t_max() {
        let list = two_planes();
        let ray = Ray::new(Point3f::new(0.0, 0.0, 3.0), Vector3f::new(0.0, 0.0, -1.0), 1.5);
        assert!(!list.intersect_p(&ray));
        let ray = Ray::new(Point3f::new(0.0, 0.0, 3.0), Vector3f::new(0.0, 0.0, -1.0), 2.5);
        assert!(list.intersect_p(&ray));
    }

    #[test]
    fn bounds_cover_all_shapes() {
        let list = two_planes();
        let b = list.world_bound();
        assert!(b.inside(&Point3f::new(1.0, 1.0, 1.0)));
        assert!(b.inside(&Point3f::new(-1.0, -1.0, 0.0)));
    }
}
