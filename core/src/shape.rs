//! Shapes

use crate::geometry::*;
use crate::interaction::*;
use crate::pbrt::*;
use std::sync::Arc;

/// Result of sampling a point on a surface.
#[derive(Copy, Clone, Debug)]
pub struct SurfaceSample {
    /// The sampled point.
    pub point: SurfacePoint,

    /// Density with respect to surface area.
    pub pdf: Float,
}

/// Shape common functions
pub trait Shape {
    /// Returns the shape type. Usually these are behind ArcShape and harder to
    /// debug. So this will be helpful.
    fn get_type(&self) -> &'static str;

    /// Returns a bounding box in world space.
    fn world_bound(&self) -> Bounds3f;

    /// Returns the closest intersection with `t` in `(0, r.t_max)`. The returned
    /// point has `distance` set and `prim_id` unset.
    ///
    /// * `r` - The ray.
    fn intersect(&self, r: &Ray) -> Option<SurfacePoint>;

    /// Returns `true` if a ray-shape intersection succeeds; otherwise `false`.
    ///
    /// * `r` - The ray.
    fn intersect_p(&self, r: &Ray) -> bool {
        self.intersect(r).is_some()
    }

    /// Returns the surface area of the shape.
    fn area(&self) -> Float;

    /// Sample a point uniformly on the surface and return the PDF with respect
    /// to area on the surface.
    ///
    /// * `u` - Sample value to use.
    fn sample_area(&self, u: &Point2f) -> SurfaceSample;

    /// Return the PDF for uniform area sampling. By default it is 1/area.
    ///
    /// * `_point` - A point on the surface.
    fn pdf_area(&self, _point: &SurfacePoint) -> Float {
        1.0 / self.area()
    }
}

/// Atomic reference counted `Shape`.
pub type ArcShape = Arc<dyn Shape + Send + Sync>;
