//! Camera

use crate::geometry::*;
use crate::interaction::*;
use crate::pbrt::*;
use crate::rng::*;
use crate::spectrum::*;
use std::sync::Arc;

/// A ray leaving the camera.
#[derive(Copy, Clone, Debug)]
pub struct CameraRaySample {
    /// The ray.
    pub ray: Ray,

    /// Point on the lens; its normal is the viewing direction.
    pub point: SurfacePoint,

    /// Importance divided by the sampling density.
    pub weight: Spectrum,

    /// Solid angle density of the ray direction, measured with respect to
    /// film area in pixel units.
    pub pdf: Float,
}

/// Result of projecting a scene point onto the film.
#[derive(Copy, Clone, Debug)]
pub struct CameraResponseSample {
    /// Continuous film position.
    pub pixel: Point2f,

    /// Importance arriving at `pixel` divided by the sampling density.
    pub weight: Spectrum,

    /// Area density of the camera sampling the scene point.
    pub pdf_emit: Float,

    /// Lens position that the response was computed for.
    pub position: Point3f,
}

/// Camera interface.
pub trait Camera {
    /// Returns the film resolution (width, height) in pixels.
    fn resolution(&self) -> (usize, usize);

    /// Returns the camera position.
    fn position(&self) -> Point3f;

    /// Returns a ray through a film position.
    ///
    /// * `film_pos` - Film position in pixel units.
    /// * `rng`      - Random number generator for lens sampling.
    fn generate_ray(&self, film_pos: &Point2f, rng: &mut RNG) -> CameraRaySample;

    /// Projects a scene point onto the film. Returns `None` if the point is
    /// behind the camera or outside the frustum.
    ///
    /// * `point` - The scene point.
    /// * `rng`   - Random number generator for lens sampling.
    fn sample_response(&self, point: &SurfacePoint, rng: &mut RNG) -> Option<CameraResponseSample>;

    /// Returns the jacobian that converts a solid angle at the camera into
    /// film area in pixel units.
    ///
    /// * `p` - The scene point the direction points to.
    fn solid_angle_to_pixel_jacobian(&self, p: &Point3f) -> Float;
}

/// Atomic reference counted `Camera`.
pub type ArcCamera = Arc<dyn Camera + Send + Sync>;
