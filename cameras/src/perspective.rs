//! Perspective Camera

use render_core::camera::*;
use render_core::geometry::*;
use render_core::interaction::*;
use render_core::pbrt::*;
use render_core::rng::*;
use render_core::sampling::*;
use render_core::spectrum::*;

/// Pinhole perspective camera. Film coordinates are in pixels with (0, 0) at
/// the top left corner.
#[derive(Clone, Debug)]
pub struct PerspectiveCamera {
    /// Camera position.
    pub position: Point3f,

    /// Viewing direction.
    forward: Vector3f,

    /// Film x-axis in world space.
    right: Vector3f,

    /// Film y-axis in world space, pointing up.
    up: Vector3f,

    /// Film width in pixels.
    width: usize,

    /// Film height in pixels.
    height: usize,

    /// tan(fov / 2) for the vertical field of view.
    tan_half_fov: Float,

    /// Aspect ratio width / height.
    aspect: Float,

    /// Distance to the virtual image plane at which a pixel has unit area.
    image_plane_distance: Float,
}

impl PerspectiveCamera {
    /// Create a new perspective camera.
    ///
    /// * `position` - Camera position.
    /// * `look_at`  - Point the camera looks at.
    /// * `up`       - Approximate up vector.
    /// * `fov`      - The vertical field-of-view angle in degrees.
    /// * `width`    - Film width in pixels.
    /// * `height`   - Film height in pixels.
    pub fn new(position: Point3f, look_at: Point3f, up: Vector3f, fov: Float, width: usize, height: usize) -> Self {
        let forward = (look_at - position).normalize();
        let right = forward.cross(&up).normalize();
        let up = right.cross(&forward);

        let tan_half_fov = (radians(fov) * 0.5).tan();
        let image_plane_distance = height as Float / (2.0 * tan_half_fov);
        debug!("Perspective camera {width}x{height}, fov {fov}, image plane at {image_plane_distance}");

        Self {
            position,
            forward,
            right,
            up,
            width,
            height,
            tan_half_fov,
            aspect: width as Float / height as Float,
            image_plane_distance,
        }
    }

    /// Returns the point in camera space: x right, y up, z along the view.
    fn to_local(&self, p: &Point3f) -> Vector3f {
        let d = *p - self.position;
        Vector3f::new(d.dot(&self.right), d.dot(&self.up), d.dot(&self.forward))
    }

    /// Maps a world position to a film position, or `None` if the point is
    /// behind the camera or outside the frame.
    fn world_to_film(&self, p: &Point3f) -> Option<Point2f> {
        let local = self.to_local(p);
        if local.z <= 0.0 {
            return None;
        }

        let ndc_x = local.x / (local.z * self.tan_half_fov * self.aspect);
        let ndc_y = local.y / (local.z * self.tan_half_fov);
        let film = Point2f::new(
            (ndc_x + 1.0) * 0.5 * self.width as Float,
            (1.0 - ndc_y) * 0.5 * self.height as Float,
        );

        if film.x < 0.0 || film.x > self.width as Float || film.y < 0.0 || film.y > self.height as Float {
            None
        } else {
            Some(film)
        }
    }
}

impl Camera for PerspectiveCamera {
    fn resolution(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    fn position(&self) -> Point3f {
        self.position
    }

    fn generate_ray(&self, film_pos: &Point2f, _rng: &mut RNG) -> CameraRaySample {
        let ndc_x = 2.0 * film_pos.x / self.width as Float - 1.0;
        let ndc_y = 1.0 - 2.0 * film_pos.y / self.height as Float;
        let dir = self.forward
            + self.right * (ndc_x * self.tan_half_fov * self.aspect)
            + self.up * (ndc_y * self.tan_half_fov);

        let ray = Ray::new(self.position, dir.normalize(), INFINITY);
        let point = SurfacePoint::new(self.position, Normal3f::from(self.forward), Point2f::default());

        CameraRaySample {
            pdf: self.solid_angle_to_pixel_jacobian(&(self.position + ray.d)),
            ray,
            point,
            weight: Spectrum::ONE,
        }
    }

    fn sample_response(&self, point: &SurfacePoint, _rng: &mut RNG) -> Option<CameraResponseSample> {
        let pixel = self.world_to_film(&point.p)?;

        let jacobian =
            self.solid_angle_to_pixel_jacobian(&point.p) * solid_angle_to_area(&self.position, &point.p, &point.n);

        Some(CameraResponseSample {
            pixel,
            weight: Spectrum::new(jacobian),
            pdf_emit: jacobian,
            position: self.position,
        })
    }

    fn solid_angle_to_pixel_jacobian(&self, p: &Point3f) -> Float {
        let local = self.to_local(p);
        let cosine = local.z / local.length();

        // Distance to the point on the image plane along the same direction.
        let d = self.image_plane_distance / cosine;
        d * d / cosine.abs()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
