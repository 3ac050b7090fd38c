//! Uniform background

use render_core::geometry::*;
use render_core::light::*;
use render_core::pbrt::*;
use render_core::sampling::*;
use render_core::spectrum::*;

/// A background emitting the same radiance from every direction.
#[derive(Clone, Debug)]
pub struct UniformBackground {
    /// Emitted radiance.
    pub l_emit: Spectrum,
}

impl UniformBackground {
    /// Returns a new `UniformBackground`.
    ///
    /// * `l_emit` - Emitted radiance.
    pub fn new(l_emit: Spectrum) -> Self {
        Self { l_emit }
    }
}

impl Background for UniformBackground {
    fn emitted_radiance(&self, _direction: &Vector3f) -> Spectrum {
        self.l_emit
    }

    fn sample_direction(&self, u: &Point2f) -> BackgroundSample {
        let pdf = uniform_sphere_pdf();
        BackgroundSample {
            direction: uniform_sample_sphere(u),
            weight: self.l_emit / pdf,
            pdf,
        }
    }

    fn direction_pdf(&self, _direction: &Vector3f) -> Float {
        uniform_sphere_pdf()
    }

    /// Samples a direction, then a point on the scene-spanning disk orthogonal
    /// to it, placed outside the scene bounding sphere.
    fn sample_ray(
        &self,
        primary_pos: &Point2f,
        primary_dir: &Point2f,
        scene_center: &Point3f,
        scene_radius: Float,
    ) -> BackgroundRaySample {
        let dir_sample = self.sample_direction(primary_dir);

        let disk = concentric_sample_disk(primary_pos);
        let (tangent, binormal) = coordinate_system(&dir_sample.direction);
        let origin = *scene_center
            + (dir_sample.direction + tangent * disk.x + binormal * disk.y) * scene_radius;

        let pos_pdf = 1.0 / (PI * scene_radius * scene_radius);
        BackgroundRaySample {
            ray: Ray::new(origin, -dir_sample.direction, INFINITY),
            weight: dir_sample.weight / pos_pdf,
            pdf: pos_pdf * dir_sample.pdf,
        }
    }

    fn ray_pdf(&self, _point: &Point3f, direction: &Vector3f, scene_radius: Float) -> Float {
        let pos_pdf = 1.0 / (PI * scene_radius * scene_radius);
        pos_pdf * self.direction_pdf(&(-*direction))
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
    fn ray_enters_scene_sphere() {
        let bg = UniformBackground::new(Spectrum::ONE);
        let center = Point3f::new(1.0, 2.0, 3.0);
        let sample = bg.sample_ray(&Point2f::new(0.5, 0.5), &Point2f::new(0.3, 0.6), &center, 2.0);

        // Disk center sample: the ray passes through the sphere center.
        let to_center = center - sample.ray.o;
        let along = to_center.dot(&sample.ray.d);
        assert!(approx_eq!(f32, along, 2.0, epsilon = 1e-3));
        assert!(approx_eq!(f32, bg.ray_pdf(&center, &sample.ray.d, 2.0), sample.pdf, epsilon = 1e-6));
    }

    #[test]
    fn weight_is_radiance_over_pdf() {
        let bg = UniformBackground::new(Spectrum::new(0.5));
        let s = bg.sample_direction(&Point2f::new(0.1, 0.2));
        assert!(approx_eq!(f32, s.weight[0] * s.pdf, 0.5, epsilon = 1e-5));
        assert!((s.direction.length() - 1.0).abs() < 1e-4);
    }
}
