//! Diffuse Material

use render_core::geometry::*;
use render_core::interaction::*;
use render_core::material::*;
use render_core::pbrt::*;
use render_core::sampling::*;
use render_core::spectrum::*;

/// Implements purely diffuse (Lambertian) reflection on both sides of a
/// surface. Directions on opposite sides do not scatter.
#[derive(Clone, Debug)]
pub struct DiffuseMaterial {
    /// Spectral diffuse reflection.
    kd: Spectrum,
}

impl DiffuseMaterial {
    /// Create a new `DiffuseMaterial`.
    ///
    /// * `kd` - Spectral diffuse reflection.
    pub fn new(kd: Spectrum) -> Self {
        Self { kd }
    }
}

/// Returns true if both directions are on the same side of the shading normal.
#[inline]
fn same_hemisphere(point: &SurfacePoint, a: &Vector3f, b: &Vector3f) -> bool {
    point.ns.dot(a) * point.ns.dot(b) > 0.0
}

impl Material for DiffuseMaterial {
    fn evaluate(&self, point: &SurfacePoint, out_dir: &Vector3f, in_dir: &Vector3f, _mode: TransportMode) -> Spectrum {
        if same_hemisphere(point, out_dir, in_dir) {
            self.kd * INV_PI
        } else {
            Spectrum::ZERO
        }
    }

    fn sample(&self, point: &SurfacePoint, out_dir: &Vector3f, _mode: TransportMode, u: &Point2f) -> BsdfSample {
        let cos_out = point.ns.dot(out_dir);
        if cos_out == 0.0 {
            return BsdfSample::INVALID;
        }

        // Sample the hemisphere on the side of the outgoing direction.
        let normal = if cos_out > 0.0 { point.ns } else { -point.ns };
        let local = cosine_sample_hemisphere(u);
        let direction = Frame::from_normal(&normal).to_world(&local).normalize();

        let pdf = cosine_hemisphere_pdf(cos_theta(&local));
        if pdf == 0.0 {
            return BsdfSample::INVALID;
        }

        BsdfSample {
            direction,
            // BSDF * cos / pdf = kd / π * cos / (cos / π).
            weight: self.kd,
            pdf,
            pdf_reverse: cosine_hemisphere_pdf(cos_out.abs()),
        }
    }

    fn pdf(&self, point: &SurfacePoint, out_dir: &Vector3f, in_dir: &Vector3f, _mode: TransportMode) -> (Float, Float) {
        if !same_hemisphere(point, out_dir, in_dir) {
            return (0.0, 0.0);
        }
        (
            cosine_hemisphere_pdf(abs_dot(&point.ns, in_dir)),
            cosine_hemisphere_pdf(abs_dot(&point.ns, out_dir)),
        )
    }

    fn scatter_strength(&self, _point: &SurfacePoint) -> Spectrum {
        self.kd
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
