//! Diffuse Area Light Source

use render_core::geometry::*;
use render_core::interaction::*;
use render_core::light::*;
use render_core::pbrt::*;
use render_core::sampling::*;
use render_core::shape::*;
use render_core::spectrum::*;

/// Implements a basic area light source with uniform spatial and directional
/// radiance distribution. Light leaves the side the shading normal points to.
#[derive(Clone)]
pub struct DiffuseAreaLight {
    /// Emitted radiance.
    pub l_emit: Spectrum,

    /// Shape describing surface of the light source.
    pub shape: ArcShape,

    /// Surface area of the shape.
    pub area: Float,
}

impl DiffuseAreaLight {
    /// Returns a new `DiffuseAreaLight`.
    ///
    /// * `l_emit` - Emitted radiance.
    /// * `shape`  - Shape describing surface of the light source.
    pub fn new(l_emit: Spectrum, shape: ArcShape) -> Self {
        let area = shape.area();
        Self { l_emit, shape, area }
    }
}

impl Emitter for DiffuseAreaLight {
    fn sample_ray(&self, primary_pos: &Point2f, primary_dir: &Point2f) -> EmitterSample {
        let pos = self.sample_uniform_area(primary_pos);

        let local = cosine_sample_hemisphere(primary_dir);
        let direction = Frame::from_normal(&pos.point.ns).to_world(&local).normalize();
        let pdf = pos.pdf * cosine_hemisphere_pdf(cos_theta(&local));

        EmitterSample {
            point: pos.point,
            direction,
            pdf,
            // The cosine cancels with the directional pdf.
            weight: self.l_emit * (PI / pos.pdf),
        }
    }

    fn pdf_ray(&self, point: &SurfacePoint, direction: &Vector3f) -> Float {
        let cosine = point.ns.dot(direction) / direction.length();
        self.pdf_uniform_area(point) * cosine_hemisphere_pdf(cosine)
    }

    fn emitted_radiance(&self, point: &SurfacePoint, direction: &Vector3f) -> Spectrum {
        if point.ns.dot(direction) <= 0.0 {
            Spectrum::ZERO
        } else {
            self.l_emit
        }
    }

    fn sample_uniform_area(&self, u: &Point2f) -> SurfaceSample {
        self.shape.sample_area(u)
    }

    fn pdf_uniform_area(&self, point: &SurfacePoint) -> Float {
        self.shape.pdf_area(point)
    }

    fn total_power(&self) -> Spectrum {
        self.l_emit * (TWO_PI * self.area)
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
