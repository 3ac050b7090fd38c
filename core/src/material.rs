//! Material

use crate::geometry::*;
use crate::interaction::*;
use crate::pbrt::*;
use crate::spectrum::*;
use std::sync::Arc;

// Light transport mode enumeration.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TransportMode {
    /// Indicates incident ray that intersected a point started at the camera.
    Radiance,

    /// Indicates incident ray that intersected a point started at the light
    /// source.
    Importance,
}

/// Result of sampling a direction from a BSDF.
#[derive(Copy, Clone, Debug, Default)]
pub struct BsdfSample {
    /// Sampled incoming direction (world space, unit length).
    pub direction: Vector3f,

    /// BSDF times cosine divided by the forward pdf.
    pub weight: Spectrum,

    /// Solid angle density of sampling `direction` given the outgoing direction.
    pub pdf: Float,

    /// Solid angle density of sampling the outgoing direction given `direction`.
    pub pdf_reverse: Float,
}

impl BsdfSample {
    /// A sample that terminates the path.
    pub const INVALID: Self = Self {
        direction: Vector3f { x: 0.0, y: 0.0, z: 0.0 },
        weight: Spectrum::ZERO,
        pdf: 0.0,
        pdf_reverse: 0.0,
    };
}

/// Material trait provides the scattering capability consumed by the
/// integrators. All directions are in world space and point away from the
/// surface.
pub trait Material {
    /// Evaluates the BSDF (without cosine).
    ///
    /// * `point`   - Point on the surface.
    /// * `out_dir` - Outgoing direction.
    /// * `in_dir`  - Incoming direction.
    /// * `mode`    - Transport mode.
    fn evaluate(&self, point: &SurfacePoint, out_dir: &Vector3f, in_dir: &Vector3f, mode: TransportMode) -> Spectrum;

    /// Samples an incoming direction.
    ///
    /// * `point`   - Point on the surface.
    /// * `out_dir` - Outgoing direction.
    /// * `mode`    - Transport mode.
    /// * `u`       - Sample value to use.
    fn sample(&self, point: &SurfacePoint, out_dir: &Vector3f, mode: TransportMode, u: &Point2f) -> BsdfSample;

    /// Returns the forward and reverse solid angle densities.
    ///
    /// * `point`   - Point on the surface.
    /// * `out_dir` - Outgoing direction.
    /// * `in_dir`  - Incoming direction.
    /// * `mode`    - Transport mode.
    fn pdf(&self, point: &SurfacePoint, out_dir: &Vector3f, in_dir: &Vector3f, mode: TransportMode) -> (Float, Float);

    /// Returns an approximate albedo, used for diagnostics.
    fn scatter_strength(&self, _point: &SurfacePoint) -> Spectrum {
        Spectrum::ONE
    }
}

/// Atomic reference counted `Material`.
pub type ArcMaterial = Arc<dyn Material + Send + Sync>;

/// Binds a material to a surface point and a fixed outgoing direction.
#[derive(Copy, Clone)]
pub struct SurfaceShader<'a> {
    /// Point on the surface.
    pub point: SurfacePoint,

    /// Unit outgoing direction.
    pub out_dir: Vector3f,

    /// Transport mode.
    pub mode: TransportMode,

    material: &'a (dyn Material + Send + Sync),
}

impl<'a> SurfaceShader<'a> {
    /// Create a new surface shader.
    ///
    /// * `point`    - Point on the surface.
    /// * `out_dir`  - Outgoing direction.
    /// * `mode`     - Transport mode.
    /// * `material` - The material at `point`.
    pub fn new(
        point: SurfacePoint,
        out_dir: Vector3f,
        mode: TransportMode,
        material: &'a (dyn Material + Send + Sync),
    ) -> Self {
        Self {
            point,
            out_dir: out_dir.normalize(),
            mode,
            material,
        }
    }

    /// Evaluates the BSDF (without cosine).
    ///
    /// * `in_dir` - Incoming direction.
    pub fn evaluate(&self, in_dir: &Vector3f) -> Spectrum {
        self.material.evaluate(&self.point, &self.out_dir, &in_dir.normalize(), self.mode)
    }

    /// Evaluates the BSDF times the shading cosine of the incoming direction.
    ///
    /// * `in_dir` - Incoming direction.
    pub fn evaluate_with_cosine(&self, in_dir: &Vector3f) -> Spectrum {
        let in_dir = in_dir.normalize();
        self.material.evaluate(&self.point, &self.out_dir, &in_dir, self.mode) * abs_dot(&self.point.ns, &in_dir)
    }

    /// Samples an incoming direction.
    ///
    /// * `u` - Sample value to use.
    pub fn sample(&self, u: &Point2f) -> BsdfSample {
        self.material.sample(&self.point, &self.out_dir, self.mode, u)
    }

    /// Returns the forward and reverse solid angle densities.
    ///
    /// * `in_dir` - Incoming direction.
    pub fn pdf(&self, in_dir: &Vector3f) -> (Float, Float) {
        self.material.pdf(&self.point, &self.out_dir, &in_dir.normalize(), self.mode)
    }
}
