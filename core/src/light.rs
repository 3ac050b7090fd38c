//! Emitters and backgrounds

use crate::geometry::*;
use crate::interaction::*;
use crate::pbrt::*;
use crate::shape::SurfaceSample;
use crate::spectrum::*;
use std::sync::Arc;

/// A ray sampled from an emitter surface.
#[derive(Copy, Clone, Debug)]
pub struct EmitterSample {
    /// Point on the emitter.
    pub point: SurfacePoint,

    /// Unit direction leaving the emitter.
    pub direction: Vector3f,

    /// Emitted radiance times cosine divided by `pdf`.
    pub weight: Spectrum,

    /// Product of the area density and the solid angle density.
    pub pdf: Float,
}

/// Emitter interface for surfaces that emit light.
pub trait Emitter {
    /// Samples a ray leaving the emitter.
    ///
    /// * `primary_pos` - Sample value for the position.
    /// * `primary_dir` - Sample value for the direction.
    fn sample_ray(&self, primary_pos: &Point2f, primary_dir: &Point2f) -> EmitterSample;

    /// Returns the density `sample_ray` has for the given point and direction.
    ///
    /// * `point`     - Point on the emitter.
    /// * `direction` - Direction leaving the emitter.
    fn pdf_ray(&self, point: &SurfacePoint, direction: &Vector3f) -> Float;

    /// Returns the radiance leaving `point` in `direction`.
    ///
    /// * `point`     - Point on the emitter.
    /// * `direction` - Direction leaving the emitter.
    fn emitted_radiance(&self, point: &SurfacePoint, direction: &Vector3f) -> Spectrum;

    /// Samples a point uniformly on the emitter surface.
    ///
    /// * `u` - Sample value to use.
    fn sample_uniform_area(&self, u: &Point2f) -> SurfaceSample;

    /// Returns the area density of `sample_uniform_area`.
    ///
    /// * `point` - Point on the emitter.
    fn pdf_uniform_area(&self, point: &SurfacePoint) -> Float;

    /// Returns the total emitted power.
    fn total_power(&self) -> Spectrum;
}

/// Atomic reference counted `Emitter`.
pub type ArcEmitter = Arc<dyn Emitter + Send + Sync>;

/// A direction sampled towards the background.
#[derive(Copy, Clone, Debug)]
pub struct BackgroundSample {
    /// Unit direction from the scene towards the background.
    pub direction: Vector3f,

    /// Radiance divided by `pdf`.
    pub weight: Spectrum,

    /// Solid angle density.
    pub pdf: Float,
}

/// A ray sampled from the background into the scene.
#[derive(Copy, Clone, Debug)]
pub struct BackgroundRaySample {
    /// The ray, pointing from the background into the scene.
    pub ray: Ray,

    /// Radiance divided by `pdf`.
    pub weight: Spectrum,

    /// Product of the direction density and the area density on the disk
    /// orthogonal to the direction.
    pub pdf: Float,
}

/// Background interface. Backgrounds are infinitely far away and only depend
/// on direction.
pub trait Background {
    /// Returns the radiance arriving from the background along a direction.
    ///
    /// * `direction` - Direction from the scene towards the background.
    fn emitted_radiance(&self, direction: &Vector3f) -> Spectrum;

    /// Samples a direction towards the background.
    ///
    /// * `u` - Sample value to use.
    fn sample_direction(&self, u: &Point2f) -> BackgroundSample;

    /// Returns the solid angle density of `sample_direction`.
    ///
    /// * `direction` - Direction from the scene towards the background.
    fn direction_pdf(&self, direction: &Vector3f) -> Float;

    /// Samples a ray entering the scene bounding sphere.
    ///
    /// * `primary_pos`  - Sample value for the position on the disk.
    /// * `primary_dir`  - Sample value for the direction.
    /// * `scene_center` - Center of the scene bounding sphere.
    /// * `scene_radius` - Radius of the scene bounding sphere.
    fn sample_ray(
        &self,
        primary_pos: &Point2f,
        primary_dir: &Point2f,
        scene_center: &Point3f,
        scene_radius: Float,
    ) -> BackgroundRaySample;

    /// Returns the density of `sample_ray` generating a ray through a point.
    ///
    /// * `point`        - A point on the ray.
    /// * `direction`    - Ray direction, from the background into the scene.
    /// * `scene_radius` - Radius of the scene bounding sphere.
    fn ray_pdf(&self, point: &Point3f, direction: &Vector3f, scene_radius: Float) -> Float;
}

/// Atomic reference counted `Background`.
pub type ArcBackground = Arc<dyn Background + Send + Sync>;
