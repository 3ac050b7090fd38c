//! Merge radius initialization and progressive reduction

use render_core::camera::*;
use render_core::geometry::*;
use render_core::pbrt::*;
use render_core::rng::*;
use render_core::sampling::*;
use render_core::scene::*;

/// Film positions, relative to the resolution, used to estimate the pixel
/// footprint.
const PROBES: [(Float, Float); 5] = [(0.5, 0.5), (0.25, 0.25), (0.75, 0.25), (0.25, 0.75), (0.75, 0.75)];

/// Maximum merge radius in pixel footprints.
const FOOTPRINT_SCALE: Float = 1.5 / 2.0;

/// Radius relative to the scene bounds when no probe hits anything.
const FALLBACK_SCALE: Float = 1.0 / 300.0;

/// Maximum merge radius of each iteration.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct MergeRadius {
    current: Float,

    /// Shrink factor; `None` keeps the radius fixed.
    reduction: Option<Float>,
}

impl MergeRadius {
    /// Estimates the initial radius from the pixel footprint at a few primary
    /// hits. Falls back to a fraction of the scene radius if every probe ray
    /// misses.
    ///
    /// * `scene`     - The scene.
    /// * `reduction` - Progressive shrink factor.
    pub fn estimate(scene: &Scene, reduction: Option<Float>) -> Self {
        let (width, height) = scene.camera.resolution();
        let mut rng = RNG::new(0);

        let mut area_sum = 0.0;
        let mut hits = 0;
        for (u, v) in PROBES {
            let film_pos = Point2f::new(u * width as Float, v * height as Float);
            let sample = scene.camera.generate_ray(&film_pos, &mut rng);
            if let Some(hit) = scene.trace(&sample.ray) {
                let pdf = sample.pdf * solid_angle_to_area(&sample.ray.o, &hit.p, &hit.n);
                if pdf > 0.0 && pdf.is_finite() {
                    area_sum += 1.0 / pdf;
                    hits += 1;
                }
            }
        }

        let current = if hits > 0 {
            (area_sum / hits as Float).sqrt() * FOOTPRINT_SCALE
        } else {
            let fallback = scene.radius() * FALLBACK_SCALE;
            warn!("Merge radius probes found no geometry, using {fallback}");
            fallback
        };
        debug!("Initial merge radius {current}");

        Self { current, reduction }
    }

    /// Create a radius with a known initial value.
    ///
    /// * `initial`   - Initial radius.
    /// * `reduction` - Progressive shrink factor.
    pub fn new(initial: Float, reduction: Option<Float>) -> Self {
        Self {
            current: initial,
            reduction,
        }
    }

    /// Returns the radius of the current iteration.
    pub fn current(&self) -> Float {
        self.current
    }

    /// Shrinks the radius after an iteration.
    ///
    /// * `iteration` - Index of the completed iteration.
    pub fn shrink(&mut self, iteration: usize) {
        if let Some(alpha) = self.reduction {
            let i = iteration as Float;
            self.current *= ((i + alpha) / (i + 1.0)).sqrt();
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
