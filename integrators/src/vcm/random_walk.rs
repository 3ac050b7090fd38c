//! Random walk driver shared by camera and light paths

use render_core::camera::*;
use render_core::geometry::*;
use render_core::interaction::*;
use render_core::light::*;
use render_core::material::*;
use render_core::pbrt::*;
use render_core::rng::*;
use render_core::sampling::*;
use render_core::scene::*;
use render_core::spectrum::*;

/// Number of bounces before Russian roulette starts.
const ROULETTE_START_DEPTH: usize = 4;

/// Callbacks invoked by a `RandomWalk`.
pub trait WalkHooks {
    /// Called when a ray leaves the scene. Returns the contribution.
    ///
    /// * `scene`             - The scene.
    /// * `ray`               - The ray that missed.
    /// * `pdf_from_ancestor` - Solid angle density of the ray direction.
    /// * `prefix_weight`     - Path weight up to the ray origin.
    /// * `depth`             - Number of edges including the missing one.
    fn on_invalid_hit(
        &mut self,
        _scene: &Scene,
        _ray: &Ray,
        _pdf_from_ancestor: Float,
        _prefix_weight: Spectrum,
        _depth: usize,
    ) -> Spectrum {
        Spectrum::ZERO
    }

    /// Called for every surface hit. Returns the contribution.
    ///
    /// * `scene`             - The scene.
    /// * `shader`            - Shading context at the hit.
    /// * `rng`               - Random number generator of the walk.
    /// * `pdf_from_ancestor` - Area density of sampling the hit.
    /// * `prefix_weight`     - Path weight up to the hit.
    /// * `depth`             - Number of edges to the hit.
    /// * `jacobian`          - Converts a solid angle density at the hit into
    ///                         an area density at the previous vertex.
    fn on_hit(
        &mut self,
        scene: &Scene,
        shader: &SurfaceShader,
        rng: &mut RNG,
        pdf_from_ancestor: Float,
        prefix_weight: Spectrum,
        depth: usize,
        jacobian: Float,
    ) -> Spectrum;

    /// Called once the reverse density of the last hit is known.
    ///
    /// * `pdf_to_ancestor` - Area density of sampling the previous vertex.
    /// * `depth`           - Depth of the last hit.
    fn on_continue(&mut self, _pdf_to_ancestor: Float, _depth: usize) {}

    /// Called when the walk ends.
    fn on_terminate(&mut self) {}
}

/// Traces one path at a time, bounce by bounce, and reports each event to a
/// set of hooks.
pub struct RandomWalk<'a> {
    scene: &'a Scene,

    /// Maximum number of edges.
    max_depth: usize,

    /// Transport mode of the walk.
    mode: TransportMode,

    /// Product of scattering weights, used for Russian roulette.
    approx_throughput: Spectrum,
}

impl<'a> RandomWalk<'a> {
    /// Create a new random walk.
    ///
    /// * `scene`     - The scene.
    /// * `max_depth` - Maximum number of edges.
    pub fn new(scene: &'a Scene, max_depth: usize) -> Self {
        Self {
            scene,
            max_depth,
            mode: TransportMode::Radiance,
            approx_throughput: Spectrum::ONE,
        }
    }

    /// Walks a camera path.
    ///
    /// * `camera_ray` - The primary ray.
    /// * `rng`        - Random number generator.
    /// * `hooks`      - Callbacks.
    pub fn start_from_camera<H: WalkHooks>(
        &mut self,
        camera_ray: &CameraRaySample,
        rng: &mut RNG,
        hooks: &mut H,
    ) -> Spectrum {
        self.mode = TransportMode::Radiance;
        self.approx_throughput = Spectrum::ONE;
        self.continue_walk(
            camera_ray.ray,
            camera_ray.point,
            camera_ray.pdf,
            camera_ray.weight,
            1,
            rng,
            hooks,
        )
    }

    /// Walks a light path from a point on an emitter.
    ///
    /// * `sample`         - The sampled emitter ray.
    /// * `initial_weight` - Emission weight including the selection pmf.
    /// * `rng`            - Random number generator.
    /// * `hooks`          - Callbacks.
    pub fn start_from_emitter<H: WalkHooks>(
        &mut self,
        sample: &EmitterSample,
        initial_weight: Spectrum,
        rng: &mut RNG,
        hooks: &mut H,
    ) -> Spectrum {
        self.mode = TransportMode::Importance;
        self.approx_throughput = Spectrum::ONE;
        let ray = sample.point.spawn_ray(&sample.direction);
        self.continue_walk(ray, sample.point, sample.pdf, initial_weight, 1, rng, hooks)
    }

    /// Walks a light path that enters the scene from the background. The ray
    /// density is already an area density at the first hit.
    ///
    /// * `ray`            - The ray entering the scene.
    /// * `initial_weight` - Emission weight including the selection pmf.
    /// * `pdf`            - Density of sampling the ray.
    /// * `rng`            - Random number generator.
    /// * `hooks`          - Callbacks.
    pub fn start_from_background<H: WalkHooks>(
        &mut self,
        ray: &Ray,
        initial_weight: Spectrum,
        pdf: Float,
        rng: &mut RNG,
        hooks: &mut H,
    ) -> Spectrum {
        self.mode = TransportMode::Importance;
        self.approx_throughput = Spectrum::ONE;

        let hit = match self.scene.trace(ray) {
            Some(hit) => hit,
            None => {
                let contrib = hooks.on_invalid_hit(self.scene, ray, pdf, initial_weight, 1);
                hooks.on_terminate();
                return contrib;
            }
        };

        let material = self.scene.material(&hit);
        let shader = SurfaceShader::new(hit, -ray.d, self.mode, material.as_ref());

        // The reverse density is needed before the hit is reported.
        let dir_sample = shader.sample(&rng.uniform_float2());
        self.approx_throughput *= dir_sample.weight;

        let estimate = hooks.on_hit(self.scene, &shader, rng, pdf, initial_weight, 1, 1.0);
        hooks.on_continue(dir_sample.pdf_reverse, 1);

        if self.max_depth <= 1 || dir_sample.pdf == 0.0 || dir_sample.weight.is_black() {
            hooks.on_terminate();
            return estimate;
        }

        let weight = initial_weight * self.shading_correction(&hit, &ray.d, &dir_sample);
        let next_ray = hit.spawn_ray(&dir_sample.direction);
        estimate + self.continue_walk(next_ray, hit, dir_sample.pdf, weight, 2, rng, hooks)
    }

    /// Returns the survival probability of Russian roulette.
    ///
    /// * `depth` - Current depth.
    fn survival_probability(&self, depth: usize) -> Float {
        if depth > ROULETTE_START_DEPTH {
            clamp(self.approx_throughput.average(), 0.05, 0.95)
        } else {
            1.0
        }
    }

    /// Returns the scattering weight with the shading normal correction for
    /// light paths.
    fn shading_correction(&self, hit: &SurfacePoint, ray_dir: &Vector3f, sample: &BsdfSample) -> Spectrum {
        if self.mode == TransportMode::Radiance {
            return sample.weight;
        }

        let in_ng = abs_dot(&hit.n, &sample.direction);
        let in_ns = abs_dot(&hit.ns, &sample.direction);
        let out_ng = abs_dot(&hit.n, ray_dir);
        let out_ns = abs_dot(&hit.ns, ray_dir);
        if in_ns == 0.0 || out_ng == 0.0 {
            return Spectrum::ZERO;
        }
        sample.weight * (in_ng / in_ns) * (out_ns / out_ng)
    }

    #[allow(clippy::too_many_arguments)]
    fn continue_walk<H: WalkHooks>(
        &mut self,
        mut ray: Ray,
        mut previous: SurfacePoint,
        mut pdf_direction: Float,
        mut prefix_weight: Spectrum,
        mut depth: usize,
        rng: &mut RNG,
        hooks: &mut H,
    ) -> Spectrum {
        let mut estimate = Spectrum::ZERO;

        while depth < self.max_depth {
            let hit = match self.scene.trace(&ray) {
                Some(hit) => hit,
                None => {
                    estimate += hooks.on_invalid_hit(self.scene, &ray, pdf_direction, prefix_weight, depth);
                    break;
                }
            };

            // Convert the density of the previous direction sample to area.
            let pdf_from_ancestor = pdf_direction * solid_angle_to_area(&previous.p, &hit.p, &hit.n);
            if pdf_from_ancestor == 0.0 {
                break;
            }
            let jacobian = solid_angle_to_area(&hit.p, &previous.p, &previous.n);

            let material = self.scene.material(&hit);
            let shader = SurfaceShader::new(hit, -ray.d, self.mode, material.as_ref());
            estimate += hooks.on_hit(
                self.scene,
                &shader,
                rng,
                pdf_from_ancestor,
                prefix_weight,
                depth,
                jacobian,
            );

            if depth + 1 >= self.max_depth {
                break;
            }

            let survival = self.survival_probability(depth);
            if rng.uniform_float() > survival {
                break;
            }

            let dir_sample = shader.sample(&rng.uniform_float2());
            self.approx_throughput *= dir_sample.weight / survival;
            hooks.on_continue(dir_sample.pdf_reverse * jacobian, depth);

            if dir_sample.pdf == 0.0 || dir_sample.weight.is_black() {
                break;
            }

            prefix_weight *= self.shading_correction(&hit, &ray.d, &dir_sample) / survival;
            depth += 1;
            pdf_direction = dir_sample.pdf;
            previous = hit;
            ray = hit.spawn_ray(&dir_sample.direction);
        }

        hooks.on_terminate();
        estimate
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vcm::test_scenes::*;

    #[derive(Default)]
    struct Recorder {
        depths: Vec<usize>,
        pdfs: Vec<Float>,
        reverse: Vec<Float>,
        misses: usize,
        terminated: bool,
    }

    impl WalkHooks for Recorder {
        fn on_invalid_hit(&mut self, _: &Scene, _: &Ray, _: Float, _: Spectrum, _: usize) -> Spectrum {
            self.misses += 1;
            Spectrum::ZERO
        }

        fn on_hit(
            &mut self,
            _scene: &Scene,
            _shader: &SurfaceShader,
            _rng: &mut RNG,
            pdf_from_ancestor: Float,
            _prefix_weight: Spectrum,
            depth: usize,
            _jacobian: Float,
        ) -> Spectrum {
            self.depths.push(depth);
            self.pdfs.push(pdf_from_ancestor);
            Spectrum::ONE
        }

        fn on_continue(&mut self, pdf_to_ancestor: Float, _depth: usize) {
            self.reverse.push(pdf_to_ancestor);
        }

        fn on_terminate(&mut self) {
            self.terminated = true;
        }
    }

    #[test]
    fn depth_grows_by_one_and_stays_bounded() {
        let scene = closed_box_scene(8, 8);
        for seed in 0..16 {
            let mut rng = RNG::with_seeds(7, seed, 0);
            let camera_ray = scene.camera.generate_ray(&Point2f::new(4.5, 4.5), &mut rng);

            let mut hooks = Recorder::default();
            let mut walk = RandomWalk::new(&scene, 4);
            let estimate = walk.start_from_camera(&camera_ray, &mut rng, &mut hooks);

            assert!(hooks.terminated);
            assert_eq!(hooks.misses, 0);
            assert!(!hooks.depths.is_empty());
            assert!(hooks.depths.len() < 4);
            for (i, d) in hooks.depths.iter().enumerate() {
                assert_eq!(*d, i + 1);
            }
            assert!(hooks.pdfs.iter().all(|p| *p > 0.0));
            assert!(hooks.reverse.len() <= hooks.depths.len());
            assert_eq!(estimate, Spectrum::new(hooks.depths.len() as Float));
        }
    }

    #[test]
    fn miss_reports_invalid_hit() {
        let scene = floor_scene(4, 4, Some(Spectrum::ONE));
        let mut rng = RNG::with_seeds(1, 2, 3);

        // Below the floor, pointing away from it.
        let mut hooks = Recorder::default();
        let mut walk = RandomWalk::new(&scene, 5);
        let ray = Ray::new(Point3f::new(0.0, 0.0, -1.0), Vector3f::new(0.0, 0.0, -1.0), INFINITY);
        walk.start_from_background(&ray, Spectrum::ONE, 1.0, &mut rng, &mut hooks);
        assert_eq!(hooks.misses, 1);
        assert!(hooks.depths.is_empty());
        assert!(hooks.terminated);
    }
}
