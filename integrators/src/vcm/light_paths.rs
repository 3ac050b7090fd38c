//! Light path tracing into the vertex cache

use super::light_selection::*;
use super::path_cache::*;
use super::random_walk::*;
use render_core::geometry::*;
use render_core::interaction::*;
use render_core::material::*;
use render_core::parallel::*;
use render_core::pbrt::*;
use render_core::rng::*;
use render_core::scene::*;
use render_core::spectrum::*;
use crossbeam_channel::bounded;
use std::thread;

/// Traces the light paths of one iteration and stores their vertices.
pub struct LightPathTracer<'a> {
    scene: &'a Scene,

    /// Maximum number of edges of a light path.
    max_depth: usize,

    /// Seed of the per path random number streams.
    base_seed: u32,

    /// Next event samples per camera vertex. Needed for the next event density
    /// stored on depth 1 vertices.
    num_shadow_rays: usize,
}

impl<'a> LightPathTracer<'a> {
    /// Create a new light path tracer.
    ///
    /// * `scene`           - The scene.
    /// * `max_depth`       - Maximum number of edges of a light path.
    /// * `base_seed`       - Seed of the per path random number streams.
    /// * `num_shadow_rays` - Next event samples per camera vertex.
    pub fn new(scene: &'a Scene, max_depth: usize, base_seed: u32, num_shadow_rays: usize) -> Self {
        Self {
            scene,
            max_depth,
            base_seed,
            num_shadow_rays,
        }
    }

    /// Traces `num_paths` light paths in parallel and commits them to the
    /// cache. The result does not depend on the number of threads.
    ///
    /// * `cache`     - The light path cache.
    /// * `num_paths` - Number of paths.
    /// * `iteration` - Current iteration.
    /// * `n_threads` - Number of worker threads.
    pub fn trace_all(&self, cache: &mut PathCache, num_paths: usize, iteration: usize, n_threads: usize) {
        let arenas = cache.begin(n_threads.max(1));

        thread::scope(|scope| {
            let (tx_worker, rx_worker) = bounded::<usize>(4096);

            let handles = arenas
                .iter_mut()
                .map(|arena| {
                    let rx_worker = rx_worker.clone();
                    scope.spawn(move || {
                        for path in rx_worker.iter() {
                            self.trace_path(arena, path, iteration);
                        }
                    })
                })
                .collect();
            drop(rx_worker);

            for path in 0..num_paths {
                if tx_worker.send(path).is_err() {
                    break;
                }
            }
            drop(tx_worker);
            join_workers(handles);
        });

        cache.commit(num_paths);
    }

    /// Traces a single path into an arena. Paths whose emission sample has
    /// zero density are stored without vertices.
    ///
    /// * `arena`     - Arena of the calling worker.
    /// * `path`      - Index of the path.
    /// * `iteration` - Current iteration.
    fn trace_path(&self, arena: &mut VertexArena, path: usize, iteration: usize) {
        let mut rng = RNG::with_seeds(self.base_seed, path as u32, iteration as u32);
        let u_select = rng.uniform_float();
        let u_pos = rng.uniform_float2();
        let u_dir = rng.uniform_float2();

        arena.begin_path(path);
        match select_light(self.scene, u_select) {
            Some((LightChoice::Background(background), select_prob)) => {
                let sample =
                    background.sample_ray(&u_pos, &u_dir, &self.scene.center(), self.scene.radius());
                if sample.pdf > 0.0 && !sample.weight.is_black() {
                    let origin = SurfacePoint::new(sample.ray.o, Normal3f::ZERO, Point2f::default());
                    let mut hooks = LightPathHooks::new(self, arena, path, origin, true);
                    RandomWalk::new(self.scene, self.max_depth).start_from_background(
                        &sample.ray,
                        sample.weight / select_prob,
                        sample.pdf * select_prob,
                        &mut rng,
                        &mut hooks,
                    );
                }
            }
            Some((LightChoice::Emitter { prim_id, emitter }, select_prob)) => {
                let mut sample = emitter.sample_ray(&u_pos, &u_dir);
                sample.point.prim_id = prim_id;
                sample.pdf *= select_prob;
                if sample.pdf > 0.0 && !sample.weight.is_black() {
                    let weight = sample.weight / select_prob;
                    let mut hooks = LightPathHooks::new(self, arena, path, sample.point, false);
                    RandomWalk::new(self.scene, self.max_depth).start_from_emitter(
                        &sample,
                        weight,
                        &mut rng,
                        &mut hooks,
                    );
                }
            }
            None => {}
        }
        arena.end_path();
    }
}

/// Writes the vertices of one light path into an arena.
struct LightPathHooks<'t, 'a> {
    tracer: &'t LightPathTracer<'a>,
    arena: &'t mut VertexArena,
    path_id: usize,
    from_background: bool,
}

impl<'t, 'a> LightPathHooks<'t, 'a> {
    /// Starts the path with its origin. The origin carries no weight; light
    /// tracing and connections never use it directly.
    fn new(
        tracer: &'t LightPathTracer<'a>,
        arena: &'t mut VertexArena,
        path_id: usize,
        origin: SurfacePoint,
        from_background: bool,
    ) -> Self {
        arena.push(PathVertex {
            point: origin,
            weight: Spectrum::ZERO,
            depth: 0,
            path_id,
            from_background,
            ..Default::default()
        });
        Self {
            tracer,
            arena,
            path_id,
            from_background,
        }
    }
}

impl<'t, 'a> WalkHooks for LightPathHooks<'t, 'a> {
    fn on_hit(
        &mut self,
        scene: &Scene,
        shader: &SurfaceShader,
        _rng: &mut RNG,
        pdf_from_ancestor: Float,
        prefix_weight: Spectrum,
        depth: usize,
        jacobian: Float,
    ) -> Spectrum {
        let pdf_next_event = if depth == 1 {
            match self.arena.current().first() {
                Some(origin) => next_event_pdf(
                    scene,
                    &shader.point.p,
                    &origin.point,
                    self.from_background,
                    self.tracer.num_shadow_rays,
                ),
                None => 0.0,
            }
        } else {
            0.0
        };

        self.arena.push(PathVertex {
            point: shader.point,
            pdf_from_ancestor,
            pdf_to_ancestor: 0.0,
            pdf_next_event,
            jacobian_to_ancestor: jacobian,
            weight: prefix_weight,
            depth,
            path_id: self.path_id,
            from_background: self.from_background,
        });
        Spectrum::ZERO
    }

    fn on_continue(&mut self, pdf_to_ancestor: Float, _depth: usize) {
        if let Some(vertex) = self.arena.last_mut() {
            vertex.pdf_to_ancestor = pdf_to_ancestor;
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
