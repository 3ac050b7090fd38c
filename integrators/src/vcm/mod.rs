//! Vertex connection and merging

mod camera_path;
mod config;
mod light_paths;
mod light_selection;
mod merge_index;
mod mis;
mod path_cache;
mod pdfs;
mod pyramid;
mod radius;
mod random_walk;
mod stats;
mod techniques;
mod timer;
mod vertex_selector;

#[cfg(test)]
mod test_scenes;

// Re-export.
pub use camera_path::*;
pub use config::*;
pub use light_paths::*;
pub use light_selection::*;
pub use merge_index::*;
pub use mis::*;
pub use path_cache::*;
pub use pdfs::*;
pub use pyramid::*;
pub use radius::*;
pub use random_walk::*;
pub use stats::*;
pub use techniques::*;
pub use timer::*;
pub use vertex_selector::*;

use render_core::app::*;
use render_core::error::*;
use render_core::film::*;
use render_core::integrator::*;
use render_core::parallel::*;
use render_core::pbrt::*;
use render_core::rng::*;
use render_core::scene::*;
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};

/// Offset of the lens sampling streams used by light tracing, so they never
/// repeat a light path stream.
const LENS_SEED_OFFSET: u32 = 0x9E3779B9;

/// Implements bidirectional path tracing with vertex connection and merging.
/// Which techniques are combined is decided by the configuration.
pub struct VCMIntegrator {
    config: VCMConfig,

    /// Statistics of the last render.
    stats: RenderStats,
}

/// State carried from one iteration to the next.
struct RenderState {
    /// Light vertices of the current iteration.
    cache: PathCache,

    /// Maximum merge radius.
    radius: MergeRadius,

    /// Debug images.
    pyramids: Option<TechPyramids>,

    /// Light paths per iteration.
    num_light_paths: usize,

    /// Worker threads.
    n_threads: usize,
}

/// Result of tracing one iteration.
struct IterationCounts {
    camera: PathCounters,
    light_paths: usize,
    light_path_edges: usize,
}

impl VCMIntegrator {
    /// Create a new `VCMIntegrator`.
    ///
    /// * `config` - Renderer configuration.
    pub fn new(config: VCMConfig) -> Self {
        Self {
            config,
            stats: RenderStats::default(),
        }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &VCMConfig {
        &self.config
    }

    /// Returns the statistics of the last render.
    pub fn stats(&self) -> &RenderStats {
        &self.stats
    }

    /// Traces the light paths, builds the merge index, traces the camera
    /// paths and connects the light vertices to the camera.
    ///
    /// * `scene`     - The scene.
    /// * `state`     - Render state.
    /// * `iteration` - Current iteration.
    fn trace_iteration(&self, scene: &Scene, state: &mut RenderState, iteration: usize) -> IterationCounts {
        let config = &self.config;
        let techniques = config.techniques();
        let num_light_paths = state.num_light_paths;
        let n_threads = state.n_threads;

        LightPathTracer::new(scene, config.max_depth, config.base_seed_light, config.num_shadow_rays).trace_all(
            &mut state.cache,
            num_light_paths,
            iteration,
            n_threads,
        );
        let cache = &state.cache;

        let merge_index = if techniques.contains(TechniqueFlags::MERGE) {
            MergeIndex::build(cache, state.radius.current())
        } else {
            MergeIndex::default()
        };

        let ctx = TechniqueContext {
            scene,
            cache,
            merge_index: &merge_index,
            mis: MisContext {
                techniques,
                merge_primary: config.merge_primary,
                num_light_paths: num_light_paths as Float,
                select_density: MisContext::connection_select_density(
                    config.connection_selection,
                    config.num_connections,
                    num_light_paths,
                    cache.num_vertices(),
                ),
                use_correlation: config.use_correlation_aware_mis,
            },
            min_depth: config.min_depth,
            max_depth: config.max_depth,
            num_shadow_rays: config.num_shadow_rays,
            max_num_photons: config.max_num_photons,
            pyramids: state.pyramids.as_ref(),
        };

        let camera = CameraPathTracer::new(&ctx, config).trace_all(iteration, n_threads);

        if techniques.contains(TechniqueFlags::LIGHT_TRACER) {
            let seed = config.base_seed_light.wrapping_add(LENS_SEED_OFFSET);
            cache.for_each_vertex(n_threads, PdfBuffers::default, |buffers, idx, vertex, _ancestor, dir| {
                let mut rng = RNG::with_seeds(seed, idx as u32, iteration as u32);
                if let Some((pixel, estimate)) = LightTrace.evaluate(&ctx, buffers, &mut rng, idx, vertex, dir) {
                    scene.frame_buffer.splat(&pixel, &ctx.record(&estimate, &pixel));
                }
            });
        }

        IterationCounts {
            camera,
            light_paths: cache.num_paths(),
            light_path_edges: (0..cache.num_paths()).map(|p| cache.length(p).saturating_sub(1)).sum(),
        }
    }
}

impl Integrator for VCMIntegrator {
    /// Render the scene.
    ///
    /// * `scene` - The scene.
    fn render(&mut self, scene: &Scene) -> Result<(), RenderError> {
        let (width, height) = scene.camera.resolution();
        self.config.validate(width, height)?;

        let config = self.config.clone();
        let techniques = config.techniques();
        let num_light_paths = config.num_light_paths.resolve(width, height);
        let n_threads = worker_count(config.num_threads);

        info!("Rendering {width}x{height} with techniques {techniques:?}");
        info!(
            "{} iterations, {num_light_paths} light paths, depth {}..={}, {n_threads} threads",
            config.num_iterations, config.min_depth, config.max_depth
        );

        let radius = if techniques.contains(TechniqueFlags::MERGE) {
            MergeRadius::estimate(scene, config.radius_reduction)
        } else {
            MergeRadius::new(0.0, None)
        };
        let pyramids = config.render_technique_pyramid.then(|| {
            TechPyramids::new(
                width,
                height,
                config.min_depth,
                config.max_depth,
                techniques.contains(TechniqueFlags::MERGE),
                techniques.contains(TechniqueFlags::CONNECT),
                techniques.contains(TechniqueFlags::LIGHT_TRACER),
            )
        });
        let mut state = RenderState {
            cache: PathCache::new(num_light_paths, config.max_depth),
            radius,
            pyramids,
            num_light_paths,
            n_threads,
        };

        let mut timer = RenderTimer::default();
        self.stats = RenderStats::default();

        let progress = create_progress_bar(config.num_iterations as u64, config.quiet);
        progress.set_message("Rendering scene");

        for iteration in 0..config.num_iterations {
            if let Some(budget) = config.max_render_time_ms {
                if timer.next_iteration_exceeds(budget) {
                    info!("Time budget of {budget} ms reached after {iteration} iterations");
                    break;
                }
            }

            timer.time_frame_buffer(|| {
                scene.frame_buffer.start_iteration();
                if let Some(pyramids) = state.pyramids.as_ref() {
                    pyramids.start_iteration();
                }
            });

            let traced = timer.time_render(|| {
                catch_unwind(AssertUnwindSafe(|| self.trace_iteration(scene, &mut state, iteration)))
            });
            let counts = match traced {
                Ok(counts) => counts,
                Err(payload) => {
                    let message = panic_message(payload.as_ref());
                    error!("Iteration {iteration} failed: {message}");
                    progress.abandon_with_message("Render failed");
                    return Err(RenderError::IterationFailed { iteration, message });
                }
            };

            timer.time_frame_buffer(|| scene.frame_buffer.end_iteration());
            timer.end_iteration();

            self.stats
                .update(&counts.camera, counts.light_paths, counts.light_path_edges);
            self.stats.merge_radius = state.radius.current();
            self.stats.render_time_ms = timer.render_ms();
            self.stats.frame_buffer_time_ms = timer.frame_buffer_ms();
            debug!(
                "Iteration {iteration}: camera path length {:.2}, light path length {:.2}, {:.2} photons per query, radius {}",
                self.stats.avg_camera_path_length,
                self.stats.avg_light_path_length,
                self.stats.avg_photons_per_query,
                self.stats.merge_radius,
            );

            state.radius.shrink(iteration);
            progress.inc(1);
        }

        progress.finish_with_message("Render complete");
        debug!(
            "Render time {} ms, frame buffer time {} ms",
            self.stats.render_time_ms, self.stats.frame_buffer_time_ms
        );

        if let Some(pyramids) = state.pyramids.as_ref() {
            pyramids.write(&config.technique_pyramid_prefix)?;
        }
        Ok(())
    }
}

/// Returns the message of a caught panic.
///
/// * `payload` - The panic payload.
fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        String::from("unknown panic")
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vcm::test_scenes::*;
    use accelerators::PrimitiveList;
    use cameras::PerspectiveCamera;
    use render_core::geometry::*;
    use render_core::interaction::*;
    use render_core::material::*;
    use render_core::spectrum::*;
    use shapes::Quad;
    use std::sync::Arc;

    fn render(scene: &Scene, config: VCMConfig) -> Result<VCMIntegrator, RenderError> {
        let mut integrator = VCMIntegrator::new(config);
        integrator.render(scene)?;
        Ok(integrator)
    }

    /// Average image value of the closed box rendered with `config`.
    fn closed_box_average(config: VCMConfig) -> Float {
        let scene = closed_box_scene(17, 17);
        let config = VCMConfig {
            num_iterations: 16,
            max_depth: 3,
            num_threads: 2,
            ..config
        };
        render(&scene, config).unwrap();
        scene.frame_buffer.average().average()
    }

    #[test]
    fn converges_to_analytic_direct_light() {
        let scene = floor_scene(33, 33, None);
        let config = VCMConfig {
            num_iterations: 256,
            max_depth: 2,
            enable_light_tracer: false,
            num_threads: 2,
            ..VCMConfig::classic_bidir()
        };
        render(&scene, config).unwrap();

        let expected = ALBEDO / PI * floor_irradiance_at_origin();
        let value = scene.frame_buffer.pixel(16, 16).average();
        assert!((value - expected).abs() < 0.02 * expected, "{value} vs {expected}");
    }

    #[test]
    fn bidirectional_matches_path_tracing() {
        let reference = closed_box_average(VCMConfig::path_tracer());
        assert!(reference > 0.0);

        let bidir = closed_box_average(VCMConfig::vertex_cache_bidir());
        assert!((bidir - reference).abs() < 0.05 * reference, "{bidir} vs {reference}");

        let classic = closed_box_average(VCMConfig::classic_bidir());
        assert!((classic - reference).abs() < 0.05 * reference, "{classic} vs {reference}");
    }

    #[test]
    fn merging_matches_path_tracing() {
        let reference = closed_box_average(VCMConfig::path_tracer());
        assert!(reference > 0.0);

        let photons = closed_box_average(VCMConfig::photon_mapper());
        assert!((photons - reference).abs() < 0.05 * reference, "{photons} vs {reference}");

        let vcm = closed_box_average(VCMConfig::vcm());
        assert!((vcm - reference).abs() < 0.05 * reference, "{vcm} vs {reference}");

        let uncorrelated = closed_box_average(VCMConfig {
            use_correlation_aware_mis: false,
            ..VCMConfig::vcm()
        });
        assert!(
            (uncorrelated - reference).abs() < 0.05 * reference,
            "{uncorrelated} vs {reference}"
        );
    }

    #[test]
    fn shadowed_pixel_is_black() {
        let scene = shadowed_floor_scene(33, 33);
        let config = VCMConfig {
            num_iterations: 4,
            max_depth: 2,
            num_threads: 2,
            ..VCMConfig::classic_bidir()
        };
        render(&scene, config).unwrap();

        assert_eq!(scene.frame_buffer.pixel(16, 16), Spectrum::ZERO);
        assert!(scene.frame_buffer.average().average() > 0.0);
    }

    #[test]
    fn single_thread_renders_are_reproducible() {
        let config = VCMConfig {
            num_iterations: 2,
            max_depth: 4,
            num_threads: 1,
            ..VCMConfig::vcm()
        };
        let first = closed_box_scene(8, 8);
        let second = closed_box_scene(8, 8);
        render(&first, config.clone()).unwrap();
        render(&second, config).unwrap();
        assert_eq!(first.frame_buffer.image(), second.frame_buffer.image());
    }

    #[test]
    fn zero_light_paths_stay_finite() {
        for config in [VCMConfig::vcm(), VCMConfig::vertex_cache_bidir(), VCMConfig::path_tracer()] {
            let scene = closed_box_scene(6, 6);
            let config = VCMConfig {
                num_light_paths: LightPathCount::Fixed(0),
                max_depth: 3,
                ..config
            };
            let integrator = render(&scene, config).unwrap();
            assert!(scene.frame_buffer.image().iter().all(|p| p.is_finite()));
            assert_eq!(integrator.stats().avg_light_path_length, 0.0);
        }
    }

    #[test]
    fn zero_time_budget_runs_one_iteration() {
        let scene = closed_box_scene(4, 4);
        let config = VCMConfig {
            num_iterations: 5,
            max_render_time_ms: Some(0),
            ..VCMConfig::vcm()
        };
        let integrator = render(&scene, config).unwrap();
        assert_eq!(scene.frame_buffer.num_iterations(), 1);
        assert_eq!(integrator.stats().iterations, 1);
    }

    #[test]
    fn invalid_config_fails_before_rendering() {
        let scene = closed_box_scene(4, 4);
        let config = VCMConfig {
            num_light_paths: LightPathCount::Fixed(3),
            ..VCMConfig::classic_bidir()
        };
        assert!(matches!(render(&scene, config), Err(RenderError::InvalidConfig(_))));
        assert_eq!(scene.frame_buffer.num_iterations(), 0);
    }

    #[test]
    fn stats_track_path_lengths() {
        let scene = closed_box_scene(8, 8);
        let config = VCMConfig {
            num_iterations: 2,
            max_depth: 4,
            ..VCMConfig::vcm()
        };
        let integrator = render(&scene, config).unwrap();
        let stats = integrator.stats();
        assert_eq!(stats.iterations, 2);
        assert!(stats.avg_camera_path_length >= 1.0 && stats.avg_camera_path_length <= 5.0);
        assert!(stats.avg_light_path_length > 0.5 && stats.avg_light_path_length <= 4.0);
        assert!(stats.merge_radius > 0.0);
    }

    /// Fails whenever a path scatters off it.
    struct BrokenMaterial;

    impl Material for BrokenMaterial {
        fn evaluate(&self, _: &SurfacePoint, _: &Vector3f, _: &Vector3f, _: TransportMode) -> Spectrum {
            Spectrum::ZERO
        }

        fn sample(&self, _: &SurfacePoint, _: &Vector3f, _: TransportMode, _: &Point2f) -> BsdfSample {
            panic!("material backend failure")
        }

        fn pdf(&self, _: &SurfacePoint, _: &Vector3f, _: &Vector3f, _: TransportMode) -> (Float, Float) {
            (0.0, 0.0)
        }
    }

    #[test]
    fn collaborator_failure_aborts_the_iteration() {
        let primitives = vec![Primitive::new(
            Arc::new(Quad::horizontal(0.0, 2.0, true)),
            Arc::new(BrokenMaterial),
            None,
        )];
        let camera = PerspectiveCamera::new(
            Point3f::new(0.0, 0.0, 3.0),
            Point3f::ORIGIN,
            Vector3f::new(0.0, 1.0, 0.0),
            40.0,
            4,
            4,
        );
        let scene = Scene::new(
            Arc::new(PrimitiveList::from_primitives(&primitives)),
            primitives,
            Arc::new(camera),
            None,
            FrameBuffer::new(4, 4),
        );
        let config = VCMConfig {
            num_iterations: 3,
            ..VCMConfig::path_tracer()
        };

        match render(&scene, config) {
            Err(RenderError::IterationFailed { iteration, message }) => {
                assert_eq!(iteration, 0);
                assert!(message.contains("material backend failure"));
            }
            _ => panic!("expected the iteration to fail"),
        }
    }

    #[test]
    fn technique_pyramid_is_written() {
        let dir = std::env::temp_dir().join(format!("vcm-pyramid-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let prefix = format!("{}/", dir.display());

        let scene = closed_box_scene(4, 4);
        let config = VCMConfig {
            num_iterations: 1,
            max_depth: 2,
            render_technique_pyramid: true,
            technique_pyramid_prefix: prefix.clone(),
            ..VCMConfig::vcm()
        };
        render(&scene, config).unwrap();

        assert!(dir.join("raw-1-hit.exr").exists());
        assert!(dir.join("weighted-2-next-event.exr").exists());
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
