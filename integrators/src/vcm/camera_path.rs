//! Camera paths and the per pixel combination of all techniques

use super::config::*;
use super::merge_index::*;
use super::mis::*;
use super::pdfs::*;
use super::random_walk::*;
use super::stats::*;
use super::techniques::*;
use super::vertex_selector::*;
use render_core::film::*;
use render_core::geometry::*;
use render_core::material::*;
use render_core::parallel::*;
use render_core::pbrt::*;
use render_core::rng::*;
use render_core::scene::*;
use render_core::spectrum::*;
use crossbeam_channel::bounded;
use std::collections::BinaryHeap;
use std::thread;

/// Scratch space owned by one worker and reused for all of its paths.
#[derive(Default)]
struct CameraScratch {
    /// Densities of the current camera path.
    vertices: Vec<PathPdfPair>,

    /// MIS arrays.
    buffers: PdfBuffers,

    /// Merge query results.
    neighbors: BinaryHeap<Neighbor>,

    /// Statistics of the worker.
    counters: PathCounters,
}

/// Traces one camera path per pixel and combines the active techniques at
/// every vertex.
pub struct CameraPathTracer<'c, 'a> {
    ctx: &'c TechniqueContext<'a>,

    /// Active techniques.
    techniques: TechniqueFlags,

    /// Light vertex selection for inner connections.
    connection_selection: ConnectionSelection,

    /// Connections per camera vertex when resampling.
    num_connections: usize,

    /// Seed of the per pixel random number streams.
    base_seed: u32,
}

impl<'c, 'a> CameraPathTracer<'c, 'a> {
    /// Create a new camera path tracer.
    ///
    /// * `ctx`    - Iteration context.
    /// * `config` - Renderer configuration.
    pub fn new(ctx: &'c TechniqueContext<'a>, config: &VCMConfig) -> Self {
        Self {
            ctx,
            techniques: config.techniques(),
            connection_selection: config.connection_selection,
            num_connections: config.num_connections,
            base_seed: config.base_seed_camera,
        }
    }

    /// Traces all pixels in parallel, one image row per work item, and
    /// splats the results into the scene's frame buffer.
    ///
    /// * `iteration` - Current iteration.
    /// * `n_threads` - Number of worker threads.
    pub fn trace_all(&self, iteration: usize, n_threads: usize) -> PathCounters {
        let (width, height) = self.ctx.scene.camera.resolution();
        let accumulator = CounterAccumulator::default();

        thread::scope(|scope| {
            let (tx_worker, rx_worker) = bounded::<usize>(height.max(1));

            let handles = (0..n_threads.max(1))
                .map(|_| {
                    let rx_worker = rx_worker.clone();
                    let accumulator = &accumulator;
                    scope.spawn(move || {
                        let mut scratch = CameraScratch::default();
                        for y in rx_worker.iter() {
                            for x in 0..width {
                                let (film_pos, value) = self.trace_pixel(&mut scratch, x, y, width, iteration);
                                self.ctx.scene.frame_buffer.splat(&film_pos, &value);
                            }
                        }
                        accumulator.report(&scratch.counters);
                    })
                })
                .collect();
            drop(rx_worker);

            for y in 0..height {
                if tx_worker.send(y).is_err() {
                    break;
                }
            }
            drop(tx_worker);
            join_workers(handles);
        });

        accumulator.into_inner()
    }

    /// Traces the camera path of one pixel. Returns the film position and the
    /// estimate.
    fn trace_pixel(
        &self,
        scratch: &mut CameraScratch,
        x: usize,
        y: usize,
        width: usize,
        iteration: usize,
    ) -> (Point2f, Spectrum) {
        let pixel_index = y * width + x;
        let mut rng = RNG::with_seeds(self.base_seed, pixel_index as u32, iteration as u32);
        let film_pos = Point2f::new(x as Float, y as Float) + rng.uniform_float2();
        let camera_ray = self.ctx.scene.camera.generate_ray(&film_pos, &mut rng);

        scratch.vertices.clear();
        scratch.counters.camera_paths += 1;
        let mut hooks = CameraPathHooks {
            tracer: self,
            scratch,
            film_pos,
            pixel_index,
            previous: camera_ray.ray.o,
            primary_distance: 0.0,
            radius: 0.0,
        };

        // One more edge than the longest path, so the last vertex can still
        // hit an emitter.
        let estimate = RandomWalk::new(self.ctx.scene, self.ctx.max_depth + 1).start_from_camera(
            &camera_ray,
            &mut rng,
            &mut hooks,
        );
        (film_pos, estimate)
    }

    /// Inner connections of one camera vertex.
    fn connect(
        &self,
        buffers: &mut PdfBuffers,
        rng: &mut RNG,
        vertex: &CameraVertex,
        pixel_index: usize,
        film_pos: &Point2f,
    ) -> Spectrum {
        let ctx = self.ctx;
        let mut sum = Spectrum::ZERO;
        match self.connection_selection {
            ConnectionSelection::PairedPath => {
                if pixel_index < ctx.cache.num_paths() {
                    for light_vertex in ctx.cache.path_range(pixel_index) {
                        sum += record(ctx, film_pos, Connect.evaluate(ctx, buffers, vertex, light_vertex));
                    }
                }
            }
            ConnectionSelection::Resampled => {
                let selector = VertexSelector::new(ctx.cache);
                for _ in 0..self.num_connections {
                    if let Some((light_vertex, _)) = selector.select(rng) {
                        sum += record(ctx, film_pos, Connect.evaluate(ctx, buffers, vertex, light_vertex));
                    }
                }
            }
        }
        sum
    }
}

/// Adds an estimate to the debug images and returns its weighted value.
fn record(ctx: &TechniqueContext, film_pos: &Point2f, estimate: Option<Estimate>) -> Spectrum {
    match estimate {
        Some(estimate) => ctx.record(&estimate, film_pos),
        None => Spectrum::ZERO,
    }
}

/// Walk callbacks of one camera path.
struct CameraPathHooks<'t, 'c, 'a> {
    tracer: &'t CameraPathTracer<'c, 'a>,
    scratch: &'t mut CameraScratch,

    /// Film position of the path.
    film_pos: Point2f,

    /// Index of the pixel; pairs it with a light path.
    pixel_index: usize,

    /// Position of the previous vertex.
    previous: Point3f,

    /// Distance from the camera to the primary hit.
    primary_distance: Float,

    /// Local merge radius.
    radius: Float,
}

impl<'t, 'c, 'a> WalkHooks for CameraPathHooks<'t, 'c, 'a> {
    fn on_invalid_hit(
        &mut self,
        _scene: &Scene,
        ray: &Ray,
        pdf_from_ancestor: Float,
        prefix_weight: Spectrum,
        depth: usize,
    ) -> Spectrum {
        let ctx = self.tracer.ctx;
        let hitting = self.tracer.techniques.contains(TechniqueFlags::HITTING);
        if !(hitting || depth == 1) || depth < ctx.min_depth {
            return Spectrum::ZERO;
        }

        self.scratch.vertices.push(PathPdfPair {
            pdf_from_ancestor,
            pdf_to_ancestor: 0.0,
        });
        let subpath = CameraSubpath {
            vertices: &self.scratch.vertices,
            primary_distance: self.primary_distance,
            radius: self.radius,
        };
        let estimate = EmitterHit.evaluate_background(ctx, &mut self.scratch.buffers, &subpath, ray, prefix_weight);
        record(ctx, &self.film_pos, estimate)
    }

    fn on_hit(
        &mut self,
        _scene: &Scene,
        shader: &SurfaceShader,
        rng: &mut RNG,
        pdf_from_ancestor: Float,
        prefix_weight: Spectrum,
        depth: usize,
        jacobian: Float,
    ) -> Spectrum {
        let tracer = self.tracer;
        let ctx = tracer.ctx;
        let techniques = tracer.techniques;

        if depth == 1 {
            self.primary_distance = shader.point.distance;
            let footprint = (1.0 / pdf_from_ancestor).sqrt();
            self.radius = footprint.min(ctx.merge_index.max_radius());
        }

        let CameraScratch {
            vertices,
            buffers,
            neighbors,
            counters,
        } = &mut *self.scratch;
        vertices.push(PathPdfPair {
            pdf_from_ancestor,
            pdf_to_ancestor: 0.0,
        });
        let vertex = CameraVertex {
            shader: *shader,
            subpath: CameraSubpath {
                vertices: vertices.as_slice(),
                primary_distance: self.primary_distance,
                radius: self.radius,
            },
            previous: self.previous,
            jacobian,
            throughput: prefix_weight,
        };

        let film_pos = &self.film_pos;
        let mut sum = Spectrum::ZERO;
        if (techniques.contains(TechniqueFlags::HITTING) || depth == 1) && depth >= ctx.min_depth {
            sum += record(ctx, film_pos, EmitterHit.evaluate(ctx, buffers, &vertex));
        }

        if depth < ctx.max_depth {
            if techniques.contains(TechniqueFlags::CONNECT) {
                sum += tracer.connect(buffers, rng, &vertex, self.pixel_index, film_pos);
            }
            if techniques.contains(TechniqueFlags::MERGE) && (depth > 1 || ctx.mis.merge_primary) {
                let (merged, found) = Merge.gather(ctx, buffers, neighbors, &vertex, film_pos);
                sum += merged;
                counters.merge_queries += 1;
                counters.photons_found += found as u64;
            }
        }

        if techniques.contains(TechniqueFlags::NEXT_EVENT) && depth < ctx.max_depth && depth + 1 >= ctx.min_depth {
            for _ in 0..ctx.num_shadow_rays {
                sum += record(ctx, film_pos, NextEvent.evaluate(ctx, buffers, rng, &vertex));
            }
        }

        self.previous = shader.point.p;
        sum
    }

    fn on_continue(&mut self, pdf_to_ancestor: Float, depth: usize) {
        if let Some(vertex) = self.scratch.vertices.get_mut(depth - 1) {
            vertex.pdf_to_ancestor = pdf_to_ancestor;
        }
    }

    fn on_terminate(&mut self) {
        self.scratch.counters.camera_edges += self.scratch.vertices.len() as u64;
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
