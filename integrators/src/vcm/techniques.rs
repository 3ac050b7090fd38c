//! Estimators combined at every camera path vertex
//!
//! Each technique builds one kind of full path from a camera vertex and
//! returns its unweighted contribution together with its balance heuristic
//! weight. The renderer picks the active ones from its configuration.

use super::light_selection::*;
use super::merge_index::*;
use super::mis::*;
use super::path_cache::*;
use super::pdfs::*;
use super::pyramid::*;
use render_core::geometry::*;
use render_core::interaction::*;
use render_core::material::*;
use render_core::pbrt::*;
use render_core::rng::*;
use render_core::sampling::*;
use render_core::scene::*;
use render_core::spectrum::*;
use std::collections::BinaryHeap;

/// Cosines below this make a merge direction too grazing to trust.
const MIN_MERGE_COSINE: Float = 1e-4;

/// Result of one technique.
#[derive(Copy, Clone, Debug)]
pub struct Estimate {
    /// Technique that produced the sample.
    pub key: TechniqueKey,

    /// Unweighted contribution, camera path throughput included.
    pub contribution: Spectrum,

    /// Balance heuristic weight.
    pub mis_weight: Float,
}

impl Estimate {
    /// Returns the MIS weighted contribution.
    pub fn weighted(&self) -> Spectrum {
        self.contribution * self.mis_weight
    }
}

/// Everything the techniques read during the camera pass of one iteration.
pub struct TechniqueContext<'a> {
    pub scene: &'a Scene,

    /// Committed light paths.
    pub cache: &'a PathCache,

    /// Spatial index over `cache`.
    pub merge_index: &'a MergeIndex,

    /// MIS parameters.
    pub mis: MisContext,

    /// Minimum path length in edges.
    pub min_depth: usize,

    /// Maximum path length in edges.
    pub max_depth: usize,

    /// Next event samples per camera vertex.
    pub num_shadow_rays: usize,

    /// Maximum number of photons per merge.
    pub max_num_photons: usize,

    /// Debug images, if enabled.
    pub pyramids: Option<&'a TechPyramids>,
}

impl<'a> TechniqueContext<'a> {
    /// Returns `true` if a path with `total_edges` edges is rendered.
    ///
    /// * `total_edges` - Path length.
    pub fn accepts_length(&self, total_edges: usize) -> bool {
        total_edges >= self.min_depth && total_edges <= self.max_depth
    }

    /// Adds an estimate to the debug images and returns its weighted value.
    ///
    /// * `estimate` - The estimate.
    /// * `film_pos` - Film position it belongs to.
    pub fn record(&self, estimate: &Estimate, film_pos: &Point2f) -> Spectrum {
        if let Some(pyramids) = self.pyramids {
            pyramids.add(estimate.key, film_pos, &estimate.contribution, estimate.mis_weight);
        }
        estimate.weighted()
    }
}

/// A camera path vertex that techniques are evaluated at.
pub struct CameraVertex<'v> {
    /// Shading context; the outgoing direction points back along the path.
    pub shader: SurfaceShader<'v>,

    /// Densities of the camera path up to and including this vertex.
    pub subpath: CameraSubpath<'v>,

    /// Position of the previous camera vertex (the lens for the primary hit).
    pub previous: Point3f,

    /// Solid angle to area conversion at the previous vertex.
    pub jacobian: Float,

    /// Product of scattering weights from the camera to this vertex.
    pub throughput: Spectrum,
}

impl<'v> CameraVertex<'v> {
    /// Returns the number of camera path edges.
    pub fn depth(&self) -> usize {
        self.subpath.vertices.len()
    }
}

/// Camera paths that randomly hit an emitter or escape to the background.
pub struct EmitterHit;

impl EmitterHit {
    /// Evaluates a camera vertex lying on an emitter.
    ///
    /// * `ctx`     - Iteration context.
    /// * `buffers` - Scratch space.
    /// * `vertex`  - The camera vertex.
    pub fn evaluate(&self, ctx: &TechniqueContext, buffers: &mut PdfBuffers, vertex: &CameraVertex) -> Option<Estimate> {
        let point = &vertex.shader.point;
        let emitter = ctx.scene.query_emitter(point)?;
        let radiance = emitter.emitted_radiance(point, &vertex.shader.out_dir);
        if radiance.is_black() {
            return None;
        }

        let depth = vertex.depth();
        let mis_weight = if depth == 1 {
            1.0
        } else {
            let pdf_emit = emitter_pdf(ctx.scene, emitter, point, &vertex.shader.out_dir, vertex.jacobian);
            let pdf_next_event = next_event_pdf(ctx.scene, &vertex.previous, point, false, ctx.num_shadow_rays);
            ctx.mis.emitter_hit(buffers, &vertex.subpath, pdf_emit, pdf_next_event, false)
        };

        Some(Estimate {
            key: TechniqueKey::new(depth, 0, depth),
            contribution: vertex.throughput * radiance,
            mis_weight,
        })
    }

    /// Evaluates a camera ray that left the scene.
    ///
    /// * `ctx`        - Iteration context.
    /// * `buffers`    - Scratch space.
    /// * `subpath`    - Camera path densities; the last entry stands for the
    ///                  background with a solid angle density.
    /// * `ray`        - The escaping ray.
    /// * `throughput` - Camera path throughput up to the ray origin.
    pub fn evaluate_background(
        &self,
        ctx: &TechniqueContext,
        buffers: &mut PdfBuffers,
        subpath: &CameraSubpath,
        ray: &Ray,
        throughput: Spectrum,
    ) -> Option<Estimate> {
        let background = ctx.scene.background.as_ref()?;
        let radiance = background.emitted_radiance(&ray.d);
        if radiance.is_black() {
            return None;
        }

        let depth = subpath.vertices.len();
        let mis_weight = if depth == 1 {
            1.0
        } else {
            let pdf_next_event = background.direction_pdf(&ray.d)
                * background_probability(ctx.scene)
                * ctx.num_shadow_rays as Float;
            let pdf_emit = background_pdf(ctx.scene, &ray.o, &-ray.d);
            ctx.mis.emitter_hit(buffers, subpath, pdf_emit, pdf_next_event, true)
        };

        Some(Estimate {
            key: TechniqueKey::new(depth, 0, depth),
            contribution: throughput * radiance,
            mis_weight,
        })
    }
}

/// Next event estimation: connects a camera vertex to a point sampled on a
/// light source or a background direction.
pub struct NextEvent;

impl NextEvent {
    /// Draws one shadow ray sample. The densities include all shadow rays of
    /// the vertex, so the estimates of one vertex are summed.
    ///
    /// * `ctx`     - Iteration context.
    /// * `buffers` - Scratch space.
    /// * `rng`     - Random number generator of the camera path.
    /// * `vertex`  - The camera vertex.
    pub fn evaluate(
        &self,
        ctx: &TechniqueContext,
        buffers: &mut PdfBuffers,
        rng: &mut RNG,
        vertex: &CameraVertex,
    ) -> Option<Estimate> {
        let u_select = rng.uniform_float();
        let u = rng.uniform_float2();
        let nsr = ctx.num_shadow_rays as Float;
        let shader = &vertex.shader;
        let depth = vertex.depth();
        let key = TechniqueKey::new(depth, 0, depth + 1);

        match select_light(ctx.scene, u_select)? {
            (LightChoice::Background(background), select_prob) => {
                let sample = background.sample_direction(&u);
                if sample.pdf == 0.0 || sample.weight.is_black() {
                    return None;
                }
                if !ctx.scene.leaves_scene(&shader.point, &sample.direction) {
                    return None;
                }
                let bsdf = shader.evaluate_with_cosine(&sample.direction);
                if bsdf.is_black() {
                    return None;
                }

                let pdf_next_event = sample.pdf * select_prob * nsr;
                let (pdf_hit, pdf_reverse) = shader.pdf(&sample.direction);
                let pdf_emit = background_pdf(ctx.scene, &shader.point.p, &-sample.direction);
                let mis_weight = ctx.mis.next_event(
                    buffers,
                    &vertex.subpath,
                    pdf_emit,
                    pdf_next_event,
                    pdf_hit,
                    pdf_reverse * vertex.jacobian,
                    true,
                );

                Some(Estimate {
                    key,
                    contribution: vertex.throughput * bsdf * sample.weight / (select_prob * nsr),
                    mis_weight,
                })
            }
            (LightChoice::Emitter { prim_id, emitter }, select_prob) => {
                let mut sample = emitter.sample_uniform_area(&u);
                sample.point.prim_id = prim_id;
                if sample.pdf == 0.0 {
                    return None;
                }

                let to_light = sample.point.p - shader.point.p;
                if to_light.length_squared() == 0.0 {
                    return None;
                }
                let dir = to_light.normalize();
                let radiance = emitter.emitted_radiance(&sample.point, &-dir);
                if radiance.is_black() {
                    return None;
                }
                let bsdf = shader.evaluate_with_cosine(&dir);
                if bsdf.is_black() || ctx.scene.is_occluded(&shader.point, &sample.point) {
                    return None;
                }

                let pdf_next_event = sample.pdf * select_prob * nsr;
                let to_light_area = solid_angle_to_area(&shader.point.p, &sample.point.p, &sample.point.n);
                let (pdf_dir, pdf_reverse) = shader.pdf(&dir);
                let pdf_emit = emitter_pdf(
                    ctx.scene,
                    emitter,
                    &sample.point,
                    &-dir,
                    solid_angle_to_area(&sample.point.p, &shader.point.p, &shader.point.n),
                );
                let mis_weight = ctx.mis.next_event(
                    buffers,
                    &vertex.subpath,
                    pdf_emit,
                    pdf_next_event,
                    pdf_dir * to_light_area,
                    pdf_reverse * vertex.jacobian,
                    false,
                );

                Some(Estimate {
                    key,
                    contribution: vertex.throughput * bsdf * radiance * (to_light_area / pdf_next_event),
                    mis_weight,
                })
            }
        }
    }
}

/// Inner connection between a camera vertex and a cached light vertex.
pub struct Connect;

impl Connect {
    /// Connects to one light vertex. Path origins are never connected to;
    /// next event estimation covers them.
    ///
    /// * `ctx`          - Iteration context.
    /// * `buffers`      - Scratch space.
    /// * `vertex`       - The camera vertex.
    /// * `light_vertex` - Flat index of the light vertex.
    pub fn evaluate(
        &self,
        ctx: &TechniqueContext,
        buffers: &mut PdfBuffers,
        vertex: &CameraVertex,
        light_vertex: usize,
    ) -> Option<Estimate> {
        let light = ctx.cache.get(light_vertex);
        if light.depth == 0 || light.weight.is_black() {
            return None;
        }
        let depth = vertex.depth();
        let total_edges = depth + light.depth + 1;
        if !ctx.accepts_length(total_edges) {
            return None;
        }
        let ancestor = ctx.cache.get(ctx.cache.ancestor(light_vertex)?);

        let shader = &vertex.shader;
        let to_light = light.point.p - shader.point.p;
        let distance_squared = to_light.length_squared();
        if distance_squared == 0.0 {
            return None;
        }
        let dir = to_light.normalize();

        let light_shader = SurfaceShader::new(
            light.point,
            ancestor.point.p - light.point.p,
            TransportMode::Importance,
            ctx.scene.material(&light.point).as_ref(),
        );
        let bsdf_camera = shader.evaluate_with_cosine(&dir);
        let bsdf_light = light_shader.evaluate(&-dir)
            * abs_dot(&light.point.n, &dir)
            * light.point.shading_correction(&light_shader.out_dir);
        if bsdf_camera.is_black() || bsdf_light.is_black() {
            return None;
        }
        if ctx.scene.is_occluded(&shader.point, &light.point) {
            return None;
        }

        let (pdf_cam_fwd, pdf_cam_rev) = shader.pdf(&dir);
        let (pdf_light_fwd, pdf_light_rev) = light_shader.pdf(&-dir);
        let mis_weight = ctx.mis.connect(
            buffers,
            ctx.cache,
            &vertex.subpath,
            light_vertex,
            pdf_cam_rev * vertex.jacobian,
            pdf_cam_fwd * solid_angle_to_area(&shader.point.p, &light.point.p, &light.point.n),
            pdf_light_rev * light.jacobian_to_ancestor,
            pdf_light_fwd * solid_angle_to_area(&light.point.p, &shader.point.p, &shader.point.n),
        );

        let contribution = vertex.throughput * bsdf_camera * bsdf_light * light.weight
            / (distance_squared * ctx.mis.select_density);
        Some(Estimate {
            key: TechniqueKey::new(depth, light.depth, total_edges),
            contribution,
            mis_weight,
        })
    }
}

/// Photon density estimation at a camera vertex.
pub struct Merge;

impl Merge {
    /// Returns the Epanechnikov kernel value of a photon.
    ///
    /// * `distance_squared` - Squared distance to the photon.
    /// * `radius_squared`   - Squared kernel radius.
    pub fn kernel(distance_squared: Float, radius_squared: Float) -> Float {
        if distance_squared >= radius_squared {
            return 0.0;
        }
        2.0 * (radius_squared - distance_squared) / (PI * radius_squared * radius_squared)
    }

    /// Merges with one photon found by a query.
    ///
    /// * `ctx`            - Iteration context.
    /// * `buffers`        - Scratch space.
    /// * `vertex`         - The camera vertex.
    /// * `photon`         - The photon.
    /// * `radius_squared` - Squared kernel radius.
    pub fn evaluate(
        &self,
        ctx: &TechniqueContext,
        buffers: &mut PdfBuffers,
        vertex: &CameraVertex,
        photon: &Neighbor,
        radius_squared: Float,
    ) -> Option<Estimate> {
        let light = ctx.cache.get(photon.vertex);
        let depth = vertex.depth();
        let total_edges = depth + light.depth;
        if light.depth == 0 || !ctx.accepts_length(total_edges) {
            return None;
        }
        let ancestor = ctx.cache.get(ctx.cache.ancestor(photon.vertex)?);

        let shader = &vertex.shader;
        let dir_to_ancestor = (ancestor.point.p - light.point.p).normalize();
        if abs_dot(&dir_to_ancestor, &shader.point.n) < MIN_MERGE_COSINE {
            return None;
        }
        let bsdf = shader.evaluate(&dir_to_ancestor) * shader.point.shading_correction(&dir_to_ancestor);
        if bsdf.is_black() {
            return None;
        }

        let (pdf_fwd, pdf_rev) = shader.pdf(&dir_to_ancestor);
        let pdf_cam_reverse = pdf_rev * vertex.jacobian;
        let pdf_light_reverse = if ancestor.depth == 0 && ancestor.from_background {
            // The background origin has no surface to convert to.
            pdf_fwd
        } else {
            pdf_fwd * solid_angle_to_area(&shader.point.p, &ancestor.point.p, &ancestor.point.n)
        };
        if pdf_light_reverse == 0.0 || (depth > 1 && pdf_cam_reverse == 0.0) {
            return None;
        }

        let mis_weight = ctx.mis.merge(
            buffers,
            ctx.cache,
            &vertex.subpath,
            photon.vertex,
            pdf_cam_reverse,
            pdf_light_reverse,
        );

        let kernel = Self::kernel(photon.distance_squared.0, radius_squared);
        Some(Estimate {
            key: TechniqueKey::new(depth, light.depth, total_edges),
            contribution: vertex.throughput * bsdf * light.weight * (kernel / ctx.mis.num_light_paths),
            mis_weight,
        })
    }

    /// Queries the photons around a camera vertex and returns the sum of all
    /// recorded merges and the number of photons found.
    ///
    /// * `ctx`       - Iteration context.
    /// * `buffers`   - Scratch space.
    /// * `neighbors` - Scratch space for the query.
    /// * `vertex`    - The camera vertex.
    /// * `film_pos`  - Film position of the camera path.
    pub fn gather(
        &self,
        ctx: &TechniqueContext,
        buffers: &mut PdfBuffers,
        neighbors: &mut BinaryHeap<Neighbor>,
        vertex: &CameraVertex,
        film_pos: &Point2f,
    ) -> (Spectrum, usize) {
        let radius = vertex.subpath.radius;
        if !(radius > 0.0) {
            return (Spectrum::ZERO, 0);
        }

        ctx.merge_index
            .k_nearest(&vertex.shader.point.p, radius, ctx.max_num_photons, neighbors);
        let radius_squared = match neighbors.peek() {
            Some(farthest) if neighbors.len() == ctx.max_num_photons => farthest.distance_squared.0,
            _ => radius * radius,
        };
        if radius_squared == 0.0 {
            return (Spectrum::ZERO, neighbors.len());
        }

        let mut sum = Spectrum::ZERO;
        for photon in neighbors.iter() {
            if let Some(estimate) = self.evaluate(ctx, buffers, vertex, photon, radius_squared) {
                sum += ctx.record(&estimate, film_pos);
            }
        }
        (sum, neighbors.len())
    }
}

/// Connects cached light vertices to the camera.
pub struct LightTrace;

impl LightTrace {
    /// Connects one light vertex to the camera. Returns the film position
    /// and the estimate.
    ///
    /// * `ctx`             - Iteration context.
    /// * `buffers`         - Scratch space.
    /// * `rng`             - Random number generator for lens sampling.
    /// * `light_vertex`    - Flat index of the light vertex.
    /// * `vertex`          - The light vertex.
    /// * `dir_to_ancestor` - Unit direction from the vertex to its ancestor.
    pub fn evaluate(
        &self,
        ctx: &TechniqueContext,
        buffers: &mut PdfBuffers,
        rng: &mut RNG,
        light_vertex: usize,
        vertex: &PathVertex,
        dir_to_ancestor: &Vector3f,
    ) -> Option<(Point2f, Estimate)> {
        let total_edges = vertex.depth + 1;
        if vertex.depth == 0 || vertex.weight.is_black() || !ctx.accepts_length(total_edges) {
            return None;
        }

        let response = ctx.scene.camera.sample_response(&vertex.point, rng)?;
        if !(response.pdf_emit > 0.0) || response.weight.is_black() {
            return None;
        }
        if ctx.scene.is_occluded_to(&vertex.point, &response.position) {
            return None;
        }

        let dir_to_camera = (response.position - vertex.point.p).normalize();
        let shader = SurfaceShader::new(
            vertex.point,
            *dir_to_ancestor,
            TransportMode::Importance,
            ctx.scene.material(&vertex.point).as_ref(),
        );
        let bsdf = shader.evaluate(&dir_to_camera) * vertex.point.shading_correction(dir_to_ancestor);
        if bsdf.is_black() {
            return None;
        }

        let (_, pdf_reverse) = shader.pdf(&dir_to_camera);
        let radius = (1.0 / response.pdf_emit).sqrt().min(ctx.merge_index.max_radius());
        let mis_weight = ctx.mis.light_tracer(
            buffers,
            ctx.cache,
            light_vertex,
            vertex.point.p.distance(&response.position),
            radius,
            response.pdf_emit,
            pdf_reverse * vertex.jacobian_to_ancestor,
        );

        let estimate = Estimate {
            key: TechniqueKey::new(0, vertex.depth, total_edges),
            contribution: vertex.weight * bsdf * response.weight / ctx.mis.num_light_paths,
            mis_weight,
        };
        Some((response.pixel, estimate))
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vcm::config::*;
    use crate::vcm::light_paths::*;
    use crate::vcm::test_scenes::*;
    use float_cmp::approx_eq;
    use proptest::prelude::*;

    fn mis(techniques: TechniqueFlags) -> MisContext {
        MisContext {
            techniques,
            merge_primary: false,
            num_light_paths: 16.0,
            select_density: 1.0,
            use_correlation: false,
        }
    }

    fn context<'a>(scene: &'a Scene, cache: &'a PathCache, index: &'a MergeIndex, mis: MisContext) -> TechniqueContext<'a> {
        TechniqueContext {
            scene,
            cache,
            merge_index: index,
            mis,
            min_depth: 1,
            max_depth: 5,
            num_shadow_rays: 1,
            max_num_photons: 8,
            pyramids: None,
        }
    }

    /// Camera vertex on the floor at the origin, seen from straight above.
    fn floor_vertex<'v>(scene: &'v Scene, pdfs: &'v [PathPdfPair]) -> CameraVertex<'v> {
        let point = scene
            .trace(&Ray::new(Point3f::new(0.0, 0.0, 0.5), Vector3f::new(0.0, 0.0, -1.0), INFINITY))
            .unwrap();
        CameraVertex {
            shader: SurfaceShader::new(
                point,
                Vector3f::new(0.0, 0.0, 1.0),
                TransportMode::Radiance,
                scene.material(&point).as_ref(),
            ),
            subpath: CameraSubpath {
                vertices: pdfs,
                primary_distance: 0.5,
                radius: 0.05,
            },
            previous: Point3f::new(0.0, 0.0, 0.5),
            jacobian: 1.0,
            throughput: Spectrum::ONE,
        }
    }

    #[test]
    fn kernel_is_normalized() {
        // Integral of the kernel over the disc of radius r.
        let r2: Float = 0.04;
        let steps = 2000;
        let r = r2.sqrt();
        let dr = r / steps as Float;
        let integral: Float = (0..steps)
            .map(|i| {
                let x = (i as Float + 0.5) * dr;
                Merge::kernel(x * x, r2) * 2.0 * PI * x * dr
            })
            .sum();
        assert!((integral - 1.0).abs() < 1e-3, "{integral}");
        assert_eq!(Merge::kernel(r2, r2), 0.0);
    }

    #[test]
    fn primary_emitter_hit_has_full_weight() {
        let scene = floor_scene(3, 3, None);
        let cache = PathCache::new(1, 2);
        let index = MergeIndex::default();
        let ctx = context(&scene, &cache, &index, mis(TechniqueFlags::all()));

        let eye = Point3f::new(0.0, 0.0, 0.5);
        let point = scene.trace(&Ray::new(eye, Vector3f::new(0.0, 0.0, 1.0), INFINITY)).unwrap();
        let pdfs = [PathPdfPair {
            pdf_from_ancestor: 1.0,
            pdf_to_ancestor: 0.0,
        }];
        let vertex = CameraVertex {
            shader: SurfaceShader::new(
                point,
                Vector3f::new(0.0, 0.0, -1.0),
                TransportMode::Radiance,
                scene.material(&point).as_ref(),
            ),
            subpath: CameraSubpath {
                vertices: &pdfs,
                primary_distance: 1.0,
                radius: 0.0,
            },
            previous: eye,
            jacobian: 1.0,
            throughput: Spectrum::ONE,
        };

        let mut buffers = PdfBuffers::default();
        let estimate = EmitterHit.evaluate(&ctx, &mut buffers, &vertex).unwrap();
        assert_eq!(estimate.mis_weight, 1.0);
        assert_eq!(estimate.contribution, Spectrum::new(LIGHT_RADIANCE));
        assert_eq!(estimate.key, TechniqueKey::new(1, 0, 1));

        // The light emits downwards only.
        let back = CameraVertex {
            shader: SurfaceShader::new(
                point,
                Vector3f::new(0.0, 0.0, 1.0),
                TransportMode::Radiance,
                scene.material(&point).as_ref(),
            ),
            ..vertex
        };
        assert!(EmitterHit.evaluate(&ctx, &mut buffers, &back).is_none());
    }

    #[test]
    fn next_event_alone_estimates_direct_light() {
        let scene = floor_scene(3, 3, None);
        let cache = PathCache::new(1, 2);
        let index = MergeIndex::default();
        let ctx = context(&scene, &cache, &index, mis(TechniqueFlags::NEXT_EVENT));
        let pdfs = [PathPdfPair {
            pdf_from_ancestor: 1.0,
            pdf_to_ancestor: 0.0,
        }];
        let vertex = floor_vertex(&scene, &pdfs);

        let mut buffers = PdfBuffers::default();
        let mut rng = RNG::new(11);
        let n = 20000;
        let mut sum = Spectrum::ZERO;
        for _ in 0..n {
            if let Some(estimate) = NextEvent.evaluate(&ctx, &mut buffers, &mut rng, &vertex) {
                assert_eq!(estimate.mis_weight, 1.0);
                assert_eq!(estimate.key, TechniqueKey::new(1, 0, 2));
                sum += estimate.weighted();
            }
        }
        let expected = ALBEDO / PI * floor_irradiance_at_origin();
        let mean = sum.average() / n as Float;
        assert!((mean - expected).abs() < 0.01 * expected, "{mean} vs {expected}");
    }

    #[test]
    fn connections_skip_origins_and_respect_depth() {
        let scene = closed_box_scene(4, 4);
        let mut cache = PathCache::new(8, 4);
        LightPathTracer::new(&scene, 4, 0x13C0FEFE, 1).trace_all(&mut cache, 8, 0, 1);
        let index = MergeIndex::default();
        let mut ctx = context(&scene, &cache, &index, mis(TechniqueFlags::all()));
        ctx.max_depth = 3;

        let pdfs = [PathPdfPair {
            pdf_from_ancestor: 1.0,
            pdf_to_ancestor: 0.0,
        }];
        let vertex = floor_vertex(&scene, &pdfs);
        let mut buffers = PdfBuffers::default();
        for (idx, light) in cache.vertices().iter().enumerate() {
            let estimate = Connect.evaluate(&ctx, &mut buffers, &vertex, idx);
            if light.depth == 0 || light.depth + 2 > 3 {
                assert!(estimate.is_none());
            }
            if let Some(estimate) = estimate {
                assert!(estimate.mis_weight > 0.0 && estimate.mis_weight <= 1.0);
                assert!(estimate.contribution.is_finite());
                assert_eq!(estimate.key, TechniqueKey::new(1, light.depth, light.depth + 2));
            }
        }
    }

    /// Connects the floor below the camera to a single light vertex on the
    /// left wall of the closed box whose shading normal is `ns`.
    fn connect_to_wall(scene: &Scene, ns: Normal3f) -> Estimate {
        let mut cache = PathCache::new(1, 2);
        let arenas = cache.begin(1);
        arenas[0].begin_path(0);
        let (prim_id, emitter) = scene.emitter(0);
        let mut origin = emitter.sample_uniform_area(&Point2f::new(0.5, 0.5)).point;
        origin.prim_id = prim_id;
        arenas[0].push(PathVertex {
            point: origin,
            ..Default::default()
        });
        let mut wall = scene
            .trace(&Ray::new(Point3f::new(0.0, 0.0, 1.0), Vector3f::new(-1.0, 0.0, 0.0), INFINITY))
            .unwrap();
        wall.ns = ns;
        arenas[0].push(PathVertex {
            point: wall,
            pdf_from_ancestor: 1.0,
            pdf_next_event: 1.0,
            jacobian_to_ancestor: 1.0,
            weight: Spectrum::ONE,
            depth: 1,
            ..Default::default()
        });
        arenas[0].end_path();
        cache.commit(1);

        let index = MergeIndex::default();
        let ctx = context(scene, &cache, &index, mis(TechniqueFlags::all()));
        let pdfs = [PathPdfPair {
            pdf_from_ancestor: 1.0,
            pdf_to_ancestor: 0.0,
        }];
        let vertex = floor_vertex(scene, &pdfs);
        let mut buffers = PdfBuffers::default();
        Connect.evaluate(&ctx, &mut buffers, &vertex, 1).unwrap()
    }

    #[test]
    fn connection_corrects_light_shading_normal() {
        let scene = closed_box_scene(4, 4);
        let plain = connect_to_wall(&scene, Normal3f::new(1.0, 0.0, 0.0));
        let tilted = connect_to_wall(&scene, Normal3f::new(1.0, 0.0, 0.3).normalize());

        // The light vertex sits at (-1, 0, 1) and its ancestor at the light
        // center (0, 0, 1.99), so the ratio of the cosines towards the ancestor
        // is (1 + 0.3 * 0.99) / |(1, 0, 0.3)|.
        let expected: Float = (1.0 + 0.3 * 0.99) / (1.09 as Float).sqrt();
        let ratio = tilted.contribution.average() / plain.contribution.average();
        assert!(approx_eq!(f32, ratio, expected, epsilon = 1e-3), "{ratio} vs {expected}");
        assert_eq!(tilted.key, TechniqueKey::new(1, 1, 3));
    }

    #[test]
    fn merge_gathers_nearby_photons() {
        let scene = floor_scene(3, 3, None);
        let mut cache = PathCache::new(1, 2);
        let arenas = cache.begin(1);
        arenas[0].begin_path(0);
        let (prim_id, emitter) = scene.emitter(0);
        let mut origin = emitter.sample_uniform_area(&Point2f::new(0.5, 0.5)).point;
        origin.prim_id = prim_id;
        arenas[0].push(PathVertex {
            point: origin,
            ..Default::default()
        });
        let floor = SurfacePoint::new(
            Point3f::new(0.01, 0.0, 0.0),
            Normal3f::new(0.0, 0.0, 1.0),
            Point2f::default(),
        );
        arenas[0].push(PathVertex {
            point: floor,
            pdf_from_ancestor: 1.0,
            pdf_next_event: 1.0,
            jacobian_to_ancestor: 1.0,
            weight: Spectrum::ONE,
            depth: 1,
            ..Default::default()
        });
        arenas[0].end_path();
        cache.commit(1);

        let index = MergeIndex::build(&cache, 0.1);
        assert_eq!(index.len(), 1);
        let ctx = context(&scene, &cache, &index, mis(TechniqueFlags::MERGE));
        let pdfs = [
            PathPdfPair {
                pdf_from_ancestor: 1.0,
                pdf_to_ancestor: 0.0,
            },
            PathPdfPair {
                pdf_from_ancestor: 1.0,
                pdf_to_ancestor: 1.0,
            },
        ];
        let vertex = floor_vertex(&scene, &pdfs);

        let mut buffers = PdfBuffers::default();
        let mut neighbors = BinaryHeap::new();
        let (sum, found) = Merge.gather(&ctx, &mut buffers, &mut neighbors, &vertex, &Point2f::default());
        assert_eq!(found, 1);

        // Fewer photons than requested, so the kernel spans the local radius.
        let r2 = 0.05 * 0.05;
        let photon = neighbors.peek().copied().unwrap();
        let estimate = Merge.evaluate(&ctx, &mut buffers, &vertex, &photon, r2).unwrap();
        let expected = ALBEDO / PI * Merge::kernel(photon.distance_squared.0, r2) / 16.0;
        assert!(approx_eq!(f32, estimate.contribution.average(), expected, epsilon = 1e-3 * expected));
        assert!(estimate.mis_weight > 0.0 && estimate.mis_weight <= 1.0);
        assert_eq!(estimate.key, TechniqueKey::new(2, 1, 3));
        assert!(approx_eq!(f32, sum.average(), estimate.weighted().average(), epsilon = 1e-6));
    }

    proptest! {
        #[test]
        fn kernel_is_non_negative(d2 in 0.0..1.0f32, r2 in 0.001..1.0f32) {
            let k = Merge::kernel(d2, r2);
            prop_assert!(k >= 0.0);
            prop_assert!(k <= 2.0 / (PI * r2) + 1e-3);
        }
    }
}
