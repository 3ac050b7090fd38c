//! Balance heuristic weights for all techniques

use super::config::*;
use super::path_cache::*;
use super::pdfs::*;
use render_core::pbrt::*;

/// Camera side of a combined path.
#[derive(Copy, Clone)]
pub struct CameraSubpath<'a> {
    /// Densities of the camera path vertices, primary hit first.
    pub vertices: &'a [PathPdfPair],

    /// Distance from the camera to the primary hit.
    pub primary_distance: Float,

    /// Local merge radius of the path.
    pub radius: Float,
}

/// Parameters shared by all MIS computations of one iteration.
#[derive(Copy, Clone, Debug)]
pub struct MisContext {
    /// Active techniques.
    pub techniques: TechniqueFlags,

    /// Whether merges at the primary camera hit are possible.
    pub merge_primary: bool,

    /// Number of light paths traced this iteration.
    pub num_light_paths: Float,

    /// Density of selecting a given light vertex for an inner connection,
    /// in units of light paths.
    pub select_density: Float,

    /// Apply the correlation correction to merges.
    pub use_correlation: bool,
}

impl MisContext {
    /// Returns the selection density for inner connections.
    ///
    /// * `selection`       - How light vertices are chosen.
    /// * `num_connections` - Connections per camera vertex.
    /// * `num_light_paths` - Light paths per iteration.
    /// * `num_vertices`    - Number of vertices in the light path cache.
    pub fn connection_select_density(
        selection: ConnectionSelection,
        num_connections: usize,
        num_light_paths: usize,
        num_vertices: usize,
    ) -> Float {
        match selection {
            ConnectionSelection::PairedPath => 1.0,
            ConnectionSelection::Resampled if num_vertices == 0 => 0.0,
            ConnectionSelection::Resampled => {
                (num_connections * num_light_paths) as Float / num_vertices as Float
            }
        }
    }

    #[inline]
    fn merging(&self) -> bool {
        self.techniques.contains(TechniqueFlags::MERGE)
    }

    #[inline]
    fn connecting(&self) -> bool {
        self.techniques.contains(TechniqueFlags::CONNECT)
    }

    /// Sums the density ratios of all techniques that sample the camera side
    /// of the path up to `last_camera` differently.
    ///
    /// * `pdfs`        - Densities of the combined path.
    /// * `last_camera` - Index of the last camera vertex.
    /// * `radius`      - Merge radius.
    /// * `correl`      - Correlation correction.
    pub fn camera_reciprocals(
        &self,
        pdfs: &BidirPathPdfs,
        last_camera: usize,
        radius: Float,
        correl: &CorrelAwareRatios,
    ) -> Float {
        let accept_area = PI * radius * radius;
        let mut sum = 0.0;
        let mut next = 1.0;
        for i in (1..=last_camera).rev() {
            if self.merging() {
                sum += next * self.num_light_paths * pdfs.light_to_camera[i] * accept_area * correl.get(i);
            }

            next *= pdfs.light_to_camera[i] / pdfs.camera_to_light[i];

            if self.connecting() {
                sum += next * self.select_density;
            }
        }

        if self.techniques.contains(TechniqueFlags::LIGHT_TRACER) {
            sum += next * pdfs.light_to_camera[0] / pdfs.camera_to_light[0] * self.num_light_paths;
        }

        if self.merge_primary && self.merging() {
            sum += next * self.num_light_paths * pdfs.light_to_camera[0] * accept_area;
        }

        sum
    }

    /// Sums the density ratios of all techniques that sample the light side
    /// of the path from `first_light` on differently.
    ///
    /// * `pdfs`        - Densities of the combined path.
    /// * `first_light` - Index of the first light vertex.
    /// * `radius`      - Merge radius.
    /// * `correl`      - Correlation correction.
    pub fn light_reciprocals(
        &self,
        pdfs: &BidirPathPdfs,
        first_light: usize,
        radius: Float,
        correl: &CorrelAwareRatios,
    ) -> Float {
        let n = pdfs.len();
        let accept_area = PI * radius * radius;
        let mut sum = 0.0;
        let mut next = 1.0;
        for i in first_light..n {
            if i == n - 1 {
                sum += next * pdfs.pdf_next_event / pdfs.light_to_camera[i];
            }

            // No merging on the light source itself.
            if i + 1 < n && (self.merge_primary || i > 0) && self.merging() {
                sum += next * self.num_light_paths * pdfs.camera_to_light[i] * accept_area * correl.get(i);
            }

            next *= pdfs.camera_to_light[i] / pdfs.light_to_camera[i];

            // The connection to the light origin is next event estimation.
            if i + 2 < n && self.connecting() {
                sum += next * self.select_density;
            }
        }

        if self.techniques.contains(TechniqueFlags::HITTING) {
            sum += next;
        }
        sum
    }

    /// Returns the weight of a camera path hitting an emitter or the
    /// background.
    ///
    /// * `buffers`         - Scratch space.
    /// * `camera`          - The camera path including the emitter vertex.
    /// * `pdf_emit`        - Density of emission sampling the previous camera
    ///                       vertex.
    /// * `pdf_next_event`  - Density of next event sampling the emitter point.
    /// * `from_background` - Whether the background was hit.
    pub fn emitter_hit(
        &self,
        buffers: &mut PdfBuffers,
        camera: &CameraSubpath,
        pdf_emit: Float,
        pdf_next_event: Float,
        from_background: bool,
    ) -> Float {
        let n = camera.vertices.len();
        if n <= 1 {
            // Only technique for directly visible lights.
            return 1.0;
        }
        let last = n - 1;

        let (mut pdfs, scratch) = buffers.prepare(n);
        pdfs.gather_camera(camera.vertices, last);
        pdfs.light_to_camera[last - 1] = pdf_emit;
        pdfs.camera_to_light[last] = camera.vertices[last].pdf_from_ancestor;
        pdfs.pdf_next_event = pdf_next_event;
        let correl = CorrelAwareRatios::new(
            &pdfs,
            camera.primary_distance,
            from_background,
            scratch,
            self.use_correlation,
        );

        let pdf_this = pdfs.camera_to_light[last];
        let mut sum = 1.0;
        sum += pdf_next_event / pdf_this;
        sum += self.camera_reciprocals(&pdfs, last - 1, camera.radius, &correl) / pdf_this;
        1.0 / sum
    }

    /// Returns the weight of next event estimation at the last camera vertex.
    ///
    /// * `buffers`         - Scratch space.
    /// * `camera`          - The camera path.
    /// * `pdf_emit`        - Density of emission sampling the camera vertex.
    /// * `pdf_next_event`  - Density of the next event sample.
    /// * `pdf_hit`         - Density of the BSDF sampling the light point.
    /// * `pdf_reverse`     - Density of the BSDF sampling the previous camera
    ///                       vertex.
    /// * `from_background` - Whether the background was sampled.
    #[allow(clippy::too_many_arguments)]
    pub fn next_event(
        &self,
        buffers: &mut PdfBuffers,
        camera: &CameraSubpath,
        pdf_emit: Float,
        pdf_next_event: Float,
        pdf_hit: Float,
        pdf_reverse: Float,
        from_background: bool,
    ) -> Float {
        let n = camera.vertices.len() + 1;
        let last = n - 2;

        let (mut pdfs, scratch) = buffers.prepare(n);
        pdfs.gather_camera(camera.vertices, last);
        pdfs.camera_to_light[last] = camera.vertices[last].pdf_from_ancestor;
        pdfs.light_to_camera[last] = pdf_emit;
        if last > 0 {
            pdfs.light_to_camera[last - 1] = pdf_reverse;
        }
        pdfs.camera_to_light[n - 1] = pdf_hit;
        pdfs.pdf_next_event = pdf_next_event;
        let correl = CorrelAwareRatios::new(
            &pdfs,
            camera.primary_distance,
            from_background,
            scratch,
            self.use_correlation,
        );

        let mut sum = 1.0;
        if self.techniques.contains(TechniqueFlags::HITTING) {
            sum += pdf_hit / pdf_next_event;
        }
        sum += self.camera_reciprocals(&pdfs, last, camera.radius, &correl) / pdf_next_event;
        1.0 / sum
    }

    /// Returns the weight of an inner connection between the last camera
    /// vertex and a light vertex.
    ///
    /// * `buffers`          - Scratch space.
    /// * `cache`            - Light path cache.
    /// * `camera`           - The camera path.
    /// * `light_vertex`     - Flat index of the light vertex.
    /// * `pdf_cam_reverse`  - Density of the camera BSDF sampling the previous
    ///                        camera vertex.
    /// * `pdf_cam_to_light` - Density of the camera BSDF sampling the light
    ///                        vertex.
    /// * `pdf_light_reverse` - Density of the light BSDF sampling the light
    ///                        vertex's ancestor.
    /// * `pdf_light_to_cam` - Density of the light BSDF sampling the camera
    ///                        vertex.
    #[allow(clippy::too_many_arguments)]
    pub fn connect(
        &self,
        buffers: &mut PdfBuffers,
        cache: &PathCache,
        camera: &CameraSubpath,
        light_vertex: usize,
        pdf_cam_reverse: Float,
        pdf_cam_to_light: Float,
        pdf_light_reverse: Float,
        pdf_light_to_cam: Float,
    ) -> Float {
        let vertex = cache.get(light_vertex);
        let n = camera.vertices.len() + vertex.depth + 1;
        let last = camera.vertices.len() - 1;

        let (mut pdfs, scratch) = buffers.prepare(n);
        pdfs.gather_camera(camera.vertices, last);
        pdfs.gather_light(cache, light_vertex, last + 1);
        if last > 0 {
            pdfs.light_to_camera[last - 1] = pdf_cam_reverse;
        }
        pdfs.camera_to_light[last] = camera.vertices[last].pdf_from_ancestor;
        pdfs.light_to_camera[last] = pdf_light_to_cam;
        pdfs.camera_to_light[last + 1] = pdf_cam_to_light;
        pdfs.camera_to_light[last + 2] = pdf_light_reverse;
        let correl = CorrelAwareRatios::new(
            &pdfs,
            camera.primary_distance,
            vertex.from_background,
            scratch,
            self.use_correlation,
        );

        let mut sum = self.camera_reciprocals(&pdfs, last, camera.radius, &correl);
        sum += self.light_reciprocals(&pdfs, last + 1, camera.radius, &correl);
        1.0 / (1.0 + sum / self.select_density)
    }

    /// Returns the weight of merging the last camera vertex with a photon.
    ///
    /// * `buffers`           - Scratch space.
    /// * `cache`             - Light path cache.
    /// * `camera`            - The camera path.
    /// * `photon`            - Flat index of the photon.
    /// * `pdf_cam_reverse`   - Density of the camera BSDF sampling the
    ///                         previous camera vertex.
    /// * `pdf_light_reverse` - Density of the camera BSDF sampling the
    ///                         photon's ancestor.
    pub fn merge(
        &self,
        buffers: &mut PdfBuffers,
        cache: &PathCache,
        camera: &CameraSubpath,
        photon: usize,
        pdf_cam_reverse: Float,
        pdf_light_reverse: Float,
    ) -> Float {
        let vertex = cache.get(photon);
        let n = camera.vertices.len() + vertex.depth;
        let last = camera.vertices.len() - 1;

        let (mut pdfs, scratch) = buffers.prepare(n);
        pdfs.gather_camera(camera.vertices, last);
        pdfs.gather_light(cache, photon, last);
        if last > 0 {
            pdfs.light_to_camera[last - 1] = pdf_cam_reverse;
        }
        pdfs.light_to_camera[last] = vertex.pdf_from_ancestor;
        pdfs.camera_to_light[last] = camera.vertices[last].pdf_from_ancestor;
        pdfs.camera_to_light[last + 1] = pdf_light_reverse;
        let correl = CorrelAwareRatios::new(
            &pdfs,
            camera.primary_distance,
            vertex.from_background,
            scratch,
            self.use_correlation,
        );

        let accept_area = PI * camera.radius * camera.radius;
        let merge_approx = pdfs.light_to_camera[last] * accept_area * self.num_light_paths * correl.get(last);
        if merge_approx == 0.0 {
            return 0.0;
        }

        let mut sum = self.camera_reciprocals(&pdfs, last, camera.radius, &correl) / merge_approx;
        sum += self.light_reciprocals(&pdfs, last + 1, camera.radius, &correl) / merge_approx;

        // Connecting the camera vertex to the photon's ancestor.
        if vertex.depth > 1 && self.connecting() {
            sum += self.select_density / merge_approx;
        }
        1.0 / sum
    }

    /// Returns the weight of connecting a light vertex to the camera.
    ///
    /// * `buffers`            - Scratch space.
    /// * `cache`              - Light path cache.
    /// * `light_vertex`       - Flat index of the light vertex.
    /// * `dist_to_cam`        - Distance from the vertex to the camera.
    /// * `radius`             - Merge radius at the vertex.
    /// * `pdf_cam_to_primary` - Area density of the camera sampling the vertex.
    /// * `pdf_reverse`        - Density of the BSDF sampling the vertex's
    ///                          ancestor.
    #[allow(clippy::too_many_arguments)]
    pub fn light_tracer(
        &self,
        buffers: &mut PdfBuffers,
        cache: &PathCache,
        light_vertex: usize,
        dist_to_cam: Float,
        radius: Float,
        pdf_cam_to_primary: Float,
        pdf_reverse: Float,
    ) -> Float {
        let vertex = cache.get(light_vertex);
        let n = vertex.depth + 1;

        let (mut pdfs, scratch) = buffers.prepare(n);
        pdfs.gather_light(cache, light_vertex, 0);
        pdfs.camera_to_light[0] = pdf_cam_to_primary;
        pdfs.camera_to_light[1] = pdf_reverse;
        let correl = CorrelAwareRatios::new(&pdfs, dist_to_cam, vertex.from_background, scratch, self.use_correlation);

        let sum = self.light_reciprocals(&pdfs, 0, radius, &correl) / self.num_light_paths;
        1.0 / (1.0 + sum)
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
