//! Sampling densities along a combined path

use super::path_cache::*;
use render_core::pbrt::*;

/// Tangent of one degree. Scales the distance to the camera into the radius
/// used by the correlation correction.
const TAN_ONE_DEGREE: Float = 0.0174550649;

/// Reverse and forward area densities of one camera path vertex.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct PathPdfPair {
    /// Area density of sampling the vertex from its ancestor.
    pub pdf_from_ancestor: Float,

    /// Area density of sampling the ancestor from the vertex.
    pub pdf_to_ancestor: Float,
}

/// Reusable storage for the arrays of one MIS computation. One instance
/// lives with every in-flight camera path; the arrays are resized and zeroed
/// for each technique evaluation, never reallocated once large enough.
#[derive(Default)]
pub struct PdfBuffers {
    light_to_camera: Vec<Float>,
    camera_to_light: Vec<Float>,
    correl_camera: Vec<Float>,
    correl_light: Vec<Float>,
}

impl PdfBuffers {
    /// Returns zeroed densities and correlation scratch space for a combined
    /// path with `num_pdfs` vertices.
    ///
    /// * `num_pdfs` - Number of vertices of the combined path.
    pub fn prepare(&mut self, num_pdfs: usize) -> (BidirPathPdfs<'_>, RatioBuffers<'_>) {
        for buf in [
            &mut self.light_to_camera,
            &mut self.camera_to_light,
            &mut self.correl_camera,
            &mut self.correl_light,
        ] {
            buf.clear();
            buf.resize(num_pdfs, 0.0);
        }

        (
            BidirPathPdfs {
                light_to_camera: &mut self.light_to_camera,
                camera_to_light: &mut self.camera_to_light,
                pdf_next_event: 0.0,
            },
            RatioBuffers {
                camera: &mut self.correl_camera,
                light: &mut self.correl_light,
            },
        )
    }
}

/// Area densities of every vertex of a combined path, indexed from the
/// camera side: index 0 is the primary hit, the last index is the light
/// path origin.
pub struct BidirPathPdfs<'a> {
    /// Density of sampling vertex `i` from vertex `i + 1`.
    pub light_to_camera: &'a mut [Float],

    /// Density of sampling vertex `i` from vertex `i - 1`.
    pub camera_to_light: &'a mut [Float],

    /// Density of next event estimation sampling the light path origin.
    pub pdf_next_event: Float,
}

impl<'a> BidirPathPdfs<'a> {
    /// Returns the number of vertices.
    pub fn len(&self) -> usize {
        self.camera_to_light.len()
    }

    /// Returns `true` if the path has no vertices.
    pub fn is_empty(&self) -> bool {
        self.camera_to_light.is_empty()
    }

    /// Copies the densities that the camera path already knows for all
    /// vertices before `last_camera`.
    ///
    /// * `vertices`    - Camera path vertices.
    /// * `last_camera` - Index of the last camera vertex.
    pub fn gather_camera(&mut self, vertices: &[PathPdfPair], last_camera: usize) {
        for i in 0..last_camera {
            self.camera_to_light[i] = vertices[i].pdf_from_ancestor;
            if i + 1 < last_camera {
                self.light_to_camera[i] = vertices[i + 1].pdf_to_ancestor;
            }
        }
    }

    /// Copies the densities that the light path already knows, from a light
    /// vertex back to the origin of its path.
    ///
    /// * `cache`  - The light path cache.
    /// * `vertex` - Flat index of the light vertex.
    /// * `first`  - Index of that vertex in the combined path.
    pub fn gather_light(&mut self, cache: &PathCache, vertex: usize, first: usize) {
        let n = self.len();
        let mut idx = vertex;
        let mut i = first;
        while i + 1 < n {
            let v = cache.get(idx);
            self.light_to_camera[i] = v.pdf_from_ancestor;
            self.camera_to_light[i + 1] = v.pdf_to_ancestor;
            if v.depth <= 1 {
                self.pdf_next_event = v.pdf_next_event;
                break;
            }
            match cache.ancestor(idx) {
                Some(ancestor) => idx = ancestor,
                None => break,
            }
            i += 1;
        }
        self.light_to_camera[n - 1] = 1.0;
    }
}

/// Scratch space for `CorrelAwareRatios`.
pub struct RatioBuffers<'a> {
    camera: &'a mut [Float],
    light: &'a mut [Float],
}

/// Correction factors that scale merge acceptance probabilities down where
/// merging and connecting would sample strongly correlated paths.
pub struct CorrelAwareRatios<'a> {
    camera: &'a [Float],
    light: &'a [Float],
    enabled: bool,
}

impl<'a> CorrelAwareRatios<'a> {
    /// Computes the ratios for a fully gathered path.
    ///
    /// * `pdfs`            - Densities of the combined path.
    /// * `dist_to_cam`     - Distance of the primary hit to the camera.
    /// * `from_background` - Whether the light path starts on the background.
    /// * `buffers`         - Scratch space.
    /// * `enabled`         - If false, every ratio is 1.
    pub fn new(
        pdfs: &BidirPathPdfs,
        dist_to_cam: Float,
        from_background: bool,
        buffers: RatioBuffers<'a>,
        enabled: bool,
    ) -> Self {
        let RatioBuffers { camera, light } = buffers;
        if !enabled || pdfs.is_empty() {
            return Self {
                camera,
                light,
                enabled: false,
            };
        }

        let radius = dist_to_cam * TAN_ONE_DEGREE;
        let accept_area = radius * radius * PI;
        let num_surface_vertices = pdfs.len() - 1;

        let mut product = 1.0;
        for i in 0..num_surface_vertices {
            product *= (pdfs.camera_to_light[i] * accept_area).min(1.0);
            camera[i] = product;
        }

        product = 1.0;
        for i in (0..num_surface_vertices).rev() {
            let mut next = pdfs.light_to_camera[i] * accept_area;
            // Area lights have a positional density on top of the directional one.
            if i == num_surface_vertices - 1 && !from_background {
                next *= accept_area;
            }
            product *= next.min(1.0);
            light[i] = product;
        }

        Self {
            camera,
            light,
            enabled: true,
        }
    }

    /// Returns the correction for merging at vertex `idx`.
    ///
    /// * `idx` - Vertex index in the combined path.
    pub fn get(&self, idx: usize) -> Float {
        if !self.enabled || idx == 0 || idx >= self.camera.len() {
            return 1.0;
        }
        let cam = self.camera[idx];
        let light = self.light[idx];
        if cam == 0.0 && light == 0.0 {
            return 1.0;
        }
        cam / (cam + light - cam * light)
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
