//! Per technique debug images

use render_core::error::*;
use render_core::film::*;
use render_core::geometry::*;
use render_core::pbrt::*;
use render_core::spectrum::*;
use std::collections::HashMap;

/// Identifies a technique by the edges each subpath contributes.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct TechniqueKey {
    /// Edges sampled from the camera.
    pub camera_edges: usize,

    /// Edges sampled from the light.
    pub light_edges: usize,

    /// Edges of the full path.
    pub total_edges: usize,
}

impl TechniqueKey {
    /// Create a new key.
    ///
    /// * `camera_edges` - Edges sampled from the camera.
    /// * `light_edges`  - Edges sampled from the light.
    /// * `total_edges`  - Edges of the full path.
    pub fn new(camera_edges: usize, light_edges: usize, total_edges: usize) -> Self {
        Self {
            camera_edges,
            light_edges,
            total_edges,
        }
    }
}

/// One image per technique and path length.
pub struct TechPyramid {
    images: HashMap<TechniqueKey, (String, FrameBuffer)>,
}

impl TechPyramid {
    /// Creates images for every technique that can produce paths between
    /// `min_depth` and `max_depth` edges.
    ///
    /// * `width`        - Image width.
    /// * `height`       - Image height.
    /// * `min_depth`    - Minimum path length.
    /// * `max_depth`    - Maximum path length.
    /// * `merges`       - Include merging.
    /// * `connections`  - Include inner connections.
    /// * `light_tracer` - Include light tracing.
    pub fn new(
        width: usize,
        height: usize,
        min_depth: usize,
        max_depth: usize,
        merges: bool,
        connections: bool,
        light_tracer: bool,
    ) -> Self {
        let mut names: Vec<(TechniqueKey, String)> = vec![];
        for depth in min_depth.max(1)..=max_depth {
            names.push((TechniqueKey::new(depth, 0, depth), format!("{depth}-hit")));
            if depth == 1 {
                continue;
            }

            if light_tracer {
                names.push((TechniqueKey::new(0, depth - 1, depth), format!("{depth}-light-tracer")));
            }
            names.push((TechniqueKey::new(depth - 1, 0, depth), format!("{depth}-next-event")));
            if connections {
                for i in 1..depth - 1 {
                    names.push((TechniqueKey::new(i, depth - i - 1, depth), format!("{depth}-connect-{i}")));
                }
            }
            if merges {
                for i in 1..depth {
                    names.push((TechniqueKey::new(i, depth - i, depth), format!("{depth}-merge-{i}")));
                }
            }
        }

        let images = names
            .into_iter()
            .map(|(key, name)| (key, (name, FrameBuffer::new(width, height))))
            .collect();
        Self { images }
    }

    /// Returns the number of techniques.
    pub fn len(&self) -> usize {
        self.images.len()
    }

    /// Returns `true` if there are no techniques.
    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// Returns the image name of a technique.
    ///
    /// * `key` - The technique.
    pub fn name(&self, key: &TechniqueKey) -> Option<&str> {
        self.images.get(key).map(|(name, _)| name.as_str())
    }

    /// Returns the image of a technique.
    ///
    /// * `key` - The technique.
    pub fn image(&self, key: &TechniqueKey) -> Option<&FrameBuffer> {
        self.images.get(key).map(|(_, image)| image)
    }

    /// Adds a sample. Techniques without an image are ignored.
    ///
    /// * `key`      - The technique.
    /// * `film_pos` - Film position.
    /// * `value`    - The contribution.
    pub fn add(&self, key: TechniqueKey, film_pos: &Point2f, value: &Spectrum) {
        if let Some((_, image)) = self.images.get(&key) {
            image.splat(film_pos, value);
        }
    }

    /// Starts a new iteration on all images.
    pub fn start_iteration(&self) {
        for (_, image) in self.images.values() {
            image.start_iteration();
        }
    }

    /// Writes every image to `{prefix}{name}.exr`.
    ///
    /// * `prefix` - File name prefix.
    pub fn write(&self, prefix: &str) -> Result<(), RenderError> {
        for (name, image) in self.images.values() {
            image.write(&format!("{prefix}{name}.exr"))?;
        }
        Ok(())
    }
}

/// Raw and MIS weighted technique images.
pub struct TechPyramids {
    /// Unweighted contributions.
    pub raw: TechPyramid,

    /// Contributions times their MIS weight.
    pub weighted: TechPyramid,
}

impl TechPyramids {
    /// Create raw and weighted pyramids with the same techniques.
    ///
    /// * `width`        - Image width.
    /// * `height`       - Image height.
    /// * `min_depth`    - Minimum path length.
    /// * `max_depth`    - Maximum path length.
    /// * `merges`       - Include merging.
    /// * `connections`  - Include inner connections.
    /// * `light_tracer` - Include light tracing.
    pub fn new(
        width: usize,
        height: usize,
        min_depth: usize,
        max_depth: usize,
        merges: bool,
        connections: bool,
        light_tracer: bool,
    ) -> Self {
        Self {
            raw: TechPyramid::new(width, height, min_depth, max_depth, merges, connections, light_tracer),
            weighted: TechPyramid::new(width, height, min_depth, max_depth, merges, connections, light_tracer),
        }
    }

    /// Adds a sample with its MIS weight.
    ///
    /// * `key`          - The technique.
    /// * `film_pos`     - Film position.
    /// * `contribution` - Unweighted contribution.
    /// * `mis_weight`   - MIS weight.
    pub fn add(&self, key: TechniqueKey, film_pos: &Point2f, contribution: &Spectrum, mis_weight: Float) {
        if contribution.is_black() {
            return;
        }
        self.raw.add(key, film_pos, contribution);
        self.weighted.add(key, film_pos, &(*contribution * mis_weight));
    }

    /// Starts a new iteration on all images.
    pub fn start_iteration(&self) {
        self.raw.start_iteration();
        self.weighted.start_iteration();
    }

    /// Writes `{prefix}raw-{name}.exr` and `{prefix}weighted-{name}.exr`.
    ///
    /// * `prefix` - File name prefix.
    pub fn write(&self, prefix: &str) -> Result<(), RenderError> {
        self.raw.write(&format!("{prefix}raw-"))?;
        self.weighted.write(&format!("{prefix}weighted-"))
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_cover_all_techniques() {
        let pyramid = TechPyramid::new(2, 2, 1, 3, true, true, true);
        let name = |c, l, t| pyramid.name(&TechniqueKey::new(c, l, t)).map(String::from);

        assert_eq!(name(1, 0, 1).as_deref(), Some("1-hit"));
        assert_eq!(name(0, 2, 3).as_deref(), Some("3-light-tracer"));
        assert_eq!(name(2, 0, 3).as_deref(), Some("3-next-event"));
        assert_eq!(name(1, 1, 3).as_deref(), Some("3-connect-1"));
        assert_eq!(name(2, 1, 3).as_deref(), Some("3-merge-2"));
        assert_eq!(name(0, 0, 1), None);

        // depth 1: hit; depth 2: hit, lt, nee, merge-1; depth 3: hit, lt, nee, connect-1, merge-1, merge-2
        assert_eq!(pyramid.len(), 1 + 4 + 6);
    }

    #[test]
    fn weighted_image_scales_by_mis() {
        let pyramids = TechPyramids::new(1, 1, 1, 2, false, false, false);
        pyramids.start_iteration();
        let key = TechniqueKey::new(1, 0, 1);
        pyramids.add(key, &Point2f::new(0.5, 0.5), &Spectrum::new(2.0), 0.25);

        let raw = pyramids.raw.image(&key).map(|img| img.pixel(0, 0));
        let weighted = pyramids.weighted.image(&key).map(|img| img.pixel(0, 0));
        assert_eq!(raw, Some(Spectrum::new(2.0)));
        assert_eq!(weighted, Some(Spectrum::new(0.5)));
    }
}
