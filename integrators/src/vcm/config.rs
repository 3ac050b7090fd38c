//! Renderer configuration

use bitflags::bitflags;
use render_core::error::*;
use render_core::pbrt::*;

bitflags! {
    /// Sampling techniques that can be combined into one estimator.
    #[derive(Copy, Clone, Debug, PartialEq, Eq)]
    pub struct TechniqueFlags: u8 {
        /// Camera paths that randomly hit an emitter or the background.
        const HITTING = 1;

        /// Next event estimation at camera path vertices.
        const NEXT_EVENT = 2;

        /// Inner connections between camera and light path vertices.
        const CONNECT = 4;

        /// Light path vertices connected to the camera.
        const LIGHT_TRACER = 8;

        /// Photon density estimation at camera path vertices.
        const MERGE = 16;
    }
}

/// Number of light paths traced per iteration.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum LightPathCount {
    /// A fixed number of paths.
    Fixed(usize),

    /// One path per pixel of the output image.
    OnePerPixel,
}

impl LightPathCount {
    /// Returns the number of paths for a given image resolution.
    ///
    /// * `width`  - Image width.
    /// * `height` - Image height.
    pub fn resolve(&self, width: usize, height: usize) -> usize {
        match self {
            Self::Fixed(n) => *n,
            Self::OnePerPixel => width * height,
        }
    }
}

/// How light vertices are chosen for inner connections.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ConnectionSelection {
    /// Connect to all vertices of the light path with the same index as the
    /// pixel. Requires one light path per pixel.
    PairedPath,

    /// Connect to `num_connections` vertices resampled uniformly from all
    /// cached light vertices.
    Resampled,
}

/// Configuration of the bidirectional renderer.
#[derive(Clone, Debug)]
pub struct VCMConfig {
    /// Number of iterations to render.
    pub num_iterations: usize,

    /// Number of light paths per iteration.
    pub num_light_paths: LightPathCount,

    /// Maximum path length in edges.
    pub max_depth: usize,

    /// Minimum path length in edges.
    pub min_depth: usize,

    /// Enable camera paths hitting emitters beyond the primary hit.
    pub enable_hitting: bool,

    /// Enable inner connections.
    pub enable_connections: bool,

    /// Enable connecting light vertices to the camera.
    pub enable_light_tracer: bool,

    /// Enable merging.
    pub enable_merging: bool,

    /// Allow merges at the primary camera hit.
    pub merge_primary: bool,

    /// Connections per camera vertex.
    pub num_connections: usize,

    /// Next event samples per camera vertex.
    pub num_shadow_rays: usize,

    /// Light vertex selection for connections.
    pub connection_selection: ConnectionSelection,

    /// Maximum number of photons a merge query returns.
    pub max_num_photons: usize,

    /// Apply the correlation correction to merge terms in MIS weights.
    pub use_correlation_aware_mis: bool,

    /// Progressive radius shrink factor; `None` keeps the radius fixed.
    pub radius_reduction: Option<Float>,

    /// Stop after the first iteration that exceeds this render time.
    pub max_render_time_ms: Option<u64>,

    /// Seed for camera path random number streams.
    pub base_seed_camera: u32,

    /// Seed for light path random number streams.
    pub base_seed_light: u32,

    /// Worker threads; 0 uses all logical CPUs.
    pub num_threads: usize,

    /// Write one image per technique after rendering.
    pub render_technique_pyramid: bool,

    /// File name prefix for the technique images.
    pub technique_pyramid_prefix: String,

    /// Hide the progress bar.
    pub quiet: bool,
}

impl Default for VCMConfig {
    fn default() -> Self {
        Self {
            num_iterations: 1,
            num_light_paths: LightPathCount::OnePerPixel,
            max_depth: 10,
            min_depth: 1,
            enable_hitting: true,
            enable_connections: true,
            enable_light_tracer: true,
            enable_merging: true,
            merge_primary: false,
            num_connections: 1,
            num_shadow_rays: 1,
            connection_selection: ConnectionSelection::Resampled,
            max_num_photons: 8,
            use_correlation_aware_mis: true,
            radius_reduction: None,
            max_render_time_ms: None,
            base_seed_camera: 0xC030114,
            base_seed_light: 0x13C0FEFE,
            num_threads: 0,
            render_technique_pyramid: false,
            technique_pyramid_prefix: String::from("techs-"),
            quiet: true,
        }
    }
}

impl VCMConfig {
    /// Vertex connection and merging with all techniques enabled.
    pub fn vcm() -> Self {
        Self::default()
    }

    /// Classic bidirectional path tracing: every pixel connects to all
    /// vertices of its own light path.
    pub fn classic_bidir() -> Self {
        Self {
            enable_merging: false,
            connection_selection: ConnectionSelection::PairedPath,
            ..Self::default()
        }
    }

    /// Bidirectional path tracing with resampled connections to a shared
    /// vertex cache.
    pub fn vertex_cache_bidir() -> Self {
        Self {
            enable_merging: false,
            ..Self::default()
        }
    }

    /// Photon mapping: merging at every camera vertex plus directly visible
    /// emitters.
    pub fn photon_mapper() -> Self {
        Self {
            enable_connections: false,
            enable_light_tracer: false,
            num_connections: 0,
            num_shadow_rays: 0,
            ..Self::default()
        }
    }

    /// Unidirectional path tracing with next event estimation.
    pub fn path_tracer() -> Self {
        Self {
            num_light_paths: LightPathCount::Fixed(0),
            enable_connections: false,
            enable_light_tracer: false,
            enable_merging: false,
            num_connections: 0,
            ..Self::default()
        }
    }

    /// Returns the preset with the given name.
    ///
    /// * `name` - One of `vcm`, `bidir`, `vertex-cache`, `photon-mapper`,
    ///            `path-tracer`.
    pub fn preset(name: &str) -> Result<Self, RenderError> {
        match name {
            "vcm" => Ok(Self::vcm()),
            "bidir" => Ok(Self::classic_bidir()),
            "vertex-cache" => Ok(Self::vertex_cache_bidir()),
            "photon-mapper" => Ok(Self::photon_mapper()),
            "path-tracer" => Ok(Self::path_tracer()),
            _ => Err(RenderError::InvalidConfig(format!("unknown technique '{name}'"))),
        }
    }

    /// Returns the techniques that are active.
    pub fn techniques(&self) -> TechniqueFlags {
        let mut flags = TechniqueFlags::empty();
        flags.set(TechniqueFlags::HITTING, self.enable_hitting);
        flags.set(TechniqueFlags::NEXT_EVENT, self.num_shadow_rays > 0);
        flags.set(
            TechniqueFlags::CONNECT,
            self.enable_connections && self.num_connections > 0,
        );
        flags.set(TechniqueFlags::LIGHT_TRACER, self.enable_light_tracer);
        flags.set(TechniqueFlags::MERGE, self.enable_merging);
        flags
    }

    /// Checks the configuration against the image resolution. Fails before
    /// any rendering starts.
    ///
    /// * `width`  - Image width.
    /// * `height` - Image height.
    pub fn validate(&self, width: usize, height: usize) -> Result<(), RenderError> {
        let invalid = |msg: &str| Err(RenderError::InvalidConfig(msg.to_string()));

        if self.max_depth < 1 {
            return invalid("max_depth must be at least 1");
        }
        if self.min_depth > self.max_depth {
            return invalid("min_depth exceeds max_depth");
        }
        if self.num_iterations < 1 {
            return invalid("num_iterations must be at least 1");
        }
        if let Some(alpha) = self.radius_reduction {
            if !(alpha > 0.0 && alpha <= 1.0) {
                return invalid("radius_reduction must be in (0, 1]");
            }
        }

        let techniques = self.techniques();
        if techniques.contains(TechniqueFlags::CONNECT)
            && self.connection_selection == ConnectionSelection::PairedPath
            && self.num_light_paths.resolve(width, height) != width * height
        {
            return invalid("paired path connections require exactly one light path per pixel");
        }
        if techniques.contains(TechniqueFlags::MERGE) && self.max_num_photons < 1 {
            return invalid("merging requires max_num_photons >= 1");
        }

        if techniques.is_empty() {
            return invalid("no technique is enabled");
        }

        Ok(())
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_validate() {
        for name in ["vcm", "bidir", "vertex-cache", "photon-mapper", "path-tracer"] {
            let config = VCMConfig::preset(name).unwrap();
            assert!(config.validate(8, 4).is_ok(), "{name}");
        }
        assert!(VCMConfig::preset("whitted").is_err());
    }

    #[test]
    fn paired_paths_need_one_path_per_pixel() {
        let config = VCMConfig {
            num_light_paths: LightPathCount::Fixed(10),
            ..VCMConfig::classic_bidir()
        };
        assert!(matches!(config.validate(8, 4), Err(RenderError::InvalidConfig(_))));

        let config = VCMConfig {
            num_light_paths: LightPathCount::Fixed(32),
            ..VCMConfig::classic_bidir()
        };
        assert!(config.validate(8, 4).is_ok());
    }

    #[test]
    fn rejects_bad_depths() {
        let config = VCMConfig {
            max_depth: 0,
            ..VCMConfig::default()
        };
        assert!(config.validate(1, 1).is_err());

        let config = VCMConfig {
            min_depth: 4,
            max_depth: 3,
            ..VCMConfig::default()
        };
        assert!(config.validate(1, 1).is_err());
    }

    #[test]
    fn technique_flags() {
        let flags = VCMConfig::path_tracer().techniques();
        assert_eq!(flags, TechniqueFlags::HITTING | TechniqueFlags::NEXT_EVENT);
        assert!(VCMConfig::vcm().techniques().is_all());
    }
}
