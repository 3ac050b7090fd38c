//! Application related stuff

use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};

lazy_static! {
    /// The global application options.
    pub static ref OPTIONS: Options = Options::parse();
}

/// System wide options.
#[derive(Parser, Clone, Debug)]
#[clap(author, version, about, long_about = None)]
pub struct Options {
    /// Number of threads to use for rendering.
    #[clap(
        long = "nthreads",
        short = 't',
        value_name = "NUM",
        default_value_t = 0,
        help = "Use specified number of threads for rendering (0 = all logical CPUs)."
    )]
    pub n_threads: usize,

    /// Number of iterations.
    #[clap(long = "iterations", short = 'n', value_name = "NUM", default_value_t = 16)]
    pub iterations: usize,

    /// Maximum path length in edges.
    #[clap(long = "maxdepth", short = 'd', value_name = "NUM", default_value_t = 5)]
    pub max_depth: usize,

    /// Minimum path length in edges.
    #[clap(long = "mindepth", value_name = "NUM", default_value_t = 1)]
    pub min_depth: usize,

    /// Number of light paths per iteration; one per pixel when omitted.
    #[clap(long = "lightpaths", short = 'l', value_name = "NUM")]
    pub light_paths: Option<usize>,

    /// Technique preset.
    #[clap(
        long = "technique",
        value_name = "NAME",
        default_value = "vcm",
        help = "One of: vcm, bidir, vertex-cache, photon-mapper, path-tracer."
    )]
    pub technique: String,

    /// Disable merging.
    #[clap(long = "no-merge")]
    pub no_merge: bool,

    /// Disable inner connections.
    #[clap(long = "no-connect")]
    pub no_connect: bool,

    /// Disable light tracing.
    #[clap(long = "no-lighttracer")]
    pub no_light_tracer: bool,

    /// Time budget in milliseconds.
    #[clap(long = "maxtime", value_name = "MS")]
    pub max_time_ms: Option<u64>,

    /// Built-in scene.
    #[clap(
        long = "scene",
        value_name = "NAME",
        default_value = "box",
        help = "One of: box, floor, sky."
    )]
    pub scene: String,

    /// Image width.
    #[clap(long = "width", value_name = "NUM", default_value_t = 256)]
    pub width: usize,

    /// Image height.
    #[clap(long = "height", value_name = "NUM", default_value_t = 256)]
    pub height: usize,

    /// Path to the image file.
    #[clap(
        long = "outfile",
        short = 'o',
        value_name = "FILE",
        default_value = "render.exr",
        help = "Write the final image to the given filename."
    )]
    pub image_file: String,

    /// Prefix for the technique pyramid images.
    #[clap(long = "pyramid", value_name = "PREFIX", help = "Write one image per technique with the given prefix.")]
    pub pyramid_prefix: Option<String>,

    /// Suppress all text output other than error messages.
    #[clap(long, help = "Suppress all text output other than error messages.")]
    pub quiet: bool,
}

/// Returns a progress bar over `len` steps, hidden when `quiet` is set.
///
/// * `len`   - Number of steps.
/// * `quiet` - Hide the progress bar.
pub fn create_progress_bar(len: u64, quiet: bool) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }
    let progress = ProgressBar::new(len);
    if let Ok(style) = ProgressStyle::with_template("{msg} [{elapsed_precise}] {wide_bar} {pos}/{len} ({eta})") {
        progress.set_style(style);
    }
    progress
}
