#[macro_use]
extern crate log;

mod scenes;

use render_core::app::*;
use render_core::error::*;
use render_core::film::*;
use render_core::integrator::*;
use integrators::*;
use scenes::*;

#[cfg(all(feature = "dhat-rs", feature = "jemalloc"))]
compile_error!("feature 'dhat-rs' and feature 'jemalloc' cannot be enabled at the same time");

#[cfg(feature = "dhat-rs")]
use dhat::{Dhat, DhatAlloc};

#[cfg(feature = "dhat-rs")]
#[global_allocator]
static ALLOCATOR: DhatAlloc = DhatAlloc;

#[cfg(feature = "jemalloc")]
#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(feature = "jemalloc")]
#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static ALLOCATOR: Jemalloc = Jemalloc;

fn main() {
    #[cfg(feature = "dhat-rs")]
    let _dhat = Dhat::start_heap_profiling();

    // Initialize `env_logger`.
    env_logger::init();

    if let Err(e) = render(&OPTIONS) {
        error!("{e}");
        std::process::exit(1);
    }
}

/// Builds the configuration from the command line options.
///
/// * `options` - Command line options.
fn build_config(options: &Options) -> Result<VCMConfig, RenderError> {
    let mut config = VCMConfig::preset(&options.technique)?;
    config.num_iterations = options.iterations;
    config.max_depth = options.max_depth;
    config.min_depth = options.min_depth;
    config.num_threads = options.n_threads;
    config.max_render_time_ms = options.max_time_ms;
    config.quiet = options.quiet;

    if let Some(n) = options.light_paths {
        config.num_light_paths = LightPathCount::Fixed(n);
    }
    if options.no_merge {
        config.enable_merging = false;
    }
    if options.no_connect {
        config.enable_connections = false;
    }
    if options.no_light_tracer {
        config.enable_light_tracer = false;
    }
    if let Some(prefix) = options.pyramid_prefix.as_ref() {
        config.render_technique_pyramid = true;
        config.technique_pyramid_prefix = prefix.clone();
    }
    Ok(config)
}

fn render(options: &Options) -> Result<(), RenderError> {
    let config = build_config(options)?;
    let scene = build_scene(
        &options.scene,
        options.width,
        options.height,
        FrameBuffer::new(options.width, options.height),
    )?;

    let mut integrator = VCMIntegrator::new(config);
    integrator.render(&scene)?;

    let stats = integrator.stats();
    info!(
        "{} iterations in {} ms ({} ms frame buffer)",
        stats.iterations, stats.render_time_ms, stats.frame_buffer_time_ms
    );

    scene.frame_buffer.write(&options.image_file)?;
    info!("Wrote '{}'", options.image_file);
    Ok(())
}
