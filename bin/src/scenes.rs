//! Built-in scenes

use accelerators::PrimitiveList;
use cameras::PerspectiveCamera;
use render_core::error::*;
use render_core::film::*;
use render_core::geometry::*;
use render_core::light::*;
use render_core::scene::*;
use render_core::shape::*;
use render_core::spectrum::*;
use lights::{DiffuseAreaLight, UniformBackground};
use materials::DiffuseMaterial;
use shapes::{Quad, Sphere};
use std::sync::Arc;

/// Builds the scene with the given name.
///
/// * `name`         - One of `box`, `floor`, `sky`.
/// * `width`        - Image width.
/// * `height`       - Image height.
/// * `frame_buffer` - Output sink with the same resolution.
pub fn build_scene(name: &str, width: usize, height: usize, frame_buffer: FrameBuffer) -> Result<Scene, RenderError> {
    let (primitives, camera, background) = match name {
        "box" => cornell_box(width, height),
        "floor" => lit_floor(width, height),
        "sky" => sky_dome(width, height),
        _ => return Err(RenderError::InvalidConfig(format!("unknown scene '{name}'"))),
    };
    info!("Scene '{name}' with {} primitives", primitives.len());

    let raytracer = Arc::new(PrimitiveList::from_primitives(&primitives));
    let background = background.map(|l| Arc::new(UniformBackground::new(l)) as ArcBackground);
    Ok(Scene::new(raytracer, primitives, Arc::new(camera), background, frame_buffer))
}

type SceneParts = (Vec<Primitive>, PerspectiveCamera, Option<Spectrum>);

fn diffuse<S: Shape + Send + Sync + 'static>(shape: S, albedo: Spectrum) -> Primitive {
    Primitive::new(Arc::new(shape), Arc::new(DiffuseMaterial::new(albedo)), None)
}

fn emitter(shape: Quad, radiance: Spectrum) -> Primitive {
    let shape: ArcShape = Arc::new(shape);
    let light: ArcEmitter = Arc::new(DiffuseAreaLight::new(radiance, shape.clone()));
    Primitive::new(shape, Arc::new(DiffuseMaterial::new(Spectrum::ZERO)), Some(light))
}

/// Closed box with a red and a green wall, two spheres and a ceiling light.
fn cornell_box(width: usize, height: usize) -> SceneParts {
    let white = Spectrum::new(0.75);
    let x = Vector3f::new(2.0, 0.0, 0.0);
    let y = Vector3f::new(0.0, 2.0, 0.0);
    let z = Vector3f::new(0.0, 0.0, 2.0);

    let primitives = vec![
        diffuse(Quad::horizontal(0.0, 1.0, true), white),
        diffuse(Quad::horizontal(2.0, 1.0, false), white),
        diffuse(Quad::new(Point3f::new(-1.0, -1.0, 0.0), y, z), Spectrum::rgb(0.75, 0.25, 0.25)),
        diffuse(Quad::new(Point3f::new(1.0, -1.0, 0.0), z, y), Spectrum::rgb(0.25, 0.75, 0.25)),
        diffuse(Quad::new(Point3f::new(-1.0, 1.0, 0.0), x, z), white),
        diffuse(Quad::new(Point3f::new(-1.0, -1.0, 0.0), z, x), white),
        diffuse(Sphere::new(Point3f::new(-0.45, 0.3, 0.35), 0.35, false), Spectrum::new(0.9)),
        diffuse(Sphere::new(Point3f::new(0.45, -0.2, 0.35), 0.35, false), Spectrum::rgb(0.6, 0.6, 0.9)),
        emitter(Quad::horizontal(1.99, 0.25, false), Spectrum::new(17.0)),
    ];
    let camera = PerspectiveCamera::new(
        Point3f::new(0.0, -0.99, 1.0),
        Point3f::new(0.0, 1.0, 1.0),
        Vector3f::new(0.0, 0.0, 1.0),
        70.0,
        width,
        height,
    );
    (primitives, camera, None)
}

/// Floor lit by a small overhead light, with a sphere casting a shadow.
fn lit_floor(width: usize, height: usize) -> SceneParts {
    let primitives = vec![
        diffuse(Quad::horizontal(0.0, 4.0, true), Spectrum::new(0.5)),
        diffuse(Sphere::new(Point3f::new(0.0, 0.0, 0.5), 0.5, false), Spectrum::new(0.8)),
        emitter(Quad::horizontal(2.5, 0.25, false), Spectrum::new(40.0)),
    ];
    let camera = PerspectiveCamera::new(
        Point3f::new(0.0, -5.0, 3.0),
        Point3f::new(0.0, 0.0, 0.5),
        Vector3f::new(0.0, 0.0, 1.0),
        40.0,
        width,
        height,
    );
    (primitives, camera, None)
}

/// Open floor under a uniform sky.
fn sky_dome(width: usize, height: usize) -> SceneParts {
    let primitives = vec![
        diffuse(Quad::horizontal(0.0, 4.0, true), Spectrum::new(0.5)),
        diffuse(Sphere::new(Point3f::new(-0.6, 0.0, 0.5), 0.5, false), Spectrum::rgb(0.8, 0.4, 0.3)),
        diffuse(Sphere::new(Point3f::new(0.6, 0.5, 0.5), 0.5, false), Spectrum::new(0.8)),
    ];
    let camera = PerspectiveCamera::new(
        Point3f::new(0.0, -5.0, 2.0),
        Point3f::new(0.0, 0.0, 0.5),
        Vector3f::new(0.0, 0.0, 1.0),
        40.0,
        width,
        height,
    );
    (primitives, camera, Some(Spectrum::rgb(0.6, 0.7, 1.0)))
}
