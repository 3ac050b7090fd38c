//! Small scenes shared by the renderer tests

use accelerators::PrimitiveList;
use cameras::PerspectiveCamera;
use render_core::film::*;
use render_core::geometry::*;
use render_core::light::*;
use render_core::pbrt::*;
use render_core::scene::*;
use render_core::shape::*;
use render_core::spectrum::*;
use lights::{DiffuseAreaLight, UniformBackground};
use materials::DiffuseMaterial;
use shapes::Quad;
use std::sync::Arc;

/// Radiance of the test area lights.
pub const LIGHT_RADIANCE: Float = 10.0;

/// Half edge length of the test area lights.
pub const LIGHT_HALF_SIZE: Float = 0.1;

/// Albedo of every diffuse surface.
pub const ALBEDO: Float = 0.5;

fn diffuse(shape: Quad) -> Primitive {
    Primitive::new(
        Arc::new(shape),
        Arc::new(DiffuseMaterial::new(Spectrum::new(ALBEDO))),
        None,
    )
}

fn area_light(shape: Quad) -> Primitive {
    let shape: ArcShape = Arc::new(shape);
    let emitter: ArcEmitter = Arc::new(DiffuseAreaLight::new(Spectrum::new(LIGHT_RADIANCE), shape.clone()));
    Primitive::new(
        shape,
        Arc::new(DiffuseMaterial::new(Spectrum::ZERO)),
        Some(emitter),
    )
}

fn build(
    primitives: Vec<Primitive>,
    camera: PerspectiveCamera,
    background: Option<Spectrum>,
    width: usize,
    height: usize,
) -> Scene {
    let raytracer = Arc::new(PrimitiveList::from_primitives(&primitives));
    let background = background.map(|l| Arc::new(UniformBackground::new(l)) as ArcBackground);
    Scene::new(
        raytracer,
        primitives,
        Arc::new(camera),
        background,
        FrameBuffer::new(width, height),
    )
}

fn floor_camera(width: usize, height: usize) -> PerspectiveCamera {
    PerspectiveCamera::new(
        Point3f::new(0.0, -3.0, 2.0),
        Point3f::ORIGIN,
        Vector3f::new(0.0, 0.0, 1.0),
        40.0,
        width,
        height,
    )
}

/// A 4x4 diffuse floor at z = 0 facing up, lit by a small square area light at
/// z = 1 facing down. The camera looks at the origin from the front.
///
/// * `width`      - Image width.
/// * `height`     - Image height.
/// * `background` - Background radiance, if any.
pub fn floor_scene(width: usize, height: usize, background: Option<Spectrum>) -> Scene {
    let primitives = vec![
        diffuse(Quad::horizontal(0.0, 2.0, true)),
        area_light(Quad::horizontal(1.0, LIGHT_HALF_SIZE, false)),
    ];
    build(primitives, floor_camera(width, height), background, width, height)
}

/// The floor scene with an occluder at z = 0.5 that puts the floor around the
/// origin into full shadow.
///
/// * `width`  - Image width.
/// * `height` - Image height.
pub fn shadowed_floor_scene(width: usize, height: usize) -> Scene {
    let primitives = vec![
        diffuse(Quad::horizontal(0.0, 2.0, true)),
        area_light(Quad::horizontal(1.0, LIGHT_HALF_SIZE, false)),
        diffuse(Quad::horizontal(0.5, 0.3, true)),
    ];
    build(primitives, floor_camera(width, height), None, width, height)
}

/// A closed diffuse box spanning [-1, 1] x [-1, 1] x [0, 2] with an area light
/// below the ceiling. The camera sits inside, so no ray ever escapes.
///
/// * `width`  - Image width.
/// * `height` - Image height.
pub fn closed_box_scene(width: usize, height: usize) -> Scene {
    let x = Vector3f::new(2.0, 0.0, 0.0);
    let y = Vector3f::new(0.0, 2.0, 0.0);
    let z = Vector3f::new(0.0, 0.0, 2.0);
    let primitives = vec![
        diffuse(Quad::horizontal(0.0, 1.0, true)),
        diffuse(Quad::horizontal(2.0, 1.0, false)),
        diffuse(Quad::new(Point3f::new(-1.0, -1.0, 0.0), y, z)),
        diffuse(Quad::new(Point3f::new(1.0, -1.0, 0.0), z, y)),
        diffuse(Quad::new(Point3f::new(-1.0, 1.0, 0.0), x, z)),
        diffuse(Quad::new(Point3f::new(-1.0, -1.0, 0.0), z, x)),
        area_light(Quad::horizontal(1.99, 0.3, false)),
    ];
    let camera = PerspectiveCamera::new(
        Point3f::new(0.0, -0.9, 1.0),
        Point3f::new(0.0, 1.0, 1.0),
        Vector3f::new(0.0, 0.0, 1.0),
        60.0,
        width,
        height,
    );
    build(primitives, camera, None, width, height)
}

/// Irradiance at the origin from the floor scene light, integrated in closed
/// form over the square.
pub fn floor_irradiance_at_origin() -> Float {
    // Form factor of a differential area to a parallel a x b rectangle at
    // distance c, with the normal through one corner.
    let corner = |a: Float, b: Float, c: Float| {
        let sa = (a * a + c * c).sqrt();
        let sb = (b * b + c * c).sqrt();
        (a / sa * (b / sa).atan() + b / sb * (a / sb).atan()) / (2.0 * PI)
    };
    let form_factor = 4.0 * corner(LIGHT_HALF_SIZE, LIGHT_HALF_SIZE, 1.0);
    PI * LIGHT_RADIANCE * form_factor
}
