//! Scene

use crate::camera::*;
use crate::film::*;
use crate::geometry::*;
use crate::interaction::*;
use crate::light::*;
use crate::material::*;
use crate::pbrt::*;
use crate::shape::*;
use std::sync::Arc;

/// Ray tracing backend over the scene geometry.
pub trait Raytracer {
    /// Returns the closest hit along the ray with `prim_id` set, or `None`.
    ///
    /// * `ray` - The ray to trace.
    fn trace(&self, ray: &Ray) -> Option<SurfacePoint>;

    /// Returns `true` if anything intersects the ray within `t_max`.
    ///
    /// * `ray` - The ray to trace.
    fn intersect_p(&self, ray: &Ray) -> bool {
        self.trace(ray).is_some()
    }

    /// Returns the world space bounds of all geometry.
    fn world_bound(&self) -> Bounds3f;
}

/// Atomic reference counted `Raytracer`.
pub type ArcRaytracer = Arc<dyn Raytracer + Send + Sync>;

/// A shape with a material and an optional emitter attached to it.
#[derive(Clone)]
pub struct Primitive {
    /// The geometry.
    pub shape: ArcShape,

    /// The material.
    pub material: ArcMaterial,

    /// The emitter, if the surface emits light.
    pub emitter: Option<ArcEmitter>,
}

impl Primitive {
    /// Create a new primitive.
    ///
    /// * `shape`    - The geometry.
    /// * `material` - The material.
    /// * `emitter`  - The emitter, if the surface emits light.
    pub fn new(shape: ArcShape, material: ArcMaterial, emitter: Option<ArcEmitter>) -> Self {
        Self {
            shape,
            material,
            emitter,
        }
    }
}

/// Scene.
pub struct Scene {
    /// Ray tracing backend. Primitive ids it reports index `primitives`.
    pub raytracer: ArcRaytracer,

    /// All primitives.
    pub primitives: Vec<Primitive>,

    /// The camera.
    pub camera: ArcCamera,

    /// The background, if any.
    pub background: Option<ArcBackground>,

    /// Output sink for the rendered image.
    pub frame_buffer: FrameBuffer,

    /// Indices of the primitives that carry an emitter.
    emitters: Vec<usize>,

    /// Center of the scene bounding sphere.
    center: Point3f,

    /// Radius of the scene bounding sphere.
    radius: Float,
}

impl Scene {
    /// Creates a new `Scene`.
    ///
    /// * `raytracer`    - Ray tracing backend built over `primitives` shapes
    ///                    in the same order.
    /// * `primitives`   - All primitives.
    /// * `camera`       - The camera.
    /// * `background`   - The background, if any.
    /// * `frame_buffer` - Output sink; its resolution must match the camera.
    pub fn new(
        raytracer: ArcRaytracer,
        primitives: Vec<Primitive>,
        camera: ArcCamera,
        background: Option<ArcBackground>,
        frame_buffer: FrameBuffer,
    ) -> Self {
        let emitters: Vec<usize> = primitives
            .iter()
            .enumerate()
            .filter(|(_, p)| p.emitter.is_some())
            .map(|(i, _)| i)
            .collect();

        let (center, radius) = raytracer.world_bound().bounding_sphere();

        debug!(
            "Scene with {} primitives, {} emitters, radius {radius}",
            primitives.len(),
            emitters.len()
        );

        Self {
            raytracer,
            primitives,
            camera,
            background,
            frame_buffer,
            emitters,
            center,
            radius,
        }
    }

    /// Traces the ray into the scene and returns the hit point if an
    /// intersection occurred.
    ///
    /// * `ray` - The ray to trace.
    pub fn trace(&self, ray: &Ray) -> Option<SurfacePoint> {
        self.raytracer.trace(ray)
    }

    /// Returns `true` if the segment between two surface points is blocked.
    ///
    /// * `from` - First point.
    /// * `to`   - Second point.
    pub fn is_occluded(&self, from: &SurfacePoint, to: &SurfacePoint) -> bool {
        self.raytracer.intersect_p(&from.spawn_ray_to_surface(to))
    }

    /// Returns `true` if the segment from a surface point to a point in space
    /// (e.g. the camera) is blocked.
    ///
    /// * `from` - The surface point.
    /// * `to`   - The target point.
    pub fn is_occluded_to(&self, from: &SurfacePoint, to: &Point3f) -> bool {
        self.raytracer.intersect_p(&from.spawn_ray_to(to))
    }

    /// Returns `true` if a ray leaving `from` in direction `d` escapes.
    ///
    /// * `from` - The surface point.
    /// * `d`    - The direction.
    pub fn leaves_scene(&self, from: &SurfacePoint, d: &Vector3f) -> bool {
        !self.raytracer.intersect_p(&from.spawn_ray(d))
    }

    /// Returns the material at a surface point.
    ///
    /// * `point` - A point found by `trace`.
    pub fn material(&self, point: &SurfacePoint) -> &ArcMaterial {
        &self.primitives[point.prim_id].material
    }

    /// Returns the emitter at a surface point, if the surface emits light.
    ///
    /// * `point` - A point found by `trace`.
    pub fn query_emitter(&self, point: &SurfacePoint) -> Option<&ArcEmitter> {
        self.primitives.get(point.prim_id).and_then(|p| p.emitter.as_ref())
    }

    /// Returns the number of emitters.
    pub fn num_emitters(&self) -> usize {
        self.emitters.len()
    }

    /// Returns the emitter with the given index together with the primitive id
    /// it is attached to.
    ///
    /// * `idx` - Emitter index in `[0, num_emitters())`.
    pub fn emitter(&self, idx: usize) -> (usize, &ArcEmitter) {
        let prim_id = self.emitters[idx];
        match self.primitives[prim_id].emitter.as_ref() {
            Some(emitter) => (prim_id, emitter),
            None => unreachable!("emitter list refers to primitive {prim_id} without emitter"),
        }
    }

    /// Returns the center of the scene bounding sphere.
    pub fn center(&self) -> Point3f {
        self.center
    }

    /// Returns the radius of the scene bounding sphere.
    pub fn radius(&self) -> Float {
        self.radius
    }
}
