//! Light selection shared by emission and next event estimation

use render_core::geometry::*;
use render_core::interaction::*;
use render_core::light::*;
use render_core::pbrt::*;
use render_core::scene::*;

/// A light source picked by `select_light`.
pub enum LightChoice<'a> {
    /// The background.
    Background(&'a ArcBackground),

    /// An emissive primitive.
    Emitter {
        /// Index of the primitive carrying the emitter.
        prim_id: usize,

        /// The emitter.
        emitter: &'a ArcEmitter,
    },
}

/// Returns the probability of selecting the background instead of an
/// emissive surface. Every light source, background included, is equally
/// likely.
///
/// * `scene` - The scene.
pub fn background_probability(scene: &Scene) -> Float {
    match scene.background {
        Some(_) => 1.0 / (1.0 + scene.num_emitters() as Float),
        None => 0.0,
    }
}

/// Returns the probability of selecting one particular emitter, given that
/// the background was not selected.
///
/// * `scene` - The scene.
pub fn select_light_pmf(scene: &Scene) -> Float {
    match scene.num_emitters() {
        0 => 0.0,
        n => 1.0 / n as Float,
    }
}

/// Selects a light source with a single sample value. Returns the choice and
/// its discrete probability, or `None` if the scene has no lights.
///
/// * `scene` - The scene.
/// * `u`     - Sample value in [0, 1).
pub fn select_light(scene: &Scene, u: Float) -> Option<(LightChoice<'_>, Float)> {
    let bg_prob = background_probability(scene);
    if let Some(background) = scene.background.as_ref() {
        if u <= bg_prob {
            return Some((LightChoice::Background(background), bg_prob));
        }
    }

    let n = scene.num_emitters();
    if n == 0 {
        return None;
    }

    let u = (u - bg_prob) / (1.0 - bg_prob);
    let idx = clamp((u * n as Float) as isize, 0, n as isize - 1) as usize;
    let (prim_id, emitter) = scene.emitter(idx);
    Some((LightChoice::Emitter { prim_id, emitter }, (1.0 - bg_prob) / n as Float))
}

/// Returns the area density of a light path starting at `point` in
/// `direction` and hitting the next vertex.
///
/// * `scene`            - The scene.
/// * `emitter`          - The emitter `point` lies on.
/// * `point`            - Point on the emitter.
/// * `direction`        - Direction leaving the emitter.
/// * `reverse_jacobian` - Solid angle to area conversion at the next vertex.
pub fn emitter_pdf(
    scene: &Scene,
    emitter: &ArcEmitter,
    point: &SurfacePoint,
    direction: &Vector3f,
    reverse_jacobian: Float,
) -> Float {
    let select = select_light_pmf(scene) * (1.0 - background_probability(scene));
    emitter.pdf_ray(point, direction) * reverse_jacobian * select
}

/// Returns the density of a light path entering the scene from the
/// background and passing through `from`.
///
/// * `scene`     - The scene.
/// * `from`      - A point on the ray.
/// * `direction` - Ray direction, from the background into the scene.
pub fn background_pdf(scene: &Scene, from: &Point3f, direction: &Vector3f) -> Float {
    match scene.background.as_ref() {
        Some(background) => background.ray_pdf(from, direction, scene.radius()) * background_probability(scene),
        None => 0.0,
    }
}

/// Returns the density of next event estimation sampling `to` from `from`.
/// For the background it is a solid angle density at `from`, otherwise an
/// area density on the emitter. Both include all shadow rays per vertex.
///
/// * `scene`           - The scene.
/// * `from`            - The shading point.
/// * `to`              - The point on the light.
/// * `to_background`   - Whether `to` stands for the background.
/// * `num_shadow_rays` - Next event samples per vertex.
pub fn next_event_pdf(
    scene: &Scene,
    from: &Point3f,
    to: &SurfacePoint,
    to_background: bool,
    num_shadow_rays: usize,
) -> Float {
    let bg_prob = background_probability(scene);
    let pdf = if to_background {
        match scene.background.as_ref() {
            Some(background) => background.direction_pdf(&(to.p - *from)) * bg_prob,
            None => 0.0,
        }
    } else {
        match scene.query_emitter(to) {
            Some(emitter) => emitter.pdf_uniform_area(to) * select_light_pmf(scene) * (1.0 - bg_prob),
            None => 0.0,
        }
    };
    pdf * num_shadow_rays as Float
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vcm::test_scenes::*;
    use render_core::spectrum::*;
    use float_cmp::approx_eq;
    use proptest::prelude::*;

    #[test]
    fn background_is_one_of_the_lights() {
        let scene = floor_scene(3, 3, Some(Spectrum::ONE));
        assert!(approx_eq!(f32, background_probability(&scene), 0.5, ulps = 2));
        assert!(matches!(select_light(&scene, 0.25), Some((LightChoice::Background(_), p)) if p == 0.5));
        assert!(matches!(select_light(&scene, 0.75), Some((LightChoice::Emitter { .. }, p)) if p == 0.5));

        let scene = floor_scene(3, 3, None);
        assert_eq!(background_probability(&scene), 0.0);
        assert!(matches!(select_light(&scene, 0.0), Some((LightChoice::Emitter { .. }, p)) if p == 1.0));
    }

    #[test]
    fn next_event_pdf_counts_shadow_rays() {
        let scene = floor_scene(3, 3, None);
        let (prim_id, emitter) = scene.emitter(0);
        let mut on_light = emitter.sample_uniform_area(&Point2f::new(0.5, 0.5)).point;
        on_light.prim_id = prim_id;

        let one = next_event_pdf(&scene, &Point3f::ORIGIN, &on_light, false, 1);
        let three = next_event_pdf(&scene, &Point3f::ORIGIN, &on_light, false, 3);
        assert!(one > 0.0);
        assert!(approx_eq!(f32, three, 3.0 * one, ulps = 4));
        assert!(approx_eq!(f32, one, emitter.pdf_uniform_area(&on_light), ulps = 4));
    }

    proptest! {
        #[test]
        fn selection_probabilities_sum_to_one(u in 0.0..1.0f32, with_background in any::<bool>()) {
            let background = if with_background { Some(Spectrum::ONE) } else { None };
            let scene = floor_scene(3, 3, background);
            let (choice, prob) = select_light(&scene, u).unwrap();
            let expected = match choice {
                LightChoice::Background(_) => background_probability(&scene),
                LightChoice::Emitter { .. } => {
                    select_light_pmf(&scene) * (1.0 - background_probability(&scene))
                }
            };
            prop_assert!((prob - expected).abs() < 1e-6);
        }
    }
}
