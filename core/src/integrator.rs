//! Integrator

use crate::error::RenderError;
use crate::scene::Scene;

/// Integrator interface.
pub trait Integrator {
    /// Render the scene into its frame buffer.
    ///
    /// * `scene` - The scene.
    fn render(&mut self, scene: &Scene) -> Result<(), RenderError>;
}
