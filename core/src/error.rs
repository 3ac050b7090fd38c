//! Errors

use thiserror::Error;

/// Errors reported by the renderer.
#[derive(Debug, Error)]
pub enum RenderError {
    /// The configuration cannot be rendered.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// An external collaborator failed during an iteration.
    #[error("iteration {iteration} failed: {message}")]
    IterationFailed {
        /// Index of the failed iteration.
        iteration: usize,

        /// Description of the failure.
        message: String,
    },

    /// Writing an image failed.
    #[error("image output failed: {0}")]
    Image(String),
}
