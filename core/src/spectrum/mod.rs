//! Spectrum

mod rgb_spectrum;

// Re-export
pub use rgb_spectrum::*;

/// Use `RGBSpectrum` for rendering.
pub type Spectrum = RGBSpectrum;
