//! Film

use crate::error::*;
use crate::geometry::*;
use crate::image_io::*;
use crate::parallel::AtomicFloat;
use crate::pbrt::*;
use crate::spectrum::*;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Receives the per-iteration estimates of a renderer.
pub trait OutputSink {
    /// Returns the resolution (width, height) in pixels.
    fn resolution(&self) -> (usize, usize);

    /// Adds a contribution to the pixel containing a film position. Positions
    /// outside the film are ignored.
    ///
    /// * `film_pos` - Film position in pixel units.
    /// * `value`    - The contribution.
    fn splat(&self, film_pos: &Point2f, value: &Spectrum);

    /// Called before the first splat of an iteration.
    fn start_iteration(&self);

    /// Called after the last splat of an iteration.
    fn end_iteration(&self);
}

/// Accumulates splats from all iterations. The stored image is the average
/// over completed iterations.
pub struct FrameBuffer {
    width: usize,
    height: usize,

    /// RGB sums, 3 per pixel in row-major order.
    pixels: Vec<AtomicFloat>,

    /// Number of started iterations.
    iterations: AtomicUsize,

    /// If set, the running image is written here after every iteration.
    intermediate_path: Option<String>,

    /// Set once a non-finite splat was reported.
    warned_non_finite: AtomicBool,
}

impl FrameBuffer {
    /// Create a new black frame buffer.
    ///
    /// * `width`  - Width in pixels.
    /// * `height` - Height in pixels.
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            pixels: (0..3 * width * height).map(|_| AtomicFloat::default()).collect(),
            iterations: AtomicUsize::new(0),
            intermediate_path: None,
            warned_non_finite: AtomicBool::new(false),
        }
    }

    /// Enables writing the running image after every iteration.
    ///
    /// * `path` - Output file path.
    pub fn with_intermediate_output(mut self, path: &str) -> Self {
        self.intermediate_path = Some(path.to_string());
        self
    }

    /// Returns the number of iterations started so far.
    pub fn num_iterations(&self) -> usize {
        self.iterations.load(Ordering::Acquire)
    }

    /// Returns the averaged value of a pixel.
    ///
    /// * `x` - Column.
    /// * `y` - Row.
    pub fn pixel(&self, x: usize, y: usize) -> Spectrum {
        let offset = 3 * (y * self.width + x);
        let scale = self.scale();
        Spectrum::rgb(
            self.pixels[offset].get() * scale,
            self.pixels[offset + 1].get() * scale,
            self.pixels[offset + 2].get() * scale,
        )
    }

    /// Returns the averaged image.
    pub fn image(&self) -> Vec<Spectrum> {
        (0..self.height)
            .flat_map(|y| (0..self.width).map(move |x| (x, y)))
            .map(|(x, y)| self.pixel(x, y))
            .collect()
    }

    /// Returns the mean of all pixels of the averaged image.
    pub fn average(&self) -> Spectrum {
        let n = (self.width * self.height).max(1) as Float;
        self.image().into_iter().fold(Spectrum::ZERO, |acc, p| acc + p) / n
    }

    /// Writes the averaged image to a file; the format follows the extension.
    ///
    /// * `path` - Output file path.
    pub fn write(&self, path: &str) -> Result<(), RenderError> {
        write_image(path, &self.image(), self.width, self.height).map_err(RenderError::Image)
    }

    fn scale(&self) -> Float {
        match self.num_iterations() {
            0 => 0.0,
            n => 1.0 / n as Float,
        }
    }
}

impl OutputSink for FrameBuffer {
    fn resolution(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    fn splat(&self, film_pos: &Point2f, value: &Spectrum) {
        if !value.is_finite() {
            if !self.warned_non_finite.swap(true, Ordering::Relaxed) {
                warn!("Ignoring non-finite splat {value} at ({}, {})", film_pos.x, film_pos.y);
            }
            return;
        }
        if film_pos.x < 0.0 || film_pos.y < 0.0 {
            return;
        }
        let (x, y) = (film_pos.x as usize, film_pos.y as usize);
        if x >= self.width || y >= self.height {
            return;
        }
        let offset = 3 * (y * self.width + x);
        for c in 0..3 {
            self.pixels[offset + c].add(value[c]);
        }
    }

    fn start_iteration(&self) {
        self.iterations.fetch_add(1, Ordering::AcqRel);
    }

    fn end_iteration(&self) {
        if let Some(path) = self.intermediate_path.as_ref() {
            if let Err(err) = self.write(path) {
                warn!("Writing intermediate image failed: {err}");
            }
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_is_iteration_average() {
        let fb = FrameBuffer::new(2, 2);
        fb.start_iteration();
        fb.splat(&Point2f::new(1.5, 0.2), &Spectrum::new(4.0));
        fb.end_iteration();
        fb.start_iteration();
        fb.splat(&Point2f::new(1.1, 0.9), &Spectrum::new(2.0));
        fb.end_iteration();

        assert_eq!(fb.num_iterations(), 2);
        assert_eq!(fb.pixel(1, 0), Spectrum::new(3.0));
        assert_eq!(fb.pixel(0, 0), Spectrum::ZERO);
    }

    #[test]
    fn rejects_out_of_bounds_and_non_finite() {
        let fb = FrameBuffer::new(2, 1);
        fb.start_iteration();
        fb.splat(&Point2f::new(-0.5, 0.0), &Spectrum::ONE);
        fb.splat(&Point2f::new(2.0, 0.0), &Spectrum::ONE);
        fb.splat(&Point2f::new(0.5, 0.5), &Spectrum::rgb(Float::NAN, 0.0, 0.0));
        fb.end_iteration();
        assert!(fb.image().iter().all(|p| p.is_black()));
    }
}
