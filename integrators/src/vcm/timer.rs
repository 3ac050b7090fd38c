//! Render timing and time budget

use std::time::{Duration, Instant};

/// Accumulates render and frame buffer time over all iterations.
#[derive(Default)]
pub struct RenderTimer {
    render: Duration,
    frame_buffer: Duration,
    iterations: u32,
}

impl RenderTimer {
    /// Runs `f` and counts its duration as render time.
    pub fn time_render<T, F: FnOnce() -> T>(&mut self, f: F) -> T {
        let start = Instant::now();
        let result = f();
        self.render += start.elapsed();
        result
    }

    /// Runs `f` and counts its duration as frame buffer time.
    pub fn time_frame_buffer<T, F: FnOnce() -> T>(&mut self, f: F) -> T {
        let start = Instant::now();
        let result = f();
        self.frame_buffer += start.elapsed();
        result
    }

    /// Marks the end of an iteration.
    pub fn end_iteration(&mut self) {
        self.iterations += 1;
    }

    /// Returns the render time in milliseconds.
    pub fn render_ms(&self) -> u64 {
        self.render.as_millis() as u64
    }

    /// Returns the frame buffer time in milliseconds.
    pub fn frame_buffer_ms(&self) -> u64 {
        self.frame_buffer.as_millis() as u64
    }

    /// Returns the total time so far.
    pub fn total(&self) -> Duration {
        self.render + self.frame_buffer
    }

    /// Returns `true` if another iteration would take the total time to or
    /// past `budget_ms`, assuming it costs as much as the average one so far.
    ///
    /// * `budget_ms` - Time budget in milliseconds.
    pub fn next_iteration_exceeds(&self, budget_ms: u64) -> bool {
        if self.iterations == 0 {
            return false;
        }
        let per_iteration = self.total() / self.iterations;
        self.total() + per_iteration >= Duration::from_millis(budget_ms)
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn first_iteration_always_runs() {
        let timer = RenderTimer::default();
        assert!(!timer.next_iteration_exceeds(0));
    }

    #[test]
    fn projects_the_next_iteration() {
        let mut timer = RenderTimer::default();
        timer.time_render(|| thread::sleep(Duration::from_millis(20)));
        timer.time_frame_buffer(|| ());
        timer.end_iteration();

        assert!(timer.render_ms() >= 20);
        assert!(timer.next_iteration_exceeds(0));
        assert!(timer.next_iteration_exceeds(30));
        assert!(!timer.next_iteration_exceeds(60_000));
    }
}
