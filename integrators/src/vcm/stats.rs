//! Render statistics

use render_core::pbrt::*;
use std::sync::Mutex;

/// Counts gathered by one worker. Workers count privately and report once
/// at the end of a pass.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct PathCounters {
    /// Number of camera paths traced.
    pub camera_paths: u64,

    /// Edges of all camera paths.
    pub camera_edges: u64,

    /// Number of merge queries.
    pub merge_queries: u64,

    /// Photons returned by all merge queries.
    pub photons_found: u64,
}

impl PathCounters {
    /// Adds the counts of another worker.
    ///
    /// * `other` - Counts to add.
    pub fn accumulate(&mut self, other: &Self) {
        self.camera_paths += other.camera_paths;
        self.camera_edges += other.camera_edges;
        self.merge_queries += other.merge_queries;
        self.photons_found += other.photons_found;
    }
}

/// Collects the counters of all workers of a pass.
#[derive(Default)]
pub struct CounterAccumulator {
    total: Mutex<PathCounters>,
}

impl CounterAccumulator {
    /// Reports the counts of one worker.
    ///
    /// * `counters` - Counts of the worker.
    pub fn report(&self, counters: &PathCounters) {
        match self.total.lock() {
            Ok(mut total) => total.accumulate(counters),
            Err(poisoned) => poisoned.into_inner().accumulate(counters),
        }
    }

    /// Returns the sum of all reports.
    pub fn into_inner(self) -> PathCounters {
        match self.total.into_inner() {
            Ok(total) => total,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

/// Statistics of a render, updated after every iteration.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct RenderStats {
    /// Completed iterations.
    pub iterations: usize,

    /// Average number of edges per camera path in the last iteration.
    pub avg_camera_path_length: Float,

    /// Average number of edges per light path in the last iteration.
    pub avg_light_path_length: Float,

    /// Average number of photons per merge query in the last iteration.
    pub avg_photons_per_query: Float,

    /// Merge radius of the last iteration.
    pub merge_radius: Float,

    /// Time spent tracing paths.
    pub render_time_ms: u64,

    /// Time spent in frame buffer updates.
    pub frame_buffer_time_ms: u64,
}

impl RenderStats {
    /// Updates the per iteration averages.
    ///
    /// * `counters`           - Camera pass counts.
    /// * `light_paths`        - Number of light paths.
    /// * `light_path_edges`   - Edges of all light paths.
    pub fn update(&mut self, counters: &PathCounters, light_paths: usize, light_path_edges: usize) {
        self.iterations += 1;
        self.avg_camera_path_length = ratio(counters.camera_edges, counters.camera_paths);
        self.avg_light_path_length = ratio(light_path_edges as u64, light_paths as u64);
        self.avg_photons_per_query = ratio(counters.photons_found, counters.merge_queries);
    }
}

fn ratio(sum: u64, count: u64) -> Float {
    if count == 0 {
        0.0
    } else {
        sum as Float / count as Float
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
    fn reports_from_all_workers_add_up() {
        let accumulator = CounterAccumulator::default();
        thread::scope(|scope| {
            for _ in 0..4 {
                scope.spawn(|| {
                    accumulator.report(&PathCounters {
                        camera_paths: 10,
                        camera_edges: 25,
                        merge_queries: 5,
                        photons_found: 20,
                    })
                });
            }
        });

        let total = accumulator.into_inner();
        assert_eq!(total.camera_paths, 40);
        assert_eq!(total.photons_found, 80);

        let mut stats = RenderStats::default();
        stats.update(&total, 0, 0);
        assert_eq!(stats.iterations, 1);
        assert_eq!(stats.avg_camera_path_length, 2.5);
        assert_eq!(stats.avg_photons_per_query, 4.0);
        assert_eq!(stats.avg_light_path_length, 0.0);
    }
}
