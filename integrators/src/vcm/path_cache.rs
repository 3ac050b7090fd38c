//! Light path vertex store

use render_core::geometry::*;
use render_core::interaction::*;
use render_core::parallel::*;
use render_core::pbrt::*;
use render_core::spectrum::*;
use crossbeam_channel::bounded;
use std::ops::Range;
use std::thread;

/// A scattering point on a light path.
#[derive(Copy, Clone, Debug, Default)]
pub struct PathVertex {
    /// The surface point, or the ray origin for paths that start on the
    /// background.
    pub point: SurfacePoint,

    /// Area density of sampling this vertex from its ancestor.
    pub pdf_from_ancestor: Float,

    /// Area density of sampling the ancestor from this vertex. Filled in once
    /// the next vertex has been sampled.
    pub pdf_to_ancestor: Float,

    /// Area density of next event estimation sampling the ancestor. Only set
    /// on depth 1 vertices.
    pub pdf_next_event: Float,

    /// Jacobian converting a solid angle density at this vertex into an area
    /// density at the ancestor.
    pub jacobian_to_ancestor: Float,

    /// Product of the emission weight and all scattering weights up to here.
    pub weight: Spectrum,

    /// Number of edges from the path origin.
    pub depth: usize,

    /// Index of the light path.
    pub path_id: usize,

    /// Whether the path started on the background.
    pub from_background: bool,
}

/// Per worker append buffer. Vertices of one path are written while it is
/// traced and stay in the arena until the cache is committed.
#[derive(Default)]
pub struct VertexArena {
    vertices: Vec<PathVertex>,

    /// (path index, first vertex, vertex count) per finished path.
    segments: Vec<(usize, usize, usize)>,

    /// First vertex of the path being traced.
    current_start: usize,

    /// Index of the path being traced.
    current_path: usize,
}

impl VertexArena {
    /// Create a new arena.
    ///
    /// * `capacity` - Number of vertices to reserve.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            vertices: Vec::with_capacity(capacity),
            ..Default::default()
        }
    }

    /// Drops all vertices, keeping the allocation.
    pub fn clear(&mut self) {
        self.vertices.clear();
        self.segments.clear();
        self.current_start = 0;
    }

    /// Starts a new path.
    ///
    /// * `path_id` - Index of the light path.
    pub fn begin_path(&mut self, path_id: usize) {
        self.current_path = path_id;
        self.current_start = self.vertices.len();
    }

    /// Appends a vertex to the current path and returns its index along the
    /// path.
    ///
    /// * `vertex` - The vertex.
    pub fn push(&mut self, vertex: PathVertex) -> usize {
        self.vertices.push(vertex);
        self.vertices.len() - 1 - self.current_start
    }

    /// Returns the vertices of the current path.
    pub fn current(&self) -> &[PathVertex] {
        &self.vertices[self.current_start..]
    }

    /// Returns the last vertex of the current path.
    pub fn last_mut(&mut self) -> Option<&mut PathVertex> {
        if self.vertices.len() > self.current_start {
            self.vertices.last_mut()
        } else {
            None
        }
    }

    /// Finishes the current path.
    pub fn end_path(&mut self) {
        let len = self.vertices.len() - self.current_start;
        self.segments.push((self.current_path, self.current_start, len));
    }
}

/// Stores all light path vertices of one iteration in path order. Vertices
/// of a path are contiguous, so the ancestor of a vertex with depth > 0 is the
/// preceding vertex.
#[derive(Default)]
pub struct PathCache {
    vertices: Vec<PathVertex>,

    /// Start of every path in `vertices`, followed by the total count.
    offsets: Vec<usize>,

    /// Per worker write buffers.
    arenas: Vec<VertexArena>,

    /// Vertex count the cache was sized for.
    capacity: usize,
}

impl PathCache {
    /// Create a new cache sized for `num_paths` paths of up to `max_depth`
    /// edges.
    ///
    /// * `num_paths` - Expected number of paths.
    /// * `max_depth` - Maximum path length.
    pub fn new(num_paths: usize, max_depth: usize) -> Self {
        let capacity = num_paths * (max_depth + 1);
        Self {
            vertices: Vec::with_capacity(capacity),
            offsets: Vec::with_capacity(num_paths + 1),
            arenas: vec![],
            capacity,
        }
    }

    /// Logically clears the cache for a new iteration and hands out one arena
    /// per worker.
    ///
    /// * `num_workers` - Number of workers tracing paths.
    pub fn begin(&mut self, num_workers: usize) -> &mut [VertexArena] {
        self.vertices.clear();
        self.offsets.clear();

        let per_worker = self.capacity / num_workers.max(1) + 1;
        if self.arenas.len() != num_workers {
            self.arenas = (0..num_workers).map(|_| VertexArena::with_capacity(per_worker)).collect();
        }
        for arena in self.arenas.iter_mut() {
            arena.clear();
        }
        &mut self.arenas
    }

    /// Moves all vertices written to the arenas into path order. Must be called
    /// after every path of the iteration has finished.
    ///
    /// * `num_paths` - Number of paths traced this iteration.
    pub fn commit(&mut self, num_paths: usize) {
        let mut lengths = vec![0; num_paths];
        for arena in self.arenas.iter() {
            for &(path, _, len) in arena.segments.iter() {
                lengths[path] = len;
            }
        }

        self.offsets.clear();
        self.offsets.reserve(num_paths + 1);
        let mut total = 0;
        for len in lengths.iter() {
            self.offsets.push(total);
            total += len;
        }
        self.offsets.push(total);

        if total > self.capacity {
            debug!("Path cache grows from {} to {} vertices", self.capacity, total);
            self.capacity = total;
        }

        self.vertices.clear();
        self.vertices.resize(total, PathVertex::default());
        for arena in self.arenas.iter() {
            for &(path, start, len) in arena.segments.iter() {
                let dst = self.offsets[path];
                self.vertices[dst..dst + len].copy_from_slice(&arena.vertices[start..start + len]);
            }
        }
    }

    /// Returns the number of paths.
    pub fn num_paths(&self) -> usize {
        self.offsets.len().saturating_sub(1)
    }

    /// Returns the total number of vertices.
    pub fn num_vertices(&self) -> usize {
        self.vertices.len()
    }

    /// Returns the number of vertices of a path.
    ///
    /// * `path` - Index of the path.
    pub fn length(&self, path: usize) -> usize {
        self.offsets[path + 1] - self.offsets[path]
    }

    /// Returns the vertices of a path.
    ///
    /// * `path` - Index of the path.
    pub fn path(&self, path: usize) -> &[PathVertex] {
        &self.vertices[self.path_range(path)]
    }

    /// Returns the flat indices of the vertices of a path.
    ///
    /// * `path` - Index of the path.
    pub fn path_range(&self, path: usize) -> Range<usize> {
        self.offsets[path]..self.offsets[path + 1]
    }

    /// Returns a vertex by its flat index.
    ///
    /// * `idx` - Flat vertex index.
    pub fn get(&self, idx: usize) -> &PathVertex {
        &self.vertices[idx]
    }

    /// Returns the flat index of the ancestor, or `None` for path origins.
    ///
    /// * `idx` - Flat vertex index.
    pub fn ancestor(&self, idx: usize) -> Option<usize> {
        if self.vertices[idx].depth > 0 {
            Some(idx - 1)
        } else {
            None
        }
    }

    /// Returns all vertices in flat order.
    pub fn vertices(&self) -> &[PathVertex] {
        &self.vertices
    }

    /// Calls `f` in parallel for every vertex that has an ancestor, together
    /// with its flat index, the ancestor and the unit direction towards it.
    /// Every worker owns a state value created by `init`.
    ///
    /// * `n_threads` - Number of worker threads.
    /// * `init`      - Creates the state of a worker.
    /// * `f`         - The callback.
    pub fn for_each_vertex<S, I, F>(&self, n_threads: usize, init: I, f: F)
    where
        I: Fn() -> S + Sync,
        F: Fn(&mut S, usize, &PathVertex, &PathVertex, &Vector3f) + Sync,
    {
        let num_paths = self.num_paths();
        let (init, f) = (&init, &f);

        thread::scope(|scope| {
            let (tx_worker, rx_worker) = bounded::<usize>(4096);

            let handles = (0..n_threads.max(1))
                .map(|_| {
                    let rx_worker = rx_worker.clone();
                    scope.spawn(move || {
                        let mut state = init();
                        for path in rx_worker.iter() {
                            for idx in self.path_range(path).skip(1) {
                                let (ancestor, vertex) = (&self.vertices[idx - 1], &self.vertices[idx]);
                                let dir_to_ancestor = (ancestor.point.p - vertex.point.p).normalize();
                                f(&mut state, idx, vertex, ancestor, &dir_to_ancestor);
                            }
                        }
                    })
                })
                .collect();
            drop(rx_worker);

            for path in 0..num_paths {
                if tx_worker.send(path).is_err() {
                    break;
                }
            }
            drop(tx_worker);
            join_workers(handles);
        });
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn vertex(path_id: usize, depth: usize) -> PathVertex {
        PathVertex {
            point: SurfacePoint::new(
                Point3f::new(path_id as Float, depth as Float, 0.0),
                Normal3f::new(0.0, 0.0, 1.0),
                Point2f::default(),
            ),
            pdf_from_ancestor: 1.0 + depth as Float,
            weight: Spectrum::ONE,
            depth,
            path_id,
            ..Default::default()
        }
    }

    /// Writes paths with the given lengths, distributing them round robin
    /// over the arenas.
    fn fill(cache: &mut PathCache, lengths: &[usize], workers: usize) {
        let arenas = cache.begin(workers);
        for (path, &len) in lengths.iter().enumerate() {
            let arena = &mut arenas[path % workers];
            arena.begin_path(path);
            for depth in 0..len {
                arena.push(vertex(path, depth));
            }
            arena.end_path();
        }
        cache.commit(lengths.len());
    }

    #[test]
    fn ancestors_are_previous_vertices() {
        let mut cache = PathCache::new(3, 4);
        fill(&mut cache, &[3, 0, 2], 2);

        assert_eq!(cache.num_paths(), 3);
        assert_eq!(cache.num_vertices(), 5);
        assert_eq!(cache.length(1), 0);
        assert_eq!(cache.ancestor(0), None);
        assert_eq!(cache.ancestor(2), Some(1));
        assert_eq!(cache.get(3).path_id, 2);
        assert_eq!(cache.ancestor(3), None);
    }

    #[test]
    fn for_each_vertex_skips_origins() {
        let mut cache = PathCache::new(4, 4);
        fill(&mut cache, &[3, 1, 4, 0], 3);

        let count = AtomicUsize::new(0);
        cache.for_each_vertex(2, || (), |_, idx, v, a, dir| {
            assert_eq!(cache.get(idx).depth, v.depth);
            assert_eq!(a.depth + 1, v.depth);
            assert_eq!(a.path_id, v.path_id);
            assert!(dir.y < 0.0);
            count.fetch_add(1, Ordering::Relaxed);
        });
        assert_eq!(count.load(Ordering::Relaxed), 2 + 0 + 3);
    }

    proptest! {
        #[test]
        fn round_trip_without_leakage(
            first in prop::collection::vec(0usize..6, 1..20),
            second in prop::collection::vec(0usize..6, 1..20),
            workers in 1usize..5,
        ) {
            let mut cache = PathCache::new(4, 2);
            fill(&mut cache, &first, workers);
            fill(&mut cache, &second, workers);

            prop_assert_eq!(cache.num_paths(), second.len());
            prop_assert_eq!(cache.num_vertices(), second.iter().sum::<usize>());
            for (path, &len) in second.iter().enumerate() {
                prop_assert_eq!(cache.length(path), len);
                for (depth, v) in cache.path(path).iter().enumerate() {
                    prop_assert_eq!(v.depth, depth);
                    prop_assert_eq!(v.path_id, path);
                    prop_assert_eq!(v.point.p.x, path as Float);
                }
            }
        }
    }
}
