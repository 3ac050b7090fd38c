//! Hash grid over light vertices for merging

use super::path_cache::*;
use render_core::geometry::*;
use render_core::pbrt::*;
use itertools::iproduct;
use ordered_float::OrderedFloat;
use std::collections::BinaryHeap;

/// A light vertex found by a query. Ordered by distance, so a `BinaryHeap`
/// keeps the farthest one on top.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct Neighbor {
    /// Squared distance to the query point.
    pub distance_squared: OrderedFloat<Float>,

    /// Flat index of the vertex in the light path cache.
    pub vertex: usize,
}

/// Spatial index over the light vertices of one iteration. Built after the
/// light pass and read-only while camera paths query it. The cell width equals
/// the maximum merge radius of the iteration, so every query only visits the
/// 27 cells around the query point.
#[derive(Default)]
pub struct MergeIndex {
    /// Cell width.
    cell_size: Float,

    /// Maximum merge radius of the iteration, stored with every vertex.
    max_radius: Float,

    /// Start of every hash bucket in `entries`, followed by the total.
    bucket_starts: Vec<usize>,

    /// Vertex positions and flat indices, grouped by bucket.
    entries: Vec<(Point3f, usize)>,
}

impl MergeIndex {
    /// Builds the index over all light vertices that can be merged with. Path
    /// origins and vertices without weight are skipped.
    ///
    /// * `cache`      - The committed light path cache.
    /// * `max_radius` - Maximum merge radius of the iteration.
    pub fn build(cache: &PathCache, max_radius: Float) -> Self {
        let points = cache
            .vertices()
            .iter()
            .enumerate()
            .filter(|(_, v)| v.depth > 0 && !v.weight.is_black())
            .map(|(i, v)| (v.point.p, i));
        Self::from_points(points, max_radius)
    }

    /// Builds the index over arbitrary points.
    ///
    /// * `points`     - Positions with their vertex indices.
    /// * `max_radius` - Maximum query radius.
    pub fn from_points<I>(points: I, max_radius: Float) -> Self
    where
        I: Iterator<Item = (Point3f, usize)>,
    {
        let points: Vec<(Point3f, usize)> = points.filter(|(p, _)| p.is_finite()).collect();
        if points.is_empty() || !(max_radius > 0.0) {
            return Self {
                max_radius: max_radius.max(0.0),
                ..Default::default()
            };
        }

        let cell_size = max_radius;
        let hash_size = round_up_pow2(points.len());

        // Counting sort by bucket.
        let buckets: Vec<usize> = points
            .iter()
            .map(|(p, _)| hash(&to_cell(p, cell_size), hash_size))
            .collect();
        let mut bucket_starts = vec![0; hash_size + 1];
        for &b in buckets.iter() {
            bucket_starts[b + 1] += 1;
        }
        for i in 0..hash_size {
            bucket_starts[i + 1] += bucket_starts[i];
        }

        let mut fill = bucket_starts.clone();
        let mut entries = vec![(Point3f::ORIGIN, 0); points.len()];
        for (&b, &point) in buckets.iter().zip(points.iter()) {
            entries[fill[b]] = point;
            fill[b] += 1;
        }

        debug!(
            "Merge index with {} vertices in {hash_size} buckets, radius {max_radius}",
            entries.len()
        );

        Self {
            cell_size,
            max_radius,
            bucket_starts,
            entries,
        }
    }

    /// Returns the maximum merge radius of the iteration.
    pub fn max_radius(&self) -> Float {
        self.max_radius
    }

    /// Returns the number of indexed vertices.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no vertex was indexed.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Finds up to `k` nearest vertices strictly within `radius` of `p`. The
    /// radius is bounded by the maximum radius. The result heap is cleared
    /// first; its top is the farthest vertex found.
    ///
    /// * `p`      - Query point.
    /// * `radius` - Query radius.
    /// * `k`      - Maximum number of vertices.
    /// * `result` - Receives the vertices.
    pub fn k_nearest(&self, p: &Point3f, radius: Float, k: usize, result: &mut BinaryHeap<Neighbor>) {
        result.clear();
        if self.entries.is_empty() || k == 0 {
            return;
        }

        let radius = radius.min(self.max_radius);
        let radius_squared = radius * radius;
        let hash_size = self.bucket_starts.len() - 1;
        let center = to_cell(p, self.cell_size);

        // Neighboring cells can share a bucket.
        let mut visited = [usize::MAX; 27];
        for (slot, (dx, dy, dz)) in iproduct!(-1..=1, -1..=1, -1..=1).enumerate() {
            let cell = Point3i::new(center.x + dx, center.y + dy, center.z + dz);
            let bucket = hash(&cell, hash_size);
            if visited[..slot].contains(&bucket) {
                continue;
            }
            visited[slot] = bucket;

            for &(q, vertex) in &self.entries[self.bucket_starts[bucket]..self.bucket_starts[bucket + 1]] {
                let d2 = p.distance_squared(&q);
                if d2 >= radius_squared {
                    continue;
                }
                let candidate = Neighbor {
                    distance_squared: OrderedFloat(d2),
                    vertex,
                };
                if result.len() < k {
                    result.push(candidate);
                } else if let Some(mut farthest) = result.peek_mut() {
                    if candidate < *farthest {
                        *farthest = candidate;
                    }
                }
            }
        }
    }
}

/// Returns the grid cell containing a point.
///
/// * `p`         - The point.
/// * `cell_size` - Cell width.
fn to_cell(p: &Point3f, cell_size: Float) -> Point3i {
    Point3i::new(
        (p.x / cell_size).floor() as Int,
        (p.y / cell_size).floor() as Int,
        (p.z / cell_size).floor() as Int,
    )
}

/// Hashes the coordinates of a cell, returning a bucket index.
///
/// * `p`         - Cell coordinates.
/// * `hash_size` - Number of buckets.
#[inline(always)]
fn hash(p: &Point3i, hash_size: usize) -> usize {
    let x = p.x.wrapping_mul(73856093);
    let y = p.y.wrapping_mul(19349663);
    let z = p.z.wrapping_mul(83492791);

    (x ^ y ^ z) as u32 as usize % hash_size
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn brute_force(points: &[Point3f], p: &Point3f, radius: Float, k: usize) -> Vec<Float> {
        let mut d: Vec<Float> = points
            .iter()
            .map(|q| p.distance_squared(q))
            .filter(|&d2| d2 < radius * radius)
            .collect();
        d.sort_by(|a, b| a.total_cmp(b));
        d.truncate(k);
        d
    }

    #[test]
    fn empty_index_finds_nothing() {
        let index = MergeIndex::from_points(std::iter::empty(), 1.0);
        let mut result = BinaryHeap::new();
        index.k_nearest(&Point3f::ORIGIN, 1.0, 8, &mut result);
        assert!(result.is_empty());
        assert_eq!(index.max_radius(), 1.0);

        let index = MergeIndex::from_points([(Point3f::ORIGIN, 0)].into_iter(), 0.0);
        index.k_nearest(&Point3f::ORIGIN, 1.0, 8, &mut result);
        assert!(result.is_empty());
    }

    #[test]
    fn top_of_heap_is_farthest() {
        let points = [0.1, 0.2, 0.3, 0.4].map(|x| Point3f::new(x, 0.0, 0.0));
        let index = MergeIndex::from_points(points.iter().copied().zip(0..), 1.0);
        let mut result = BinaryHeap::new();
        index.k_nearest(&Point3f::ORIGIN, 1.0, 3, &mut result);
        assert_eq!(result.len(), 3);
        let farthest = result.peek().map(|n| n.vertex);
        assert_eq!(farthest, Some(2));
    }

    #[test]
    fn radius_is_bounded_by_max_radius() {
        let points = [Point3f::new(0.5, 0.0, 0.0)];
        let index = MergeIndex::from_points(points.iter().copied().zip(0..), 0.25);
        let mut result = BinaryHeap::new();
        index.k_nearest(&Point3f::ORIGIN, 10.0, 8, &mut result);
        assert!(result.is_empty());
    }

    proptest! {
        #[test]
        fn matches_brute_force(
            coords in prop::collection::vec((-2.0..2.0f32, -2.0..2.0f32, -2.0..2.0f32), 0..200),
            query in (-2.0..2.0f32, -2.0..2.0f32, -2.0..2.0f32),
            radius in 0.01..1.0f32,
            k in 1usize..12,
        ) {
            let points: Vec<Point3f> = coords.iter().map(|&(x, y, z)| Point3f::new(x, y, z)).collect();
            let index = MergeIndex::from_points(points.iter().copied().zip(0..), radius);
            let p = Point3f::new(query.0, query.1, query.2);

            let mut result = BinaryHeap::new();
            index.k_nearest(&p, radius, k, &mut result);
            let found: Vec<Float> = result.into_sorted_vec().iter().map(|n| n.distance_squared.0).collect();
            prop_assert_eq!(found, brute_force(&points, &p, radius, k));
        }
    }
}
