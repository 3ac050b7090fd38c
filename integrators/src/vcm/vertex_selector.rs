//! Uniform resampling of cached light vertices

use super::path_cache::*;
use render_core::pbrt::*;
use render_core::rng::*;

/// Picks light vertices uniformly among all vertices of the cache, path
/// origins included.
#[derive(Copy, Clone)]
pub struct VertexSelector<'a> {
    cache: &'a PathCache,
}

impl<'a> VertexSelector<'a> {
    /// Create a new selector over a committed cache.
    ///
    /// * `cache` - The light path cache.
    pub fn new(cache: &'a PathCache) -> Self {
        Self { cache }
    }

    /// Returns the flat index of a random vertex and the probability of
    /// having picked it, or `None` if the cache is empty.
    ///
    /// * `rng` - Random number generator.
    pub fn select(&self, rng: &mut RNG) -> Option<(usize, Float)> {
        match self.cache.num_vertices() {
            0 => None,
            n => Some((rng.uniform_index(n), 1.0 / n as Float)),
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn cache_with(lengths: &[usize]) -> PathCache {
        let mut cache = PathCache::new(lengths.len(), 4);
        let arenas = cache.begin(1);
        for (path, &len) in lengths.iter().enumerate() {
            arenas[0].begin_path(path);
            for depth in 0..len {
                arenas[0].push(PathVertex {
                    depth,
                    path_id: path,
                    ..Default::default()
                });
            }
            arenas[0].end_path();
        }
        cache.commit(lengths.len());
        cache
    }

    #[test]
    fn empty_cache_selects_nothing() {
        let cache = cache_with(&[0, 0]);
        let mut rng = RNG::new(0);
        assert!(VertexSelector::new(&cache).select(&mut rng).is_none());
    }

    #[test]
    fn every_vertex_is_reachable() {
        let cache = cache_with(&[3, 1, 4]);
        let selector = VertexSelector::new(&cache);
        let mut rng = RNG::new(42);
        let mut counts = [0usize; 8];
        for _ in 0..8000 {
            let (idx, prob) = selector.select(&mut rng).unwrap();
            assert_eq!(prob, 0.125);
            counts[idx] += 1;
        }
        assert!(counts.iter().all(|&c| c > 800 && c < 1200), "{counts:?}");
    }
}
