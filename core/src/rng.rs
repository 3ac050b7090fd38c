//! Random Number Generator.

use crate::geometry::*;
use crate::pbrt::*;

/// 32-bit precision value for 1 - epsilon.
pub const ONE_MINUS_EPSILON: Float = hexf32!("0x1.fffffep-1"); // 0.99999994

const PCG32_DEFAULT_STATE: u64 = 0x853c49e6748fea9b;
const PCG32_DEFAULT_STREAM: u64 = 0xda3e39cb94b95bdb;
const PCG32_MULT: u64 = 0x5851f42d4c957f2d;

/// Implements the PCG32 pseudo-random number generator.
#[derive(Clone, Debug)]
pub struct RNG {
    state: u64,
    inc: u64,
}

impl Default for RNG {
    /// Return a new instance of `RNG` with default state and stream.
    fn default() -> Self {
        Self {
            state: PCG32_DEFAULT_STATE,
            inc: PCG32_DEFAULT_STREAM,
        }
    }
}

impl RNG {
    /// Create a new `RNG` by seeding it with the given starting sequence.
    ///
    /// * `sequence_index` - The starting sequence to seed with.
    pub fn new(sequence_index: u64) -> Self {
        let mut ret = Self { state: 0, inc: 0 };
        ret.set_sequence(sequence_index);
        ret
    }

    /// Create a new `RNG` whose sequence is derived from a base seed, a
    /// sample index and an iteration. Each distinct triple selects an
    /// independent, reproducible stream.
    ///
    /// * `base_seed` - Base seed distinguishing camera and light paths.
    /// * `index`     - Pixel or path index.
    /// * `iteration` - Iteration number.
    pub fn with_seeds(base_seed: u32, index: u32, iteration: u32) -> Self {
        let h = hash_u64(hash_u64(hash_u64(base_seed as u64) ^ index as u64) ^ iteration as u64);
        Self::new(h)
    }

    /// Initialize the random number generator sequence.
    ///
    /// * `init_seq` - The starting sequence to seed with.
    #[inline(always)]
    fn set_sequence(&mut self, init_seq: u64) {
        self.state = 0;
        self.inc = init_seq.wrapping_shl(1) | 1;
        let _ = self.uniform_u32();
        self.state = self.state.wrapping_add(PCG32_DEFAULT_STATE);
        let _ = self.uniform_u32();
    }

    /// Returns a uniformly distributed u32 value.
    #[inline(always)]
    pub fn uniform_u32(&mut self) -> u32 {
        let old_state = self.state;
        self.state = old_state.wrapping_mul(PCG32_MULT).wrapping_add(self.inc);

        let xor_shifted = (((old_state >> 18) ^ old_state) >> 27) as u32;
        let rot = (old_state >> 59) as u32;
        xor_shifted.rotate_right(rot)
    }

    /// Returns a uniformly distributed value over the half open interval [0.0, 1.0).
    pub fn uniform_float(&mut self) -> Float {
        (self.uniform_u32() as Float * hexf32!("0x1.0p-32")).min(ONE_MINUS_EPSILON)
    }

    /// Returns a point uniformly distributed over [0.0, 1.0)^2.
    pub fn uniform_float2(&mut self) -> Point2f {
        let x = self.uniform_float();
        let y = self.uniform_float();
        Point2f::new(x, y)
    }

    /// Returns a uniformly distributed index in [0, n). Returns 0 when `n` is 0.
    ///
    /// * `n` - Number of choices.
    pub fn uniform_index(&mut self, n: usize) -> usize {
        if n <= 1 {
            return 0;
        }
        ((self.uniform_float() * n as Float) as usize).min(n - 1)
    }
}

/// Mixes the bits of a 64-bit value (splitmix64 finalizer).
///
/// * `v` - The value.
#[inline(always)]
fn hash_u64(v: u64) -> u64 {
    let mut z = v.wrapping_add(0x9e3779b97f4a7c15);
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58476d1ce4e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d049bb133111eb);
    z ^ (z >> 31)
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn same_seeds_same_stream() {
        let mut a = RNG::with_seeds(0xC030114, 17, 3);
        let mut b = RNG::with_seeds(0xC030114, 17, 3);
        for _ in 0..32 {
            assert_eq!(a.uniform_u32(), b.uniform_u32());
        }
    }

    #[test]
    fn different_iterations_differ() {
        let mut a = RNG::with_seeds(0xC030114, 17, 3);
        let mut b = RNG::with_seeds(0xC030114, 17, 4);
        let xs: Vec<u32> = (0..8).map(|_| a.uniform_u32()).collect();
        let ys: Vec<u32> = (0..8).map(|_| b.uniform_u32()).collect();
        assert_ne!(xs, ys);
    }

    proptest! {
        #[test]
        fn uniform_float_in_unit_interval(seed in 0u64..1_000_000) {
            let mut rng = RNG::new(seed);
            for _ in 0..16 {
                let u = rng.uniform_float();
                prop_assert!((0.0..1.0).contains(&u));
            }
        }

        #[test]
        fn uniform_index_in_range(seed in 0u64..1_000_000, n in 1usize..1000) {
            let mut rng = RNG::new(seed);
            prop_assert!(rng.uniform_index(n) < n);
        }
    }
}
