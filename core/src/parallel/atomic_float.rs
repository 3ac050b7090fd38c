//! AtomicFloat

use crate::pbrt::{bits_to_float, float_to_bits, Float};
use std::sync::atomic::{AtomicU32, Ordering};

/// Floating point value supporting lock-free accumulation, stored as the bit
/// pattern in an `AtomicU32`.
#[derive(Debug, Default)]
pub struct AtomicFloat {
    bits: AtomicU32,
}

impl AtomicFloat {
    /// Create a new `AtomicFloat`.
    ///
    /// * `v` - The value.
    pub fn new(v: Float) -> Self {
        Self {
            bits: AtomicU32::new(float_to_bits(v)),
        }
    }

    /// Atomically adds a value.
    ///
    /// * `v` - The value to add.
    pub fn add(&self, v: Float) {
        let mut old_bits = self.bits.load(Ordering::Relaxed);
        loop {
            let new_bits = float_to_bits(bits_to_float(old_bits) + v);
            match self
                .bits
                .compare_exchange_weak(old_bits, new_bits, Ordering::AcqRel, Ordering::Relaxed)
            {
                Ok(_) => return,
                Err(current) => old_bits = current,
            }
        }
    }

    /// Loads the value.
    pub fn get(&self) -> Float {
        bits_to_float(self.bits.load(Ordering::Acquire))
    }

    /// Stores a value.
    ///
    /// * `v` - The value.
    pub fn set(&self, v: Float) {
        self.bits.store(float_to_bits(v), Ordering::Release);
    }
}

impl Clone for AtomicFloat {
    fn clone(&self) -> Self {
        Self::new(self.get())
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
    fn concurrent_adds_are_not_lost() {
        let v = AtomicFloat::new(0.0);
        thread::scope(|scope| {
            for _ in 0..4 {
                scope.spawn(|| {
                    for _ in 0..1000 {
                        v.add(1.0);
                    }
                });
            }
        });
        assert_eq!(v.get(), 4000.0);
    }

    #[test]
    fn set_and_clone() {
        let v = AtomicFloat::default();
        assert_eq!(v.get(), 0.0);
        v.set(2.5);
        assert_eq!(v.clone().get(), 2.5);
    }
}
