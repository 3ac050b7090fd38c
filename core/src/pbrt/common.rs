//! Common

use num_traits::Num;

/// Use 32-bit precision for floating point numbers.
pub type Float = f32;

/// Default signed integer to 32-bit.
pub type Int = i32;

/// Infinty (∞)
pub const INFINITY: Float = Float::INFINITY;

/// PI (π)
pub const PI: Float = std::f32::consts::PI;

/// 1/PI (1/π)
pub const INV_PI: Float = 1.0 / PI;

/// 2*PI (2π)
pub const TWO_PI: Float = PI * 2.0;

/// PI/4 (π/4)
pub const PI_OVER_FOUR: Float = PI * 0.25;

/// PI/2 (π/2)
pub const PI_OVER_TWO: Float = PI * 0.5;

/// 1/4*PI (1/4π)
pub const INV_FOUR_PI: Float = 1.0 / (4.0 * PI);

/// Shadow Epsilon
pub const SHADOW_EPSILON: Float = 0.0001;

/// Offset applied along the geometric normal when spawning rays off a surface.
pub const RAY_OFFSET_EPSILON: Float = 1e-4;

/// Clamps a value to the closed interval [low, high].
///
/// * `val`  - The value.
/// * `low`  - Lower bound.
/// * `high` - Upper bound.
#[inline(always)]
pub fn clamp<T>(val: T, low: T, high: T) -> T
where
    T: Num + PartialOrd + Copy,
{
    if val < low {
        low
    } else if val > high {
        high
    } else {
        val
    }
}

/// Linearly interpolate between two values.
///
/// * `t`  - Parameter in [0, 1].
/// * `p0` - Value at t = 0.
/// * `p1` - Value at t = 1.
#[inline(always)]
pub fn lerp(t: Float, p0: Float, p1: Float) -> Float {
    (1.0 - t) * p0 + t * p1
}

/// Convert degrees to radians.
///
/// * `deg` - Angle in degrees.
#[inline(always)]
pub fn radians(deg: Float) -> Float {
    (PI / 180.0) * deg
}

/// Returns gamma corrected values for use in 8-bit images.
///
/// * `value` - Value to correct.
#[inline(always)]
pub fn gamma_correct(value: Float) -> Float {
    if value <= 0.0031308 {
        12.92 * value
    } else {
        1.055 * value.powf(1.0 / 2.4) - 0.055
    }
}

/// Interprets a floating point value's bits as an unsigned integer.
///
/// * `f` - The floating point value.
#[inline(always)]
pub fn float_to_bits(f: f32) -> u32 {
    f.to_bits()
}

/// Interprets unsigned integer bits as a floating point value.
///
/// * `i` - The bits.
#[inline(always)]
pub fn bits_to_float(i: u32) -> f32 {
    f32::from_bits(i)
}

/// Returns the smallest power of two greater than or equal to `v`.
///
/// * `v` - The value.
#[inline]
pub fn round_up_pow2(v: usize) -> usize {
    v.max(1).next_power_of_two()
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
