//! Common geometry traits

use crate::pbrt::*;

/// Dot product.
pub trait Dot<T> {
    /// Output type.
    type Output;

    /// Returns the dot product.
    ///
    /// * `other` - The other operand.
    fn dot(&self, other: &T) -> Self::Output;
}

/// Cross product.
pub trait Cross<T> {
    /// Output type.
    type Output;

    /// Returns the cross product.
    ///
    /// * `other` - The other operand.
    fn cross(&self, other: &T) -> Self::Output;
}

/// Returns the absolute value of the dot product of two operands.
///
/// * `a` - First operand.
/// * `b` - Second operand.
#[inline(always)]
pub fn abs_dot<A, B>(a: &A, b: &B) -> Float
where
    A: Dot<B, Output = Float>,
{
    a.dot(b).abs()
}
