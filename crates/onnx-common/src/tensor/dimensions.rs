//! Tensor shape descriptor
//!
//! The runtime boundary speaks two integer widths: pointer-sized extents for
//! buffer arithmetic and 32-bit extents for APIs that take `int` shapes.
//! [`Dimensions`] keeps both in lockstep so neither side has to convert on
//! every call.

use std::fmt;
use std::ops::Mul;

use super::TensorError;

/// Product of all extents, accumulated left to right.
///
/// The accumulator is seeded with the first extent rather than the
/// multiplicative identity, so an empty slice yields `T::default()` (zero for
/// every integer type), not one.
///
/// The multiplication is unchecked. Shapes from untrusted sources go through
/// [`Dimensions::checked_element_count`] instead.
pub fn element_count<T>(dims: &[T]) -> T
where
    T: Copy + Default + Mul<Output = T>,
{
    match dims.split_first() {
        Some((&first, rest)) => rest.iter().fold(first, |acc, &extent| acc * extent),
        None => T::default(),
    }
}

/// Immutable tensor shape with synchronized `usize` and `i32` views.
///
/// Narrowing to `i32` truncates extents above `i32::MAX` on 64-bit targets.
/// A negative `i32` extent widens to `usize::MAX`, so any allocation or fit
/// check on such a shape fails; [`Dimensions::try_from_i32`] rejects it up
/// front.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Dimensions {
    native: Box<[usize]>,
    narrow: Box<[i32]>,
}

impl Dimensions {
    /// Build from pointer-sized extents
    pub fn from_native(dims: impl Into<Box<[usize]>>) -> Self {
        let native = dims.into();
        let narrow = native.iter().map(|&extent| extent as i32).collect();
        Self { native, narrow }
    }

    /// Build from 32-bit extents
    pub fn from_i32(dims: impl Into<Box<[i32]>>) -> Self {
        let narrow = dims.into();
        let native = narrow
            .iter()
            .map(|&extent| usize::try_from(extent).unwrap_or(usize::MAX))
            .collect();
        Self { native, narrow }
    }

    /// Build from 32-bit extents, rejecting negative ones
    pub fn try_from_i32(dims: impl Into<Box<[i32]>>) -> Result<Self, TensorError> {
        let narrow = dims.into();
        if let Some((axis, &extent)) = narrow.iter().enumerate().find(|&(_, &e)| e < 0) {
            return Err(TensorError::NegativeExtent { axis, extent });
        }
        Ok(Self::from_i32(narrow))
    }

    /// Pointer-sized extents
    pub fn as_native(&self) -> &[usize] {
        &self.native
    }

    /// 32-bit extents
    pub fn as_i32(&self) -> &[i32] {
        &self.narrow
    }

    /// 64-bit signed extents, the shape type ONNX Runtime consumes.
    ///
    /// Fails if an extent exceeds `i64::MAX`.
    pub fn to_i64(&self) -> Result<Vec<i64>, TensorError> {
        self.native
            .iter()
            .map(|&extent| i64::try_from(extent))
            .collect::<Result<_, _>>()
            .map_err(|_| TensorError::ShapeOverflow { dims: self.clone() })
    }

    /// Number of axes
    pub fn rank(&self) -> usize {
        self.native.len()
    }

    /// Extent of the last axis, if any
    pub fn last(&self) -> Option<usize> {
        self.native.last().copied()
    }

    /// Copy of this shape with the last extent replaced.
    ///
    /// Returns the shape unchanged when it has no axes.
    pub fn with_last(&self, extent: usize) -> Self {
        let mut native = self.native.to_vec();
        if let Some(last) = native.last_mut() {
            *last = extent;
        }
        Self::from_native(native)
    }

    /// Total number of elements; zero for a shape with no axes.
    ///
    /// Overflows like [`element_count`]. Everything that sizes or slices a
    /// buffer uses [`checked_element_count`](Self::checked_element_count).
    pub fn total_element_count(&self) -> usize {
        element_count(&self.native)
    }

    /// Total number of elements, or `None` if the product overflows `usize`.
    ///
    /// A zero extent anywhere makes the count zero regardless of the others.
    pub fn checked_element_count(&self) -> Option<usize> {
        if self.native.contains(&0) {
            return Some(0);
        }
        match self.native.split_first() {
            Some((&first, rest)) => rest
                .iter()
                .try_fold(first, |acc, &extent| acc.checked_mul(extent)),
            None => Some(0),
        }
    }

    /// Element count for sizing a buffer.
    ///
    /// Stricter than [`checked_element_count`](Self::checked_element_count):
    /// the product of the non-zero extents must also fit `isize`, the bound
    /// ndarray places on any view.
    pub(crate) fn element_count_or_overflow(&self) -> Result<usize, TensorError> {
        let spanned = self
            .native
            .iter()
            .filter(|&&extent| extent != 0)
            .try_fold(1usize, |acc, &extent| acc.checked_mul(extent));
        match (spanned, self.checked_element_count()) {
            (Some(spanned), Some(count)) if spanned <= isize::MAX as usize => Ok(count),
            _ => Err(TensorError::ShapeOverflow { dims: self.clone() }),
        }
    }
}

impl fmt::Debug for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.native.iter()).finish()
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl From<Vec<usize>> for Dimensions {
    fn from(dims: Vec<usize>) -> Self {
        Self::from_native(dims)
    }
}

impl From<&[usize]> for Dimensions {
    fn from(dims: &[usize]) -> Self {
        Self::from_native(dims)
    }
}

impl<const N: usize> From<[usize; N]> for Dimensions {
    fn from(dims: [usize; N]) -> Self {
        Self::from_native(dims.to_vec())
    }
}

impl From<Vec<i32>> for Dimensions {
    fn from(dims: Vec<i32>) -> Self {
        Self::from_i32(dims)
    }
}

impl From<&[i32]> for Dimensions {
    fn from(dims: &[i32]) -> Self {
        Self::from_i32(dims)
    }
}

impl<const N: usize> From<[i32; N]> for Dimensions {
    fn from(dims: [i32; N]) -> Self {
        Self::from_i32(dims.to_vec())
    }
}

impl From<&Dimensions> for Dimensions {
    fn from(dims: &Dimensions) -> Self {
        dims.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_element_count() {
        assert_eq!(Dimensions::from([4usize, 1, 1, 4]).total_element_count(), 16);
        assert_eq!(Dimensions::from([2i32, 3]).total_element_count(), 6);
        assert_eq!(Dimensions::from([7usize]).total_element_count(), 7);
        assert_eq!(Dimensions::from([3usize, 0, 2]).total_element_count(), 0);
    }

    #[test]
    fn test_empty_shape_counts_zero() {
        let dims = Dimensions::from(Vec::<usize>::new());
        assert_eq!(dims.rank(), 0);
        assert_eq!(dims.total_element_count(), 0);
        assert_eq!(element_count::<i32>(&[]), 0);
        assert_eq!(element_count::<i64>(&[]), 0);
    }

    #[test]
    fn test_views_stay_in_sync() {
        let from_native = Dimensions::from(vec![2usize, 3, 5]);
        assert_eq!(from_native.as_i32(), &[2, 3, 5]);
        assert_eq!(from_native.to_i64().unwrap(), vec![2, 3, 5]);

        let from_narrow = Dimensions::from(vec![2i32, 3, 5]);
        assert_eq!(from_narrow.as_native(), &[2, 3, 5]);
        assert_eq!(from_narrow, from_native);
    }

    #[test]
    fn test_with_last() {
        let dims = Dimensions::from([4usize, 10]);
        let replaced = dims.with_last(3);
        assert_eq!(replaced.as_native(), &[4, 3]);
        assert_eq!(replaced.as_i32(), &[4, 3]);
        assert_eq!(dims.as_native(), &[4, 10]);

        let empty = Dimensions::from(Vec::<usize>::new());
        assert_eq!(empty.with_last(3).rank(), 0);
    }

    #[test]
    fn test_checked_element_count() {
        assert_eq!(Dimensions::from([3usize, 4]).checked_element_count(), Some(12));
        assert_eq!(Dimensions::from(Vec::<usize>::new()).checked_element_count(), Some(0));
        assert_eq!(Dimensions::from([usize::MAX, 2]).checked_element_count(), None);
        assert_eq!(Dimensions::from([1usize << 63, 2]).checked_element_count(), None);
        assert_eq!(Dimensions::from([usize::MAX, 2, 0]).checked_element_count(), Some(0));
        assert_eq!(Dimensions::from([usize::MAX]).checked_element_count(), Some(usize::MAX));

        let err = Dimensions::from([usize::MAX, 2]).element_count_or_overflow().unwrap_err();
        assert!(matches!(err, TensorError::ShapeOverflow { .. }));
        assert!(Dimensions::from([usize::MAX, 0]).element_count_or_overflow().is_err());
        assert_eq!(Dimensions::from([5usize, 0]).element_count_or_overflow().unwrap(), 0);
    }

    #[test]
    fn test_to_i64_rejects_wide_extents() {
        let dims = Dimensions::from([1usize << 63, 1]);
        assert!(matches!(dims.to_i64(), Err(TensorError::ShapeOverflow { .. })));
        assert_eq!(
            Dimensions::from([i64::MAX as usize]).to_i64().unwrap(),
            vec![i64::MAX]
        );
    }

    #[test]
    fn test_negative_extents() {
        let err = Dimensions::try_from_i32([2, -1, 3]).unwrap_err();
        assert!(matches!(err, TensorError::NegativeExtent { axis: 1, extent: -1 }));
        assert_eq!(Dimensions::try_from_i32([2, 3]).unwrap().as_native(), &[2, 3]);

        let widened = Dimensions::from([-4i32]);
        assert_eq!(widened.as_native(), &[usize::MAX]);
        assert_eq!(widened.as_i32(), &[-4]);
    }

    #[test]
    fn test_display() {
        assert_eq!(Dimensions::from([2usize, 3]).to_string(), "[2, 3]");
    }
}
