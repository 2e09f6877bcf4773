//! Allocation helpers for tensor backing storage
//!
//! Thin entry points over [`RawBuffer`] for callers that only want storage,
//! not a shaped [`Tensor`](super::Tensor).

use bytemuck::Pod;

use super::{RawBuffer, TensorError};

/// Allocate a pinned buffer without initializing it.
///
/// # Safety
///
/// Every element must be written before it is read.
pub unsafe fn allocate_pinned_uninit<T: Pod>(len: usize) -> Result<RawBuffer<T>, TensorError> {
    RawBuffer::uninit(len, true)
}

/// Allocate a pinned buffer with every element set to `value`
pub fn allocate_pinned_filled<T: Pod>(len: usize, value: T) -> Result<RawBuffer<T>, TensorError> {
    RawBuffer::filled(len, value, true)
}

/// Allocate a buffer with every element set to `value`
pub fn allocate_filled<T: Pod>(
    len: usize,
    value: T,
    pinned: bool,
) -> Result<RawBuffer<T>, TensorError> {
    RawBuffer::filled(len, value, pinned)
}
