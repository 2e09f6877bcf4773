//! Tensor bridge: one owned buffer, two synchronized views
//!
//! This module provides the storage and shape types every other module
//! builds on:
//!
//! - [`Dimensions`] keeps a shape in the integer widths the runtime boundary
//!   needs.
//! - [`RawBuffer`] is fixed, optionally pinned storage.
//! - [`Tensor`] owns one buffer and projects it as an ndarray view and as a
//!   named [`NativeTensor`] without copying.

pub mod allocator;
pub mod buffer;
pub mod dimensions;
pub mod element;
pub mod error;
pub mod managed;
pub mod native;

pub use allocator::{allocate_filled, allocate_pinned_filled, allocate_pinned_uninit};
pub use buffer::{RawBuffer, PINNED_ALIGNMENT};
pub use dimensions::{element_count, Dimensions};
pub use element::{DataType, Element};
pub use error::TensorError;
pub use managed::Tensor;
pub use native::{NativeTensor, NativeTensorMut, TensorData, TensorDataMut};
