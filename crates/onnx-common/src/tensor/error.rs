//! Error types for tensor allocation and shape handling

use thiserror::Error;

use super::{DataType, Dimensions};

/// Tensor and buffer errors
#[derive(Debug, Error)]
pub enum TensorError {
    /// Backing storage could not be allocated
    #[error("Failed to allocate tensor buffer of {bytes} bytes")]
    AllocationFailed {
        /// Requested size in bytes
        bytes: usize,
    },

    /// Shape does not fit the backing buffer
    #[error("Tensor size mismatch: shape {dims} needs {expected} elements, buffer holds {actual}")]
    SizeMismatch {
        /// Requested shape
        dims: Dimensions,
        /// Elements the shape describes
        expected: usize,
        /// Elements available in the buffer
        actual: usize,
    },

    /// Shape whose element count or extents do not fit the index types
    #[error("Tensor shape {dims} overflows the addressable element count")]
    ShapeOverflow {
        /// Offending shape
        dims: Dimensions,
    },

    /// Negative extent in a 32-bit shape
    #[error("Tensor extent {extent} at axis {axis} is negative")]
    NegativeExtent {
        /// Axis holding the extent
        axis: usize,
        /// Extent as given
        extent: i32,
    },

    /// Element type of a foreign tensor does not match the requested one
    #[error("Tensor data type mismatch: expected {expected:?}, got {actual:?}")]
    DataTypeMismatch {
        /// Element type asked for
        expected: DataType,
        /// Element type found
        actual: DataType,
    },
}
