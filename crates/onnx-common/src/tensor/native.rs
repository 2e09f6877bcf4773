//! Named, type-erased tensor views passed to and from native sessions
//!
//! These never own storage. A [`NativeTensor`] borrows either a bridge-owned
//! [`Tensor`](super::Tensor) buffer or any foreign slice; binding to a session
//! is by [`name`](NativeTensor::name), in any order.

use std::borrow::Cow;

use super::{DataType, Dimensions, Element, TensorError};

/// Borrowed tensor payload, tagged with its element type
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TensorData<'a> {
    /// 32-bit floats
    F32(&'a [f32]),
    /// 64-bit floats
    F64(&'a [f64]),
    /// 32-bit signed integers
    I32(&'a [i32]),
    /// 64-bit signed integers
    I64(&'a [i64]),
    /// Bytes
    U8(&'a [u8]),
}

impl<'a> TensorData<'a> {
    /// Element type of the payload
    pub fn data_type(&self) -> DataType {
        match self {
            TensorData::F32(_) => DataType::F32,
            TensorData::F64(_) => DataType::F64,
            TensorData::I32(_) => DataType::I32,
            TensorData::I64(_) => DataType::I64,
            TensorData::U8(_) => DataType::U8,
        }
    }

    /// Number of elements
    pub fn len(&self) -> usize {
        match self {
            TensorData::F32(data) => data.len(),
            TensorData::F64(data) => data.len(),
            TensorData::I32(data) => data.len(),
            TensorData::I64(data) => data.len(),
            TensorData::U8(data) => data.len(),
        }
    }

    /// Whether the payload is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Payload as raw bytes in native byte order
    pub fn as_bytes(&self) -> &'a [u8] {
        match *self {
            TensorData::F32(data) => bytemuck::cast_slice(data),
            TensorData::F64(data) => bytemuck::cast_slice(data),
            TensorData::I32(data) => bytemuck::cast_slice(data),
            TensorData::I64(data) => bytemuck::cast_slice(data),
            TensorData::U8(data) => data,
        }
    }
}

/// Mutably borrowed tensor payload, tagged with its element type
#[derive(Debug, PartialEq)]
pub enum TensorDataMut<'a> {
    /// 32-bit floats
    F32(&'a mut [f32]),
    /// 64-bit floats
    F64(&'a mut [f64]),
    /// 32-bit signed integers
    I32(&'a mut [i32]),
    /// 64-bit signed integers
    I64(&'a mut [i64]),
    /// Bytes
    U8(&'a mut [u8]),
}

impl TensorDataMut<'_> {
    /// Element type of the payload
    pub fn data_type(&self) -> DataType {
        match self {
            TensorDataMut::F32(_) => DataType::F32,
            TensorDataMut::F64(_) => DataType::F64,
            TensorDataMut::I32(_) => DataType::I32,
            TensorDataMut::I64(_) => DataType::I64,
            TensorDataMut::U8(_) => DataType::U8,
        }
    }

    /// Number of elements
    pub fn len(&self) -> usize {
        match self {
            TensorDataMut::F32(data) => data.len(),
            TensorDataMut::F64(data) => data.len(),
            TensorDataMut::I32(data) => data.len(),
            TensorDataMut::I64(data) => data.len(),
            TensorDataMut::U8(data) => data.len(),
        }
    }

    /// Whether the payload is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Writable payload as raw bytes in native byte order
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        match self {
            TensorDataMut::F32(data) => bytemuck::cast_slice_mut(&mut **data),
            TensorDataMut::F64(data) => bytemuck::cast_slice_mut(&mut **data),
            TensorDataMut::I32(data) => bytemuck::cast_slice_mut(&mut **data),
            TensorDataMut::I64(data) => bytemuck::cast_slice_mut(&mut **data),
            TensorDataMut::U8(data) => &mut **data,
        }
    }
}

fn check_len(dims: &Dimensions, len: usize) -> Result<(), TensorError> {
    let expected = dims.element_count_or_overflow()?;
    if expected != len {
        return Err(TensorError::SizeMismatch {
            dims: dims.clone(),
            expected,
            actual: len,
        });
    }
    Ok(())
}

/// Read-only named tensor view for session inputs
#[derive(Debug, Clone)]
pub struct NativeTensor<'a> {
    name: Cow<'a, str>,
    dims: Cow<'a, Dimensions>,
    data: TensorData<'a>,
}

impl<'a> NativeTensor<'a> {
    pub(crate) fn from_parts(
        name: Cow<'a, str>,
        dims: Cow<'a, Dimensions>,
        data: TensorData<'a>,
    ) -> Self {
        Self { name, dims, data }
    }

    /// View a foreign slice as a named tensor.
    ///
    /// The shape must describe exactly `data.len()` elements.
    pub fn from_slice<T: Element>(
        name: impl Into<Cow<'a, str>>,
        dims: impl Into<Dimensions>,
        data: &'a [T],
    ) -> Result<Self, TensorError> {
        let dims = dims.into();
        check_len(&dims, data.len())?;
        Ok(Self {
            name: name.into(),
            dims: Cow::Owned(dims),
            data: T::wrap(data),
        })
    }

    /// Binding name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Logical shape
    pub fn dims(&self) -> &Dimensions {
        &self.dims
    }

    /// Type-erased payload, valid for the full borrow
    pub fn data(&self) -> TensorData<'a> {
        self.data
    }

    /// Element type
    pub fn data_type(&self) -> DataType {
        self.data.data_type()
    }

    /// Typed payload, or `None` if `T` is not the element type
    pub fn as_slice<T: Element>(&self) -> Option<&'a [T]> {
        T::downcast(&self.data)
    }
}

/// Writable named tensor view for session outputs
#[derive(Debug)]
pub struct NativeTensorMut<'a> {
    name: Cow<'a, str>,
    dims: Cow<'a, Dimensions>,
    data: TensorDataMut<'a>,
}

impl<'a> NativeTensorMut<'a> {
    pub(crate) fn from_parts(
        name: Cow<'a, str>,
        dims: Cow<'a, Dimensions>,
        data: TensorDataMut<'a>,
    ) -> Self {
        Self { name, dims, data }
    }

    /// View a foreign mutable slice as a named output tensor
    pub fn from_slice<T: Element>(
        name: impl Into<Cow<'a, str>>,
        dims: impl Into<Dimensions>,
        data: &'a mut [T],
    ) -> Result<Self, TensorError> {
        let dims = dims.into();
        check_len(&dims, data.len())?;
        Ok(Self {
            name: name.into(),
            dims: Cow::Owned(dims),
            data: T::wrap_mut(data),
        })
    }

    /// Binding name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Logical shape
    pub fn dims(&self) -> &Dimensions {
        &self.dims
    }

    /// Type-erased payload
    pub fn data_mut(&mut self) -> &mut TensorDataMut<'a> {
        &mut self.data
    }

    /// Element type
    pub fn data_type(&self) -> DataType {
        self.data.data_type()
    }

    /// Typed payload, or `None` if `T` is not the element type
    pub fn as_mut_slice<T: Element>(&mut self) -> Option<&mut [T]> {
        T::downcast_mut(&mut self.data)
    }
}
