//! Bridge-owned tensor with a numeric view and a native view over one buffer

use std::borrow::Cow;

use ndarray::{ArrayViewD, ArrayViewMutD, IxDyn};

use super::{Dimensions, Element, NativeTensor, NativeTensorMut, RawBuffer, TensorError};

/// Tensor that owns a single [`RawBuffer`] and projects it two ways.
///
/// [`view`](Tensor::view) / [`view_mut`](Tensor::view_mut) expose the buffer
/// as an ndarray for numeric work; [`as_native`](Tensor::as_native) /
/// [`as_native_mut`](Tensor::as_native_mut) expose the same memory as a named
/// tensor for session binding. Neither projection copies, so writes through
/// one are immediately visible through the other.
///
/// Invariant: `dims().total_element_count() == len()`. A shape with no axes
/// therefore owns an empty buffer.
#[derive(Debug)]
pub struct Tensor<T: Element> {
    buffer: RawBuffer<T>,
    dims: Dimensions,
}

impl<T: Element> Tensor<T> {
    /// Zero-initialized tensor
    pub fn zeros(dims: impl Into<Dimensions>, pinned: bool) -> Result<Self, TensorError> {
        let dims = dims.into();
        let buffer = RawBuffer::zeroed(dims.element_count_or_overflow()?, pinned)?;
        Ok(Self { buffer, dims })
    }

    /// Tensor with every element set to `value`
    pub fn filled(dims: impl Into<Dimensions>, value: T, pinned: bool) -> Result<Self, TensorError> {
        let dims = dims.into();
        let buffer = RawBuffer::filled(dims.element_count_or_overflow()?, value, pinned)?;
        Ok(Self { buffer, dims })
    }

    /// Tensor with unspecified contents.
    ///
    /// # Safety
    ///
    /// Every element must be overwritten (for example by binding the tensor
    /// as a session output and running the session successfully) before any
    /// element is read.
    pub unsafe fn uninit(dims: impl Into<Dimensions>, pinned: bool) -> Result<Self, TensorError> {
        let dims = dims.into();
        let buffer = RawBuffer::uninit(dims.element_count_or_overflow()?, pinned)?;
        Ok(Self { buffer, dims })
    }

    /// Tensor holding a copy of `data`; the shape must match its length
    pub fn from_slice(
        dims: impl Into<Dimensions>,
        data: &[T],
        pinned: bool,
    ) -> Result<Self, TensorError> {
        let dims = dims.into();
        let expected = dims.element_count_or_overflow()?;
        if expected != data.len() {
            return Err(TensorError::SizeMismatch {
                dims,
                expected,
                actual: data.len(),
            });
        }
        let buffer = RawBuffer::from_slice(data, pinned)?;
        Ok(Self { buffer, dims })
    }

    /// Absorb a tensor the bridge does not own.
    ///
    /// This is the one path that copies eagerly: the payload is duplicated
    /// into a fresh buffer and the shape is taken from `source`.
    pub fn copy_from(source: &NativeTensor<'_>, pinned: bool) -> Result<Self, TensorError> {
        let data = source.as_slice::<T>().ok_or(TensorError::DataTypeMismatch {
            expected: T::DATA_TYPE,
            actual: source.data_type(),
        })?;
        Self::from_slice(source.dims().clone(), data, pinned)
    }

    /// Allocate a copy with the same shape and pinning
    pub fn try_clone(&self) -> Result<Self, TensorError> {
        Ok(Self {
            buffer: self.buffer.try_clone()?,
            dims: self.dims.clone(),
        })
    }

    /// Logical shape
    pub fn dims(&self) -> &Dimensions {
        &self.dims
    }

    /// Number of elements in the backing buffer
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Whether the tensor holds no elements
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Whether the backing buffer was allocated pinned
    pub fn is_pinned(&self) -> bool {
        self.buffer.is_pinned()
    }

    /// Backing buffer
    pub fn buffer(&self) -> &RawBuffer<T> {
        &self.buffer
    }

    /// Elements in row-major order
    pub fn as_slice(&self) -> &[T] {
        self.buffer.as_slice()
    }

    /// Mutable elements in row-major order
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        self.buffer.as_mut_slice()
    }

    fn ndarray_dims(&self) -> IxDyn {
        // ndarray treats zero axes as a one-element scalar; ours is empty.
        if self.dims.rank() == 0 {
            IxDyn(&[0])
        } else {
            IxDyn(self.dims.as_native())
        }
    }

    /// Numeric view of the buffer
    pub fn view(&self) -> ArrayViewD<'_, T> {
        ArrayViewD::from_shape(self.ndarray_dims(), self.buffer.as_slice())
            .expect("tensor shape always covers its buffer")
    }

    /// Mutable numeric view of the buffer
    pub fn view_mut(&mut self) -> ArrayViewMutD<'_, T> {
        let dims = self.ndarray_dims();
        ArrayViewMutD::from_shape(dims, self.buffer.as_mut_slice())
            .expect("tensor shape always covers its buffer")
    }

    /// Named read-only view for session input binding
    pub fn as_native<'a>(&'a self, name: impl Into<Cow<'a, str>>) -> NativeTensor<'a> {
        NativeTensor::from_parts(
            name.into(),
            Cow::Borrowed(&self.dims),
            T::wrap(self.buffer.as_slice()),
        )
    }

    /// Named writable view for session output binding
    pub fn as_native_mut<'a>(&'a mut self, name: impl Into<Cow<'a, str>>) -> NativeTensorMut<'a> {
        NativeTensorMut::from_parts(
            name.into(),
            Cow::Borrowed(&self.dims),
            T::wrap_mut(self.buffer.as_mut_slice()),
        )
    }

    /// View the leading elements of the buffer under a different shape.
    ///
    /// Escape hatch for graphs that want a shape the tensor was not created
    /// with. The only check is that the new shape fits in the buffer; a shape
    /// needing more elements than the buffer holds, or more than `usize` can
    /// count, is rejected, never truncated.
    pub fn reinterpret<'a>(
        &'a self,
        name: impl Into<Cow<'a, str>>,
        dims: impl Into<Dimensions>,
    ) -> Result<NativeTensor<'a>, TensorError> {
        let dims = dims.into();
        let count = self.fitting_count(&dims)?;
        Ok(NativeTensor::from_parts(
            name.into(),
            Cow::Owned(dims),
            T::wrap(&self.buffer.as_slice()[..count]),
        ))
    }

    /// Writable counterpart of [`reinterpret`](Tensor::reinterpret)
    pub fn reinterpret_mut<'a>(
        &'a mut self,
        name: impl Into<Cow<'a, str>>,
        dims: impl Into<Dimensions>,
    ) -> Result<NativeTensorMut<'a>, TensorError> {
        let dims = dims.into();
        let count = self.fitting_count(&dims)?;
        Ok(NativeTensorMut::from_parts(
            name.into(),
            Cow::Owned(dims),
            T::wrap_mut(&mut self.buffer.as_mut_slice()[..count]),
        ))
    }

    fn fitting_count(&self, dims: &Dimensions) -> Result<usize, TensorError> {
        let count = dims.element_count_or_overflow()?;
        if count > self.buffer.len() {
            return Err(TensorError::SizeMismatch {
                dims: dims.clone(),
                expected: count,
                actual: self.buffer.len(),
            });
        }
        Ok(count)
    }

    /// Change the logical shape, keeping the same buffer.
    ///
    /// The new shape must describe exactly as many elements as the buffer.
    pub fn reshape(self, dims: impl Into<Dimensions>) -> Result<Self, TensorError> {
        let dims = dims.into();
        let expected = dims.element_count_or_overflow()?;
        if expected != self.buffer.len() {
            return Err(TensorError::SizeMismatch {
                dims,
                expected,
                actual: self.buffer.len(),
            });
        }
        Ok(Self {
            buffer: self.buffer,
            dims,
        })
    }
}
