//! Element types that can cross the native boundary

use std::fmt::Debug;

use bytemuck::Pod;

use super::{TensorData, TensorDataMut};

/// Data types for tensors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    /// 32-bit floating point
    F32,
    /// 64-bit floating point
    F64,
    /// 32-bit signed integer
    I32,
    /// 64-bit signed integer
    I64,
    /// 8-bit unsigned integer
    U8,
}

impl DataType {
    /// Get size in bytes for this data type
    pub fn size_bytes(&self) -> usize {
        match self {
            DataType::F32 => 4,
            DataType::F64 => 8,
            DataType::I32 => 4,
            DataType::I64 => 8,
            DataType::U8 => 1,
        }
    }
}

/// Scalar type storable in a [`Tensor`](super::Tensor).
///
/// Each element type maps to one [`DataType`] and one variant of the
/// type-erased [`TensorData`] views handed to the runtime.
pub trait Element: Pod + Debug + PartialEq + Send + Sync + 'static {
    /// Runtime tag for this element type
    const DATA_TYPE: DataType;

    /// Erase the element type of a slice
    fn wrap(data: &[Self]) -> TensorData<'_>;

    /// Erase the element type of a mutable slice
    fn wrap_mut(data: &mut [Self]) -> TensorDataMut<'_>;

    /// Recover a typed slice, if the element type matches
    fn downcast<'a>(data: &TensorData<'a>) -> Option<&'a [Self]>;

    /// Recover a typed mutable slice, if the element type matches
    fn downcast_mut<'a>(data: &'a mut TensorDataMut<'_>) -> Option<&'a mut [Self]>;
}

macro_rules! impl_element {
    ($ty:ty, $variant:ident) => {
        impl Element for $ty {
            const DATA_TYPE: DataType = DataType::$variant;

            fn wrap(data: &[Self]) -> TensorData<'_> {
                TensorData::$variant(data)
            }

            fn wrap_mut(data: &mut [Self]) -> TensorDataMut<'_> {
                TensorDataMut::$variant(data)
            }

            fn downcast<'a>(data: &TensorData<'a>) -> Option<&'a [Self]> {
                match *data {
                    TensorData::$variant(values) => Some(values),
                    _ => None,
                }
            }

            fn downcast_mut<'a>(data: &'a mut TensorDataMut<'_>) -> Option<&'a mut [Self]> {
                match data {
                    TensorDataMut::$variant(values) => Some(&mut **values),
                    _ => None,
                }
            }
        }
    };
}

impl_element!(f32, F32);
impl_element!(f64, F64);
impl_element!(i32, I32);
impl_element!(i64, I64);
impl_element!(u8, U8);
