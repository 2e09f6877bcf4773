//! Runtime implementations

#[cfg(feature = "onnxruntime")]
pub mod onnxruntime;

#[cfg(feature = "onnxruntime")]
pub use onnxruntime::{tensor_from_value, OrtRuntime, OrtSession};
