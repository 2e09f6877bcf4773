//! Error types for onnx-common

use thiserror::Error;

use crate::model::ConfigError;
use crate::tensor::TensorError;

/// Result type alias for onnx-common operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for onnx-common
#[derive(Debug, Error)]
pub enum Error {
    /// Model configuration could not be resolved
    #[error("Invalid model configuration: {0}")]
    Config(#[from] ConfigError),

    /// Tensor allocation or shape error
    #[error(transparent)]
    Tensor(#[from] TensorError),

    /// Error reported by the inference runtime (session construction or run)
    #[error("Inference runtime error: {0}")]
    Runtime(String),

    /// An operator was called with arguments its shape contract forbids
    #[error("Shape contract violated: {0}")]
    ShapeContract(String),

    /// Logging subscriber could not be installed
    #[error("Initialization failed: {0}")]
    Init(String),
}

#[cfg(feature = "onnxruntime")]
impl From<ort::Error> for Error {
    fn from(err: ort::Error) -> Self {
        Error::Runtime(format!("ONNX Runtime error: {}", err))
    }
}
