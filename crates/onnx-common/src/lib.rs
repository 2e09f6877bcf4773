//! onnx-common - Session lifecycle and zero-copy tensor bridging for ONNX inference
//!
//! This crate sits between application code and a native inference runtime.
//!
//! # Architecture
//!
//! - [`model`]: static [`ModelConfig`] plus [`ConfigurableModel`], which owns
//!   a [`Runtime`] and decides when sessions are built and torn down
//!   (eager, lazily cached, or per call).
//! - [`tensor`]: [`Tensor`] owns one buffer and exposes it both as an ndarray
//!   view for numeric code and as a named [`NativeTensor`] for session
//!   binding, without copying.
//! - [`ops`]: activations on the numeric view and a TopK operator backed by a
//!   packaged single-node graph.
//! - [`backend`]: the ONNX Runtime implementation of [`Runtime`]
//!   (feature `onnxruntime`, on by default).
//!
//! # Example
//!
//! ```ignore
//! use onnx_common::{Backend, ConfigBuilder, MemoryMode, OrtRuntime, Tensor};
//!
//! fn main() -> onnx_common::Result<()> {
//!     let mut model = ConfigBuilder::new()
//!         .with_model_path("models/classifier.onnx")
//!         .with_backend(Backend::Cuda(0))
//!         .with_memory_mode(MemoryMode::LazyCached)
//!         .create_model(OrtRuntime)?;
//!
//!     let input = Tensor::<f32>::zeros([1usize, 3, 224, 224], true)?;
//!     let mut logits = Tensor::<f32>::zeros([1usize, 1000], true)?;
//!
//!     let mut session = model.resolve()?;
//!     session.run(&[input.as_native("input")], &mut [logits.as_native_mut("logits")])?;
//!     drop(session);
//!
//!     let best = logits.top_k(5, false)?;
//!     println!("{:?}", best.indices.as_slice());
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]

pub mod backend;
pub mod error;
pub mod model;
pub mod ops;
pub mod runtime;
pub mod tensor;

pub use error::{Error, Result};
pub use model::{
    Backend, ConfigBuilder, ConfigError, ConfigurableModel, LogSeverity, MemoryMode, ModelConfig,
    ModelSource, OptimizationLevel, SessionHandle, SessionMetrics, SessionOptions,
};
pub use ops::{release_thread_session, top_k_with, TopKOutput};
pub use runtime::{NativeSession, Runtime};
pub use tensor::{DataType, Dimensions, Element, NativeTensor, NativeTensorMut, Tensor, TensorError};

#[cfg(feature = "onnxruntime")]
pub use backend::{OrtRuntime, OrtSession};
#[cfg(feature = "onnxruntime")]
pub use ops::top_k;

/// Install a `tracing` subscriber for this process.
///
/// Honors `RUST_LOG`, defaulting to `info`. Fails if a global subscriber is
/// already installed.
pub fn init() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .try_init()
        .map_err(|e| Error::Init(e.to_string()))?;

    tracing::info!("onnx-common initialized");
    Ok(())
}
