//! Narrow contract with the native inference runtime
//!
//! Everything this crate needs from a runtime is "build a session from a
//! [`ModelConfig`]" and "run it with named inputs and outputs". The ONNX
//! Runtime implementation lives in [`crate::backend`]; tests and embedders can
//! supply their own.

use crate::model::ModelConfig;
use crate::tensor::{NativeTensor, NativeTensorMut};
use crate::Result;

/// Loaded inference session
pub trait NativeSession {
    /// Run the graph once.
    ///
    /// Inputs and outputs are matched to the graph by name, in any order.
    /// On success every element of every output view has been written.
    /// Blocks the calling thread until the runtime returns.
    fn run(&mut self, inputs: &[NativeTensor<'_>], outputs: &mut [NativeTensorMut<'_>]) -> Result<()>;
}

impl<S: NativeSession + ?Sized> NativeSession for Box<S> {
    fn run(&mut self, inputs: &[NativeTensor<'_>], outputs: &mut [NativeTensorMut<'_>]) -> Result<()> {
        (**self).run(inputs, outputs)
    }
}

/// Session factory
pub trait Runtime {
    /// Session type this runtime produces
    type Session: NativeSession;

    /// Construct a session from a resolved configuration.
    ///
    /// Applies extension registration, the execution provider for the
    /// configured backend (none for CPU), log severity and session options,
    /// then loads the model source. Failures are returned as-is; nothing is
    /// retried.
    fn build_session(&self, config: &ModelConfig) -> Result<Self::Session>;
}

impl<R: Runtime + ?Sized> Runtime for &R {
    type Session = R::Session;

    fn build_session(&self, config: &ModelConfig) -> Result<Self::Session> {
        (**self).build_session(config)
    }
}
