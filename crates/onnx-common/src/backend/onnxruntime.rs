//! ONNX Runtime backend
//!
//! Sessions run through an I/O binding. Every [`NativeTensor`] and
//! [`NativeTensorMut`] is wrapped as an ORT value over the caller's own
//! buffer, so inputs are read and outputs are written in place, matched by
//! name. No result is copied back.

use std::ffi::{c_void, CStr};
use std::fmt;
use std::ptr::{self, NonNull};

use ort::execution_providers::{
    CUDAExecutionProvider, CoreMLExecutionProvider, DirectMLExecutionProvider,
    ExecutionProviderDispatch, TensorRTExecutionProvider,
};
use ort::logging::LogLevel;
use ort::session::builder::{GraphOptimizationLevel, SessionBuilder};
use ort::session::Session;
use ort::sys as ort_sys;
use ort::tensor::{PrimitiveTensorElementType, TensorElementType};
use ort::value::DynValue;

use crate::model::{Backend, LogSeverity, ModelConfig, ModelSource, OptimizationLevel};
use crate::runtime::{NativeSession, Runtime};
use crate::tensor::{DataType, Dimensions, Element, NativeTensor, NativeTensorMut, Tensor};
use crate::{Error, Result};

/// Builds sessions on the process-wide ONNX Runtime environment
#[derive(Debug, Clone, Copy, Default)]
pub struct OrtRuntime;

/// Loaded ONNX Runtime session
pub struct OrtSession {
    session: Session,
}

impl OrtSession {
    /// Underlying `ort` session, for calls this crate does not wrap
    pub fn inner(&mut self) -> &mut Session {
        &mut self.session
    }
}

impl fmt::Debug for OrtSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OrtSession").finish_non_exhaustive()
    }
}

fn runtime_error(err: impl fmt::Display) -> Error {
    Error::Runtime(format!("ONNX Runtime error: {}", err))
}

/// Provider for a non-CPU backend.
///
/// CPU yields nothing: the runtime registers its CPU provider itself and a
/// second registration fails. Every other provider errors on failure instead
/// of falling back silently.
fn execution_provider(backend: Backend) -> Option<ExecutionProviderDispatch> {
    match backend {
        Backend::Cpu => None,
        Backend::Cuda(device) => Some(
            CUDAExecutionProvider::default()
                .with_device_id(device as i32)
                .build()
                .error_on_failure(),
        ),
        Backend::DirectMl(device) => Some(
            DirectMLExecutionProvider::default()
                .with_device_id(device as i32)
                .build()
                .error_on_failure(),
        ),
        Backend::CoreMl => Some(CoreMLExecutionProvider::default().build().error_on_failure()),
        Backend::TensorRt(device) => Some(
            TensorRTExecutionProvider::default()
                .with_device_id(device as i32)
                .build()
                .error_on_failure(),
        ),
    }
}

fn log_level(severity: LogSeverity) -> LogLevel {
    match severity {
        LogSeverity::Verbose => LogLevel::Verbose,
        LogSeverity::Info => LogLevel::Info,
        LogSeverity::Warning => LogLevel::Warning,
        LogSeverity::Error => LogLevel::Error,
        LogSeverity::Fatal => LogLevel::Fatal,
    }
}

fn optimization_level(level: OptimizationLevel) -> GraphOptimizationLevel {
    match level {
        OptimizationLevel::Disable => GraphOptimizationLevel::Disable,
        OptimizationLevel::Basic => GraphOptimizationLevel::Level1,
        OptimizationLevel::Extended => GraphOptimizationLevel::Level2,
        OptimizationLevel::All => GraphOptimizationLevel::Level3,
    }
}

fn configure(config: &ModelConfig) -> Result<SessionBuilder> {
    let mut builder = Session::builder()?;

    if config.register_extensions() {
        builder = builder.with_extensions().map_err(runtime_error)?;
    }

    if let Some(provider) = execution_provider(config.backend()) {
        builder = builder
            .with_execution_providers([provider])
            .map_err(runtime_error)?;
    }

    builder = builder
        .with_log_level(log_level(config.log_severity()))
        .map_err(runtime_error)?;

    let options = config.options();
    builder = builder
        .with_optimization_level(optimization_level(options.optimization_level))
        .map_err(runtime_error)?;
    if let Some(threads) = options.intra_threads {
        builder = builder.with_intra_threads(threads).map_err(runtime_error)?;
    }
    if let Some(threads) = options.inter_threads {
        builder = builder.with_inter_threads(threads).map_err(runtime_error)?;
    }

    Ok(builder)
}

impl Runtime for OrtRuntime {
    type Session = OrtSession;

    fn build_session(&self, config: &ModelConfig) -> Result<OrtSession> {
        let builder = configure(config)?;
        let session = match config.source() {
            ModelSource::Path(path) => builder.commit_from_file(path).map_err(runtime_error)?,
            ModelSource::Bytes(bytes) => builder.commit_from_memory(bytes).map_err(runtime_error)?,
        };
        Ok(OrtSession { session })
    }
}

fn element_type(data_type: DataType) -> TensorElementType {
    match data_type {
        DataType::F32 => TensorElementType::Float32,
        DataType::F64 => TensorElementType::Float64,
        DataType::I32 => TensorElementType::Int32,
        DataType::I64 => TensorElementType::Int64,
        DataType::U8 => TensorElementType::Uint8,
    }
}

/// Turn a C API status into an error, releasing it.
///
/// # Safety
///
/// `status` must come from a call on `api` and not have been released.
unsafe fn check_status(api: &ort_sys::OrtApi, status: ort_sys::OrtStatusPtr, what: &str) -> Result<()> {
    if status.0.is_null() {
        return Ok(());
    }
    let message = CStr::from_ptr((api.GetErrorMessage)(status.0))
        .to_string_lossy()
        .into_owned();
    (api.ReleaseStatus)(status.0);
    Err(runtime_error(format!("{}: {}", what, message)))
}

/// Wrap caller-owned CPU memory as an ORT tensor value without copying.
///
/// # Safety
///
/// `data` must point to `bytes` bytes laid out as `dims` elements of
/// `data_type`, and stay valid (and unaliased, if ORT writes to it) until
/// the returned value and every binding holding it are dropped.
unsafe fn borrowed_value(
    data: *mut c_void,
    bytes: usize,
    dims: &Dimensions,
    data_type: DataType,
) -> Result<DynValue> {
    let shape = dims.to_i64()?;
    let api = ort::api();

    let mut info: *mut ort_sys::OrtMemoryInfo = ptr::null_mut();
    let status = (api.CreateCpuMemoryInfo)(
        ort_sys::OrtAllocatorType::OrtArenaAllocator,
        ort_sys::OrtMemType::OrtMemTypeDefault,
        &mut info,
    );
    check_status(api, status, "CPU memory info")?;

    let mut value: *mut ort_sys::OrtValue = ptr::null_mut();
    let status = (api.CreateTensorWithDataAsOrtValue)(
        info,
        data,
        bytes as _,
        shape.as_ptr(),
        shape.len() as _,
        element_type(data_type).into(),
        &mut value,
    );
    // The tensor keeps its own reference to the memory info.
    (api.ReleaseMemoryInfo)(info);
    check_status(api, status, "binding tensor buffer")?;

    let value = NonNull::new(value).ok_or_else(|| runtime_error("null tensor value"))?;
    Ok(DynValue::from_ptr(value, None))
}

impl NativeSession for OrtSession {
    fn run(&mut self, inputs: &[NativeTensor<'_>], outputs: &mut [NativeTensorMut<'_>]) -> Result<()> {
        let mut binding = self.session.create_binding()?;

        // Input values borrow `inputs` and stay alive until the run completes.
        let mut held = Vec::with_capacity(inputs.len());
        for input in inputs {
            let bytes = input.data().as_bytes();
            // SAFETY: `bytes` is borrowed for the whole call and the value is
            // dropped before returning. Inputs are only read by the runtime.
            let value = unsafe {
                borrowed_value(
                    bytes.as_ptr() as *mut c_void,
                    bytes.len(),
                    input.dims(),
                    input.data_type(),
                )?
            };
            binding.bind_input(input.name(), &value)?;
            held.push(value);
        }

        for output in outputs.iter_mut() {
            let name = output.name().to_string();
            let dims = output.dims().clone();
            let data_type = output.data_type();
            let bytes = output.data_mut().as_bytes_mut();
            // SAFETY: `bytes` is exclusively borrowed for the whole call; the
            // binding that writes through it is dropped before returning.
            let value = unsafe {
                borrowed_value(bytes.as_mut_ptr() as *mut c_void, bytes.len(), &dims, data_type)?
            };
            binding.bind_output(name, value)?;
        }

        self.session.run_binding(&binding)?;
        drop(binding);
        drop(held);
        Ok(())
    }
}

/// Absorb a value returned by a plain `ort` session run into a bridge tensor.
///
/// Copies the payload once, like [`Tensor::copy_from`]. Sessions driven
/// through [`NativeSession::run`] never need this.
pub fn tensor_from_value<T>(value: &DynValue, pinned: bool) -> Result<Tensor<T>>
where
    T: Element + PrimitiveTensorElementType,
{
    let (shape, data) = value.try_extract_tensor::<T>()?;
    let dims = shape
        .iter()
        .map(|&extent| usize::try_from(extent))
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|_| runtime_error(format!("value has unresolved shape {:?}", shape)))?;
    Ok(Tensor::from_slice(dims, data, pinned)?)
}
