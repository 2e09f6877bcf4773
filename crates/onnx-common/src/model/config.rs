//! Static model configuration
//!
//! A [`ModelConfig`] is resolved once per logical model, usually at startup,
//! and never changes afterwards. It is built with [`ConfigBuilder`] in code or
//! loaded from a TOML, JSON or YAML file.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::{ConfigError, ConfigurableModel};
use crate::runtime::Runtime;

/// Where the serialized model comes from
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelSource {
    /// Model file on disk
    Path(PathBuf),
    /// Model already in memory. Cannot appear in configuration files.
    #[serde(skip)]
    Bytes(Arc<[u8]>),
}

impl fmt::Debug for ModelSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelSource::Path(path) => f.debug_tuple("Path").field(path).finish(),
            ModelSource::Bytes(bytes) => write!(f, "Bytes({} bytes)", bytes.len()),
        }
    }
}

impl fmt::Display for ModelSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelSource::Path(path) => write!(f, "{}", path.display()),
            ModelSource::Bytes(bytes) => write!(f, "<{} bytes in memory>", bytes.len()),
        }
    }
}

/// Execution backend, with a device index where the provider takes one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Backend {
    /// Default CPU provider
    #[default]
    Cpu,
    /// CUDA GPU with device index
    Cuda(u32),
    /// DirectML adapter with device index
    #[serde(rename = "directml")]
    DirectMl(u32),
    /// Apple CoreML
    #[serde(rename = "coreml")]
    CoreMl,
    /// TensorRT on the CUDA device with this index
    #[serde(rename = "tensorrt")]
    TensorRt(u32),
}

impl Backend {
    /// Device index, for providers that take one
    pub fn device_id(&self) -> Option<u32> {
        match self {
            Backend::Cuda(idx) | Backend::DirectMl(idx) | Backend::TensorRt(idx) => Some(*idx),
            Backend::Cpu | Backend::CoreMl => None,
        }
    }

    /// Get backend string representation
    pub fn as_str(&self) -> String {
        match self {
            Backend::Cpu => "cpu".to_string(),
            Backend::Cuda(idx) => format!("cuda:{}", idx),
            Backend::DirectMl(idx) => format!("directml:{}", idx),
            Backend::CoreMl => "coreml".to_string(),
            Backend::TensorRt(idx) => format!("tensorrt:{}", idx),
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_str())
    }
}

/// When a session is built and how long it lives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryMode {
    /// Build at construction and keep until the model is dropped
    #[default]
    #[serde(alias = "none")]
    Eager,
    /// Build on first use, then keep
    #[serde(alias = "defer_loading")]
    LazyCached,
    /// Build for every use and destroy when the handle is dropped
    #[serde(alias = "unload_after_use")]
    LazyPerCall,
}

impl MemoryMode {
    /// Whether the session is built when the model is constructed
    pub fn loads_eagerly(self) -> bool {
        matches!(self, MemoryMode::Eager)
    }

    /// Whether a built session is kept between uses
    pub fn caches_session(self) -> bool {
        !matches!(self, MemoryMode::LazyPerCall)
    }
}

/// Runtime log severity threshold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogSeverity {
    /// Everything
    Verbose,
    /// Informational and above
    Info,
    /// Warnings and above
    #[default]
    Warning,
    /// Errors and above
    Error,
    /// Fatal errors only
    Fatal,
}

/// Graph optimization level applied at session construction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptimizationLevel {
    /// No graph optimizations
    Disable,
    /// Semantics-preserving rewrites only
    Basic,
    /// Basic plus extended fusions
    Extended,
    /// All optimizations, including layout changes
    #[default]
    All,
}

/// Session options handed to the runtime unchanged
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionOptions {
    /// Threads used within an operator; runtime default when unset
    pub intra_threads: Option<usize>,
    /// Threads used across operators; runtime default when unset
    pub inter_threads: Option<usize>,
    /// Graph optimization level
    pub optimization_level: OptimizationLevel,
}

/// Resolved, immutable model configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelConfig {
    source: ModelSource,
    backend: Backend,
    memory_mode: MemoryMode,
    register_extensions: bool,
    log_severity: LogSeverity,
    options: SessionOptions,
}

impl ModelConfig {
    /// Start building a configuration
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Parse a TOML configuration
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let builder: ConfigBuilder = toml::from_str(text).map_err(|e| ConfigError::Parse {
            format: "toml",
            message: e.to_string(),
        })?;
        builder.build()
    }

    /// Parse a JSON configuration
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let builder: ConfigBuilder = serde_json::from_str(text).map_err(|e| ConfigError::Parse {
            format: "json",
            message: e.to_string(),
        })?;
        builder.build()
    }

    /// Parse a YAML configuration
    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        let builder: ConfigBuilder = serde_yaml::from_str(text).map_err(|e| ConfigError::Parse {
            format: "yaml",
            message: e.to_string(),
        })?;
        builder.build()
    }

    /// Load a configuration file, picking the format from its extension.
    ///
    /// A relative model path is resolved against the file's directory.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;

        let builder: ConfigBuilder = match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => toml::from_str(&text).map_err(|e| ConfigError::Parse {
                format: "toml",
                message: e.to_string(),
            })?,
            Some("json") => serde_json::from_str(&text).map_err(|e| ConfigError::Parse {
                format: "json",
                message: e.to_string(),
            })?,
            Some("yaml") | Some("yml") => serde_yaml::from_str(&text).map_err(|e| ConfigError::Parse {
                format: "yaml",
                message: e.to_string(),
            })?,
            _ => return Err(ConfigError::UnsupportedFormat(path.display().to_string())),
        };

        let base = path.parent().unwrap_or_else(|| Path::new(""));
        tracing::debug!(config = %path.display(), "Loaded model configuration");
        builder.relative_to(base).build()
    }

    /// Model source
    pub fn source(&self) -> &ModelSource {
        &self.source
    }

    /// Execution backend
    pub fn backend(&self) -> Backend {
        self.backend
    }

    /// Session lifetime policy
    pub fn memory_mode(&self) -> MemoryMode {
        self.memory_mode
    }

    /// Whether runtime extension operators are registered
    pub fn register_extensions(&self) -> bool {
        self.register_extensions
    }

    /// Runtime log severity
    pub fn log_severity(&self) -> LogSeverity {
        self.log_severity
    }

    /// Session options bundle
    pub fn options(&self) -> &SessionOptions {
        &self.options
    }
}

/// Builder for [`ModelConfig`]; also the on-disk configuration format
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigBuilder {
    source: Option<ModelSource>,
    backend: Backend,
    memory_mode: MemoryMode,
    register_extensions: bool,
    log_severity: LogSeverity,
    options: SessionOptions,
}

impl ConfigBuilder {
    /// Create a builder with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the model from a file
    pub fn with_model_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.source = Some(ModelSource::Path(path.into()));
        self
    }

    /// Load the model from memory
    pub fn with_model_bytes(mut self, bytes: impl Into<Arc<[u8]>>) -> Self {
        self.source = Some(ModelSource::Bytes(bytes.into()));
        self
    }

    /// Set the model source directly
    pub fn with_source(mut self, source: ModelSource) -> Self {
        self.source = Some(source);
        self
    }

    /// Set the execution backend
    pub fn with_backend(mut self, backend: Backend) -> Self {
        self.backend = backend;
        self
    }

    /// Set the session lifetime policy
    pub fn with_memory_mode(mut self, memory_mode: MemoryMode) -> Self {
        self.memory_mode = memory_mode;
        self
    }

    /// Register runtime extension operators before provider setup
    pub fn with_register_extensions(mut self) -> Self {
        self.register_extensions = true;
        self
    }

    /// Set the runtime log severity
    pub fn with_log_severity(mut self, log_severity: LogSeverity) -> Self {
        self.log_severity = log_severity;
        self
    }

    /// Replace the session options bundle
    pub fn with_options(mut self, options: SessionOptions) -> Self {
        self.options = options;
        self
    }

    /// Set intra-op thread count
    pub fn with_intra_threads(mut self, threads: usize) -> Self {
        self.options.intra_threads = Some(threads);
        self
    }

    /// Set inter-op thread count
    pub fn with_inter_threads(mut self, threads: usize) -> Self {
        self.options.inter_threads = Some(threads);
        self
    }

    /// Set graph optimization level
    pub fn with_optimization_level(mut self, level: OptimizationLevel) -> Self {
        self.options.optimization_level = level;
        self
    }

    fn relative_to(mut self, base: &Path) -> Self {
        if let Some(ModelSource::Path(path)) = &mut self.source {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        }
        self
    }

    /// Resolve into an immutable configuration
    pub fn build(self) -> Result<ModelConfig, ConfigError> {
        let source = self.source.ok_or(ConfigError::MissingModelSource)?;
        Ok(ModelConfig {
            source,
            backend: self.backend,
            memory_mode: self.memory_mode,
            register_extensions: self.register_extensions,
            log_severity: self.log_severity,
            options: self.options,
        })
    }

    /// Resolve and construct the model in one step
    pub fn create_model<R: Runtime>(self, runtime: R) -> crate::Result<ConfigurableModel<R>> {
        let config = self.build()?;
        ConfigurableModel::new(runtime, config)
    }
}
