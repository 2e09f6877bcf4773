//! Error types for model configuration

use thiserror::Error;

/// Configuration errors. Always fatal; nothing retries them.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Neither a model path nor model bytes were provided
    #[error("No model source configured (set a model path or model bytes)")]
    MissingModelSource,

    /// Configuration text could not be parsed
    #[error("Failed to parse {format} configuration: {message}")]
    Parse {
        /// Format being parsed
        format: &'static str,
        /// Parser message
        message: String,
    },

    /// Configuration file extension is not one we can read
    #[error("Unsupported configuration file format: {0}")]
    UnsupportedFormat(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
