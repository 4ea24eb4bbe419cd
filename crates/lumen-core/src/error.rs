//! Error types for the Lumen ingestion pipeline.
//!
//! Pipeline errors carry the context a caller needs (filename, stage,
//! underlying diagnostic) and map onto a closed set of wire-visible
//! kinds via [`PipelineError::kind`]. Library diagnostics never cross
//! the pipeline boundary unwrapped.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Top-level error type for Lumen operations.
#[derive(Error, Debug)]
pub enum LumenError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Pipeline processing errors
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// General I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the config file from disk
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse TOML configuration
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Configuration values are invalid
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Pipeline processing errors.
///
/// Every variant except `MetadataCorrupt` aborts the whole request;
/// metadata corruption degrades to all-null metadata fields and is
/// only ever logged (see `pipeline::metadata`).
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Input bytes match no known format family
    #[error("Unsupported format for {filename}: {detail}")]
    UnsupportedFormat { filename: String, detail: String },

    /// RAW container is structurally corrupt or undecodable
    #[error("RAW decode failed for {filename}: {message}")]
    RawDecode { filename: String, message: String },

    /// RAW support is not registered in this process
    #[error("RAW decode capability is not available in this build")]
    MissingCapability,

    /// Embedded metadata directory is structurally malformed
    #[error("Metadata directory corrupt in {filename}: {message}")]
    MetadataCorrupt { filename: String, message: String },

    /// Caller-supplied parameter is malformed or out of range
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// RAW decode slot pool saturated for the whole bounded wait
    #[error("RAW decode pool saturated after {waited_ms}ms")]
    Busy { waited_ms: u64 },

    /// Recognized container failed to decode
    #[error("Decode error for {filename}: {message}")]
    Decode { filename: String, message: String },

    /// Unexpected internal failure
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Wire-visible failure classification for a [`PipelineError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    UnsupportedFormat,
    RawDecodeError,
    MissingCapability,
    MetadataCorrupt,
    InvalidParameter,
    Busy,
    InternalError,
}

impl PipelineError {
    /// Classify this error for the outcome boundary.
    ///
    /// A recognized container that fails mid-decode is not an
    /// "unrecognized container", so `Decode` classifies as internal.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnsupportedFormat { .. } => ErrorKind::UnsupportedFormat,
            Self::RawDecode { .. } => ErrorKind::RawDecodeError,
            Self::MissingCapability => ErrorKind::MissingCapability,
            Self::MetadataCorrupt { .. } => ErrorKind::MetadataCorrupt,
            Self::InvalidParameter(_) => ErrorKind::InvalidParameter,
            Self::Busy { .. } => ErrorKind::Busy,
            Self::Decode { .. } | Self::Internal(_) => ErrorKind::InternalError,
        }
    }
}

/// Convenience type alias for Lumen results.
pub type Result<T> = std::result::Result<T, LumenError>;

/// Convenience type alias for pipeline-specific results.
pub type PipelineResult<T> = std::result::Result<T, PipelineError>;
