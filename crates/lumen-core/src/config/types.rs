//! Sub-configuration structs with defaults.

use serde::{Deserialize, Serialize};

/// Resource limits to protect against problematic inputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum input file size in megabytes
    pub max_file_size_mb: u64,

    /// Maximum raster dimension (width or height)
    pub max_image_dimension: u32,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_file_size_mb: 100,
            max_image_dimension: 12000,
        }
    }
}

/// RAW decode capability and slot pool settings.
///
/// Demosaicing is CPU- and memory-heavy; the slot pool bounds how many
/// RAW decodes run at once. Standard-format decode is not pooled.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RawConfig {
    /// Runtime switch for the RAW capability. The capability is only
    /// registered when this is true AND the `raw-decode` feature was
    /// compiled in.
    pub enabled: bool,

    /// Concurrent RAW decode slots
    pub max_concurrent_decodes: usize,

    /// How long a request waits for a slot before failing busy
    pub acquire_timeout_ms: u64,
}

impl Default for RawConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_concurrent_decodes: 2,
            acquire_timeout_ms: 10_000,
        }
    }
}

/// Output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Default output format ("json" or "jsonl")
    pub format: String,

    /// Pretty-print JSON output
    pub pretty: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: "json".to_string(),
            pretty: false,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: error, warn, info, debug, trace
    pub level: String,

    /// Log format: "pretty" or "json"
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}
