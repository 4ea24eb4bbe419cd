//! Lumen Core - image ingestion pipeline library.
//!
//! Lumen takes a single image file (standard raster or camera RAW) and
//! produces a normalized, content-addressed record: two deterministic
//! derived previews, a canonical metadata extract, and a content hash
//! usable for deduplication.
//!
//! # Architecture
//!
//! ```text
//! bytes → dispatch → (raw | decode) → canonical raster
//!                                       ├─ metadata (original bytes)
//!                                       ├─ previews → hothash
//!                                       └─ assemble → PhotoRecord
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use lumen_core::{Config, ImagePipeline, ProcessOptions};
//!
//! #[tokio::main]
//! async fn main() -> lumen_core::Result<()> {
//!     let pipeline = ImagePipeline::new(&Config::load()?);
//!     let record = pipeline
//!         .process_path("./IMG_1234.jpg".as_ref(), &ProcessOptions::default())
//!         .await?;
//!     println!("{}", record.hothash);
//!     Ok(())
//! }
//! ```

// Module declarations
pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod types;

// Re-exports for convenient access
pub use config::Config;
pub use error::{ConfigError, ErrorKind, LumenError, PipelineError, PipelineResult, Result};
pub use output::{OutputFormat, OutputWriter};
pub use pipeline::{ImagePipeline, ProcessOptions};
pub use types::{
    BasicMetadata, CameraSettings, GpsCoordinates, PhotoRecord, ProcessingOutcome,
};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_pipeline_from_default_config() {
        let pipeline = ImagePipeline::new(&Config::default());
        // Capability tracks build feature + config switch
        assert_eq!(
            pipeline.raw_capability(),
            cfg!(feature = "raw-decode")
        );
    }
}
