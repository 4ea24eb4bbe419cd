//! Pipeline orchestration - wires together all processing stages.
//!
//! One invocation is a pure function of (bytes, filename, options):
//! no mutable state is shared across invocations, and concurrent
//! requests are fully independent. Stage order front-loads the cheap
//! fail-fast checks so a doomed request never does pixel work.

use std::path::Path;

use tokio::task;

use crate::config::{Config, LimitsConfig};
use crate::error::PipelineError;
use crate::types::{PhotoRecord, ProcessingOutcome};

use super::assemble::Assembler;
use super::decode::ImageDecoder;
use super::dispatch::{Dispatcher, FormatTag};
use super::hash::HashCalculator;
use super::metadata::MetadataExtractor;
use super::preview::PreviewGenerator;
use super::raw::RawNormalizer;

/// Options for one pipeline invocation.
#[derive(Debug, Clone, Default)]
pub struct ProcessOptions {
    /// Coldpreview bounding box; `None` skips coldpreview generation
    /// entirely (the output fields stay null).
    pub coldpreview_size: Option<u32>,
}

/// The ingestion pipeline: one image in, one outcome out.
pub struct ImagePipeline {
    limits: LimitsConfig,
    decoder: ImageDecoder,
    raw: Option<RawNormalizer>,
}

impl ImagePipeline {
    /// Build a pipeline, resolving the RAW capability once.
    pub fn new(config: &Config) -> Self {
        let raw = RawNormalizer::from_config(config);
        if raw.is_none() {
            tracing::debug!("RAW decode capability not registered");
        }
        Self {
            limits: config.limits.clone(),
            decoder: ImageDecoder::new(config.limits.clone()),
            raw,
        }
    }

    /// Whether RAW inputs can be processed by this pipeline.
    pub fn raw_capability(&self) -> bool {
        self.raw.is_some()
    }

    /// Process an image file on disk.
    pub async fn process_path(
        &self,
        path: &Path,
        options: &ProcessOptions,
    ) -> Result<PhotoRecord, PipelineError> {
        if !path.is_file() {
            return Err(PipelineError::InvalidParameter(format!(
                "file not found: {}",
                path.display()
            )));
        }
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown")
            .to_string();
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| PipelineError::InvalidParameter(format!("cannot read {}: {e}", path.display())))?;

        self.process_bytes(bytes, &filename, options).await
    }

    /// Process an in-memory buffer.
    pub async fn process_bytes(
        &self,
        bytes: Vec<u8>,
        filename: &str,
        options: &ProcessOptions,
    ) -> Result<PhotoRecord, PipelineError> {
        let start = std::time::Instant::now();
        tracing::debug!("Processing: {} ({} bytes)", filename, bytes.len());

        // Malformed options fail before any decode work
        if let Some(size) = options.coldpreview_size {
            PreviewGenerator::check_coldpreview_size(size)?;
        }

        let max_bytes = self.limits.max_file_size_mb * 1024 * 1024;
        if bytes.len() as u64 > max_bytes {
            return Err(PipelineError::InvalidParameter(format!(
                "input of {} bytes exceeds limit of {} MB",
                bytes.len(),
                self.limits.max_file_size_mb
            )));
        }

        // Classify once; the tag is never re-derived downstream
        let detection = Dispatcher::classify(&bytes, filename);
        tracing::trace!("  Dispatch: {:?}", detection);

        // Capability check precedes everything RAW-related, so the
        // failure is shallow and immediate
        if matches!(detection.tag, FormatTag::Raw(_)) && self.raw.is_none() {
            return Err(PipelineError::MissingCapability);
        }

        // Metadata reads the original container, not the raster, and
        // never fails the request
        let metadata_start = std::time::Instant::now();
        let metadata = MetadataExtractor::extract(&bytes, filename);
        tracing::trace!("  Metadata: {:?}", metadata_start.elapsed());

        let decode_start = std::time::Instant::now();
        let raster = match detection.tag {
            FormatTag::Jpeg | FormatTag::Png => {
                self.decoder.decode(bytes, detection.tag, filename).await?
            }
            FormatTag::Raw(kind) => {
                // Checked above; the pool guards only this path
                let normalizer = self
                    .raw
                    .as_ref()
                    .ok_or(PipelineError::MissingCapability)?;
                normalizer.normalize(bytes, kind, filename).await?
            }
            FormatTag::Unknown => {
                return Err(PipelineError::UnsupportedFormat {
                    filename: filename.to_string(),
                    detail: "no known signature, extension advisory exhausted".into(),
                });
            }
        };
        tracing::trace!("  Decode: {:?}", decode_start.elapsed());

        // Previews are CPU-bound; run both on the blocking pool
        let preview_start = std::time::Instant::now();
        let coldpreview_size = options.coldpreview_size;
        let (raster, hotpreview, coldpreview) = task::spawn_blocking(move || {
            let hot = PreviewGenerator::hotpreview(&raster)?;
            let cold = match coldpreview_size {
                Some(size) => Some(PreviewGenerator::coldpreview(&raster, size)?),
                None => None,
            };
            Ok::<_, PipelineError>((raster, hot, cold))
        })
        .await
        .map_err(|e| PipelineError::Internal(format!("preview task join error: {e}")))??;
        tracing::trace!("  Previews: {:?}", preview_start.elapsed());

        let hothash = HashCalculator::hothash(&hotpreview);

        let record = Assembler::build(
            filename,
            raster.width(),
            raster.height(),
            hothash,
            &hotpreview,
            coldpreview.as_ref(),
            metadata,
        )?;

        tracing::debug!(
            "Processed {} in {:?} ({}x{})",
            filename,
            start.elapsed(),
            record.width,
            record.height
        );
        Ok(record)
    }

    /// Process a buffer and shape the result for the outcome boundary.
    pub async fn process_outcome(
        &self,
        bytes: Vec<u8>,
        filename: &str,
        options: &ProcessOptions,
    ) -> ProcessingOutcome {
        let result = self.process_bytes(bytes, filename, options).await;
        if let Err(ref e) = result {
            tracing::warn!("Processing failed for {}: {e}", filename);
        }
        ProcessingOutcome::from_result(result)
    }
}
