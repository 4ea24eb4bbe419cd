//! Final record assembly and structural invariant enforcement.
//!
//! The assembler only ever sees fully successful upstream outcomes -
//! any hard failure aborted the request before reaching it. Its job is
//! to flatten previews, hash, and metadata into one immutable
//! [`PhotoRecord`] and to verify the structural invariant one last
//! time before the record leaves the pipeline.

use crate::error::PipelineError;
use crate::types::PhotoRecord;

use super::metadata::ExtractedMetadata;
use super::preview::PreviewArtifact;

/// Merges all stage outcomes into the immutable success record.
pub struct Assembler;

impl Assembler {
    /// Build the record and run the final structural check.
    pub fn build(
        filename: &str,
        width: u32,
        height: u32,
        hothash: String,
        hotpreview: &PreviewArtifact,
        coldpreview: Option<&PreviewArtifact>,
        metadata: ExtractedMetadata,
    ) -> Result<PhotoRecord, PipelineError> {
        let gps = metadata.basic.gps;
        let record = PhotoRecord {
            hothash,
            hotpreview_base64: hotpreview.to_base64(),
            hotpreview_width: hotpreview.width,
            hotpreview_height: hotpreview.height,
            coldpreview_base64: coldpreview.map(PreviewArtifact::to_base64),
            coldpreview_width: coldpreview.map(|p| p.width),
            coldpreview_height: coldpreview.map(|p| p.height),
            primary_filename: filename.to_string(),
            width,
            height,
            taken_at: metadata.basic.taken_at,
            camera_make: metadata.basic.camera_make,
            camera_model: metadata.basic.camera_model,
            gps_latitude: gps.map(|g| g.latitude),
            gps_longitude: gps.map(|g| g.longitude),
            has_gps: gps.is_some(),
            iso: metadata.settings.iso,
            aperture: metadata.settings.aperture,
            shutter_speed: metadata.settings.shutter_speed,
            focal_length: metadata.settings.focal_length,
            lens_model: metadata.settings.lens_model,
            lens_make: metadata.settings.lens_make,
        };

        Self::enforce_invariants(&record)?;
        Ok(record)
    }

    /// The non-null core of every success: hotpreview, hothash,
    /// dimensions, filename. Also checks the pairing rules that the
    /// field flattening could silently violate.
    fn enforce_invariants(record: &PhotoRecord) -> Result<(), PipelineError> {
        if record.hotpreview_base64.is_empty() {
            return Err(PipelineError::Internal(
                "assembled record lacks hotpreview bytes".into(),
            ));
        }
        if record.hothash.len() != 64
            || !record.hothash.chars().all(|c| c.is_ascii_hexdigit())
        {
            return Err(PipelineError::Internal(format!(
                "assembled record carries malformed hothash {:?}",
                record.hothash
            )));
        }
        if record.width == 0 || record.height == 0 {
            return Err(PipelineError::Internal(
                "assembled record has degenerate dimensions".into(),
            ));
        }
        if record.primary_filename.is_empty() {
            return Err(PipelineError::Internal(
                "assembled record lacks a filename".into(),
            ));
        }
        if record.has_gps != (record.gps_latitude.is_some() && record.gps_longitude.is_some()) {
            return Err(PipelineError::Internal(
                "assembled record has inconsistent GPS presence".into(),
            ));
        }
        let cold_fields = [
            record.coldpreview_base64.is_some(),
            record.coldpreview_width.is_some(),
            record.coldpreview_height.is_some(),
        ];
        if cold_fields.iter().any(|&p| p) && !cold_fields.iter().all(|&p| p) {
            return Err(PipelineError::Internal(
                "assembled record has partial coldpreview fields".into(),
            ));
        }
        Ok(())
    }
}
