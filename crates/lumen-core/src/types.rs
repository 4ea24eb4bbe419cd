//! Core data types for the Lumen ingestion pipeline.
//!
//! [`PhotoRecord`] is the immutable output of one successful run. Its
//! serde schema is the wire contract: every field is always present,
//! and nullable fields serialize as explicit JSON `null` so a consumer
//! can distinguish "not requested" from "failed to extract".

use serde::{Deserialize, Serialize};

use crate::error::{ErrorKind, PipelineError};

/// GPS position in decimal degrees.
///
/// Both coordinates are always present together; partially populated
/// GPS never exists (the extractor drops the pair if any component is
/// missing or malformed).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GpsCoordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// Camera and capture metadata, each field independently nullable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BasicMetadata {
    /// Capture timestamp, ISO-8601 (`YYYY-MM-DDTHH:MM:SS`)
    pub taken_at: Option<String>,

    /// Camera manufacturer
    pub camera_make: Option<String>,

    /// Camera model
    pub camera_model: Option<String>,

    /// GPS position; `None` unless every component was well-formed
    pub gps: Option<GpsCoordinates>,
}

/// Exposure settings, each field independently nullable.
///
/// Absence of one field never implies absence of another; cameras
/// populate these inconsistently across vendors.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CameraSettings {
    /// ISO sensitivity
    pub iso: Option<u32>,

    /// Aperture as an f-number (e.g. 1.8)
    pub aperture: Option<f64>,

    /// Shutter speed as display text (e.g. "1/250")
    pub shutter_speed: Option<String>,

    /// Focal length in mm
    pub focal_length: Option<f64>,

    /// Lens model
    pub lens_model: Option<String>,

    /// Lens manufacturer
    pub lens_make: Option<String>,
}

/// The immutable success output of one pipeline run.
///
/// Field set and types follow the PhotoEgg wire schema. Binary
/// artifacts cross the boundary as base64 text. No field uses
/// `skip_serializing_if`: nullable fields must appear as `null`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhotoRecord {
    // === Identity ===
    /// BLAKE3 digest of the encoded hotpreview bytes (64 hex chars)
    pub hothash: String,

    // === Hotpreview (always present) ===
    /// Base64-encoded JPEG
    pub hotpreview_base64: String,
    pub hotpreview_width: u32,
    pub hotpreview_height: u32,

    // === Coldpreview (present iff requested) ===
    /// Base64-encoded JPEG, `null` when no size was requested
    pub coldpreview_base64: Option<String>,
    pub coldpreview_width: Option<u32>,
    pub coldpreview_height: Option<u32>,

    // === File info ===
    pub primary_filename: String,

    /// Source raster width in pixels
    pub width: u32,

    /// Source raster height in pixels
    pub height: u32,

    // === Capture metadata ===
    pub taken_at: Option<String>,
    pub camera_make: Option<String>,
    pub camera_model: Option<String>,

    // === GPS ===
    pub gps_latitude: Option<f64>,
    pub gps_longitude: Option<f64>,
    pub has_gps: bool,

    // === Camera settings ===
    pub iso: Option<u32>,
    pub aperture: Option<f64>,
    pub shutter_speed: Option<String>,
    pub focal_length: Option<f64>,
    pub lens_model: Option<String>,
    pub lens_make: Option<String>,
}

/// Failure half of a [`ProcessingOutcome`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureInfo {
    pub kind: ErrorKind,
    pub message: String,
}

/// Tagged result of one pipeline invocation.
///
/// Internally tagged: `{"status":"success",...}` or
/// `{"status":"failure",...}`. Never a partially filled success.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ProcessingOutcome {
    Success(Box<PhotoRecord>),
    Failure(FailureInfo),
}

impl ProcessingOutcome {
    /// Convert a pipeline result at the outcome boundary.
    pub fn from_result(result: Result<PhotoRecord, PipelineError>) -> Self {
        match result {
            Ok(record) => Self::Success(Box::new(record)),
            Err(err) => Self::Failure(FailureInfo {
                kind: err.kind(),
                message: err.to_string(),
            }),
        }
    }

    /// Whether this outcome is a success.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}
