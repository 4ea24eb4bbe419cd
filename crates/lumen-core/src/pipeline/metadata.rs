//! EXIF metadata extraction with per-field fallback chains.
//!
//! Extraction reads the embedded IFD directory of the ORIGINAL
//! container bytes: for RAW inputs that is the RAW container itself,
//! since tags rarely survive conversion. Each field tries an ordered
//! chain of named sources; the first well-formed one wins. Extraction
//! never blocks the raster pipeline: a structurally corrupt directory
//! degrades to all-null fields and is only logged.

use std::io::Cursor;

use exif::{In, Reader, Tag, Value};

use crate::error::PipelineError;
use crate::types::{BasicMetadata, CameraSettings, GpsCoordinates};

/// Everything the extractor can produce for one input.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractedMetadata {
    pub basic: BasicMetadata,
    pub settings: CameraSettings,
}

/// A named entry in a fallback chain. The name only feeds tracing, so
/// a log line can say which source won.
struct FieldSource {
    name: &'static str,
    tag: Tag,
}

/// Capture timestamp sources, in order. The filesystem modification
/// time is deliberately never a fallback: it fabricates precision the
/// capture never had.
const TAKEN_AT_CHAIN: &[FieldSource] = &[
    FieldSource {
        name: "DateTimeOriginal",
        tag: Tag::DateTimeOriginal,
    },
    FieldSource {
        name: "DateTimeDigitized",
        tag: Tag::DateTimeDigitized,
    },
];

/// ISO sources, in order.
const ISO_CHAIN: &[FieldSource] = &[
    FieldSource {
        name: "PhotographicSensitivity",
        tag: Tag::PhotographicSensitivity,
    },
    FieldSource {
        name: "ISOSpeed",
        tag: Tag::ISOSpeed,
    },
];

/// Extracts structured metadata from image containers.
pub struct MetadataExtractor;

impl MetadataExtractor {
    /// Extract metadata from the original container bytes.
    ///
    /// Infallible by design: corruption degrades to all-null fields so
    /// metadata quality never blocks preview or hash generation.
    pub fn extract(bytes: &[u8], filename: &str) -> ExtractedMetadata {
        match Self::read_directory(bytes) {
            Ok(Some(exif)) => ExtractedMetadata {
                basic: Self::basic(&exif),
                settings: Self::settings(&exif),
            },
            Ok(None) => {
                tracing::debug!("No embedded metadata directory in {}", filename);
                ExtractedMetadata::default()
            }
            Err(e) => {
                let err = PipelineError::MetadataCorrupt {
                    filename: filename.to_string(),
                    message: e.to_string(),
                };
                tracing::warn!("{err}; continuing with null metadata");
                ExtractedMetadata::default()
            }
        }
    }

    /// Parse the container's metadata directory.
    ///
    /// `Ok(None)` means the container simply carries no directory;
    /// `Err` means the directory exists but is structurally malformed.
    fn read_directory(bytes: &[u8]) -> Result<Option<exif::Exif>, exif::Error> {
        match Reader::new().read_from_container(&mut Cursor::new(bytes)) {
            Ok(exif) => Ok(Some(exif)),
            Err(exif::Error::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn basic(exif: &exif::Exif) -> BasicMetadata {
        BasicMetadata {
            taken_at: Self::taken_at(exif),
            camera_make: Self::ascii_field(exif, Tag::Make),
            camera_model: Self::ascii_field(exif, Tag::Model),
            gps: Self::gps(exif),
        }
    }

    fn settings(exif: &exif::Exif) -> CameraSettings {
        // Fields are independent: absence of one never implies
        // absence of another.
        CameraSettings {
            iso: Self::iso(exif),
            aperture: Self::aperture(exif),
            shutter_speed: Self::shutter_speed(exif),
            focal_length: Self::focal_length(exif),
            lens_model: Self::ascii_field(exif, Tag::LensModel),
            lens_make: Self::ascii_field(exif, Tag::LensMake),
        }
    }

    // ── Per-field chains ───────────────────────────────────────────

    fn taken_at(exif: &exif::Exif) -> Option<String> {
        for source in TAKEN_AT_CHAIN {
            if let Some(dt) = Self::datetime_field(exif, source.tag) {
                tracing::trace!("taken_at resolved from {}", source.name);
                return Some(dt);
            }
        }
        None
    }

    fn iso(exif: &exif::Exif) -> Option<u32> {
        for source in ISO_CHAIN {
            if let Some(v) = Self::u32_field(exif, source.tag) {
                tracing::trace!("iso resolved from {}", source.name);
                return Some(v);
            }
        }
        None
    }

    /// FNumber directly, else ApertureValue (APEX: f = 2^(Av/2)).
    fn aperture(exif: &exif::Exif) -> Option<f64> {
        if let Some(f) = Self::rational_field(exif, Tag::FNumber) {
            return Some(f);
        }
        let av = Self::rational_field(exif, Tag::ApertureValue)?;
        let f = 2f64.powf(av / 2.0);
        Some((f * 10.0).round() / 10.0)
    }

    /// ExposureTime directly, else ShutterSpeedValue (APEX: t = 2^-Tv).
    fn shutter_speed(exif: &exif::Exif) -> Option<String> {
        if let Some(field) = exif.get_field(Tag::ExposureTime, In::PRIMARY) {
            if let Value::Rational(ref r) = field.value {
                if let Some(r) = r.first().filter(|r| r.num > 0 && r.denom > 0) {
                    return Self::format_exposure(r.num as f64 / r.denom as f64);
                }
            }
        }
        if let Some(field) = exif.get_field(Tag::ShutterSpeedValue, In::PRIMARY) {
            if let Value::SRational(ref r) = field.value {
                if let Some(r) = r.first().filter(|r| r.denom != 0) {
                    let tv = r.num as f64 / r.denom as f64;
                    return Self::format_exposure(2f64.powf(-tv));
                }
            }
        }
        None
    }

    fn focal_length(exif: &exif::Exif) -> Option<f64> {
        Self::rational_field(exif, Tag::FocalLength)
    }

    /// All-or-nothing GPS: latitude, longitude and both hemisphere
    /// references must be present and well-formed, or the pair is
    /// dropped entirely. No partial GPS.
    fn gps(exif: &exif::Exif) -> Option<GpsCoordinates> {
        let latitude =
            Self::gps_coordinate(exif, Tag::GPSLatitude, Tag::GPSLatitudeRef, 'N', 'S', 90.0)?;
        let longitude =
            Self::gps_coordinate(exif, Tag::GPSLongitude, Tag::GPSLongitudeRef, 'E', 'W', 180.0)?;
        Some(GpsCoordinates {
            latitude,
            longitude,
        })
    }

    fn gps_coordinate(
        exif: &exif::Exif,
        coord_tag: Tag,
        ref_tag: Tag,
        positive: char,
        negative: char,
        bound: f64,
    ) -> Option<f64> {
        let coord = exif.get_field(coord_tag, In::PRIMARY)?;
        let degrees = match coord.value {
            Value::Rational(ref r) if r.len() >= 3 => {
                if r[..3].iter().any(|v| v.denom == 0) {
                    return None;
                }
                r[0].to_f64() + r[1].to_f64() / 60.0 + r[2].to_f64() / 3600.0
            }
            _ => return None,
        };

        let reference = Self::ascii_field(exif, ref_tag)?;
        let sign = match reference.chars().next().map(|c| c.to_ascii_uppercase()) {
            Some(c) if c == positive => 1.0,
            Some(c) if c == negative => -1.0,
            _ => return None,
        };

        let value = sign * degrees;
        (value.abs() <= bound).then_some(value)
    }

    // ── Value helpers ──────────────────────────────────────────────

    /// First ASCII component, trimmed; empty strings are not
    /// well-formed and count as absent.
    fn ascii_field(exif: &exif::Exif, tag: Tag) -> Option<String> {
        let field = exif.get_field(tag, In::PRIMARY)?;
        match field.value {
            Value::Ascii(ref vecs) => vecs
                .first()
                .map(|v| {
                    String::from_utf8_lossy(v)
                        .trim_end_matches('\0')
                        .trim()
                        .to_string()
                })
                .filter(|s| !s.is_empty()),
            _ => None,
        }
    }

    /// EXIF datetime normalized to ISO-8601. A value that does not
    /// parse is not well-formed, so the caller's chain moves on.
    fn datetime_field(exif: &exif::Exif, tag: Tag) -> Option<String> {
        let field = exif.get_field(tag, In::PRIMARY)?;
        let raw = match field.value {
            Value::Ascii(ref vecs) => vecs.first()?,
            _ => return None,
        };
        let dt = exif::DateTime::from_ascii(raw).ok()?;
        Some(format!(
            "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}",
            dt.year, dt.month, dt.day, dt.hour, dt.minute, dt.second
        ))
    }

    fn u32_field(exif: &exif::Exif, tag: Tag) -> Option<u32> {
        let field = exif.get_field(tag, In::PRIMARY)?;
        match field.value {
            Value::Short(ref v) => v.first().map(|&x| x as u32),
            Value::Long(ref v) => v.first().copied(),
            _ => None,
        }
    }

    fn rational_field(exif: &exif::Exif, tag: Tag) -> Option<f64> {
        let field = exif.get_field(tag, In::PRIMARY)?;
        match field.value {
            Value::Rational(ref v) => v
                .first()
                .filter(|r| r.denom != 0)
                .map(|r| r.to_f64())
                .filter(|f| *f > 0.0),
            _ => None,
        }
    }

    /// Conventional exposure display: "1/250" below a second,
    /// "2.5" / "30" at or above.
    fn format_exposure(seconds: f64) -> Option<String> {
        if !seconds.is_finite() || seconds <= 0.0 {
            return None;
        }
        if seconds < 1.0 {
            Some(format!("1/{}", (1.0 / seconds).round() as u64))
        } else if seconds.fract() == 0.0 {
            Some(format!("{}", seconds as u64))
        } else {
            Some(format!("{seconds:.1}"))
        }
    }
}
