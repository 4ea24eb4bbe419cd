//! RAW sensor normalization into the canonical raster.
//!
//! The capability is resolved once at pipeline construction: it exists
//! only when the `raw-decode` feature was compiled in AND `raw.enabled`
//! is set. A RAW input arriving without it fails fast with
//! `MissingCapability` before any decode attempt.
//!
//! Demosaicing is CPU- and memory-heavy, so decodes are bounded by a
//! counted slot pool. The permit guard moves into the blocking task,
//! which means a caller that abandons the request cannot leak a slot -
//! the slot frees when the decode finishes, success or not.
//!
//! The rendering is fixed and reproducible: per-channel black/white
//! normalization, bilinear demosaic, as-shot white balance, gamma 2.2.
//! No creative development.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task;
use tokio::time::timeout;

use crate::config::{Config, LimitsConfig};
use crate::error::PipelineError;

use super::decode::CanonicalRaster;
use super::dispatch::RawKind;

/// Converts RAW sensor data into the same canonical raster
/// representation standard formats decode to.
pub struct RawNormalizer {
    slots: Arc<Semaphore>,
    acquire_timeout: Duration,
    limits: LimitsConfig,
}

impl RawNormalizer {
    /// Resolve the RAW capability from configuration.
    ///
    /// Returns `None` when the capability is absent (feature not
    /// compiled, or disabled at runtime); the pipeline then rejects
    /// RAW inputs up front instead of failing deep inside a decode.
    pub fn from_config(config: &Config) -> Option<Self> {
        if !Self::capability_compiled() || !config.raw.enabled {
            return None;
        }
        Some(Self {
            slots: Arc::new(Semaphore::new(config.raw.max_concurrent_decodes)),
            acquire_timeout: Duration::from_millis(config.raw.acquire_timeout_ms),
            limits: config.limits.clone(),
        })
    }

    /// Whether RAW support was compiled into this build.
    pub const fn capability_compiled() -> bool {
        cfg!(feature = "raw-decode")
    }

    /// Decode a RAW buffer into the canonical raster.
    ///
    /// Acquires a decode slot first, waiting at most the configured
    /// interval; a saturated pool fails `Busy` rather than queuing
    /// unboundedly.
    pub async fn normalize(
        &self,
        bytes: Vec<u8>,
        kind: RawKind,
        filename: &str,
    ) -> Result<CanonicalRaster, PipelineError> {
        let permit = self.acquire_slot().await?;

        let name = filename.to_string();
        let limits = self.limits.clone();
        tracing::debug!("RAW decode start ({}): {}", kind.as_str(), name);

        task::spawn_blocking(move || {
            // Slot released when the decode ends, even if the caller
            // abandoned the future in the meantime.
            let _slot = permit;
            decode_sensor(&bytes, &name, &limits)
        })
        .await
        .map_err(|e| PipelineError::Internal(format!("RAW decode task join error: {e}")))?
    }

    async fn acquire_slot(
        &self,
    ) -> Result<tokio::sync::OwnedSemaphorePermit, PipelineError> {
        match timeout(self.acquire_timeout, self.slots.clone().acquire_owned()).await {
            Ok(Ok(permit)) => Ok(permit),
            Ok(Err(_)) => Err(PipelineError::Internal("RAW slot pool closed".into())),
            Err(_) => Err(PipelineError::Busy {
                waited_ms: self.acquire_timeout.as_millis() as u64,
            }),
        }
    }
}

/// Fixed develop pipeline: sensor data in, 8-bit RGB out.
#[cfg(feature = "raw-decode")]
fn decode_sensor(
    bytes: &[u8],
    filename: &str,
    limits: &LimitsConfig,
) -> Result<CanonicalRaster, PipelineError> {
    use std::io::Cursor;

    let raw_decode_err = |message: String| PipelineError::RawDecode {
        filename: filename.to_string(),
        message,
    };

    let raw = rawloader::decode(&mut Cursor::new(bytes)).map_err(|e| raw_decode_err(e.to_string()))?;

    let data = match &raw.data {
        rawloader::RawImageData::Integer(data) => data,
        rawloader::RawImageData::Float(_) => {
            return Err(raw_decode_err(
                "floating-point sensor data is not supported".to_string(),
            ));
        }
    };

    // Active sensor area; crops are [top, right, bottom, left]
    let (top, right, bottom, left) = (raw.crops[0], raw.crops[1], raw.crops[2], raw.crops[3]);
    let width = raw
        .width
        .checked_sub(left + right)
        .filter(|w| *w > 0)
        .ok_or_else(|| raw_decode_err("degenerate crop geometry".to_string()))?;
    let height = raw
        .height
        .checked_sub(top + bottom)
        .filter(|h| *h > 0)
        .ok_or_else(|| raw_decode_err("degenerate crop geometry".to_string()))?;
    if data.len() < raw.width * raw.height * raw.cpp {
        return Err(raw_decode_err("sensor data shorter than declared".to_string()));
    }

    let max = limits.max_image_dimension as usize;
    if width > max || height > max {
        return Err(PipelineError::InvalidParameter(format!(
            "image dimensions {width}x{height} exceed limit {max}"
        )));
    }

    let rgb = match raw.cpp {
        1 => demosaic_bilinear(&raw, data, top, left, width, height),
        3 => interleaved_rgb(&raw, data, top, left, width, height),
        other => {
            return Err(raw_decode_err(format!(
                "unsupported components-per-pixel {other}"
            )));
        }
    };

    let image = image::RgbImage::from_raw(width as u32, height as u32, rgb)
        .ok_or_else(|| PipelineError::Internal("RAW raster buffer size mismatch".into()))?;
    Ok(CanonicalRaster::from_rgb(image))
}

#[cfg(not(feature = "raw-decode"))]
fn decode_sensor(
    _bytes: &[u8],
    _filename: &str,
    _limits: &LimitsConfig,
) -> Result<CanonicalRaster, PipelineError> {
    Err(PipelineError::MissingCapability)
}

/// Normalize one sensor sample to linear [0, 1] for its CFA color.
#[cfg(feature = "raw-decode")]
fn normalize_sample(raw: &rawloader::RawImage, value: u16, color: usize) -> f32 {
    let black = raw.blacklevels[color] as f32;
    let white = raw.whitelevels[color] as f32;
    let range = (white - black).max(1.0);
    ((value as f32 - black) / range).clamp(0.0, 1.0)
}

/// As-shot white balance scale, green-normalized. Falls back to
/// neutral when the camera recorded no usable coefficients.
#[cfg(feature = "raw-decode")]
fn wb_scales(raw: &rawloader::RawImage) -> [f32; 4] {
    let green = raw.wb_coeffs[1];
    if !green.is_finite() || green <= 0.0 {
        return [1.0; 4];
    }
    let mut scales = [1.0f32; 4];
    for (i, scale) in scales.iter_mut().enumerate() {
        let c = raw.wb_coeffs[i];
        if c.is_finite() && c > 0.0 {
            *scale = c / green;
        }
    }
    // Second green shares the green scale
    scales[3] = scales[1];
    scales
}

/// Bilinear demosaic of a Bayer mosaic: the pixel's own channel is
/// kept exact, the two missing channels average over the 3x3
/// neighborhood samples that carry them.
#[cfg(feature = "raw-decode")]
fn demosaic_bilinear(
    raw: &rawloader::RawImage,
    data: &[u16],
    top: usize,
    left: usize,
    width: usize,
    height: usize,
) -> Vec<u8> {
    let scales = wb_scales(raw);

    // Pre-balanced mosaic over the active area, with the RGB channel
    // (second green folded into green) each sample carries.
    let mut values = vec![0.0f32; width * height];
    let mut channels = vec![0u8; width * height];
    for y in 0..height {
        for x in 0..width {
            let (sy, sx) = (top + y, left + x);
            let color = raw.cfa.color_at(sy, sx);
            let sample = data[sy * raw.width + sx];
            let idx = y * width + x;
            values[idx] = normalize_sample(raw, sample, color) * scales[color.min(3)];
            channels[idx] = match color {
                0 => 0,
                2 => 2,
                _ => 1,
            };
        }
    }

    let mut rgb = vec![0u8; width * height * 3];
    for y in 0..height {
        for x in 0..width {
            let mut sum = [0.0f32; 3];
            let mut count = [0u32; 3];
            for ny in y.saturating_sub(1)..(y + 2).min(height) {
                for nx in x.saturating_sub(1)..(x + 2).min(width) {
                    let idx = ny * width + nx;
                    let ch = channels[idx] as usize;
                    sum[ch] += values[idx];
                    count[ch] += 1;
                }
            }

            let own_idx = y * width + x;
            let own_ch = channels[own_idx] as usize;
            let out = &mut rgb[own_idx * 3..own_idx * 3 + 3];
            for ch in 0..3 {
                let v = if ch == own_ch {
                    values[own_idx]
                } else if count[ch] > 0 {
                    sum[ch] / count[ch] as f32
                } else {
                    0.0
                };
                out[ch] = gamma_encode(v);
            }
        }
    }
    rgb
}

/// Sensor data already carrying three components per pixel (linear
/// RGB raws); normalized and gamma-encoded without demosaic.
#[cfg(feature = "raw-decode")]
fn interleaved_rgb(
    raw: &rawloader::RawImage,
    data: &[u16],
    top: usize,
    left: usize,
    width: usize,
    height: usize,
) -> Vec<u8> {
    let mut rgb = vec![0u8; width * height * 3];
    for y in 0..height {
        for x in 0..width {
            let src = ((top + y) * raw.width + (left + x)) * 3;
            let dst = (y * width + x) * 3;
            for ch in 0..3 {
                let v = normalize_sample(raw, data[src + ch], ch);
                rgb[dst + ch] = gamma_encode(v);
            }
        }
    }
    rgb
}

/// Fixed display gamma. Part of the pinned rendering: changing this
/// changes every RAW-derived hothash.
#[cfg(feature = "raw-decode")]
fn gamma_encode(linear: f32) -> u8 {
    (linear.clamp(0.0, 1.0).powf(1.0 / 2.2) * 255.0).round() as u8
}
