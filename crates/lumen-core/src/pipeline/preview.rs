//! Deterministic preview derivation from the canonical raster.
//!
//! The hotpreview's encoded bytes are the hash input, so everything
//! that shapes them is pinned here: bounding box, resize filter, and
//! encoder quality. Changing any of these constants changes every
//! hothash ever issued: treat them as part of the wire format.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::{self, FilterType};
use image::RgbImage;

use crate::error::PipelineError;

use super::decode::CanonicalRaster;

/// Hotpreview bounding box edge, in pixels.
pub const HOTPREVIEW_BOX: u32 = 150;

/// Smallest accepted coldpreview bounding box. Requests below it are
/// rejected, never silently clamped up.
pub const MIN_COLDPREVIEW_SIZE: u32 = 150;

/// The one resize filter both previews use. Shared so their pixel
/// statistics stay comparable for perceptual comparison downstream.
pub const PREVIEW_FILTER: FilterType = FilterType::Lanczos3;

/// Fixed lossy quality for the JPEG re-encode.
pub const PREVIEW_JPEG_QUALITY: u8 = 85;

/// One encoded preview: JPEG bytes plus pixel dimensions.
#[derive(Debug, Clone)]
pub struct PreviewArtifact {
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl PreviewArtifact {
    /// Base64 text of the encoded bytes, for the JSON boundary.
    pub fn to_base64(&self) -> String {
        BASE64.encode(&self.bytes)
    }
}

/// Derives the two thumbnail artifacts from the canonical raster.
pub struct PreviewGenerator;

impl PreviewGenerator {
    /// Generate the always-present hotpreview.
    pub fn hotpreview(raster: &CanonicalRaster) -> Result<PreviewArtifact, PipelineError> {
        Self::render(raster, HOTPREVIEW_BOX)
    }

    /// Generate a coldpreview at an explicitly requested bounding box.
    pub fn coldpreview(
        raster: &CanonicalRaster,
        size: u32,
    ) -> Result<PreviewArtifact, PipelineError> {
        Self::check_coldpreview_size(size)?;
        Self::render(raster, size)
    }

    /// Validate a requested coldpreview size without touching pixels,
    /// so malformed requests fail before any decode work.
    pub fn check_coldpreview_size(size: u32) -> Result<(), PipelineError> {
        if size < MIN_COLDPREVIEW_SIZE {
            return Err(PipelineError::InvalidParameter(format!(
                "coldpreview_size must be >= {MIN_COLDPREVIEW_SIZE}, got {size}"
            )));
        }
        Ok(())
    }

    /// Aspect-preserving resize into the box, then JPEG encode.
    fn render(raster: &CanonicalRaster, box_edge: u32) -> Result<PreviewArtifact, PipelineError> {
        let (width, height) = fit_within(raster.width(), raster.height(), box_edge);

        let resized: RgbImage = if (width, height) == (raster.width(), raster.height()) {
            raster.pixels().clone()
        } else {
            imageops::resize(raster.pixels(), width, height, PREVIEW_FILTER)
        };

        let mut bytes = Vec::new();
        JpegEncoder::new_with_quality(&mut bytes, PREVIEW_JPEG_QUALITY)
            .encode_image(&resized)
            .map_err(|e| PipelineError::Internal(format!("preview encode failed: {e}")))?;

        Ok(PreviewArtifact {
            bytes,
            width,
            height,
        })
    }
}

/// Scale dimensions to fit a square bounding box, preserving aspect
/// ratio. Never upscales: a raster already inside the box keeps its
/// size and is only re-encoded.
fn fit_within(width: u32, height: u32, box_edge: u32) -> (u32, u32) {
    if width <= box_edge && height <= box_edge {
        return (width, height);
    }
    let scale = box_edge as f64 / width.max(height) as f64;
    let w = ((width as f64 * scale).round() as u32).clamp(1, box_edge);
    let h = ((height as f64 * scale).round() as u32).clamp(1, box_edge);
    (w, h)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::testutil::gradient_raster;

    #[test]
    fn test_hotpreview_bounded_by_box() {
        let raster = gradient_raster(4000, 3000);
        let preview = PreviewGenerator::hotpreview(&raster).unwrap();

        assert_eq!(preview.width, 150);
        assert_eq!(preview.height, 113);
        assert!(!preview.bytes.is_empty());
        // JPEG SOI marker
        assert_eq!(&preview.bytes[0..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn test_hotpreview_is_byte_deterministic() {
        let raster = gradient_raster(640, 480);
        let a = PreviewGenerator::hotpreview(&raster).unwrap();
        let b = PreviewGenerator::hotpreview(&raster).unwrap();
        assert_eq!(a.bytes, b.bytes);
    }

    #[test]
    fn test_small_raster_not_upscaled() {
        let raster = gradient_raster(100, 80);
        let preview = PreviewGenerator::hotpreview(&raster).unwrap();
        assert_eq!((preview.width, preview.height), (100, 80));
    }

    #[test]
    fn test_coldpreview_below_minimum_rejected() {
        let raster = gradient_raster(640, 480);
        let err = PreviewGenerator::coldpreview(&raster, 149).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidParameter(_)));
    }

    #[test]
    fn test_coldpreview_at_minimum_accepted() {
        let raster = gradient_raster(640, 480);
        let preview = PreviewGenerator::coldpreview(&raster, 150).unwrap();
        assert!(preview.width <= 150 && preview.height <= 150);
    }

    #[test]
    fn test_coldpreview_bounded_by_requested_size() {
        let raster = gradient_raster(4000, 3000);
        let preview = PreviewGenerator::coldpreview(&raster, 2560).unwrap();
        assert_eq!(preview.width, 2560);
        assert_eq!(preview.height, 1920);
    }

    #[test]
    fn test_portrait_orientation_fits_height() {
        let raster = gradient_raster(3000, 4000);
        let preview = PreviewGenerator::hotpreview(&raster).unwrap();
        assert_eq!(preview.height, 150);
        assert_eq!(preview.width, 113);
    }

    #[test]
    fn test_base64_roundtrip() {
        let raster = gradient_raster(320, 240);
        let preview = PreviewGenerator::hotpreview(&raster).unwrap();
        let decoded = BASE64.decode(preview.to_base64()).unwrap();
        assert_eq!(decoded, preview.bytes);
    }

    #[test]
    fn test_fit_within_extreme_aspect() {
        // A 10000x10 strip must keep both dimensions >= 1
        let (w, h) = fit_within(10000, 10, 150);
        assert_eq!(w, 150);
        assert_eq!(h, 1);
    }
}
