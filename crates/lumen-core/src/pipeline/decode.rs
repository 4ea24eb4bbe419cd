//! Standard-format decoding into the canonical raster.
//!
//! JPEG and PNG inputs decode here; RAW inputs converge on the same
//! [`CanonicalRaster`] through `pipeline::raw`. Everything downstream
//! operates on the raster only and cannot tell the two paths apart.

use image::{DynamicImage, RgbImage};
use tokio::task;

use crate::config::LimitsConfig;
use crate::error::PipelineError;

use super::dispatch::FormatTag;

/// The single in-memory pixel representation all formats converge to:
/// an 8-bit RGB grid.
#[derive(Debug, Clone)]
pub struct CanonicalRaster {
    image: RgbImage,
}

impl CanonicalRaster {
    /// Flatten any decoded image into 8-bit RGB.
    pub fn from_dynamic(image: DynamicImage) -> Self {
        Self {
            image: image.into_rgb8(),
        }
    }

    /// Wrap an already-canonical RGB buffer.
    pub fn from_rgb(image: RgbImage) -> Self {
        Self { image }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Borrow the underlying pixel grid.
    pub fn pixels(&self) -> &RgbImage {
        &self.image
    }
}

/// Decodes standard raster formats with dimension enforcement.
///
/// Decoding runs on the blocking pool; unlike the RAW path it is cheap
/// enough to run unpooled at whatever concurrency the caller drives.
pub struct ImageDecoder {
    limits: LimitsConfig,
}

impl ImageDecoder {
    pub fn new(limits: LimitsConfig) -> Self {
        Self { limits }
    }

    /// Decode an in-memory buffer whose format tag is already known.
    pub async fn decode(
        &self,
        bytes: Vec<u8>,
        tag: FormatTag,
        filename: &str,
    ) -> Result<CanonicalRaster, PipelineError> {
        let limits = self.limits.clone();
        let name = filename.to_string();

        task::spawn_blocking(move || Self::decode_sync(&bytes, tag, &name, &limits))
            .await
            .map_err(|e| PipelineError::Internal(format!("decode task join error: {e}")))?
    }

    /// Synchronous decode (runs in spawn_blocking).
    fn decode_sync(
        bytes: &[u8],
        tag: FormatTag,
        filename: &str,
        limits: &LimitsConfig,
    ) -> Result<CanonicalRaster, PipelineError> {
        let format = match tag {
            FormatTag::Jpeg => image::ImageFormat::Jpeg,
            FormatTag::Png => image::ImageFormat::Png,
            _ => {
                return Err(PipelineError::Internal(format!(
                    "standard decoder invoked for non-standard tag {tag:?}"
                )))
            }
        };

        let decoded = image::load_from_memory_with_format(bytes, format).map_err(|e| {
            PipelineError::Decode {
                filename: filename.to_string(),
                message: e.to_string(),
            }
        })?;

        let (width, height) = (decoded.width(), decoded.height());
        if width > limits.max_image_dimension || height > limits.max_image_dimension {
            return Err(PipelineError::InvalidParameter(format!(
                "image dimensions {width}x{height} exceed limit {}",
                limits.max_image_dimension
            )));
        }

        Ok(CanonicalRaster::from_dynamic(decoded))
    }
}
