//! The image ingestion pipeline.
//!
//! Stages, leaf-first:
//! - **dispatch**: classify input bytes into a format tag
//! - **decode**: standard raster formats into the canonical raster
//! - **raw**: RAW sensor data into the same canonical raster
//! - **metadata**: embedded EXIF directory with per-field fallback
//! - **preview**: deterministic hotpreview/coldpreview derivation
//! - **hash**: content identity from the encoded hotpreview bytes
//! - **assemble**: merge everything into one immutable record
//! - **processor**: orchestrates the stages

pub mod assemble;
pub mod decode;
pub mod dispatch;
pub mod hash;
pub mod metadata;
pub mod preview;
pub mod processor;
pub mod raw;

// Re-exports for convenient access
pub use assemble::Assembler;
pub use decode::{CanonicalRaster, ImageDecoder};
pub use dispatch::{Confidence, Detection, Dispatcher, FormatTag, RawKind};
pub use hash::HashCalculator;
pub use metadata::{ExtractedMetadata, MetadataExtractor};
pub use preview::{PreviewArtifact, PreviewGenerator};
pub use processor::{ImagePipeline, ProcessOptions};
pub use raw::RawNormalizer;

/// Synthetic in-memory images shared across the stage tests.
#[cfg(test)]
pub(crate) mod testutil {
    use image::codecs::jpeg::JpegEncoder;
    use image::codecs::png::PngEncoder;
    use image::{ImageEncoder, RgbImage};

    use super::decode::CanonicalRaster;

    fn gradient(width: u32, height: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| {
            image::Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
        })
    }

    pub fn gradient_raster(width: u32, height: u32) -> CanonicalRaster {
        CanonicalRaster::from_rgb(gradient(width, height))
    }

    pub fn encode_png(width: u32, height: u32) -> Vec<u8> {
        let img = gradient(width, height);
        let mut buf = Vec::new();
        PngEncoder::new(&mut buf)
            .write_image(img.as_raw(), width, height, image::ExtendedColorType::Rgb8)
            .unwrap();
        buf
    }

    pub fn encode_jpeg(width: u32, height: u32) -> Vec<u8> {
        let img = gradient(width, height);
        let mut buf = Vec::new();
        JpegEncoder::new_with_quality(&mut buf, 90)
            .encode_image(&img)
            .unwrap();
        buf
    }
}
