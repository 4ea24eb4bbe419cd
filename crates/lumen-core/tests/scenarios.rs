//! End-to-end scenarios over the public pipeline API.
//!
//! These build real containers in memory: a JPEG body from the image
//! encoder with an EXIF APP1 segment spliced in after SOI, so the
//! metadata path is exercised through the same bytes the raster path
//! decodes.

use std::io::Cursor;

use exif::experimental::Writer;
use exif::{Field, In, Rational, Tag, Value};
use image::codecs::jpeg::JpegEncoder;
use image::RgbImage;

use lumen_core::{Config, ImagePipeline, ProcessOptions};

fn gradient_jpeg(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
    });
    let mut buf = Vec::new();
    JpegEncoder::new_with_quality(&mut buf, 90)
        .encode_image(&img)
        .unwrap();
    buf
}

fn ascii(tag: Tag, text: &str) -> Field {
    Field {
        tag,
        ifd_num: In::PRIMARY,
        value: Value::Ascii(vec![text.as_bytes().to_vec()]),
    }
}

fn rational(tag: Tag, num: u32, denom: u32) -> Field {
    Field {
        tag,
        ifd_num: In::PRIMARY,
        value: Value::Rational(vec![Rational { num, denom }]),
    }
}

fn dms(tag: Tag, d: u32, m: u32, s: u32) -> Field {
    Field {
        tag,
        ifd_num: In::PRIMARY,
        value: Value::Rational(vec![
            Rational { num: d, denom: 1 },
            Rational { num: m, denom: 1 },
            Rational { num: s, denom: 1 },
        ]),
    }
}

/// Wrap a TIFF-encoded directory into a JPEG APP1 segment.
fn app1_segment(tiff: &[u8]) -> Vec<u8> {
    let mut seg = vec![0xFF, 0xE1];
    // Length counts itself plus the Exif identifier
    let len = (tiff.len() + 8) as u16;
    seg.extend_from_slice(&len.to_be_bytes());
    seg.extend_from_slice(b"Exif\0\0");
    seg.extend_from_slice(tiff);
    seg
}

/// Splice an APP1 segment right after SOI.
fn splice(jpeg: &[u8], segment: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(jpeg.len() + segment.len());
    out.extend_from_slice(&jpeg[..2]);
    out.extend_from_slice(segment);
    out.extend_from_slice(&jpeg[2..]);
    out
}

fn jpeg_with_exif(width: u32, height: u32, fields: &[Field]) -> Vec<u8> {
    let mut writer = Writer::new();
    for field in fields {
        writer.push_field(field);
    }
    let mut cursor = Cursor::new(Vec::new());
    writer.write(&mut cursor, false).unwrap();
    splice(&gradient_jpeg(width, height), &app1_segment(&cursor.into_inner()))
}

fn full_exif() -> Vec<Field> {
    vec![
        ascii(Tag::DateTimeOriginal, "2024:06:01 14:03:22"),
        ascii(Tag::Make, "Canon"),
        ascii(Tag::Model, "Canon EOS R5"),
        dms(Tag::GPSLatitude, 59, 54, 0),
        ascii(Tag::GPSLatitudeRef, "N"),
        dms(Tag::GPSLongitude, 10, 45, 0),
        ascii(Tag::GPSLongitudeRef, "E"),
        rational(Tag::FNumber, 28, 10),
        rational(Tag::ExposureTime, 1, 250),
        rational(Tag::FocalLength, 35, 1),
        Field {
            tag: Tag::PhotographicSensitivity,
            ifd_num: In::PRIMARY,
            value: Value::Short(vec![400]),
        },
        ascii(Tag::LensModel, "RF35mm F1.8 MACRO IS STM"),
    ]
}

#[tokio::test]
async fn full_exif_jpeg_with_coldpreview() {
    // 4000x3000 JPEG, full EXIF + GPS, coldpreview at 2560
    let bytes = jpeg_with_exif(4000, 3000, &full_exif());
    let pipeline = ImagePipeline::new(&Config::default());
    let options = ProcessOptions {
        coldpreview_size: Some(2560),
    };

    let record = pipeline
        .process_bytes(bytes, "IMG_0001.jpg", &options)
        .await
        .unwrap();

    assert_eq!(record.width, 4000);
    assert_eq!(record.height, 3000);
    assert_eq!(record.primary_filename, "IMG_0001.jpg");

    assert!(record.hotpreview_width <= 150 && record.hotpreview_height <= 150);
    assert_eq!(record.coldpreview_width, Some(2560));
    assert_eq!(record.coldpreview_height, Some(1920));
    assert!(record.coldpreview_base64.is_some());

    assert_eq!(record.hothash.len(), 64);
    assert!(record.hothash.chars().all(|c| c.is_ascii_hexdigit()));

    assert_eq!(record.taken_at.as_deref(), Some("2024-06-01T14:03:22"));
    assert_eq!(record.camera_make.as_deref(), Some("Canon"));
    assert_eq!(record.camera_model.as_deref(), Some("Canon EOS R5"));

    assert!(record.has_gps);
    let lat = record.gps_latitude.unwrap();
    let lon = record.gps_longitude.unwrap();
    assert!((lat - 59.9).abs() < 1e-9);
    assert!((lon - 10.75).abs() < 1e-9);

    assert_eq!(record.iso, Some(400));
    assert_eq!(record.aperture, Some(2.8));
    assert_eq!(record.shutter_speed.as_deref(), Some("1/250"));
    assert_eq!(record.focal_length, Some(35.0));
    assert_eq!(
        record.lens_model.as_deref(),
        Some("RF35mm F1.8 MACRO IS STM")
    );
}

#[tokio::test]
async fn corrupt_metadata_directory_never_blocks_previews() {
    // Valid JPEG raster with an APP1 whose TIFF payload is garbage:
    // only metadata degrades, previews and hash still come out
    let garbage = vec![0xABu8; 64];
    let bytes = splice(&gradient_jpeg(800, 600), &app1_segment(&garbage));

    let pipeline = ImagePipeline::new(&Config::default());
    let record = pipeline
        .process_bytes(bytes, "mangled.jpg", &ProcessOptions::default())
        .await
        .unwrap();

    assert_eq!(record.width, 800);
    assert!(!record.hotpreview_base64.is_empty());
    assert_eq!(record.hothash.len(), 64);

    assert!(record.taken_at.is_none());
    assert!(record.camera_make.is_none());
    assert!(!record.has_gps);
    assert!(record.iso.is_none());
}

#[tokio::test]
async fn hothash_stable_for_identical_bytes() {
    let bytes = jpeg_with_exif(1024, 768, &full_exif());
    let pipeline = ImagePipeline::new(&Config::default());

    let a = pipeline
        .process_bytes(bytes.clone(), "same.jpg", &ProcessOptions::default())
        .await
        .unwrap();
    let b = pipeline
        .process_bytes(bytes, "same.jpg", &ProcessOptions::default())
        .await
        .unwrap();

    assert_eq!(a.hothash, b.hothash);
    assert_eq!(a.hotpreview_base64, b.hotpreview_base64);
}

#[tokio::test]
async fn outcome_json_carries_every_field() {
    // The wire schema is closed: all 22 fields present, nullable ones
    // as explicit null
    let bytes = gradient_jpeg(320, 240);
    let pipeline = ImagePipeline::new(&Config::default());

    let outcome = pipeline
        .process_outcome(bytes, "wire.jpg", &ProcessOptions::default())
        .await;
    let json = serde_json::to_value(&outcome).unwrap();

    for field in [
        "hothash",
        "hotpreview_base64",
        "hotpreview_width",
        "hotpreview_height",
        "coldpreview_base64",
        "coldpreview_width",
        "coldpreview_height",
        "primary_filename",
        "width",
        "height",
        "taken_at",
        "camera_make",
        "camera_model",
        "gps_latitude",
        "gps_longitude",
        "has_gps",
        "iso",
        "aperture",
        "shutter_speed",
        "focal_length",
        "lens_model",
        "lens_make",
    ] {
        assert!(
            json.get(field).is_some(),
            "output schema is missing {field}"
        );
    }
    assert_eq!(json["coldpreview_base64"], serde_json::Value::Null);
    assert_eq!(json["status"], "success");
}
