//! Format classification from magic-byte signatures.
//!
//! Classification is primarily by signature; the filename extension is
//! advisory only and never the sole basis for a tag. TIFF containers
//! need the advisory step because several RAW families (NEF, ARW, DNG,
//! PEF) are plain TIFF at the byte level. The tag is produced once here
//! and never re-derived downstream.

use std::path::Path;

/// Recognized format families.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatTag {
    Jpeg,
    Png,
    Raw(RawKind),
    Unknown,
}

/// RAW container subtypes the pipeline can dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawKind {
    /// Canon CR2
    Cr2,
    /// Nikon NEF
    Nef,
    /// Sony ARW
    Arw,
    /// Adobe DNG
    Dng,
    /// Fujifilm RAF
    Raf,
    /// Olympus ORF
    Orf,
    /// Panasonic RW2
    Rw2,
    /// Pentax PEF
    Pef,
}

impl RawKind {
    /// Short lowercase name, matching the conventional file extension.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cr2 => "cr2",
            Self::Nef => "nef",
            Self::Arw => "arw",
            Self::Dng => "dng",
            Self::Raf => "raf",
            Self::Orf => "orf",
            Self::Rw2 => "rw2",
            Self::Pef => "pef",
        }
    }
}

/// How the tag was established.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confidence {
    /// The signature alone identifies the format
    Signature,
    /// The signature identifies a container family; the extension
    /// refined it to a concrete subtype
    SignatureAndExtension,
}

/// A classification result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Detection {
    pub tag: FormatTag,
    pub confidence: Confidence,
}

/// Classifies input bytes into a format tag.
pub struct Dispatcher;

impl Dispatcher {
    /// Classify a byte buffer. Pure and deterministic; no retries.
    pub fn classify(bytes: &[u8], filename: &str) -> Detection {
        let tag = Self::by_signature(bytes);
        if tag != FormatTag::Unknown {
            return Detection {
                tag,
                confidence: Confidence::Signature,
            };
        }

        // TIFF containers: the signature proves a TIFF family; only the
        // extension can tell NEF from ARW from DNG. A renamed file at
        // worst falls through to Unknown: the extension never overrides
        // a signature, and never classifies on its own.
        if Self::is_tiff(bytes) {
            if let Some(kind) = Self::raw_kind_from_extension(filename) {
                return Detection {
                    tag: FormatTag::Raw(kind),
                    confidence: Confidence::SignatureAndExtension,
                };
            }
        }

        Detection {
            tag: FormatTag::Unknown,
            confidence: Confidence::Signature,
        }
    }

    /// Formats identifiable from the signature alone.
    fn by_signature(bytes: &[u8]) -> FormatTag {
        if bytes.len() < 16 {
            return FormatTag::Unknown;
        }

        // JPEG: FF D8 FF
        if bytes[0] == 0xFF && bytes[1] == 0xD8 && bytes[2] == 0xFF {
            return FormatTag::Jpeg;
        }

        // PNG: 89 50 4E 47
        if bytes[0] == 0x89 && bytes[1] == b'P' && bytes[2] == b'N' && bytes[3] == b'G' {
            return FormatTag::Png;
        }

        // Fujifilm RAF: literal vendor magic
        if bytes.starts_with(b"FUJIFILMCCD-RAW") {
            return FormatTag::Raw(RawKind::Raf);
        }

        // Olympus ORF: "IIRO" / "IIRS" / "MMOR" (TIFF-like but with a
        // vendor byte where the version number belongs)
        if bytes.starts_with(b"IIRO") || bytes.starts_with(b"IIRS") || bytes.starts_with(b"MMOR")
        {
            return FormatTag::Raw(RawKind::Orf);
        }

        // Panasonic RW2: II 55 00
        if bytes[0] == b'I' && bytes[1] == b'I' && bytes[2] == 0x55 && bytes[3] == 0x00 {
            return FormatTag::Raw(RawKind::Rw2);
        }

        // Canon CR2: little-endian TIFF with "CR" at offset 8
        if Self::is_tiff(bytes) && bytes[8] == b'C' && bytes[9] == b'R' {
            return FormatTag::Raw(RawKind::Cr2);
        }

        FormatTag::Unknown
    }

    /// TIFF header: II (little-endian) or MM (big-endian) + version 42.
    fn is_tiff(bytes: &[u8]) -> bool {
        if bytes.len() < 4 {
            return false;
        }
        let le = bytes[0] == b'I' && bytes[1] == b'I' && bytes[2] == 0x2A && bytes[3] == 0x00;
        let be = bytes[0] == b'M' && bytes[1] == b'M' && bytes[2] == 0x00 && bytes[3] == 0x2A;
        le || be
    }

    /// Advisory refinement of a TIFF container by extension.
    fn raw_kind_from_extension(filename: &str) -> Option<RawKind> {
        let ext = Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())?
            .to_ascii_lowercase();
        match ext.as_str() {
            "cr2" => Some(RawKind::Cr2),
            "nef" => Some(RawKind::Nef),
            "arw" => Some(RawKind::Arw),
            "dng" => Some(RawKind::Dng),
            "pef" => Some(RawKind::Pef),
            "orf" => Some(RawKind::Orf),
            _ => None,
        }
    }
}
