//! Content identity from the encoded hotpreview bytes.
//!
//! The hothash is a BLAKE3 digest over the hotpreview's EXACT encoded
//! byte sequence: not over raw pixels. Hash stability therefore rests
//! entirely on the determinism of the preview encode path (fixed
//! filter, fixed quality, fixed encoder); those constants live in
//! `pipeline::preview` and are version-tracked as wire format.

use blake3::Hasher as Blake3Hasher;

use super::preview::PreviewArtifact;

/// Computes the deduplication identity of an ingested image.
pub struct HashCalculator;

impl HashCalculator {
    /// BLAKE3 hex digest (64 lowercase chars) of the hotpreview bytes.
    pub fn hothash(preview: &PreviewArtifact) -> String {
        Self::digest(&preview.bytes)
    }

    fn digest(data: &[u8]) -> String {
        let mut hasher = Blake3Hasher::new();
        hasher.update(data);
        hasher.finalize().to_hex().to_string()
    }
}
