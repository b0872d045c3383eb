//! # Content Digest — SHA-256 over Text
//!
//! `text_digest` hashes exact UTF-8 text. It backs both fix proposal ids
//! (over their canonical material) and the original/rewritten hashes
//! carried in document reports.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// The hash algorithm used to produce a content digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DigestAlgorithm {
    /// SHA-256.
    Sha256,
}

/// A content-addressed digest with its algorithm tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentDigest {
    /// The hash algorithm that produced this digest.
    pub algorithm: DigestAlgorithm,
    /// The raw 32-byte digest value.
    pub bytes: [u8; 32],
}

impl ContentDigest {
    /// Create a new content digest from raw bytes and algorithm.
    pub fn new(algorithm: DigestAlgorithm, bytes: [u8; 32]) -> Self {
        Self { algorithm, bytes }
    }

    /// Render the digest as a lowercase hex string.
    pub fn to_hex(&self) -> String {
        self.bytes.iter().map(|b| format!("{b:02x}")).collect()
    }
}

/// Compute a SHA-256 digest of text, byte for byte.
///
/// Document bodies are opaque to Stamp, so they are hashed as-is rather than
/// canonicalized. The loader has already normalized newlines to `\n`.
pub fn text_digest(text: &str) -> ContentDigest {
    let hash = Sha256::digest(text.as_bytes());
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(&hash);
    ContentDigest::new(DigestAlgorithm::Sha256, bytes)
}
