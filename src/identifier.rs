//! Content identifier: a stable checkpoint key derived from document bytes.
//!
//! The identifier is the lowercase hex SHA-256 digest of the bytes followed
//! by their decimal length. Two files with identical content share an
//! identifier no matter where they live, so a renamed or copied document
//! still resumes from its checkpoints.

use sha2::{Digest, Sha256};
use std::fmt;

/// Deterministic identifier for a document's byte content.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentId(String);

impl DocumentId {
    /// Derive the identifier for `bytes`.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let digest = Sha256::digest(bytes);
        Self(format!("{:x}{}", digest, bytes.len()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for DocumentId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
