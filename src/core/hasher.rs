//! Document fingerprinting with BLAKE3.
//!
//! Every report built from raw bytes records a digest of the exact document
//! that was evaluated, so audit trails can tie a verdict to its input.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A BLAKE3 digest of a definitions document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentDigest(String);

impl DocumentDigest {
    /// Computes the digest of the given bytes.
    pub fn of(data: &[u8]) -> Self {
        Self(blake3::hash(data).to_hex().to_string())
    }

    /// Returns the lowercase hex digest.
    pub fn as_hex(&self) -> &str {
        &self.0
    }

    /// Consumes the digest, returning the hex string.
    pub fn into_hex(self) -> String {
        self.0
    }
}

impl fmt::Display for DocumentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "blake3:{}", self.0)
    }
}
