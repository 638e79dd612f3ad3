use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Deterministic string encoding used both as a storage key and for equality.
///
/// Two values with the same canonical key are the same identity; the
/// encoding must never depend on formatting or map ordering.
pub trait CanonicalKey {
    fn canonical_key(&self) -> String;
}

/// Content-derived identifier (lowercase hex SHA-256).
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentId(String);

impl ContentId {
    /// Derives the id for a byte sequence; identical bytes always share an id.
    #[must_use]
    pub fn of(bytes: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        Self(hex::encode(hasher.finalize()))
    }

    /// Wraps an id received from the server or read back from the store.
    #[must_use]
    pub fn from_hex(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl CanonicalKey for ContentId {
    fn canonical_key(&self) -> String {
        self.0.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_bytes_share_an_id() {
        let first = ContentId::of(b"Hello Maya");
        let second = ContentId::of(b"Hello Maya");
        assert_eq!(first, second);
        assert_ne!(first, ContentId::of(b"Hello Alf"));
        assert_eq!(first.as_str().len(), 64);
    }
}
