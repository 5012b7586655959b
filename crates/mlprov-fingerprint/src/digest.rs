//! Content digest primitives
//!
//! Provides [`ContentDigest`], a strongly-typed 32-byte SHA-256 digest used to
//! content-address files and serialized provenance documents.

use sha2::{Digest, Sha256};
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// A 32-byte content digest (SHA-256)
///
/// Rendered as 64 lowercase hexadecimal characters.
/// Immutable and cheap to clone (Copy).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ContentDigest([u8; 32]);

impl ContentDigest {
    /// Length of the digest in bytes
    pub const LEN: usize = 32;

    /// Create a digest from raw bytes
    #[inline]
    #[must_use]
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get reference to the underlying bytes
    #[inline]
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Create digest from byte slice
    ///
    /// # Errors
    /// Returns error if slice length is not exactly 32 bytes
    pub fn from_slice(bytes: &[u8]) -> Result<Self, HashError> {
        if bytes.len() != Self::LEN {
            return Err(HashError::InvalidLength {
                expected: Self::LEN,
                actual: bytes.len(),
            });
        }
        let mut arr = [0u8; 32];
        arr.copy_from_slice(bytes);
        Ok(Self(arr))
    }

    /// Compute the SHA-256 digest of an in-memory buffer
    #[inline]
    #[must_use]
    pub fn compute(data: &[u8]) -> Self {
        let mut builder = DigestBuilder::new();
        builder.update(data);
        builder.finish()
    }

    /// Short string representation (first 16 hex chars)
    #[inline]
    #[must_use]
    pub fn short(&self) -> String {
        hex::encode(&self.0[..8])
    }
}

impl Display for ContentDigest {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl FromStr for ContentDigest {
    type Err = HashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.chars().any(|c| c.is_ascii_uppercase()) {
            return Err(HashError::NotLowercase);
        }
        let bytes = hex::decode(s)?;
        Self::from_slice(&bytes)
    }
}

impl AsRef<[u8]> for ContentDigest {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl serde::Serialize for ContentDigest {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        if serializer.is_human_readable() {
            serializer.serialize_str(&self.to_string())
        } else {
            serializer.serialize_bytes(&self.0)
        }
    }
}

impl<'de> serde::Deserialize<'de> for ContentDigest {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct DigestVisitor;

        impl serde::de::Visitor<'_> for DigestVisitor {
            type Value = ContentDigest;

            fn expecting(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
                formatter.write_str("a 32-byte digest as lowercase hex string or byte array")
            }

            fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                value.parse().map_err(serde::de::Error::custom)
            }

            fn visit_bytes<E>(self, value: &[u8]) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                ContentDigest::from_slice(value).map_err(serde::de::Error::custom)
            }
        }

        if deserializer.is_human_readable() {
            deserializer.deserialize_str(DigestVisitor)
        } else {
            deserializer.deserialize_bytes(DigestVisitor)
        }
    }
}

/// Running SHA-256 accumulator
///
/// Feeding the same bytes in any split yields the same [`ContentDigest`].
#[derive(Clone, Default)]
pub struct DigestBuilder {
    hasher: Sha256,
    consumed: u64,
}

impl fmt::Debug for DigestBuilder {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("DigestBuilder")
            .field("consumed", &self.consumed)
            .finish_non_exhaustive()
    }
}

impl DigestBuilder {
    /// Create an empty accumulator
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk of bytes
    #[inline]
    pub fn update(&mut self, chunk: &[u8]) {
        self.hasher.update(chunk);
        self.consumed += chunk.len() as u64;
    }

    /// Number of bytes fed so far
    #[inline]
    #[must_use]
    pub fn consumed(&self) -> u64 {
        self.consumed
    }

    /// Finish and produce the digest
    #[inline]
    #[must_use]
    pub fn finish(self) -> ContentDigest {
        ContentDigest::new(self.hasher.finalize().into())
    }
}

/// Errors that can occur when working with digests
#[derive(Debug, thiserror::Error)]
pub enum HashError {
    /// Invalid digest length
    #[error("invalid digest length: expected {expected}, got {actual}")]
    InvalidLength {
        /// Required byte length
        expected: usize,
        /// Supplied byte length
        actual: usize,
    },

    /// Digest strings are lowercase only
    #[error("digest must be lowercase hex")]
    NotLowercase,

    /// Hex encoding error
    #[error("hex decode error: {0}")]
    HexDecode(#[from] hex::FromHexError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_sha256_vector() {
        let digest = ContentDigest::compute(b"abc");
        assert_eq!(
            digest.to_string(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn empty_input_digest() {
        let digest = DigestBuilder::new().finish();
        assert_eq!(
            digest.to_string(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn from_slice_invalid_length() {
        let result = ContentDigest::from_slice(&[1u8; 31]);
        assert!(matches!(
            result,
            Err(HashError::InvalidLength {
                expected: 32,
                actual: 31
            })
        ));
    }

    #[test]
    fn display_is_lowercase_and_parses_back() {
        let digest = ContentDigest::compute(b"test");
        let s = digest.to_string();
        assert_eq!(s.len(), 64);
        assert_eq!(s, s.to_lowercase());
        let parsed: ContentDigest = s.parse().unwrap();
        assert_eq!(digest, parsed);
    }

    #[test]
    fn uppercase_hex_rejected() {
        let s = ContentDigest::compute(b"test").to_string().to_uppercase();
        assert!(matches!(s.parse::<ContentDigest>(), Err(HashError::NotLowercase)));
    }

    #[test]
    fn builder_split_matches_one_shot() {
        let mut builder = DigestBuilder::new();
        builder.update(b"hello ");
        builder.update(b"world");
        assert_eq!(builder.consumed(), 11);
        assert_eq!(builder.finish(), ContentDigest::compute(b"hello world"));
    }

    #[test]
    fn short_is_prefix() {
        let digest = ContentDigest::compute(b"test");
        assert_eq!(digest.short().len(), 16);
        assert!(digest.to_string().starts_with(&digest.short()));
    }

    #[test]
    fn serde_json_uses_hex_string() {
        let digest = ContentDigest::compute(b"test");
        let json = serde_json::to_string(&digest).unwrap();
        assert_eq!(json, format!("\"{digest}\""));
        let decoded: ContentDigest = serde_json::from_str(&json).unwrap();
        assert_eq!(digest, decoded);
    }
}
