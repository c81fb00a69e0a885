use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CryptoError;

/// A 32-byte BLAKE3 digest, serialized as lowercase hex.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Digest([u8; 32]);

impl Digest {
    /// Full hex-encoded string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from a 64-character hex string.
    pub fn from_hex(s: &str) -> Result<Self, CryptoError> {
        let bytes = hex::decode(s).map_err(|e| CryptoError::InvalidDigest(e.to_string()))?;
        let arr: [u8; 32] = bytes.try_into().map_err(|b: Vec<u8>| {
            CryptoError::InvalidDigest(format!("expected 32 bytes, got {}", b.len()))
        })?;
        Ok(Self(arr))
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({})", &self.to_hex()[..16])
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for Digest {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Digest {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Digest::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// Domain-separated BLAKE3 content hasher.
///
/// Each hasher carries a domain tag that is prepended to every hash
/// computation, and callers may add a per-use label (the snapshot kind). A
/// todo snapshot and an accounts snapshot with identical bytes therefore
/// never share a digest.
pub struct ContentHasher {
    domain: &'static str,
}

impl ContentHasher {
    /// Hasher for persisted store snapshots.
    pub const SNAPSHOT: Self = Self {
        domain: "hearth-snapshot-v1",
    };

    /// Hash raw bytes under this domain and a label.
    pub fn hash(&self, label: &str, data: &[u8]) -> Digest {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.domain.as_bytes());
        hasher.update(b":");
        hasher.update(label.as_bytes());
        hasher.update(b":");
        hasher.update(data);
        Digest(*hasher.finalize().as_bytes())
    }

    /// Hash a serializable value as compact JSON.
    pub fn hash_json<T: Serialize>(&self, label: &str, value: &T) -> Result<Digest, CryptoError> {
        let data =
            serde_json::to_vec(value).map_err(|e| CryptoError::Serialization(e.to_string()))?;
        Ok(self.hash(label, &data))
    }

    /// Whether `value` encodes to the expected digest.
    pub fn verify_json<T: Serialize>(
        &self,
        label: &str,
        value: &T,
        expected: &Digest,
    ) -> Result<bool, CryptoError> {
        Ok(self.hash_json(label, value)? == *expected)
    }
}
