//! SHA-256 hashing helpers and the invocation fingerprint.
//!
//! All identifiers in Palisade are deterministic truncated SHA-256
//! digests: the same inputs produce the same ID in every process, which
//! is what makes approval matching restart-safe without any shared
//! counter or RNG.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

use crate::stable::stable_bytes;

/// Literal substituted when params cannot be stably serialized, so the
/// fingerprint stays total and deterministic.
pub const UNSERIALIZABLE_PARAMS: &str = "[unserializable-params]";

/// Hex length of an invocation fingerprint (and of approval IDs).
pub const FINGERPRINT_LEN: usize = 16;

/// Full SHA-256 digest of the input, lowercase hex.
#[must_use]
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Truncated SHA-256 digest of the input, lowercase hex.
///
/// `len` is clamped to the 64 hex chars of a full digest.
#[must_use]
pub fn sha256_hex_prefix(data: &[u8], len: usize) -> String {
    let mut digest = sha256_hex(data);
    digest.truncate(len.min(64));
    digest
}

/// Truncated SHA-256 over the stable serialization of (redacted) tool
/// parameters: the invocation fingerprint.
///
/// Two calls with semantically equal parameters map to the same hash,
/// regardless of key order or process.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParamsHash(String);

impl ParamsHash {
    /// Fingerprint a structured value.
    ///
    /// Values that exceed the stable serializer's depth cap hash the
    /// fixed [`UNSERIALIZABLE_PARAMS`] literal instead, preserving
    /// determinism over hostile inputs.
    #[must_use]
    pub fn of_value(value: &serde_json::Value) -> Self {
        let digest = match stable_bytes(value) {
            Ok(bytes) => sha256_hex_prefix(&bytes, FINGERPRINT_LEN),
            Err(_) => sha256_hex_prefix(UNSERIALIZABLE_PARAMS.as_bytes(), FINGERPRINT_LEN),
        };
        Self(digest)
    }

    /// Wrap an already-computed fingerprint (e.g. read back from disk).
    #[must_use]
    pub fn from_hex(hex: impl Into<String>) -> Self {
        Self(hex.into())
    }

    /// The hex digits.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ParamsHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
