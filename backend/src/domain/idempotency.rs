//! Idempotency primitives for emission calculations.
//!
//! A client attaches an [`IdempotencyKey`] to a calculation request. The
//! service stores the key together with a [`PayloadHash`] of the canonical
//! request; a retry with the same key and hash replays the stored result,
//! while the same key with a different hash is a conflict.
//!
//! Canonicalisation sorts object keys recursively and serialises compactly
//! before hashing with SHA-256, so key order and whitespace do not matter.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Maximum accepted key length in characters.
pub const IDEMPOTENCY_KEY_MAX_LEN: usize = 128;

/// Validation errors for [`IdempotencyKey`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdempotencyKeyValidationError {
    /// The key was empty after trimming.
    EmptyKey,
    /// The key was too long or contained control characters.
    InvalidKey,
}

impl fmt::Display for IdempotencyKeyValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyKey => write!(f, "idempotency key must not be empty"),
            Self::InvalidKey => write!(
                f,
                "idempotency key must be at most {IDEMPOTENCY_KEY_MAX_LEN} printable characters"
            ),
        }
    }
}

impl std::error::Error for IdempotencyKeyValidationError {}

/// Client-provided idempotency key.
///
/// Any printable string up to [`IDEMPOTENCY_KEY_MAX_LEN`] characters is
/// accepted; surrounding whitespace is trimmed.
///
/// # Examples
/// ```
/// use carbon_tracker::domain::IdempotencyKey;
///
/// let key = IdempotencyKey::new(" cart-42-line-1 ").expect("valid key");
/// assert_eq!(key.as_ref(), "cart-42-line-1");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct IdempotencyKey(String);

impl IdempotencyKey {
    pub fn new(key: impl AsRef<str>) -> Result<Self, IdempotencyKeyValidationError> {
        let trimmed = key.as_ref().trim();
        if trimmed.is_empty() {
            return Err(IdempotencyKeyValidationError::EmptyKey);
        }
        if trimmed.chars().count() > IDEMPOTENCY_KEY_MAX_LEN
            || trimmed.chars().any(char::is_control)
        {
            return Err(IdempotencyKeyValidationError::InvalidKey);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Generate a random key. Primarily useful in tests.
    pub fn random() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl AsRef<str> for IdempotencyKey {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for IdempotencyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<IdempotencyKey> for String {
    fn from(value: IdempotencyKey) -> Self {
        value.0
    }
}

impl TryFrom<String> for IdempotencyKey {
    type Error = IdempotencyKeyValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Error returned when a stored hash cannot be decoded.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("payload hash must be 64 hexadecimal characters")]
pub struct PayloadHashError;

/// SHA-256 digest of a canonical request payload.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PayloadHash([u8; 32]);

impl PayloadHash {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Decode the lowercase hex form stored alongside calculations.
    pub fn from_hex(value: &str) -> Result<Self, PayloadHashError> {
        let bytes = hex::decode(value).map_err(|_| PayloadHashError)?;
        let array: [u8; 32] = bytes.try_into().map_err(|_| PayloadHashError)?;
        Ok(Self(array))
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for PayloadHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Canonicalise a JSON value and hash it.
///
/// # Examples
/// ```
/// use carbon_tracker::domain::canonicalize_and_hash;
/// use serde_json::json;
///
/// let a = canonicalize_and_hash(&json!({"b": 2, "a": 1}));
/// let b = canonicalize_and_hash(&json!({"a": 1, "b": 2}));
/// assert_eq!(a, b);
/// ```
pub fn canonicalize_and_hash(value: &serde_json::Value) -> PayloadHash {
    let canonical = canonicalize(value).to_string();
    PayloadHash(Sha256::digest(canonical.as_bytes()).into())
}

fn canonicalize(value: &serde_json::Value) -> serde_json::Value {
    match value {
        serde_json::Value::Object(map) => {
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_by_key(|(key, _)| key.as_str());
            serde_json::Value::Object(
                entries
                    .into_iter()
                    .map(|(key, inner)| (key.clone(), canonicalize(inner)))
                    .collect(),
            )
        }
        serde_json::Value::Array(items) => {
            serde_json::Value::Array(items.iter().map(canonicalize).collect())
        }
        other => other.clone(),
    }
}
