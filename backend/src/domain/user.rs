//! User identity.
//!
//! Users are not stored by this service; they are referenced by identifier
//! only. Identifiers are UUIDs. Older clients still send small positive
//! integers, which map onto the zero-padded UUID space so both forms address
//! the same rows.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Validation errors returned by [`UserId::new`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserValidationError {
    EmptyId,
    InvalidId,
}

impl fmt::Display for UserValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyId => write!(f, "user id must not be empty"),
            Self::InvalidId => write!(f, "user id must be a UUID or a positive integer"),
        }
    }
}

impl std::error::Error for UserValidationError {}

/// Stable user identifier.
///
/// # Examples
/// ```
/// use carbon_tracker::domain::UserId;
///
/// let legacy = UserId::new("1").expect("legacy id");
/// assert_eq!(legacy.to_string(), "00000000-0000-0000-0000-000000000001");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserId(Uuid);

impl UserId {
    /// Parse a UUID or a legacy positive integer.
    pub fn new(id: impl AsRef<str>) -> Result<Self, UserValidationError> {
        let raw = id.as_ref().trim();
        if raw.is_empty() {
            return Err(UserValidationError::EmptyId);
        }
        if let Ok(uuid) = Uuid::parse_str(raw) {
            return Ok(Self(uuid));
        }
        match raw.parse::<u64>() {
            Ok(value) if value > 0 => Ok(Self::from_legacy(value)),
            _ => Err(UserValidationError::InvalidId),
        }
    }

    /// Map a legacy integer identifier onto its zero-padded UUID.
    pub fn from_legacy(value: u64) -> Self {
        Self(Uuid::from_u128(u128::from(value)))
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Generate a new random identifier.
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<UserId> for String {
    fn from(value: UserId) -> Self {
        value.to_string()
    }
}

impl TryFrom<String> for UserId {
    type Error = UserValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}
