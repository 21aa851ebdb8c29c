//! Access token claims, ledger records and rotation results.
//!
//! Tokens carry `sub`, `jti`, `iat` and `exp`. Each issued token is written
//! to the ledger; rotation revokes the old `jti` by blacklisting it and
//! linking the ledger row to its replacement.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Reason stored when a token is replaced by rotation.
pub const ROTATED_REASON: &str = "rotated";
/// Maximum subject length accepted by the ledger.
pub const SUBJECT_MAX_LEN: usize = 128;
const IP_MAX_LEN: usize = 64;
const USER_AGENT_MAX_LEN: usize = 255;

/// Claims encoded in an access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    pub sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,
    #[serde(default)]
    pub iat: i64,
    pub exp: i64,
}

impl TokenClaims {
    /// Fresh claims for `subject` with a new `jti`.
    pub fn issue(subject: &str, issued_at: DateTime<Utc>, lifetime: Duration) -> Self {
        Self {
            sub: subject.to_owned(),
            jti: Some(new_jti()),
            iat: issued_at.timestamp(),
            exp: (issued_at + lifetime).timestamp(),
        }
    }

    /// The `jti`, treating an empty claim as absent.
    pub fn jti(&self) -> Option<&str> {
        self.jti.as_deref().filter(|jti| !jti.trim().is_empty())
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.exp, 0)
    }
}

/// Generate a token id: a v4 UUID without hyphens.
///
/// # Examples
/// ```
/// use carbon_tracker::domain::token::new_jti;
///
/// let jti = new_jti();
/// assert_eq!(jti.len(), 32);
/// assert!(!jti.contains('-'));
/// ```
pub fn new_jti() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Validation failure for a token subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SubjectValidationError {
    #[error("user_id must not be empty")]
    Empty,
    #[error("user_id must be at most {SUBJECT_MAX_LEN} characters")]
    TooLong,
}

/// Validate and trim a token subject.
pub fn validate_subject(raw: &str) -> Result<String, SubjectValidationError> {
    let subject = raw.trim();
    if subject.is_empty() {
        return Err(SubjectValidationError::Empty);
    }
    if subject.chars().count() > SUBJECT_MAX_LEN {
        return Err(SubjectValidationError::TooLong);
    }
    Ok(subject.to_owned())
}

/// Client details recorded in the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ClientMeta {
    ip: Option<String>,
    user_agent: Option<String>,
}

impl ClientMeta {
    /// Truncate values to the ledger column sizes.
    pub fn new(ip: Option<&str>, user_agent: Option<&str>) -> Self {
        let clip = |value: Option<&str>, max: usize| {
            value
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(|v| v.chars().take(max).collect::<String>())
        };
        Self {
            ip: clip(ip, IP_MAX_LEN),
            user_agent: clip(user_agent, USER_AGENT_MAX_LEN),
        }
    }

    pub fn ip(&self) -> Option<&str> {
        self.ip.as_deref()
    }

    pub fn user_agent(&self) -> Option<&str> {
        self.user_agent.as_deref()
    }
}

/// Ledger row for an issued token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEntry {
    pub user_id: String,
    pub jti: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub client: ClientMeta,
}

/// Atomic rotation of one token into another.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenRotation {
    pub old_jti: String,
    pub replacement: LedgerEntry,
    pub revoked_at: DateTime<Utc>,
    pub reason: String,
}

/// A freshly issued token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedToken {
    pub access_token: String,
    pub jti: String,
    pub subject: String,
    pub expires_in: i64,
}

/// Rotation result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotatedToken {
    pub token: IssuedToken,
    pub rotated_from: String,
}

/// Guard verdict for a bearer token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevocationStatus {
    /// Undecodable or without `jti`; the guard lets it through.
    Unchecked,
    Active,
    Revoked,
}
