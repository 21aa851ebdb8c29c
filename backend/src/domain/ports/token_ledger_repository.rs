//! Port for the token ledger and revocation list.

use async_trait::async_trait;

use crate::domain::token::{LedgerEntry, TokenRotation};

use super::define_port_error;

define_port_error! {
    /// Errors raised by token ledger adapters.
    pub enum TokenLedgerRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } =>
            "token ledger connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } =>
            "token ledger query failed: {message}",
        /// The token was revoked before the rotation committed.
        AlreadyRevoked { jti: String } =>
            "token {jti} is already revoked",
    }
}

/// Port for token bookkeeping.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TokenLedgerRepository: Send + Sync {
    /// Whether `jti` is on the revocation list.
    async fn is_revoked(&self, jti: &str) -> Result<bool, TokenLedgerRepositoryError>;

    async fn record_issued(&self, entry: &LedgerEntry) -> Result<(), TokenLedgerRepositoryError>;

    /// In one transaction: blacklist the old `jti`, mark its ledger row
    /// revoked and replaced, and record the replacement. Fails with
    /// `AlreadyRevoked` when the old `jti` is already blacklisted.
    async fn rotate(&self, rotation: &TokenRotation) -> Result<(), TokenLedgerRepositoryError>;
}

/// Fixture ledger that records nothing and revokes nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureTokenLedgerRepository;

#[async_trait]
impl TokenLedgerRepository for FixtureTokenLedgerRepository {
    async fn is_revoked(&self, _jti: &str) -> Result<bool, TokenLedgerRepositoryError> {
        Ok(false)
    }

    async fn record_issued(&self, _entry: &LedgerEntry) -> Result<(), TokenLedgerRepositoryError> {
        Ok(())
    }

    async fn rotate(&self, _rotation: &TokenRotation) -> Result<(), TokenLedgerRepositoryError> {
        Ok(())
    }
}
