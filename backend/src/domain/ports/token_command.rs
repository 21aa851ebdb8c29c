//! Driving ports for token issue, rotation and revocation checks.

use async_trait::async_trait;

use crate::domain::Error;
use crate::domain::token::{ClientMeta, IssuedToken, RevocationStatus, RotatedToken};

/// Domain use-case port for token mutations.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TokenCommand: Send + Sync {
    /// Issue a token for `subject` and record it in the ledger.
    async fn issue(&self, subject: String, client: ClientMeta) -> Result<IssuedToken, Error>;

    /// Replace `bearer` with a new token for the same subject.
    ///
    /// `None` means no bearer token was presented.
    async fn rotate(
        &self,
        bearer: Option<String>,
        client: ClientMeta,
    ) -> Result<RotatedToken, Error>;
}

/// Port consulted by the revocation guard.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RevocationCheck: Send + Sync {
    async fn status(&self, bearer: &str) -> Result<RevocationStatus, Error>;
}

/// Port exposing the verified subject of a bearer token.
#[cfg_attr(test, mockall::automock)]
pub trait TokenIntrospection: Send + Sync {
    /// The `sub` claim when `bearer` verifies, otherwise `None`.
    fn subject(&self, bearer: &str) -> Option<String>;
}

/// Fixture token ports: nothing is signed and no token is inspected.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureTokenService;

#[async_trait]
impl TokenCommand for FixtureTokenService {
    async fn issue(&self, _subject: String, _client: ClientMeta) -> Result<IssuedToken, Error> {
        Err(Error::service_unavailable("token signing is not configured"))
    }

    async fn rotate(
        &self,
        _bearer: Option<String>,
        _client: ClientMeta,
    ) -> Result<RotatedToken, Error> {
        Err(Error::service_unavailable("token signing is not configured"))
    }
}

impl TokenIntrospection for FixtureTokenService {
    fn subject(&self, _bearer: &str) -> Option<String> {
        None
    }
}

#[async_trait]
impl RevocationCheck for FixtureTokenService {
    async fn status(&self, _bearer: &str) -> Result<RevocationStatus, Error> {
        Ok(RevocationStatus::Unchecked)
    }
}
