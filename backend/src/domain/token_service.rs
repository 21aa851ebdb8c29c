//! Token issue, rotation and revocation service.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Duration;
use mockable::Clock;
use tracing::debug;

use crate::domain::ports::{
    AuditRepository, RevocationCheck, TokenCodec, TokenCodecError, TokenCommand,
    TokenIntrospection, TokenLedgerRepository, TokenLedgerRepositoryError, record_best_effort,
};
use crate::domain::token::{
    ClientMeta, IssuedToken, LedgerEntry, ROTATED_REASON, RevocationStatus, RotatedToken,
    TokenClaims, TokenRotation, validate_subject,
};
use crate::domain::{Error, NewAuditEvent};

const MISSING_BEARER_MESSAGE: &str = "Missing Bearer token";
const INVALID_TOKEN_MESSAGE: &str = "Invalid token";
const MISSING_JTI_MESSAGE: &str = "Token missing jti";
const REVOKED_MESSAGE: &str = "Token revoked";

/// Token service implementing [`TokenCommand`] and [`RevocationCheck`].
#[derive(Clone)]
pub struct TokenService<L, C> {
    ledger: Arc<L>,
    codec: Arc<C>,
    audit: Arc<dyn AuditRepository>,
    clock: Arc<dyn Clock>,
    lifetime: Duration,
}

impl<L, C> TokenService<L, C> {
    pub fn new(
        ledger: Arc<L>,
        codec: Arc<C>,
        audit: Arc<dyn AuditRepository>,
        clock: Arc<dyn Clock>,
        lifetime: Duration,
    ) -> Self {
        Self {
            ledger,
            codec,
            audit,
            clock,
            lifetime,
        }
    }
}

impl<L, C> TokenService<L, C>
where
    L: TokenLedgerRepository,
    C: TokenCodec,
{
    fn map_ledger_error(error: TokenLedgerRepositoryError) -> Error {
        match error {
            TokenLedgerRepositoryError::Connection { message } => {
                Error::service_unavailable(format!("token ledger unavailable: {message}"))
            }
            TokenLedgerRepositoryError::Query { message } => {
                Error::internal(format!("token ledger error: {message}"))
            }
            TokenLedgerRepositoryError::AlreadyRevoked { .. } => {
                Error::unauthorized(REVOKED_MESSAGE)
            }
        }
    }

    fn map_encode_error(error: TokenCodecError) -> Error {
        Error::internal(format!("token signing failed: {error}"))
    }

    /// Sign claims for `subject`, returning the token and its ledger row.
    fn mint(
        &self,
        subject: &str,
        client: ClientMeta,
    ) -> Result<(IssuedToken, LedgerEntry), Error> {
        let now = self.clock.utc();
        let claims = TokenClaims::issue(subject, now, self.lifetime);
        let access_token = self
            .codec
            .encode(&claims)
            .map_err(Self::map_encode_error)?;
        let jti = claims.jti().map(str::to_owned).unwrap_or_default();
        let expires_at = claims.expires_at();
        let expires_in = expires_at
            .map(|at| (at - now).num_seconds().max(0))
            .unwrap_or_default();

        Ok((
            IssuedToken {
                access_token,
                jti: jti.clone(),
                subject: subject.to_owned(),
                expires_in,
            },
            LedgerEntry {
                user_id: subject.to_owned(),
                jti,
                issued_at: now,
                expires_at,
                client,
            },
        ))
    }
}

#[async_trait]
impl<L, C> TokenCommand for TokenService<L, C>
where
    L: TokenLedgerRepository,
    C: TokenCodec,
{
    async fn issue(&self, subject: String, client: ClientMeta) -> Result<IssuedToken, Error> {
        let subject = validate_subject(&subject).map_err(|error| {
            Error::unprocessable(error.to_string()).with_details(serde_json::json!({
                "field": "user_id",
                "code": "invalid_subject",
            }))
        })?;
        let (token, entry) = self.mint(&subject, client)?;
        self.ledger
            .record_issued(&entry)
            .await
            .map_err(Self::map_ledger_error)?;
        Ok(token)
    }

    async fn rotate(
        &self,
        bearer: Option<String>,
        client: ClientMeta,
    ) -> Result<RotatedToken, Error> {
        let bearer = bearer
            .filter(|token| !token.trim().is_empty())
            .ok_or_else(|| Error::unauthorized(MISSING_BEARER_MESSAGE))?;
        let claims = self.codec.decode(bearer.trim()).map_err(|error| {
            debug!(%error, "rejecting undecodable token");
            Error::unauthorized(INVALID_TOKEN_MESSAGE)
        })?;
        let old_jti = claims
            .jti()
            .map(str::to_owned)
            .ok_or_else(|| Error::unauthorized(MISSING_JTI_MESSAGE))?;
        if self
            .ledger
            .is_revoked(&old_jti)
            .await
            .map_err(Self::map_ledger_error)?
        {
            return Err(Error::unauthorized(REVOKED_MESSAGE));
        }

        let subject = if claims.sub.trim().is_empty() {
            "unknown".to_owned()
        } else {
            claims.sub
        };
        let (token, replacement) = self.mint(&subject, client)?;
        self.ledger
            .rotate(&TokenRotation {
                old_jti: old_jti.clone(),
                replacement,
                revoked_at: self.clock.utc(),
                reason: ROTATED_REASON.to_owned(),
            })
            .await
            .map_err(Self::map_ledger_error)?;

        record_best_effort(
            self.audit.as_ref(),
            NewAuditEvent::new(
                "token_rotated",
                format!("sub={subject} old_jti={old_jti} new_jti={}", token.jti),
            ),
        )
        .await;

        Ok(RotatedToken {
            token,
            rotated_from: old_jti,
        })
    }
}

#[async_trait]
impl<L, C> RevocationCheck for TokenService<L, C>
where
    L: TokenLedgerRepository,
    C: TokenCodec,
{
    async fn status(&self, bearer: &str) -> Result<RevocationStatus, Error> {
        let Ok(claims) = self.codec.decode(bearer) else {
            return Ok(RevocationStatus::Unchecked);
        };
        let Some(jti) = claims.jti() else {
            return Ok(RevocationStatus::Unchecked);
        };
        let revoked = self
            .ledger
            .is_revoked(jti)
            .await
            .map_err(Self::map_ledger_error)?;
        Ok(if revoked {
            RevocationStatus::Revoked
        } else {
            RevocationStatus::Active
        })
    }
}

impl<L, C> TokenIntrospection for TokenService<L, C>
where
    L: TokenLedgerRepository,
    C: TokenCodec,
{
    fn subject(&self, bearer: &str) -> Option<String> {
        self.codec
            .decode(bearer)
            .ok()
            .map(|claims| claims.sub)
            .filter(|sub| !sub.trim().is_empty())
    }
}
