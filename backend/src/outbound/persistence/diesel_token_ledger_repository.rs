//! PostgreSQL-backed `TokenLedgerRepository` implementation using Diesel ORM.
//!
//! Rotation is one transaction. The blacklist insert acts as the gate: when
//! the old `jti` is already present the insert affects no rows and the whole
//! rotation rolls back with `AlreadyRevoked`.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, AsyncPgConnection, RunQueryDsl};
use tracing::debug;

use crate::domain::ports::{TokenLedgerRepository, TokenLedgerRepositoryError};
use crate::domain::token::{LedgerEntry, TokenRotation};

use super::diesel_basic_error_mapping::basic_error_mappers;
use super::models::{NewBlacklistRow, NewTokenLedgerRow};
use super::pool::DbPool;
use super::schema::{token_blacklist, token_ledger};

/// Diesel-backed implementation of the token ledger port.
#[derive(Clone)]
pub struct DieselTokenLedgerRepository {
    pool: DbPool,
}

impl DieselTokenLedgerRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

basic_error_mappers!(TokenLedgerRepositoryError);

/// Outcome of a failed rotation transaction.
#[derive(Debug)]
enum RotationFailure {
    AlreadyRevoked,
    Database(diesel::result::Error),
}

impl From<diesel::result::Error> for RotationFailure {
    fn from(error: diesel::result::Error) -> Self {
        Self::Database(error)
    }
}

fn ledger_row(entry: &LedgerEntry) -> NewTokenLedgerRow<'_> {
    NewTokenLedgerRow {
        user_id: &entry.user_id,
        jti: &entry.jti,
        issued_at: entry.issued_at,
        expires_at: entry.expires_at,
        ip: entry.client.ip(),
        user_agent: entry.client.user_agent(),
    }
}

async fn rotate_in_transaction(
    conn: &mut AsyncPgConnection,
    rotation: &TokenRotation,
) -> Result<(), RotationFailure> {
    let blacklisted = diesel::insert_into(token_blacklist::table)
        .values(&NewBlacklistRow {
            jti: &rotation.old_jti,
            revoked_at: rotation.revoked_at,
            reason: Some(rotation.reason.as_str()),
        })
        .on_conflict_do_nothing()
        .execute(conn)
        .await?;
    if blacklisted == 0 {
        return Err(RotationFailure::AlreadyRevoked);
    }

    let updated = diesel::update(token_ledger::table.filter(token_ledger::jti.eq(&rotation.old_jti)))
        .set((
            token_ledger::revoked_at.eq(Some(rotation.revoked_at)),
            token_ledger::revoked_reason.eq(Some(rotation.reason.as_str())),
            token_ledger::replaced_by_jti.eq(Some(rotation.replacement.jti.as_str())),
        ))
        .execute(conn)
        .await?;
    if updated == 0 {
        debug!(jti = %rotation.old_jti, "rotated token had no ledger row");
    }

    diesel::insert_into(token_ledger::table)
        .values(&ledger_row(&rotation.replacement))
        .execute(conn)
        .await?;
    Ok(())
}

#[async_trait]
impl TokenLedgerRepository for DieselTokenLedgerRepository {
    async fn is_revoked(&self, jti: &str) -> Result<bool, TokenLedgerRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        diesel::select(diesel::dsl::exists(token_blacklist::table.find(jti)))
            .get_result(&mut conn)
            .await
            .map_err(map_diesel_error)
    }

    async fn record_issued(&self, entry: &LedgerEntry) -> Result<(), TokenLedgerRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        diesel::insert_into(token_ledger::table)
            .values(&ledger_row(entry))
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(map_diesel_error)
    }

    async fn rotate(&self, rotation: &TokenRotation) -> Result<(), TokenLedgerRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        conn.transaction(|conn| rotate_in_transaction(conn, rotation).scope_boxed())
            .await
            .map_err(|failure| match failure {
                RotationFailure::AlreadyRevoked => {
                    TokenLedgerRepositoryError::already_revoked(rotation.old_jti.clone())
                }
                RotationFailure::Database(error) => map_diesel_error(error),
            })
    }
}
