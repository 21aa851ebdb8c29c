//! PostgreSQL-backed `AuditRepository` implementation using Diesel ORM.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::domain::ports::{AuditRepository, AuditRepositoryError};
use crate::domain::{AuditEvent, NewAuditEvent};

use super::diesel_basic_error_mapping::basic_error_mappers;
use super::models::{AuditEventRow, NewAuditEventRow};
use super::pool::DbPool;
use super::schema::audit_events;

/// Diesel-backed implementation of the audit repository port.
#[derive(Clone)]
pub struct DieselAuditRepository {
    pool: DbPool,
}

impl DieselAuditRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

basic_error_mappers!(AuditRepositoryError);

#[async_trait]
impl AuditRepository for DieselAuditRepository {
    async fn record(&self, event: &NewAuditEvent) -> Result<(), AuditRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        diesel::insert_into(audit_events::table)
            .values(&NewAuditEventRow {
                event_type: event.event_type(),
                message: event.message(),
            })
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(map_diesel_error)
    }

    async fn list_recent(&self, limit: u32) -> Result<Vec<AuditEvent>, AuditRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let rows: Vec<AuditEventRow> = audit_events::table
            .order((audit_events::created_at.desc(), audit_events::id.desc()))
            .limit(i64::from(limit))
            .select(AuditEventRow::as_select())
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(rows
            .into_iter()
            .map(|row| AuditEvent {
                id: row.id,
                event_type: row.event_type,
                message: row.message,
                created_at: row.created_at,
            })
            .collect())
    }
}
