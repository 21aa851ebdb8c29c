//! PostgreSQL-backed `NotificationPreferencesRepository` using Diesel ORM.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::upsert::excluded;
use diesel_async::RunQueryDsl;

use crate::domain::UserId;
use crate::domain::notification::NotificationPreferences;
use crate::domain::ports::{
    NotificationPreferencesRepository, NotificationPreferencesRepositoryError,
};

use super::diesel_basic_error_mapping::basic_error_mappers;
use super::models::NotificationPreferencesRow;
use super::pool::DbPool;
use super::schema::user_notification_preferences as prefs;

/// Diesel-backed implementation of the notification preferences port.
#[derive(Clone)]
pub struct DieselNotificationPreferencesRepository {
    pool: DbPool,
}

impl DieselNotificationPreferencesRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

basic_error_mappers!(NotificationPreferencesRepositoryError);

fn row_to_preferences(
    row: NotificationPreferencesRow,
) -> Result<NotificationPreferences, NotificationPreferencesRepositoryError> {
    let frequency = row.frequency.parse().map_err(|err| {
        NotificationPreferencesRepositoryError::query(format!(
            "invalid notification frequency in database: {err}"
        ))
    })?;
    let types: Vec<String> = serde_json::from_value(row.types).map_err(|err| {
        NotificationPreferencesRepositoryError::query(format!(
            "invalid notification types in database: {err}"
        ))
    })?;
    Ok(NotificationPreferences {
        user_id: UserId::from_uuid(row.user_id),
        enabled: row.enabled,
        frequency,
        types,
        allow_email: row.allow_email,
        allow_push: row.allow_push,
        allow_sms: row.allow_sms,
        last_notified_at: row.last_notified_at,
        updated_at: row.updated_at,
    })
}

fn preferences_to_row(preferences: &NotificationPreferences) -> NotificationPreferencesRow {
    NotificationPreferencesRow {
        user_id: *preferences.user_id.as_uuid(),
        enabled: preferences.enabled,
        frequency: preferences.frequency.as_str().to_owned(),
        types: serde_json::Value::from(preferences.types.clone()),
        allow_email: preferences.allow_email,
        allow_push: preferences.allow_push,
        allow_sms: preferences.allow_sms,
        last_notified_at: preferences.last_notified_at,
        updated_at: preferences.updated_at,
    }
}

#[async_trait]
impl NotificationPreferencesRepository for DieselNotificationPreferencesRepository {
    async fn find(
        &self,
        user_id: &UserId,
    ) -> Result<Option<NotificationPreferences>, NotificationPreferencesRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row: Option<NotificationPreferencesRow> = prefs::table
            .find(user_id.as_uuid())
            .select(NotificationPreferencesRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        row.map(row_to_preferences).transpose()
    }

    async fn upsert(
        &self,
        preferences: &NotificationPreferences,
    ) -> Result<NotificationPreferences, NotificationPreferencesRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let stored: NotificationPreferencesRow = diesel::insert_into(prefs::table)
            .values(&preferences_to_row(preferences))
            .on_conflict(prefs::user_id)
            .do_update()
            .set((
                prefs::enabled.eq(excluded(prefs::enabled)),
                prefs::frequency.eq(excluded(prefs::frequency)),
                prefs::types.eq(excluded(prefs::types)),
                prefs::allow_email.eq(excluded(prefs::allow_email)),
                prefs::allow_push.eq(excluded(prefs::allow_push)),
                prefs::allow_sms.eq(excluded(prefs::allow_sms)),
                prefs::last_notified_at.eq(excluded(prefs::last_notified_at)),
                prefs::updated_at.eq(excluded(prefs::updated_at)),
            ))
            .returning(NotificationPreferencesRow::as_returning())
            .get_result(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        row_to_preferences(stored)
    }

    async fn mark_notified(
        &self,
        user_id: &UserId,
        at: DateTime<Utc>,
    ) -> Result<(), NotificationPreferencesRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        diesel::update(prefs::table.find(user_id.as_uuid()))
            .set((prefs::last_notified_at.eq(Some(at)), prefs::updated_at.eq(at)))
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(map_diesel_error)
    }
}
