//! Port for notification preference persistence.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::UserId;
use crate::domain::notification::NotificationPreferences;

use super::define_port_error;

define_port_error! {
    /// Errors raised by notification preference adapters.
    pub enum NotificationPreferencesRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } =>
            "notification preferences connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } =>
            "notification preferences query failed: {message}",
    }
}

/// Port for per-user notification preferences.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NotificationPreferencesRepository: Send + Sync {
    async fn find(
        &self,
        user_id: &UserId,
    ) -> Result<Option<NotificationPreferences>, NotificationPreferencesRepositoryError>;

    /// Insert or replace the user's row, returning the stored state.
    async fn upsert(
        &self,
        preferences: &NotificationPreferences,
    ) -> Result<NotificationPreferences, NotificationPreferencesRepositoryError>;

    async fn mark_notified(
        &self,
        user_id: &UserId,
        at: DateTime<Utc>,
    ) -> Result<(), NotificationPreferencesRepositoryError>;
}

/// Fixture repository that stores nothing and echoes upserts.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureNotificationPreferencesRepository;

#[async_trait]
impl NotificationPreferencesRepository for FixtureNotificationPreferencesRepository {
    async fn find(
        &self,
        _user_id: &UserId,
    ) -> Result<Option<NotificationPreferences>, NotificationPreferencesRepositoryError> {
        Ok(None)
    }

    async fn upsert(
        &self,
        preferences: &NotificationPreferences,
    ) -> Result<NotificationPreferences, NotificationPreferencesRepositoryError> {
        Ok(preferences.clone())
    }

    async fn mark_notified(
        &self,
        _user_id: &UserId,
        _at: DateTime<Utc>,
    ) -> Result<(), NotificationPreferencesRepositoryError> {
        Ok(())
    }
}
