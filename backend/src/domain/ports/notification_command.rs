//! Driving port for notification preferences and sends.

use async_trait::async_trait;
use chrono::Utc;

use crate::domain::notification::{
    NOTIFICATIONS_DISABLED_REASON, NotificationPreferences, PreferencesPatch, PreferencesUpdate,
    SendOutcome,
};
use crate::domain::{Error, UserId};

/// Domain use-case port for notifications.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NotificationCommand: Send + Sync {
    /// Stored preferences, creating defaults on first access.
    async fn preferences(&self, user_id: UserId) -> Result<NotificationPreferences, Error>;

    async fn replace_preferences(
        &self,
        user_id: UserId,
        update: PreferencesUpdate,
    ) -> Result<NotificationPreferences, Error>;

    async fn patch_preferences(
        &self,
        user_id: UserId,
        patch: PreferencesPatch,
    ) -> Result<NotificationPreferences, Error>;

    async fn send(&self, user_id: UserId, message: String, kind: String)
    -> Result<SendOutcome, Error>;
}

/// Fixture command serving defaults and blocking sends.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureNotificationCommand;

#[async_trait]
impl NotificationCommand for FixtureNotificationCommand {
    async fn preferences(&self, user_id: UserId) -> Result<NotificationPreferences, Error> {
        Ok(NotificationPreferences::defaults(user_id, Utc::now()))
    }

    async fn replace_preferences(
        &self,
        user_id: UserId,
        update: PreferencesUpdate,
    ) -> Result<NotificationPreferences, Error> {
        Ok(update.into_preferences(user_id, Utc::now()))
    }

    async fn patch_preferences(
        &self,
        user_id: UserId,
        patch: PreferencesPatch,
    ) -> Result<NotificationPreferences, Error> {
        let now = Utc::now();
        let mut preferences = NotificationPreferences::defaults(user_id, now);
        preferences.apply(patch, now);
        Ok(preferences)
    }

    async fn send(
        &self,
        _user_id: UserId,
        _message: String,
        _kind: String,
    ) -> Result<SendOutcome, Error> {
        Ok(SendOutcome::Blocked {
            reason: NOTIFICATIONS_DISABLED_REASON.to_owned(),
        })
    }
}
