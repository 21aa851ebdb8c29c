//! Notification preference and dispatch service.

use std::sync::Arc;

use async_trait::async_trait;
use mockable::Clock;
use tracing::warn;

use crate::domain::notification::{
    NOTIFICATIONS_DISABLED_REASON, NotificationDispatch, NotificationPreferences,
    PreferencesPatch, PreferencesUpdate, SendOutcome,
};
use crate::domain::ports::{
    NotificationCommand, NotificationPreferencesRepository,
    NotificationPreferencesRepositoryError, NotificationSender, NotificationSenderError,
};
use crate::domain::{Error, UserId};

/// Notification service implementing [`NotificationCommand`].
#[derive(Clone)]
pub struct NotificationService<R, S> {
    repo: Arc<R>,
    sender: Arc<S>,
    clock: Arc<dyn Clock>,
}

impl<R, S> NotificationService<R, S> {
    pub fn new(repo: Arc<R>, sender: Arc<S>, clock: Arc<dyn Clock>) -> Self {
        Self {
            repo,
            sender,
            clock,
        }
    }
}

impl<R, S> NotificationService<R, S>
where
    R: NotificationPreferencesRepository,
    S: NotificationSender,
{
    fn map_repository_error(error: NotificationPreferencesRepositoryError) -> Error {
        match error {
            NotificationPreferencesRepositoryError::Connection { message } => {
                Error::service_unavailable(format!(
                    "notification preferences unavailable: {message}"
                ))
            }
            NotificationPreferencesRepositoryError::Query { message } => {
                Error::internal(format!("notification preferences error: {message}"))
            }
        }
    }

    fn map_sender_error(error: NotificationSenderError) -> Error {
        match error {
            NotificationSenderError::Delivery { message } => {
                Error::service_unavailable(format!("notification delivery failed: {message}"))
            }
        }
    }

    async fn load_or_create(&self, user_id: UserId) -> Result<NotificationPreferences, Error> {
        if let Some(existing) = self
            .repo
            .find(&user_id)
            .await
            .map_err(Self::map_repository_error)?
        {
            return Ok(existing);
        }
        let defaults = NotificationPreferences::defaults(user_id, self.clock.utc());
        self.repo
            .upsert(&defaults)
            .await
            .map_err(Self::map_repository_error)
    }
}

#[async_trait]
impl<R, S> NotificationCommand for NotificationService<R, S>
where
    R: NotificationPreferencesRepository,
    S: NotificationSender,
{
    async fn preferences(&self, user_id: UserId) -> Result<NotificationPreferences, Error> {
        self.load_or_create(user_id).await
    }

    async fn replace_preferences(
        &self,
        user_id: UserId,
        update: PreferencesUpdate,
    ) -> Result<NotificationPreferences, Error> {
        let preferences = update.into_preferences(user_id, self.clock.utc());
        self.repo
            .upsert(&preferences)
            .await
            .map_err(Self::map_repository_error)
    }

    async fn patch_preferences(
        &self,
        user_id: UserId,
        patch: PreferencesPatch,
    ) -> Result<NotificationPreferences, Error> {
        let mut preferences = self.load_or_create(user_id).await?;
        preferences.apply(patch, self.clock.utc());
        self.repo
            .upsert(&preferences)
            .await
            .map_err(Self::map_repository_error)
    }

    async fn send(
        &self,
        user_id: UserId,
        message: String,
        kind: String,
    ) -> Result<SendOutcome, Error> {
        let preferences = self.load_or_create(user_id).await?;
        if !preferences.enabled {
            return Ok(SendOutcome::Blocked {
                reason: NOTIFICATIONS_DISABLED_REASON.to_owned(),
            });
        }

        let receipt = self
            .sender
            .send(&NotificationDispatch {
                user_id,
                message,
                kind,
                channel: preferences.channel(),
            })
            .await
            .map_err(Self::map_sender_error)?;

        if let Err(error) = self.repo.mark_notified(&user_id, self.clock.utc()).await {
            warn!(%error, user_id = %user_id, "failed to record last notification time");
        }
        Ok(SendOutcome::Sent(receipt))
    }
}
