//! Sender that records dispatches in the log instead of delivering them.

use async_trait::async_trait;
use tracing::info;

use crate::domain::notification::{DispatchReceipt, NotificationDispatch};
use crate::domain::ports::{NotificationSender, NotificationSenderError};

/// Logs each dispatch and returns a receipt flagged `mock`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingNotificationSender;

#[async_trait]
impl NotificationSender for LoggingNotificationSender {
    async fn send(
        &self,
        dispatch: &NotificationDispatch,
    ) -> Result<DispatchReceipt, NotificationSenderError> {
        info!(
            user_id = %dispatch.user_id,
            channel = dispatch.channel.as_str(),
            kind = %dispatch.kind,
            "notification dispatched"
        );
        Ok(DispatchReceipt {
            mock: true,
            channel: dispatch.channel,
            user_id: dispatch.user_id.clone(),
            kind: dispatch.kind.clone(),
            message: dispatch.message.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::UserId;
    use crate::domain::notification::NotificationChannel;

    #[tokio::test]
    async fn receipts_echo_the_dispatch() {
        let dispatch = NotificationDispatch {
            user_id: UserId::from_legacy(9),
            message: "Nouveau défi disponible".to_owned(),
            kind: "challenge".to_owned(),
            channel: NotificationChannel::Email,
        };
        let receipt = LoggingNotificationSender
            .send(&dispatch)
            .await
            .expect("logging sender never fails");
        assert!(receipt.mock);
        assert_eq!(receipt.channel, NotificationChannel::Email);
        assert_eq!(receipt.user_id, dispatch.user_id);
        assert_eq!(receipt.message, dispatch.message);
    }
}
