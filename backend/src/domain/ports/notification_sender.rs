//! Port for delivering notifications.

use async_trait::async_trait;

use crate::domain::notification::{DispatchReceipt, NotificationDispatch};

use super::define_port_error;

define_port_error! {
    /// Errors raised by notification senders.
    pub enum NotificationSenderError {
        /// Delivery channel rejected the message.
        Delivery { message: String } =>
            "notification delivery failed: {message}",
    }
}

/// Port for notification delivery.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NotificationSender: Send + Sync {
    async fn send(
        &self,
        dispatch: &NotificationDispatch,
    ) -> Result<DispatchReceipt, NotificationSenderError>;
}
