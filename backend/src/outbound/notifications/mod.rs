//! Notification delivery adapters.
//!
//! Only a logging sender exists; no push, email or SMS provider is wired.

mod logging_sender;

pub use logging_sender::LoggingNotificationSender;
