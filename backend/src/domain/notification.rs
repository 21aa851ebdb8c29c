//! Notification preferences and dispatch outcomes.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};

use super::UserId;

/// Reason returned when a user has disabled notifications.
pub const NOTIFICATIONS_DISABLED_REASON: &str = "Notifications disabled for this user";
/// Notification type used when the client sends none.
pub const DEFAULT_NOTIFICATION_TYPE: &str = "info";

/// How often notifications may be delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NotificationFrequency {
    #[default]
    Immediate,
    Hourly,
    Daily,
    Weekly,
}

impl NotificationFrequency {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Immediate => "immediate",
            Self::Hourly => "hourly",
            Self::Daily => "daily",
            Self::Weekly => "weekly",
        }
    }
}

impl fmt::Display for NotificationFrequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned for an unknown frequency.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported notification frequency: {0}")]
pub struct ParseFrequencyError(pub String);

impl FromStr for NotificationFrequency {
    type Err = ParseFrequencyError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "immediate" => Ok(Self::Immediate),
            "hourly" => Ok(Self::Hourly),
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            other => Err(ParseFrequencyError(other.to_owned())),
        }
    }
}

/// Channel a notification is delivered on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationChannel {
    Push,
    Email,
    Sms,
    /// No channel allowed; the sender only logs.
    Log,
}

impl NotificationChannel {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Push => "push",
            Self::Email => "email",
            Self::Sms => "sms",
            Self::Log => "log",
        }
    }
}

/// Stored per-user preferences.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationPreferences {
    pub user_id: UserId,
    pub enabled: bool,
    pub frequency: NotificationFrequency,
    pub types: Vec<String>,
    pub allow_email: bool,
    pub allow_push: bool,
    pub allow_sms: bool,
    pub last_notified_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl NotificationPreferences {
    /// Preferences created for a user with none stored.
    pub fn defaults(user_id: UserId, now: DateTime<Utc>) -> Self {
        Self {
            user_id,
            enabled: true,
            frequency: NotificationFrequency::Immediate,
            types: Vec::new(),
            allow_email: true,
            allow_push: true,
            allow_sms: false,
            last_notified_at: None,
            updated_at: now,
        }
    }

    /// Preferred delivery channel: push, then email, then SMS.
    pub fn channel(&self) -> NotificationChannel {
        if self.allow_push {
            NotificationChannel::Push
        } else if self.allow_email {
            NotificationChannel::Email
        } else if self.allow_sms {
            NotificationChannel::Sms
        } else {
            NotificationChannel::Log
        }
    }

    /// Apply a partial update.
    pub fn apply(&mut self, patch: PreferencesPatch, now: DateTime<Utc>) {
        let PreferencesPatch {
            enabled,
            frequency,
            types,
            allow_email,
            allow_push,
            allow_sms,
            last_notified_at,
        } = patch;
        if let Some(value) = enabled {
            self.enabled = value;
        }
        if let Some(value) = frequency {
            self.frequency = value;
        }
        if let Some(value) = types {
            self.types = value;
        }
        if let Some(value) = allow_email {
            self.allow_email = value;
        }
        if let Some(value) = allow_push {
            self.allow_push = value;
        }
        if let Some(value) = allow_sms {
            self.allow_sms = value;
        }
        if last_notified_at.is_some() {
            self.last_notified_at = last_notified_at;
        }
        self.updated_at = now;
    }
}

/// Full replacement of a user's preferences.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreferencesUpdate {
    pub enabled: bool,
    pub frequency: NotificationFrequency,
    pub types: Vec<String>,
    pub allow_email: bool,
    pub allow_push: bool,
    pub allow_sms: bool,
    pub last_notified_at: Option<DateTime<Utc>>,
}

impl PreferencesUpdate {
    pub fn into_preferences(self, user_id: UserId, now: DateTime<Utc>) -> NotificationPreferences {
        NotificationPreferences {
            user_id,
            enabled: self.enabled,
            frequency: self.frequency,
            types: self.types,
            allow_email: self.allow_email,
            allow_push: self.allow_push,
            allow_sms: self.allow_sms,
            last_notified_at: self.last_notified_at,
            updated_at: now,
        }
    }
}

/// Partial update; `None` fields are left unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PreferencesPatch {
    pub enabled: Option<bool>,
    pub frequency: Option<NotificationFrequency>,
    pub types: Option<Vec<String>>,
    pub allow_email: Option<bool>,
    pub allow_push: Option<bool>,
    pub allow_sms: Option<bool>,
    pub last_notified_at: Option<DateTime<Utc>>,
}

/// Message to deliver to a user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationDispatch {
    pub user_id: UserId,
    pub message: String,
    pub kind: String,
    pub channel: NotificationChannel,
}

/// Sender acknowledgement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchReceipt {
    pub mock: bool,
    pub channel: NotificationChannel,
    pub user_id: UserId,
    pub kind: String,
    pub message: String,
}

/// Outcome of a send request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    Blocked { reason: String },
    Sent(DispatchReceipt),
}
