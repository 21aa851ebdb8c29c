//! Audit trail of notable events.

use chrono::{DateTime, Utc};

/// Maximum stored length of an event type.
pub const EVENT_TYPE_MAX_LEN: usize = 64;
/// Maximum stored length of an event message.
pub const MESSAGE_MAX_LEN: usize = 512;
/// Default size of a recent-events listing.
pub const DEFAULT_RECENT_LIMIT: u32 = 20;
/// Upper bound on a recent-events listing.
pub const MAX_RECENT_LIMIT: u32 = 200;

/// Stored audit event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditEvent {
    pub id: i64,
    pub event_type: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

/// Event waiting to be recorded.
///
/// Fields are truncated on construction so a long message never prevents
/// the event from being stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAuditEvent {
    event_type: String,
    message: String,
}

impl NewAuditEvent {
    /// # Examples
    /// ```
    /// use carbon_tracker::domain::NewAuditEvent;
    ///
    /// let event = NewAuditEvent::new("token_rotated", "x".repeat(600));
    /// assert_eq!(event.message().chars().count(), 512);
    /// ```
    pub fn new(event_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            event_type: truncate_chars(event_type.into(), EVENT_TYPE_MAX_LEN),
            message: truncate_chars(message.into(), MESSAGE_MAX_LEN),
        }
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

fn truncate_chars(value: String, max: usize) -> String {
    match value.char_indices().nth(max) {
        Some((byte_index, _)) => value[..byte_index].to_owned(),
        None => value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn short_values_are_kept() {
        let event = NewAuditEvent::new("product_created", "ean=123");
        assert_eq!(event.event_type(), "product_created");
        assert_eq!(event.message(), "ean=123");
    }

    #[rstest]
    fn truncation_respects_char_boundaries() {
        let event = NewAuditEvent::new("é".repeat(70), "ü".repeat(513));
        assert_eq!(event.event_type().chars().count(), EVENT_TYPE_MAX_LEN);
        assert_eq!(event.message().chars().count(), MESSAGE_MAX_LEN);
    }
}
