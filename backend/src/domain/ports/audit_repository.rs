//! Port for the audit event log.

use async_trait::async_trait;

use crate::domain::{AuditEvent, NewAuditEvent};

use super::define_port_error;

define_port_error! {
    /// Errors raised by audit repository adapters.
    pub enum AuditRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } =>
            "audit repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } =>
            "audit repository query failed: {message}",
    }
}

/// Port for appending and reading audit events.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AuditRepository: Send + Sync {
    async fn record(&self, event: &NewAuditEvent) -> Result<(), AuditRepositoryError>;

    /// Most recent events, newest first.
    async fn list_recent(&self, limit: u32) -> Result<Vec<AuditEvent>, AuditRepositoryError>;
}

/// Fixture repository that discards events.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureAuditRepository;

#[async_trait]
impl AuditRepository for FixtureAuditRepository {
    async fn record(&self, _event: &NewAuditEvent) -> Result<(), AuditRepositoryError> {
        Ok(())
    }

    async fn list_recent(&self, _limit: u32) -> Result<Vec<AuditEvent>, AuditRepositoryError> {
        Ok(Vec::new())
    }
}

/// Record an event, logging and discarding any failure.
pub async fn record_best_effort(audit: &dyn AuditRepository, event: NewAuditEvent) {
    if let Err(error) = audit.record(&event).await {
        tracing::warn!(
            %error,
            event_type = event.event_type(),
            "failed to record audit event"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn best_effort_recording_swallows_failures() {
        let mut repo = MockAuditRepository::new();
        repo.expect_record()
            .times(1)
            .returning(|_| Err(AuditRepositoryError::connection("down")));

        record_best_effort(&repo, NewAuditEvent::new("x", "y")).await;
    }

    #[tokio::test]
    async fn fixture_lists_nothing() {
        let events = FixtureAuditRepository
            .list_recent(20)
            .await
            .expect("fixture listing");
        assert!(events.is_empty());
    }
}
