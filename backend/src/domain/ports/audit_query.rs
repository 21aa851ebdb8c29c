//! Driving port for reading the audit log.

use async_trait::async_trait;

use crate::domain::{AuditEvent, Error};

/// Domain use-case port for recent audit events.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AuditQuery: Send + Sync {
    /// Newest events first. Storage failures yield an empty list.
    async fn list_recent(&self, limit: Option<u32>) -> Result<Vec<AuditEvent>, Error>;
}
