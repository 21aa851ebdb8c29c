//! Audit log reads.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use crate::domain::audit::{DEFAULT_RECENT_LIMIT, MAX_RECENT_LIMIT};
use crate::domain::ports::{AuditQuery, AuditRepository};
use crate::domain::{AuditEvent, Error};

/// Audit service implementing [`AuditQuery`].
#[derive(Clone)]
pub struct AuditService {
    repo: Arc<dyn AuditRepository>,
}

impl AuditService {
    pub fn new(repo: Arc<dyn AuditRepository>) -> Self {
        Self { repo }
    }
}

#[async_trait]
impl AuditQuery for AuditService {
    async fn list_recent(&self, limit: Option<u32>) -> Result<Vec<AuditEvent>, Error> {
        let limit = limit
            .unwrap_or(DEFAULT_RECENT_LIMIT)
            .clamp(1, MAX_RECENT_LIMIT);
        match self.repo.list_recent(limit).await {
            Ok(events) => Ok(events),
            Err(error) => {
                warn!(%error, "audit listing failed; returning empty list");
                Ok(Vec::new())
            }
        }
    }
}
