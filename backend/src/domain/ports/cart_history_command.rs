//! Driving ports for recording and listing validated carts.

use async_trait::async_trait;
use chrono::Utc;

use crate::domain::cart_history::{
    CartHistoryEntry, CartHistoryReceipt, CartMetrics, PeriodLabels,
};
use crate::domain::{Error, UserId};

/// Domain use-case port for appending cart summaries.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CartHistoryCommand: Send + Sync {
    async fn record(
        &self,
        user_id: UserId,
        metrics: CartMetrics,
    ) -> Result<CartHistoryReceipt, Error>;
}

/// Domain use-case port for reading cart summaries.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CartHistoryQuery: Send + Sync {
    /// Most recent entries, newest first. Storage failures yield an empty
    /// list.
    async fn list_recent(
        &self,
        user_id: UserId,
        limit: Option<u32>,
    ) -> Result<Vec<CartHistoryEntry>, Error>;
}

/// Fixture cart history ports without storage.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureCartHistoryService;

#[async_trait]
impl CartHistoryCommand for FixtureCartHistoryService {
    async fn record(
        &self,
        _user_id: UserId,
        _metrics: CartMetrics,
    ) -> Result<CartHistoryReceipt, Error> {
        let now = Utc::now();
        Ok(CartHistoryReceipt {
            id: 1,
            validated_at: now,
            labels: PeriodLabels::for_instant(now),
        })
    }
}

#[async_trait]
impl CartHistoryQuery for FixtureCartHistoryService {
    async fn list_recent(
        &self,
        _user_id: UserId,
        _limit: Option<u32>,
    ) -> Result<Vec<CartHistoryEntry>, Error> {
        Ok(Vec::new())
    }
}
