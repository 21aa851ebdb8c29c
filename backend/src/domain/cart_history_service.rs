//! Cart history service.

use std::sync::Arc;

use async_trait::async_trait;
use mockable::Clock;
use tracing::warn;

use crate::domain::cart_history::{
    CartHistoryEntry, CartHistoryReceipt, CartMetrics, NewCartHistoryEntry, PeriodLabels,
    clamp_history_limit,
};
use crate::domain::ports::{
    CartHistoryCommand, CartHistoryQuery, CartHistoryRepository, CartHistoryRepositoryError,
};
use crate::domain::{Error, UserId};

/// Cart history service implementing the cart history driving ports.
#[derive(Clone)]
pub struct CartHistoryService<R> {
    repo: Arc<R>,
    clock: Arc<dyn Clock>,
}

impl<R> CartHistoryService<R> {
    pub fn new(repo: Arc<R>, clock: Arc<dyn Clock>) -> Self {
        Self { repo, clock }
    }
}

fn map_history_error(error: CartHistoryRepositoryError) -> Error {
    match error {
        CartHistoryRepositoryError::Connection { message } => {
            Error::service_unavailable(format!("cart history unavailable: {message}"))
        }
        CartHistoryRepositoryError::Query { message } => {
            Error::internal(format!("cart history error: {message}"))
        }
    }
}

#[async_trait]
impl<R> CartHistoryCommand for CartHistoryService<R>
where
    R: CartHistoryRepository,
{
    async fn record(
        &self,
        user_id: UserId,
        metrics: CartMetrics,
    ) -> Result<CartHistoryReceipt, Error> {
        let now = self.clock.utc();
        let labels = PeriodLabels::for_instant(now);
        let entry = NewCartHistoryEntry {
            user_id,
            metrics,
            labels: labels.clone(),
            created_at: now,
        };
        let id = self
            .repo
            .insert(&entry)
            .await
            .map_err(map_history_error)?;
        Ok(CartHistoryReceipt {
            id,
            validated_at: now,
            labels,
        })
    }
}

#[async_trait]
impl<R> CartHistoryQuery for CartHistoryService<R>
where
    R: CartHistoryRepository,
{
    async fn list_recent(
        &self,
        user_id: UserId,
        limit: Option<u32>,
    ) -> Result<Vec<CartHistoryEntry>, Error> {
        match self
            .repo
            .list_recent(&user_id, clamp_history_limit(limit))
            .await
        {
            Ok(entries) => Ok(entries),
            Err(error) => {
                warn!(%error, %user_id, "cart history listing failed; returning empty list");
                Ok(Vec::new())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ErrorCode;
    use crate::domain::ports::MockCartHistoryRepository;
    use crate::domain::test_fixtures::{fixture_clock, fixture_timestamp};
    use rstest::rstest;

    fn metrics() -> CartMetrics {
        CartMetrics {
            total_co2_g: 12_500,
            article_count: 8,
            distinct_product_count: 6,
            total_distance_km: 420.0,
            days_captured_by_tree: 0.5,
            tree_equivalent: 0.01,
        }
    }

    #[tokio::test]
    async fn record_labels_rows_with_the_insertion_instant() {
        let user_id = UserId::from_legacy(4);
        let mut repo = MockCartHistoryRepository::new();
        repo.expect_insert()
            .withf(move |entry| {
                entry.user_id == user_id
                    && entry.created_at == fixture_timestamp()
                    && entry.labels.week == "2025-W47"
            })
            .times(1)
            .return_once(|_| Ok(77));

        let receipt = CartHistoryService::new(Arc::new(repo), fixture_clock())
            .record(user_id, metrics())
            .await
            .expect("recorded");
        assert_eq!(receipt.id, 77);
        assert_eq!(receipt.labels.month, "2025-11");
        assert_eq!(receipt.validated_at, fixture_timestamp());
    }

    #[tokio::test]
    async fn record_maps_outages_to_service_unavailable() {
        let mut repo = MockCartHistoryRepository::new();
        repo.expect_insert()
            .return_once(|_| Err(CartHistoryRepositoryError::connection("refused")));

        let error = CartHistoryService::new(Arc::new(repo), fixture_clock())
            .record(UserId::random(), metrics())
            .await
            .expect_err("outage");
        assert_eq!(error.code(), ErrorCode::ServiceUnavailable);
    }

    #[rstest]
    #[case(None, 50)]
    #[case(Some(1_000), 500)]
    #[tokio::test]
    async fn list_recent_clamps_limit(#[case] requested: Option<u32>, #[case] expected: u32) {
        let mut repo = MockCartHistoryRepository::new();
        repo.expect_list_recent()
            .withf(move |_, limit| *limit == expected)
            .times(1)
            .return_once(|_, _| Ok(Vec::new()));

        let rows = CartHistoryService::new(Arc::new(repo), fixture_clock())
            .list_recent(UserId::random(), requested)
            .await
            .expect("listing");
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn list_recent_swallows_storage_errors() {
        let mut repo = MockCartHistoryRepository::new();
        repo.expect_list_recent()
            .return_once(|_, _| Err(CartHistoryRepositoryError::query("boom")));

        let rows = CartHistoryService::new(Arc::new(repo), fixture_clock())
            .list_recent(UserId::random(), None)
            .await
            .expect("fallback");
        assert!(rows.is_empty());
    }
}
