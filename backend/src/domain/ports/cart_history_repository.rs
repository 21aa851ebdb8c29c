//! Port for cart history persistence and window totals.

use async_trait::async_trait;

use crate::domain::UserId;
use crate::domain::cart_history::{CartHistoryEntry, NewCartHistoryEntry};
use crate::domain::challenge::{Co2WindowTotals, TimeWindow};

use super::define_port_error;

define_port_error! {
    /// Errors raised by cart history repository adapters.
    pub enum CartHistoryRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } =>
            "cart history repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } =>
            "cart history repository query failed: {message}",
    }
}

/// Port for the append-only `co2_cart_history` table.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CartHistoryRepository: Send + Sync {
    /// Insert a row and return its identifier.
    async fn insert(&self, entry: &NewCartHistoryEntry) -> Result<i64, CartHistoryRepositoryError>;

    /// Most recent rows for the user, newest first.
    async fn list_recent(
        &self,
        user_id: &UserId,
        limit: u32,
    ) -> Result<Vec<CartHistoryEntry>, CartHistoryRepositoryError>;

    /// Sum of `total_co2_g` and the count of distinct days within `window`.
    async fn co2_totals(
        &self,
        user_id: &UserId,
        window: &TimeWindow,
    ) -> Result<Co2WindowTotals, CartHistoryRepositoryError>;
}

/// Fixture repository that accepts inserts and reports no history.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureCartHistoryRepository;

#[async_trait]
impl CartHistoryRepository for FixtureCartHistoryRepository {
    async fn insert(&self, _entry: &NewCartHistoryEntry) -> Result<i64, CartHistoryRepositoryError> {
        Ok(1)
    }

    async fn list_recent(
        &self,
        _user_id: &UserId,
        _limit: u32,
    ) -> Result<Vec<CartHistoryEntry>, CartHistoryRepositoryError> {
        Ok(Vec::new())
    }

    async fn co2_totals(
        &self,
        _user_id: &UserId,
        _window: &TimeWindow,
    ) -> Result<Co2WindowTotals, CartHistoryRepositoryError> {
        Ok(Co2WindowTotals::default())
    }
}
