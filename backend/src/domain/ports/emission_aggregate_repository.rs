//! Port for aggregate queries over emission calculations.

use async_trait::async_trait;

use crate::domain::aggregation::{
    CategoryAggregate, DateRange, GroupBucket, HistoryPoint, HistoryQuery, Interval, SummaryQuery,
};

use super::define_port_error;

define_port_error! {
    /// Errors raised by aggregate query adapters.
    pub enum EmissionAggregateRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } =>
            "emission aggregate connection failed: {message}",
        /// Query failed during execution.
        Query { message: String } =>
            "emission aggregate query failed: {message}",
    }
}

/// Port for emission aggregates.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EmissionAggregateRepository: Send + Sync {
    /// Buckets ordered by time, limited to `query.limit`.
    async fn history(
        &self,
        query: &HistoryQuery,
    ) -> Result<Vec<HistoryPoint>, EmissionAggregateRepositoryError>;

    /// Per-category aggregates sorted and paged as requested.
    async fn summary(
        &self,
        query: &SummaryQuery,
    ) -> Result<Vec<CategoryAggregate>, EmissionAggregateRepositoryError>;

    /// Per-category aggregates over the sessions of one group.
    async fn group_summary(
        &self,
        group_id: i64,
        range: &DateRange,
    ) -> Result<Vec<CategoryAggregate>, EmissionAggregateRepositoryError>;

    /// Bucketed totals and averages over the sessions of one group.
    async fn group_buckets(
        &self,
        group_id: i64,
        interval: Interval,
        range: &DateRange,
    ) -> Result<Vec<GroupBucket>, EmissionAggregateRepositoryError>;
}

/// Fixture repository returning empty aggregates.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureEmissionAggregateRepository;

#[async_trait]
impl EmissionAggregateRepository for FixtureEmissionAggregateRepository {
    async fn history(
        &self,
        _query: &HistoryQuery,
    ) -> Result<Vec<HistoryPoint>, EmissionAggregateRepositoryError> {
        Ok(Vec::new())
    }

    async fn summary(
        &self,
        _query: &SummaryQuery,
    ) -> Result<Vec<CategoryAggregate>, EmissionAggregateRepositoryError> {
        Ok(Vec::new())
    }

    async fn group_summary(
        &self,
        _group_id: i64,
        _range: &DateRange,
    ) -> Result<Vec<CategoryAggregate>, EmissionAggregateRepositoryError> {
        Ok(Vec::new())
    }

    async fn group_buckets(
        &self,
        _group_id: i64,
        _interval: Interval,
        _range: &DateRange,
    ) -> Result<Vec<GroupBucket>, EmissionAggregateRepositoryError> {
        Ok(Vec::new())
    }
}
