//! Emission reporting service.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use tracing::warn;

use crate::domain::Error;
use crate::domain::aggregation::{
    AGGREGATION_SKIPPED_NOTE, DateRange, GroupCategorySummary, GroupCompareQuery,
    GroupComparison, GroupSeries, HistoryQuery, HistoryReport, HistorySummary, Interval,
    SummaryQuery, SummaryReport, compare_groups,
};
use crate::domain::ports::{
    EmissionAggregateRepository, EmissionAggregateRepositoryError, EmissionReportQuery,
};

/// Reporting service implementing [`EmissionReportQuery`].
#[derive(Clone)]
pub struct ReportingService<R> {
    repo: Arc<R>,
}

impl<R> ReportingService<R> {
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }
}

impl<R> ReportingService<R>
where
    R: EmissionAggregateRepository,
{
    fn map_repository_error(error: EmissionAggregateRepositoryError) -> Error {
        match error {
            EmissionAggregateRepositoryError::Connection { message } => Error::service_unavailable(
                format!("emission aggregates unavailable: {message}"),
            ),
            EmissionAggregateRepositoryError::Query { message } => {
                Error::internal(format!("emission aggregate error: {message}"))
            }
        }
    }

    fn require_groups(group_ids: &[i64]) -> Result<(), Error> {
        if group_ids.is_empty() {
            return Err(Error::unprocessable("at least one group id is required")
                .with_details(json!({ "field": "ids", "code": "missing_field" })));
        }
        Ok(())
    }
}

#[async_trait]
impl<R> EmissionReportQuery for ReportingService<R>
where
    R: EmissionAggregateRepository,
{
    async fn history(&self, query: HistoryQuery) -> Result<HistoryReport, Error> {
        let series = self
            .repo
            .history(&query)
            .await
            .map_err(Self::map_repository_error)?;
        let summary = HistorySummary::of(&series);
        Ok(HistoryReport {
            query,
            series,
            summary,
        })
    }

    async fn summary(&self, query: SummaryQuery) -> Result<SummaryReport, Error> {
        match self.repo.summary(&query).await {
            Ok(items) => Ok(SummaryReport { items, note: None }),
            Err(error) => {
                warn!(%error, "emission summary aggregation failed; returning empty summary");
                Ok(SummaryReport {
                    items: Vec::new(),
                    note: Some(AGGREGATION_SKIPPED_NOTE.to_owned()),
                })
            }
        }
    }

    async fn summary_groups(
        &self,
        group_ids: Vec<i64>,
        range: DateRange,
    ) -> Result<Vec<GroupCategorySummary>, Error> {
        Self::require_groups(&group_ids)?;
        let mut summaries = Vec::with_capacity(group_ids.len());
        for group_id in group_ids {
            let items = self
                .repo
                .group_summary(group_id, &range)
                .await
                .map_err(Self::map_repository_error)?;
            summaries.push(GroupCategorySummary { group_id, items });
        }
        Ok(summaries)
    }

    async fn compare_groups(&self, query: GroupCompareQuery) -> Result<GroupComparison, Error> {
        Self::require_groups(&query.group_ids)?;
        if query.interval == Interval::Day {
            return Err(Error::unprocessable("interval must be 'week' or 'month'")
                .with_details(json!({
                    "field": "interval",
                    "value": query.interval.as_str(),
                    "code": "invalid_interval",
                })));
        }

        let mut groups = Vec::with_capacity(query.group_ids.len());
        for group_id in &query.group_ids {
            let items = self
                .repo
                .group_buckets(*group_id, query.interval, &query.range)
                .await
                .map_err(Self::map_repository_error)?;
            groups.push(GroupSeries {
                group_id: *group_id,
                items,
            });
        }
        Ok(compare_groups(query.interval, groups))
    }
}
