//! Driving port for emission reports.

use async_trait::async_trait;

use crate::domain::Error;
use crate::domain::aggregation::{
    DateRange, GroupCategorySummary, GroupCompareQuery, GroupComparison, HistoryQuery,
    HistoryReport, HistorySummary, SummaryQuery, SummaryReport, compare_groups,
};

/// Domain use-case port for emission reporting.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EmissionReportQuery: Send + Sync {
    async fn history(&self, query: HistoryQuery) -> Result<HistoryReport, Error>;

    /// Category summary. Storage failures yield an empty report with a note.
    async fn summary(&self, query: SummaryQuery) -> Result<SummaryReport, Error>;

    async fn summary_groups(
        &self,
        group_ids: Vec<i64>,
        range: DateRange,
    ) -> Result<Vec<GroupCategorySummary>, Error>;

    async fn compare_groups(&self, query: GroupCompareQuery) -> Result<GroupComparison, Error>;
}

/// Fixture reports over no data.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureEmissionReportQuery;

#[async_trait]
impl EmissionReportQuery for FixtureEmissionReportQuery {
    async fn history(&self, query: HistoryQuery) -> Result<HistoryReport, Error> {
        Ok(HistoryReport {
            query,
            series: Vec::new(),
            summary: HistorySummary::of(&[]),
        })
    }

    async fn summary(&self, _query: SummaryQuery) -> Result<SummaryReport, Error> {
        Ok(SummaryReport::default())
    }

    async fn summary_groups(
        &self,
        group_ids: Vec<i64>,
        _range: DateRange,
    ) -> Result<Vec<GroupCategorySummary>, Error> {
        Ok(group_ids
            .into_iter()
            .map(|group_id| GroupCategorySummary {
                group_id,
                items: Vec::new(),
            })
            .collect())
    }

    async fn compare_groups(&self, query: GroupCompareQuery) -> Result<GroupComparison, Error> {
        Ok(compare_groups(query.interval, Vec::new()))
    }
}
