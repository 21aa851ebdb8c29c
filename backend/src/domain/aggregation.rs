//! Read-side emission aggregates: time series, category summaries and group
//! comparisons.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};

/// Default number of history buckets.
pub const DEFAULT_HISTORY_LIMIT: u32 = 366;
/// Maximum number of history buckets or summary rows.
pub const MAX_AGGREGATE_LIMIT: u32 = 1000;
/// Default number of summary rows.
pub const DEFAULT_SUMMARY_LIMIT: u32 = 100;
/// Note attached to a summary whose aggregation failed.
pub const AGGREGATION_SKIPPED_NOTE: &str = "Aggregation skipped";

/// Failure to parse an aggregation parameter.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported {parameter}: {value}")]
pub struct ParseAggregationError {
    pub parameter: &'static str,
    pub value: String,
}

impl ParseAggregationError {
    fn new(parameter: &'static str, value: &str) -> Self {
        Self {
            parameter,
            value: value.to_owned(),
        }
    }
}

macro_rules! string_enum {
    ($(#[$meta:meta])* $name:ident, $param:literal { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = ParseAggregationError;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                match value.trim().to_ascii_lowercase().as_str() {
                    $($text => Ok(Self::$variant),)+
                    _ => Err(ParseAggregationError::new($param, value)),
                }
            }
        }
    };
}

string_enum!(
    /// Time bucket width, passed to `date_trunc`.
    Interval, "interval" { Day => "day", Week => "week", Month => "month" }
);
string_enum!(
    /// Per-bucket statistic.
    Metric, "metric" { Sum => "sum", Avg => "avg", Count => "count", Min => "min", Max => "max" }
);
string_enum!(
    /// Secondary grouping of history buckets.
    HistoryGroupBy, "group_by" {
        None => "none",
        Category => "category",
        Product => "product",
        Store => "store",
        Brand => "brand",
    }
);
string_enum!(
    /// Summary sort column.
    SummarySort, "sort_by" {
        TotalEmission => "total_emission",
        AvgEmission => "avg_emission",
        MinEmission => "min_emission",
        MaxEmission => "max_emission",
    }
);
string_enum!(
    /// Sort direction.
    SortOrder, "order" { Asc => "asc", Desc => "desc" }
);

/// Parse a comma separated metric list, defaulting to sum and count.
///
/// # Examples
/// ```
/// use carbon_tracker::domain::aggregation::{Metric, parse_metrics};
///
/// assert_eq!(parse_metrics(None).expect("defaults"), vec![Metric::Sum, Metric::Count]);
/// assert_eq!(parse_metrics(Some("max, avg")).expect("valid list"), vec![Metric::Max, Metric::Avg]);
/// ```
pub fn parse_metrics(raw: Option<&str>) -> Result<Vec<Metric>, ParseAggregationError> {
    let mut metrics = Vec::new();
    for part in raw.unwrap_or_default().split(',') {
        if part.trim().is_empty() {
            continue;
        }
        let metric = part.parse::<Metric>()?;
        if !metrics.contains(&metric) {
            metrics.push(metric);
        }
    }
    if metrics.is_empty() {
        metrics = vec![Metric::Sum, Metric::Count];
    }
    Ok(metrics)
}

/// Inclusive calendar date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DateRange {
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
}

/// Error raised when a range starts after it ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("start_date must be <= end_date")]
pub struct InvertedDateRange;

impl DateRange {
    pub fn new(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Result<Self, InvertedDateRange> {
        match (start, end) {
            (Some(s), Some(e)) if s > e => Err(InvertedDateRange),
            _ => Ok(Self { start, end }),
        }
    }

    pub fn start(&self) -> Option<NaiveDate> {
        self.start
    }

    pub fn end(&self) -> Option<NaiveDate> {
        self.end
    }
}

/// Time-series query over emission calculations.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryQuery {
    pub interval: Interval,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub metrics: Vec<Metric>,
    pub group_by: HistoryGroupBy,
    pub limit: u32,
}

impl HistoryQuery {
    pub fn includes(&self, metric: Metric) -> bool {
        self.metrics.contains(&metric)
    }
}

/// One history bucket; unrequested metrics are `None`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct HistoryPoint {
    pub t: DateTime<Utc>,
    pub sum: Option<f64>,
    pub avg: Option<f64>,
    pub count: Option<i64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub group: Option<String>,
}

/// Totals across a history series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HistorySummary {
    pub sum_total: f64,
    pub trend_slope_per_interval: f64,
    pub count_points: usize,
}

impl HistorySummary {
    /// Summarise `series`; the slope uses each bucket's sum, falling back to
    /// its average.
    pub fn of(series: &[HistoryPoint]) -> Self {
        let values: Vec<f64> = series
            .iter()
            .map(|point| point.sum.or(point.avg).unwrap_or(0.0))
            .collect();
        Self {
            sum_total: series.iter().filter_map(|point| point.sum).sum(),
            trend_slope_per_interval: trend_slope(&values),
            count_points: series.len(),
        }
    }
}

/// History response model.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryReport {
    pub query: HistoryQuery,
    pub series: Vec<HistoryPoint>,
    pub summary: HistorySummary,
}

/// Least-squares slope of `values` against their index; zero below two
/// points.
///
/// # Examples
/// ```
/// use carbon_tracker::domain::aggregation::trend_slope;
///
/// assert_eq!(trend_slope(&[1.0, 3.0, 5.0]), 2.0);
/// assert_eq!(trend_slope(&[4.0]), 0.0);
/// ```
pub fn trend_slope(values: &[f64]) -> f64 {
    let n = values.len() as f64;
    if values.len() < 2 {
        return 0.0;
    }
    let mean_x = (n - 1.0) / 2.0;
    let mean_y = values.iter().sum::<f64>() / n;
    let (num, den) = values
        .iter()
        .enumerate()
        .fold((0.0, 0.0), |(num, den), (i, y)| {
            let dx = i as f64 - mean_x;
            (num + dx * (y - mean_y), den + dx * dx)
        });
    if den == 0.0 { 0.0 } else { num / den }
}

/// Category summary query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryQuery {
    pub category_code: Option<String>,
    pub range: DateRange,
    pub sort_by: SummarySort,
    pub order: SortOrder,
    pub limit: u32,
    pub offset: u32,
}

impl Default for SummaryQuery {
    fn default() -> Self {
        Self {
            category_code: None,
            range: DateRange::default(),
            sort_by: SummarySort::TotalEmission,
            order: SortOrder::Desc,
            limit: DEFAULT_SUMMARY_LIMIT,
            offset: 0,
        }
    }
}

/// Per-category statistics in gCO2e.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryAggregate {
    pub category_code: String,
    pub subcategory_code: Option<String>,
    pub avg_emission: f64,
    pub min_emission: f64,
    pub max_emission: f64,
    pub total_emission: f64,
}

/// Summary response model.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SummaryReport {
    pub items: Vec<CategoryAggregate>,
    /// Set when aggregation failed and `items` is a fallback.
    pub note: Option<String>,
}

/// Category aggregates for one group's sessions.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupCategorySummary {
    pub group_id: i64,
    pub items: Vec<CategoryAggregate>,
}

/// One bucket of a group's time series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroupBucket {
    pub bucket_start: NaiveDate,
    pub total_emission: f64,
    pub avg_emission: f64,
}

/// A group's raw time series.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupSeries {
    pub group_id: i64,
    pub items: Vec<GroupBucket>,
}

/// Group comparison query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupCompareQuery {
    pub group_ids: Vec<i64>,
    pub interval: Interval,
    pub range: DateRange,
}

/// Ranked series entry.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedGroupSeries {
    pub group_id: i64,
    pub interval: Interval,
    pub low_co2_rank: u32,
    pub trend_slope: f64,
    pub items: Vec<GroupBucket>,
}

/// Period statistics of one group relative to the best group.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroupComparisonRow {
    pub group_id: i64,
    pub low_co2_rank: u32,
    pub period_total: f64,
    pub period_avg: f64,
    pub trend_slope: f64,
    pub diff_abs_total: f64,
    /// Percent above the best total; `None` when the best total is zero.
    pub diff_rel_total: Option<f64>,
}

/// Comparison response model, ordered by rank.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupComparison {
    pub interval: Interval,
    pub series: Vec<RankedGroupSeries>,
    pub comparison: Vec<GroupComparisonRow>,
}

/// Rank groups ascending by period total.
pub fn compare_groups(interval: Interval, groups: Vec<GroupSeries>) -> GroupComparison {
    let mut stats: Vec<(GroupSeries, f64, f64, f64)> = groups
        .into_iter()
        .map(|group| {
            let total: f64 = group.items.iter().map(|b| b.total_emission).sum();
            let avg = if group.items.is_empty() {
                0.0
            } else {
                group.items.iter().map(|b| b.avg_emission).sum::<f64>() / group.items.len() as f64
            };
            let totals: Vec<f64> = group.items.iter().map(|b| b.total_emission).collect();
            let slope = trend_slope(&totals);
            (group, total, avg, slope)
        })
        .collect();
    stats.sort_by(|a, b| a.1.total_cmp(&b.1));

    let best = stats.first().map_or(0.0, |entry| entry.1);
    let mut series = Vec::with_capacity(stats.len());
    let mut comparison = Vec::with_capacity(stats.len());
    for (rank, (group, total, avg, slope)) in (1_u32..).zip(stats) {
        let diff_abs = total - best;
        comparison.push(GroupComparisonRow {
            group_id: group.group_id,
            low_co2_rank: rank,
            period_total: total,
            period_avg: avg,
            trend_slope: slope,
            diff_abs_total: diff_abs,
            diff_rel_total: (best != 0.0).then(|| diff_abs / best * 100.0),
        });
        series.push(RankedGroupSeries {
            group_id: group.group_id,
            interval,
            low_co2_rank: rank,
            trend_slope: slope,
            items: group.items,
        });
    }

    GroupComparison {
        interval,
        series,
        comparison,
    }
}
