//! Validated cart summaries.
//!
//! Each time a user validates a cart the client posts its CO2 metrics. Rows
//! are append-only and labelled with the calendar month and ISO week of the
//! insertion instant; the challenge engine later sums them per window.

use chrono::{DateTime, Datelike, Utc};

use super::UserId;

/// Period type stored on every row.
pub const MONTH_PERIOD_TYPE: &str = "month";
/// Default number of rows returned by a history listing.
pub const DEFAULT_HISTORY_LIMIT: u32 = 50;
/// Upper bound on a history listing.
pub const MAX_HISTORY_LIMIT: u32 = 500;

/// Metrics reported for one validated cart.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CartMetrics {
    pub total_co2_g: i64,
    pub article_count: i32,
    pub distinct_product_count: i32,
    pub total_distance_km: f64,
    pub days_captured_by_tree: f64,
    pub tree_equivalent: f64,
}

/// Month and ISO-week labels for an instant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeriodLabels {
    /// `YYYY-MM`.
    pub month: String,
    /// `YYYY-Www`, using the ISO week-numbering year.
    pub week: String,
}

impl PeriodLabels {
    /// # Examples
    /// ```
    /// use carbon_tracker::domain::cart_history::PeriodLabels;
    /// use chrono::{TimeZone, Utc};
    ///
    /// let at = Utc.with_ymd_and_hms(2025, 11, 19, 10, 0, 0).unwrap();
    /// let labels = PeriodLabels::for_instant(at);
    /// assert_eq!(labels.month, "2025-11");
    /// assert_eq!(labels.week, "2025-W47");
    /// ```
    pub fn for_instant(at: DateTime<Utc>) -> Self {
        let iso = at.iso_week();
        Self {
            month: at.format("%Y-%m").to_string(),
            week: format!("{}-W{:02}", iso.year(), iso.week()),
        }
    }
}

/// Row to insert.
#[derive(Debug, Clone, PartialEq)]
pub struct NewCartHistoryEntry {
    pub user_id: UserId,
    pub metrics: CartMetrics,
    pub labels: PeriodLabels,
    pub created_at: DateTime<Utc>,
}

/// Stored cart summary.
#[derive(Debug, Clone, PartialEq)]
pub struct CartHistoryEntry {
    pub id: i64,
    pub user_id: UserId,
    pub period_type: String,
    pub period_label: String,
    pub metrics: CartMetrics,
    pub created_at: DateTime<Utc>,
}

/// Confirmation returned after recording a cart.
#[derive(Debug, Clone, PartialEq)]
pub struct CartHistoryReceipt {
    pub id: i64,
    pub validated_at: DateTime<Utc>,
    pub labels: PeriodLabels,
}

/// Clamp a requested listing size into `1..=MAX_HISTORY_LIMIT`.
pub fn clamp_history_limit(requested: Option<u32>) -> u32 {
    requested
        .unwrap_or(DEFAULT_HISTORY_LIMIT)
        .clamp(1, MAX_HISTORY_LIMIT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rstest::rstest;

    #[rstest]
    #[case(2025, 1, 1, "2025-01", "2025-W01")]
    #[case(2024, 12, 30, "2024-12", "2025-W01")]
    #[case(2021, 1, 3, "2021-01", "2020-W53")]
    #[case(2025, 6, 15, "2025-06", "2025-W24")]
    fn labels_use_iso_week_year(
        #[case] year: i32,
        #[case] month: u32,
        #[case] day: u32,
        #[case] expected_month: &str,
        #[case] expected_week: &str,
    ) {
        let at = Utc
            .with_ymd_and_hms(year, month, day, 12, 0, 0)
            .single()
            .expect("valid timestamp");
        let labels = PeriodLabels::for_instant(at);
        assert_eq!(labels.month, expected_month);
        assert_eq!(labels.week, expected_week);
    }

    #[rstest]
    #[case(None, 50)]
    #[case(Some(0), 1)]
    #[case(Some(20), 20)]
    #[case(Some(9_999), 500)]
    fn history_limit_is_clamped(#[case] requested: Option<u32>, #[case] expected: u32) {
        assert_eq!(clamp_history_limit(requested), expected);
    }
}
