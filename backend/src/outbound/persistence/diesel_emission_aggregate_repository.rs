//! PostgreSQL aggregation queries over `emission_calculations`.
//!
//! Aggregates are expressed as parameterised SQL because they rely on
//! `date_trunc` and grouping that Diesel's query builder does not model.
//! Only values travel as bind parameters; column names and sort directions
//! come from closed enums.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use diesel::QueryableByName;
use diesel::sql_types::{BigInt, Date, Float8, Nullable, Text, Timestamptz};
use diesel_async::RunQueryDsl;

use crate::domain::aggregation::{
    CategoryAggregate, DateRange, GroupBucket, HistoryGroupBy, HistoryPoint, HistoryQuery,
    Interval, Metric, SortOrder, SummaryQuery, SummarySort,
};
use crate::domain::ports::{EmissionAggregateRepository, EmissionAggregateRepositoryError};

use super::diesel_basic_error_mapping::basic_error_mappers;
use super::pool::DbPool;

/// Diesel-backed implementation of the emission aggregate port.
#[derive(Clone)]
pub struct DieselEmissionAggregateRepository {
    pool: DbPool,
}

impl DieselEmissionAggregateRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

basic_error_mappers!(EmissionAggregateRepositoryError);

#[derive(Debug, QueryableByName)]
struct HistoryBucketRow {
    #[diesel(sql_type = Timestamptz)]
    t: DateTime<Utc>,
    #[diesel(sql_type = Nullable<Float8>)]
    sum: Option<f64>,
    #[diesel(sql_type = Nullable<Float8>)]
    avg: Option<f64>,
    #[diesel(sql_type = BigInt)]
    count: i64,
    #[diesel(sql_type = Nullable<Float8>)]
    min: Option<f64>,
    #[diesel(sql_type = Nullable<Float8>)]
    max: Option<f64>,
    #[diesel(sql_type = Nullable<Text>)]
    grp: Option<String>,
}

#[derive(Debug, QueryableByName)]
struct CategoryAggregateRow {
    #[diesel(sql_type = Text)]
    category_code: String,
    #[diesel(sql_type = Nullable<Text>)]
    subcategory_code: Option<String>,
    #[diesel(sql_type = Float8)]
    avg_emission: f64,
    #[diesel(sql_type = Float8)]
    min_emission: f64,
    #[diesel(sql_type = Float8)]
    max_emission: f64,
    #[diesel(sql_type = Float8)]
    total_emission: f64,
}

impl From<CategoryAggregateRow> for CategoryAggregate {
    fn from(row: CategoryAggregateRow) -> Self {
        Self {
            category_code: row.category_code,
            subcategory_code: row.subcategory_code,
            avg_emission: row.avg_emission,
            min_emission: row.min_emission,
            max_emission: row.max_emission,
            total_emission: row.total_emission,
        }
    }
}

#[derive(Debug, QueryableByName)]
struct GroupBucketRow {
    #[diesel(sql_type = Date)]
    bucket_start: NaiveDate,
    #[diesel(sql_type = Float8)]
    total_emission: f64,
    #[diesel(sql_type = Float8)]
    avg_emission: f64,
}

/// SQL expression for the secondary history grouping.
///
/// Calculations carry no store or brand, so those groupings yield a null
/// group rather than an error.
fn group_expression(group_by: HistoryGroupBy) -> &'static str {
    match group_by {
        HistoryGroupBy::Category => "category_code",
        HistoryGroupBy::Product => "product_id",
        HistoryGroupBy::None | HistoryGroupBy::Store | HistoryGroupBy::Brand => "NULL::text",
    }
}

fn sort_column(sort: SummarySort) -> &'static str {
    match sort {
        SummarySort::TotalEmission => "total_emission",
        SummarySort::AvgEmission => "avg_emission",
        SummarySort::MinEmission => "min_emission",
        SummarySort::MaxEmission => "max_emission",
    }
}

fn sort_direction(order: SortOrder) -> &'static str {
    match order {
        SortOrder::Asc => "ASC",
        SortOrder::Desc => "DESC",
    }
}

fn history_sql(group_by: HistoryGroupBy) -> String {
    format!(
        "SELECT date_trunc($1, created_at) AS t, \
                SUM(emissions_gco2e) AS sum, \
                AVG(emissions_gco2e) AS avg, \
                COUNT(*) AS count, \
                MIN(emissions_gco2e) AS min, \
                MAX(emissions_gco2e) AS max, \
                {group} AS grp \
         FROM emission_calculations \
         WHERE ($2::timestamptz IS NULL OR created_at >= $2) \
           AND ($3::timestamptz IS NULL OR created_at <= $3) \
         GROUP BY t, grp \
         ORDER BY t ASC, grp ASC NULLS FIRST \
         LIMIT $4",
        group = group_expression(group_by),
    )
}

fn summary_sql(sort: SummarySort, order: SortOrder) -> String {
    format!(
        "SELECT category_code, \
                NULL::text AS subcategory_code, \
                AVG(emissions_gco2e) AS avg_emission, \
                MIN(emissions_gco2e) AS min_emission, \
                MAX(emissions_gco2e) AS max_emission, \
                SUM(emissions_gco2e) AS total_emission \
         FROM emission_calculations \
         WHERE ($1::text IS NULL OR category_code = $1) \
           AND ($2::date IS NULL OR created_at >= $2::date) \
           AND ($3::date IS NULL OR created_at < $3::date + 1) \
         GROUP BY category_code \
         ORDER BY {column} {direction}, category_code ASC \
         LIMIT $4 OFFSET $5",
        column = sort_column(sort),
        direction = sort_direction(order),
    )
}

const GROUP_SUMMARY_SQL: &str = "\
    SELECT ec.category_code, \
           NULL::text AS subcategory_code, \
           AVG(ec.emissions_gco2e) AS avg_emission, \
           MIN(ec.emissions_gco2e) AS min_emission, \
           MAX(ec.emissions_gco2e) AS max_emission, \
           SUM(ec.emissions_gco2e) AS total_emission \
    FROM emission_calculations ec \
    JOIN user_group_sessions gs ON gs.session_id = ec.session_id \
    WHERE gs.group_id = $1 \
      AND ($2::date IS NULL OR ec.created_at >= $2::date) \
      AND ($3::date IS NULL OR ec.created_at < $3::date + 1) \
    GROUP BY ec.category_code \
    ORDER BY ec.category_code ASC";

const GROUP_BUCKETS_SQL: &str = "\
    SELECT date_trunc($2, ec.created_at)::date AS bucket_start, \
           SUM(ec.emissions_gco2e) AS total_emission, \
           AVG(ec.emissions_gco2e) AS avg_emission \
    FROM emission_calculations ec \
    JOIN user_group_sessions gs ON gs.session_id = ec.session_id \
    WHERE gs.group_id = $1 \
      AND ($3::date IS NULL OR ec.created_at >= $3::date) \
      AND ($4::date IS NULL OR ec.created_at < $4::date + 1) \
    GROUP BY bucket_start \
    ORDER BY bucket_start ASC";

fn to_point(row: HistoryBucketRow, query: &HistoryQuery) -> HistoryPoint {
    let keep = |metric: Metric, value: Option<f64>| value.filter(|_| query.includes(metric));
    HistoryPoint {
        t: row.t,
        sum: keep(Metric::Sum, row.sum),
        avg: keep(Metric::Avg, row.avg),
        count: query.includes(Metric::Count).then_some(row.count),
        min: keep(Metric::Min, row.min),
        max: keep(Metric::Max, row.max),
        group: row.grp,
    }
}

#[async_trait]
impl EmissionAggregateRepository for DieselEmissionAggregateRepository {
    async fn history(
        &self,
        query: &HistoryQuery,
    ) -> Result<Vec<HistoryPoint>, EmissionAggregateRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let rows: Vec<HistoryBucketRow> = diesel::sql_query(history_sql(query.group_by))
            .bind::<Text, _>(query.interval.as_str())
            .bind::<Nullable<Timestamptz>, _>(query.from)
            .bind::<Nullable<Timestamptz>, _>(query.to)
            .bind::<BigInt, _>(i64::from(query.limit))
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(rows.into_iter().map(|row| to_point(row, query)).collect())
    }

    async fn summary(
        &self,
        query: &SummaryQuery,
    ) -> Result<Vec<CategoryAggregate>, EmissionAggregateRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let rows: Vec<CategoryAggregateRow> = diesel::sql_query(summary_sql(query.sort_by, query.order))
            .bind::<Nullable<Text>, _>(query.category_code.as_deref())
            .bind::<Nullable<Date>, _>(query.range.start())
            .bind::<Nullable<Date>, _>(query.range.end())
            .bind::<BigInt, _>(i64::from(query.limit))
            .bind::<BigInt, _>(i64::from(query.offset))
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(rows.into_iter().map(CategoryAggregate::from).collect())
    }

    async fn group_summary(
        &self,
        group_id: i64,
        range: &DateRange,
    ) -> Result<Vec<CategoryAggregate>, EmissionAggregateRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let rows: Vec<CategoryAggregateRow> = diesel::sql_query(GROUP_SUMMARY_SQL)
            .bind::<BigInt, _>(group_id)
            .bind::<Nullable<Date>, _>(range.start())
            .bind::<Nullable<Date>, _>(range.end())
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(rows.into_iter().map(CategoryAggregate::from).collect())
    }

    async fn group_buckets(
        &self,
        group_id: i64,
        interval: Interval,
        range: &DateRange,
    ) -> Result<Vec<GroupBucket>, EmissionAggregateRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let rows: Vec<GroupBucketRow> = diesel::sql_query(GROUP_BUCKETS_SQL)
            .bind::<BigInt, _>(group_id)
            .bind::<Text, _>(interval.as_str())
            .bind::<Nullable<Date>, _>(range.start())
            .bind::<Nullable<Date>, _>(range.end())
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(rows
            .into_iter()
            .map(|row| GroupBucket {
                bucket_start: row.bucket_start,
                total_emission: row.total_emission,
                avg_emission: row.avg_emission,
            })
            .collect())
    }
}
