//! PostgreSQL-backed `CartHistoryRepository` implementation using Diesel ORM.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel::sql_types::{BigInt, Double, Timestamptz, Uuid as SqlUuid};
use diesel_async::RunQueryDsl;

use crate::domain::UserId;
use crate::domain::cart_history::{
    CartHistoryEntry, CartMetrics, MONTH_PERIOD_TYPE, NewCartHistoryEntry,
};
use crate::domain::challenge::{Co2WindowTotals, TimeWindow};
use crate::domain::ports::{CartHistoryRepository, CartHistoryRepositoryError};

use super::diesel_basic_error_mapping::basic_error_mappers;
use super::models::{CartHistoryRow, NewCartHistoryRow};
use super::pool::DbPool;
use super::schema::co2_cart_history;

const WINDOW_TOTALS_HALF_OPEN_SQL: &str = "SELECT \
    COALESCE(SUM(total_co2_g), 0)::float8 AS total_grams, \
    COUNT(DISTINCT (created_at AT TIME ZONE 'UTC')::date) AS distinct_days \
    FROM co2_cart_history \
    WHERE user_id = $1 AND created_at >= $2 AND created_at < $3";

const WINDOW_TOTALS_CLOSED_SQL: &str = "SELECT \
    COALESCE(SUM(total_co2_g), 0)::float8 AS total_grams, \
    COUNT(DISTINCT (created_at AT TIME ZONE 'UTC')::date) AS distinct_days \
    FROM co2_cart_history \
    WHERE user_id = $1 AND created_at >= $2 AND created_at <= $3";

#[derive(QueryableByName)]
struct WindowTotalsRow {
    #[diesel(sql_type = Double)]
    total_grams: f64,
    #[diesel(sql_type = BigInt)]
    distinct_days: i64,
}

/// Diesel-backed implementation of the cart history repository port.
#[derive(Clone)]
pub struct DieselCartHistoryRepository {
    pool: DbPool,
}

impl DieselCartHistoryRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

basic_error_mappers!(CartHistoryRepositoryError);

fn window_sql(window: &TimeWindow) -> &'static str {
    if window.inclusive_end {
        WINDOW_TOTALS_CLOSED_SQL
    } else {
        WINDOW_TOTALS_HALF_OPEN_SQL
    }
}

fn row_to_entry(row: CartHistoryRow) -> CartHistoryEntry {
    CartHistoryEntry {
        id: row.id,
        user_id: UserId::from_uuid(row.user_id),
        period_type: row.period_type,
        period_label: row.period_label,
        metrics: CartMetrics {
            total_co2_g: row.total_co2_g,
            article_count: row.nb_articles,
            distinct_product_count: row.nb_distinct_products,
            total_distance_km: row.total_distance_km,
            days_captured_by_tree: row.days_captured_by_tree,
            tree_equivalent: row.tree_equivalent,
        },
        created_at: row.created_at,
    }
}

fn totals_from_row(row: WindowTotalsRow) -> Co2WindowTotals {
    Co2WindowTotals {
        total_grams: row.total_grams,
        distinct_days: u32::try_from(row.distinct_days.max(0)).unwrap_or(u32::MAX),
    }
}

#[async_trait]
impl CartHistoryRepository for DieselCartHistoryRepository {
    async fn insert(&self, entry: &NewCartHistoryEntry) -> Result<i64, CartHistoryRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let metrics = &entry.metrics;
        let row = NewCartHistoryRow {
            user_id: *entry.user_id.as_uuid(),
            total_co2_g: metrics.total_co2_g,
            nb_articles: metrics.article_count,
            nb_distinct_products: metrics.distinct_product_count,
            total_distance_km: metrics.total_distance_km,
            days_captured_by_tree: metrics.days_captured_by_tree,
            tree_equivalent: metrics.tree_equivalent,
            period_type: MONTH_PERIOD_TYPE,
            period_label: &entry.labels.month,
            period_week: &entry.labels.week,
            created_at: entry.created_at,
        };
        diesel::insert_into(co2_cart_history::table)
            .values(&row)
            .returning(co2_cart_history::id)
            .get_result(&mut conn)
            .await
            .map_err(map_diesel_error)
    }

    async fn list_recent(
        &self,
        user_id: &UserId,
        limit: u32,
    ) -> Result<Vec<CartHistoryEntry>, CartHistoryRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let rows: Vec<CartHistoryRow> = co2_cart_history::table
            .filter(co2_cart_history::user_id.eq(user_id.as_uuid()))
            .order((co2_cart_history::created_at.desc(), co2_cart_history::id.desc()))
            .limit(i64::from(limit))
            .select(CartHistoryRow::as_select())
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(rows.into_iter().map(row_to_entry).collect())
    }

    async fn co2_totals(
        &self,
        user_id: &UserId,
        window: &TimeWindow,
    ) -> Result<Co2WindowTotals, CartHistoryRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row: WindowTotalsRow = diesel::sql_query(window_sql(window))
            .bind::<SqlUuid, _>(*user_id.as_uuid())
            .bind::<Timestamptz, _>(window.from)
            .bind::<Timestamptz, _>(window.to)
            .get_result(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(totals_from_row(row))
    }
}
