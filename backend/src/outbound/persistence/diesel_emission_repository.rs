//! PostgreSQL-backed `EmissionRepository` implementation using Diesel ORM.
//!
//! Calculations are immutable. The unique index on `idempotency_key` is the
//! final arbiter when two requests with the same key race.

use async_trait::async_trait;
use chrono::NaiveDate;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::domain::emission::{EmissionCalculation, EmissionFactor, QuantityUnit};
use crate::domain::ports::{EmissionRepository, EmissionRepositoryError};
use crate::domain::{IdempotencyKey, PayloadHash};

use super::diesel_basic_error_mapping::{basic_error_mappers, is_unique_violation};
use super::models::{EmissionCalculationRow, EmissionFactorRow};
use super::pool::DbPool;
use super::schema::{emission_calculations, emission_factors};

/// Diesel-backed implementation of the emission repository port.
#[derive(Clone)]
pub struct DieselEmissionRepository {
    pool: DbPool,
}

impl DieselEmissionRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

basic_error_mappers!(EmissionRepositoryError);

fn parse_unit(raw: &str) -> Result<QuantityUnit, EmissionRepositoryError> {
    raw.parse()
        .map_err(|err| EmissionRepositoryError::query(format!("invalid unit in database: {err}")))
}

fn row_to_factor(row: EmissionFactorRow) -> Result<EmissionFactor, EmissionRepositoryError> {
    Ok(EmissionFactor {
        id: row.id,
        unit: parse_unit(&row.unit)?,
        category_code: row.category_code,
        factor_gco2e_per_unit: row.factor_gco2e_per_unit,
        source: row.source,
        version: row.version,
        valid_from: row.valid_from,
        valid_to: row.valid_to,
    })
}

fn row_to_calculation(
    row: EmissionCalculationRow,
) -> Result<EmissionCalculation, EmissionRepositoryError> {
    let idempotency_key = IdempotencyKey::new(&row.idempotency_key).map_err(|err| {
        EmissionRepositoryError::query(format!("invalid idempotency key in database: {err}"))
    })?;
    let payload_hash = PayloadHash::from_hex(&row.payload_hash).map_err(|err| {
        EmissionRepositoryError::query(format!("corrupted payload hash in database: {err}"))
    })?;
    Ok(EmissionCalculation {
        id: row.id,
        product_id: row.product_id,
        category_code: row.category_code,
        quantity: row.quantity,
        quantity_unit: parse_unit(&row.quantity_unit)?,
        normalized_qty: row.normalized_qty,
        factor_id: row.factor_id,
        emissions_gco2e: row.emissions_gco2e,
        method: row.method,
        session_id: row.session_id,
        idempotency_key,
        payload_hash,
        created_at: row.created_at,
    })
}

fn calculation_to_row(calculation: &EmissionCalculation) -> EmissionCalculationRow {
    EmissionCalculationRow {
        id: calculation.id,
        product_id: calculation.product_id.clone(),
        category_code: calculation.category_code.clone(),
        quantity: calculation.quantity,
        quantity_unit: calculation.quantity_unit.as_str().to_owned(),
        normalized_qty: calculation.normalized_qty,
        factor_id: calculation.factor_id,
        emissions_gco2e: calculation.emissions_gco2e,
        method: calculation.method.clone(),
        session_id: calculation.session_id.clone(),
        idempotency_key: calculation.idempotency_key.to_string(),
        payload_hash: calculation.payload_hash.to_hex(),
        created_at: calculation.created_at,
    }
}

#[async_trait]
impl EmissionRepository for DieselEmissionRepository {
    async fn factors_for(
        &self,
        category_code: &str,
        day: NaiveDate,
    ) -> Result<Vec<EmissionFactor>, EmissionRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let rows: Vec<EmissionFactorRow> = emission_factors::table
            .filter(emission_factors::category_code.eq(category_code))
            .filter(
                emission_factors::valid_from
                    .is_null()
                    .or(emission_factors::valid_from.le(day)),
            )
            .filter(
                emission_factors::valid_to
                    .is_null()
                    .or(emission_factors::valid_to.ge(day)),
            )
            .order((
                emission_factors::valid_from.desc().nulls_last(),
                emission_factors::id.desc(),
            ))
            .select(EmissionFactorRow::as_select())
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        rows.into_iter().map(row_to_factor).collect()
    }

    async fn find_by_idempotency_key(
        &self,
        key: &IdempotencyKey,
    ) -> Result<Option<EmissionCalculation>, EmissionRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row: Option<EmissionCalculationRow> = emission_calculations::table
            .filter(emission_calculations::idempotency_key.eq(key.as_ref()))
            .select(EmissionCalculationRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        row.map(row_to_calculation).transpose()
    }

    async fn insert(
        &self,
        calculation: &EmissionCalculation,
    ) -> Result<(), EmissionRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        diesel::insert_into(emission_calculations::table)
            .values(&calculation_to_row(calculation))
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(|err| {
                if is_unique_violation(&err) {
                    EmissionRepositoryError::duplicate_key(calculation.idempotency_key.to_string())
                } else {
                    map_diesel_error(err)
                }
            })
    }
}
