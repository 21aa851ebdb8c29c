//! Port for emission factors and calculation persistence.

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::domain::IdempotencyKey;
use crate::domain::emission::{EmissionCalculation, EmissionFactor};

use super::define_port_error;

define_port_error! {
    /// Errors raised by emission repository adapters.
    pub enum EmissionRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } =>
            "emission repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } =>
            "emission repository query failed: {message}",
        /// A calculation with the same idempotency key was stored concurrently.
        DuplicateKey { key: String } =>
            "emission calculation with idempotency key {key} already exists",
    }
}

/// Port for emission storage.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EmissionRepository: Send + Sync {
    /// Factors for `category_code` valid on `day`, most recent first.
    async fn factors_for(
        &self,
        category_code: &str,
        day: NaiveDate,
    ) -> Result<Vec<EmissionFactor>, EmissionRepositoryError>;

    async fn find_by_idempotency_key(
        &self,
        key: &IdempotencyKey,
    ) -> Result<Option<EmissionCalculation>, EmissionRepositoryError>;

    /// Store a calculation; `DuplicateKey` when its key is taken.
    async fn insert(
        &self,
        calculation: &EmissionCalculation,
    ) -> Result<(), EmissionRepositoryError>;
}

/// Fixture repository without factors.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureEmissionRepository;

#[async_trait]
impl EmissionRepository for FixtureEmissionRepository {
    async fn factors_for(
        &self,
        _category_code: &str,
        _day: NaiveDate,
    ) -> Result<Vec<EmissionFactor>, EmissionRepositoryError> {
        Ok(Vec::new())
    }

    async fn find_by_idempotency_key(
        &self,
        _key: &IdempotencyKey,
    ) -> Result<Option<EmissionCalculation>, EmissionRepositoryError> {
        Ok(None)
    }

    async fn insert(
        &self,
        _calculation: &EmissionCalculation,
    ) -> Result<(), EmissionRepositoryError> {
        Ok(())
    }
}
