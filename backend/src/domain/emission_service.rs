//! Emission calculation service.
//!
//! Calculations are keyed by an idempotency key. A repeated key with the
//! same payload hash replays the stored calculation; a different payload is
//! a conflict.

use std::sync::Arc;

use async_trait::async_trait;
use mockable::Clock;
use serde_json::json;

use crate::domain::emission::EmissionCalculation;
use crate::domain::ports::{
    CalculateEmissionRequest, CalculateEmissionResponse, EmissionCommand, EmissionRepository,
    EmissionRepositoryError,
};
use crate::domain::{Error, PayloadHash};

/// Emission service implementing [`EmissionCommand`].
#[derive(Clone)]
pub struct EmissionService<R> {
    repo: Arc<R>,
    clock: Arc<dyn Clock>,
}

impl<R> EmissionService<R> {
    pub fn new(repo: Arc<R>, clock: Arc<dyn Clock>) -> Self {
        Self { repo, clock }
    }
}

impl<R> EmissionService<R>
where
    R: EmissionRepository,
{
    const CONFLICT_MESSAGE: &str = "idempotency key already used with different payload";

    fn map_repository_error(error: EmissionRepositoryError) -> Error {
        match error {
            EmissionRepositoryError::Connection { message } => {
                Error::service_unavailable(format!("emission repository unavailable: {message}"))
            }
            EmissionRepositoryError::Query { message } => {
                Error::internal(format!("emission repository error: {message}"))
            }
            EmissionRepositoryError::DuplicateKey { key } => {
                Error::conflict(format!("idempotency key {key} already used"))
            }
        }
    }

    fn resolve_existing(
        existing: EmissionCalculation,
        payload_hash: &PayloadHash,
    ) -> Result<CalculateEmissionResponse, Error> {
        if &existing.payload_hash != payload_hash {
            return Err(Error::conflict(Self::CONFLICT_MESSAGE).with_details(json!({
                "idempotencyKey": existing.idempotency_key.as_ref(),
                "code": "idempotency_conflict",
            })));
        }
        Ok(CalculateEmissionResponse {
            calculation: existing,
            replayed: true,
        })
    }
}

#[async_trait]
impl<R> EmissionCommand for EmissionService<R>
where
    R: EmissionRepository,
{
    async fn calculate(
        &self,
        request: CalculateEmissionRequest,
    ) -> Result<CalculateEmissionResponse, Error> {
        let CalculateEmissionRequest {
            input,
            idempotency_key,
        } = request;
        let payload_hash = input.payload_hash();

        if let Some(existing) = self
            .repo
            .find_by_idempotency_key(&idempotency_key)
            .await
            .map_err(Self::map_repository_error)?
        {
            return Self::resolve_existing(existing, &payload_hash);
        }

        let now = self.clock.utc();
        let factors = self
            .repo
            .factors_for(input.category_code(), now.date_naive())
            .await
            .map_err(Self::map_repository_error)?;
        if factors.is_empty() {
            return Err(Error::not_found(format!(
                "no emission factor for category {}",
                input.category_code()
            )));
        }
        let calculation = input
            .compatible_factor(&factors)
            .and_then(|factor| {
                EmissionCalculation::compute(&input, factor, idempotency_key.clone(), now)
            })
            .ok_or_else(|| {
                Error::unprocessable(format!(
                    "unit {} is incompatible with the emission factor for {}",
                    input.unit(),
                    input.category_code()
                ))
                .with_details(json!({
                    "field": "quantity_unit",
                    "value": input.unit().as_str(),
                    "code": "incompatible_unit",
                }))
            })?;

        match self.repo.insert(&calculation).await {
            Ok(()) => Ok(CalculateEmissionResponse {
                calculation,
                replayed: false,
            }),
            Err(EmissionRepositoryError::DuplicateKey { .. }) => {
                let existing = self
                    .repo
                    .find_by_idempotency_key(&idempotency_key)
                    .await
                    .map_err(Self::map_repository_error)?
                    .ok_or_else(|| {
                        Error::internal("idempotency record disappeared during race resolution")
                    })?;
                Self::resolve_existing(existing, &payload_hash)
            }
            Err(error) => Err(Self::map_repository_error(error)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::emission::{EmissionFactor, EmissionInput, QuantityUnit};
    use crate::domain::ports::MockEmissionRepository;
    use crate::domain::test_fixtures::{fixture_clock, fixture_timestamp};
    use crate::domain::{ErrorCode, IdempotencyKey};
    use rstest::{fixture, rstest};

    #[fixture]
    fn input() -> EmissionInput {
        EmissionInput::new("dairy", 250.0, QuantityUnit::Grams, None, Some("s-1".to_owned()))
            .expect("valid input")
    }

    #[fixture]
    fn key() -> IdempotencyKey {
        IdempotencyKey::new("calc-001").expect("valid key")
    }

    fn kg_factor() -> EmissionFactor {
        EmissionFactor {
            id: 5,
            category_code: "dairy".to_owned(),
            unit: QuantityUnit::Kilograms,
            factor_gco2e_per_unit: 2000.0,
            source: None,
            version: None,
            valid_from: None,
            valid_to: None,
        }
    }

    fn stored(input: &EmissionInput, key: IdempotencyKey) -> EmissionCalculation {
        EmissionCalculation::compute(input, &kg_factor(), key, fixture_timestamp())
            .expect("compatible")
    }

    #[rstest]
    #[tokio::test]
    async fn computes_and_stores_new_calculations(input: EmissionInput, key: IdempotencyKey) {
        let mut repo = MockEmissionRepository::new();
        repo.expect_find_by_idempotency_key()
            .times(1)
            .return_once(|_| Ok(None));
        repo.expect_factors_for()
            .withf(|category, day| {
                category == "dairy" && *day == fixture_timestamp().date_naive()
            })
            .return_once(|_, _| Ok(vec![kg_factor()]));
        repo.expect_insert().times(1).return_once(|_| Ok(()));

        let response = EmissionService::new(Arc::new(repo), fixture_clock())
            .calculate(CalculateEmissionRequest {
                input,
                idempotency_key: key,
            })
            .await
            .expect("calculation");

        assert!(!response.replayed);
        assert!((response.calculation.emissions_gco2e - 500.0).abs() < 1e-9);
        assert_eq!(response.calculation.factor_id, 5);
    }

    #[rstest]
    #[tokio::test]
    async fn replays_matching_payloads(input: EmissionInput, key: IdempotencyKey) {
        let existing = stored(&input, key.clone());
        let existing_id = existing.id;
        let mut repo = MockEmissionRepository::new();
        repo.expect_find_by_idempotency_key()
            .return_once(move |_| Ok(Some(existing)));
        repo.expect_insert().times(0);

        let response = EmissionService::new(Arc::new(repo), fixture_clock())
            .calculate(CalculateEmissionRequest {
                input,
                idempotency_key: key,
            })
            .await
            .expect("replay");

        assert!(response.replayed);
        assert_eq!(response.calculation.id, existing_id);
    }

    #[rstest]
    #[tokio::test]
    async fn rejects_key_reuse_with_different_payload(input: EmissionInput, key: IdempotencyKey) {
        let other = EmissionInput::new("dairy", 999.0, QuantityUnit::Grams, None, None)
            .expect("valid input");
        let existing = stored(&other, key.clone());
        let mut repo = MockEmissionRepository::new();
        repo.expect_find_by_idempotency_key()
            .return_once(move |_| Ok(Some(existing)));

        let error = EmissionService::new(Arc::new(repo), fixture_clock())
            .calculate(CalculateEmissionRequest {
                input,
                idempotency_key: key,
            })
            .await
            .expect_err("conflict");
        assert_eq!(error.code(), ErrorCode::Conflict);
    }

    #[rstest]
    #[tokio::test]
    async fn unknown_category_is_not_found(input: EmissionInput, key: IdempotencyKey) {
        let mut repo = MockEmissionRepository::new();
        repo.expect_find_by_idempotency_key().return_once(|_| Ok(None));
        repo.expect_factors_for().return_once(|_, _| Ok(Vec::new()));

        let error = EmissionService::new(Arc::new(repo), fixture_clock())
            .calculate(CalculateEmissionRequest {
                input,
                idempotency_key: key,
            })
            .await
            .expect_err("no factor");
        assert_eq!(error.code(), ErrorCode::NotFound);
    }

    #[rstest]
    #[tokio::test]
    async fn incompatible_unit_is_unprocessable(key: IdempotencyKey) {
        let litres = EmissionInput::new("dairy", 1.0, QuantityUnit::Litres, None, None)
            .expect("valid input");
        let mut repo = MockEmissionRepository::new();
        repo.expect_find_by_idempotency_key().return_once(|_| Ok(None));
        repo.expect_factors_for()
            .return_once(|_, _| Ok(vec![kg_factor()]));
        repo.expect_insert().times(0);

        let error = EmissionService::new(Arc::new(repo), fixture_clock())
            .calculate(CalculateEmissionRequest {
                input: litres,
                idempotency_key: key,
            })
            .await
            .expect_err("incompatible");
        assert_eq!(error.code(), ErrorCode::UnprocessableEntity);
    }

    #[rstest]
    #[tokio::test]
    async fn concurrent_insert_resolves_to_replay(input: EmissionInput, key: IdempotencyKey) {
        let winner = stored(&input, key.clone());
        let mut repo = MockEmissionRepository::new();
        let mut lookups = 0;
        repo.expect_find_by_idempotency_key()
            .times(2)
            .returning(move |_| {
                lookups += 1;
                Ok((lookups == 2).then(|| winner.clone()))
            });
        repo.expect_factors_for()
            .return_once(|_, _| Ok(vec![kg_factor()]));
        repo.expect_insert()
            .return_once(|calc| Err(EmissionRepositoryError::duplicate_key(calc.idempotency_key.as_ref())));

        let response = EmissionService::new(Arc::new(repo), fixture_clock())
            .calculate(CalculateEmissionRequest {
                input,
                idempotency_key: key,
            })
            .await
            .expect("race resolved");
        assert!(response.replayed);
    }
}
