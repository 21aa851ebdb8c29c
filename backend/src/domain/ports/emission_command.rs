//! Driving port for idempotent emission calculations.

use async_trait::async_trait;

use crate::domain::emission::{EmissionCalculation, EmissionInput};
use crate::domain::{Error, IdempotencyKey};

/// Request to compute and store an emission.
#[derive(Debug, Clone, PartialEq)]
pub struct CalculateEmissionRequest {
    pub input: EmissionInput,
    pub idempotency_key: IdempotencyKey,
}

/// Stored or replayed calculation.
#[derive(Debug, Clone, PartialEq)]
pub struct CalculateEmissionResponse {
    pub calculation: EmissionCalculation,
    /// True when the key was seen before with the same payload.
    pub replayed: bool,
}

/// Domain use-case port for emission calculations.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EmissionCommand: Send + Sync {
    async fn calculate(
        &self,
        request: CalculateEmissionRequest,
    ) -> Result<CalculateEmissionResponse, Error>;
}

/// Fixture command without emission factors.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureEmissionCommand;

#[async_trait]
impl EmissionCommand for FixtureEmissionCommand {
    async fn calculate(
        &self,
        request: CalculateEmissionRequest,
    ) -> Result<CalculateEmissionResponse, Error> {
        Err(Error::not_found(format!(
            "no emission factor for category {}",
            request.input.category_code()
        )))
    }
}
