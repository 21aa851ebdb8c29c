//! Challenge domain service.
//!
//! Implements activation (activate-or-reuse) and on-demand evaluation of
//! reduction challenges. Evaluation always returns the freshly computed
//! result; persisting it is best-effort.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use mockable::Clock;
use tracing::warn;

use crate::domain::challenge::{
    ActiveChallenge, Challenge, Evaluation, EvaluationInputs, evaluate, evaluation_windows,
    normalize_target,
};
use crate::domain::ports::{
    ActivateChallengeRequest, ActivateChallengeResponse, AuditRepository, CartHistoryRepository,
    CartHistoryRepositoryError, ChallengeCommand, ChallengeEvaluation, ChallengeQuery,
    ChallengeRepository, ChallengeRepositoryError, EvaluateChallengeRequest, EvaluationUpdate,
    NewChallengeInstance, record_best_effort,
};
use crate::domain::{Error, NewAuditEvent, UserId};

/// Challenge service implementing the challenge driving ports.
#[derive(Clone)]
pub struct ChallengeService<C, H> {
    challenges: Arc<C>,
    history: Arc<H>,
    audit: Arc<dyn AuditRepository>,
    clock: Arc<dyn Clock>,
}

impl<C, H> ChallengeService<C, H> {
    pub fn new(
        challenges: Arc<C>,
        history: Arc<H>,
        audit: Arc<dyn AuditRepository>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            challenges,
            history,
            audit,
            clock,
        }
    }
}

impl<C, H> ChallengeService<C, H>
where
    C: ChallengeRepository,
    H: CartHistoryRepository,
{
    fn map_challenge_error(error: ChallengeRepositoryError) -> Error {
        match error {
            ChallengeRepositoryError::Connection { message } => {
                Error::service_unavailable(format!("challenge repository unavailable: {message}"))
            }
            ChallengeRepositoryError::Query { message } => {
                Error::internal(format!("challenge repository error: {message}"))
            }
        }
    }

    fn map_history_error(error: CartHistoryRepositoryError) -> Error {
        match error {
            CartHistoryRepositoryError::Connection { message } => Error::service_unavailable(
                format!("cart history repository unavailable: {message}"),
            ),
            CartHistoryRepositoryError::Query { message } => {
                Error::internal(format!("cart history repository error: {message}"))
            }
        }
    }

    async fn require_challenge(&self, challenge_id: i64) -> Result<Challenge, Error> {
        self.challenges
            .find_challenge(challenge_id)
            .await
            .map_err(Self::map_challenge_error)?
            .ok_or_else(|| Error::not_found(format!("challenge {challenge_id} not found")))
    }

    async fn compute(
        &self,
        user_id: &UserId,
        challenge: &Challenge,
        instance: &crate::domain::challenge::ChallengeInstance,
    ) -> Result<Evaluation, Error> {
        let now = self.clock.utc();
        let windows = evaluation_windows(instance.period, now);
        let reference = self
            .history
            .co2_totals(user_id, &windows.reference)
            .await
            .map_err(Self::map_history_error)?;
        let current = self
            .history
            .co2_totals(user_id, &windows.current)
            .await
            .map_err(Self::map_history_error)?;
        let target_fraction = normalize_target(
            instance
                .target_value
                .unwrap_or(challenge.default_target_value),
        );

        Ok(evaluate(EvaluationInputs {
            reference,
            current,
            target_fraction,
            window_closed: windows.closed,
        }))
    }
}

#[async_trait]
impl<C, H> ChallengeQuery for ChallengeService<C, H>
where
    C: ChallengeRepository,
    H: CartHistoryRepository,
{
    async fn list_catalogue(&self) -> Result<Vec<Challenge>, Error> {
        match self.challenges.list_catalogue().await {
            Ok(challenges) => Ok(challenges),
            Err(error) => {
                warn!(%error, "challenge catalogue unavailable; returning empty list");
                Ok(Vec::new())
            }
        }
    }

    async fn list_active(&self, user_id: &UserId) -> Result<Vec<ActiveChallenge>, Error> {
        let instances = match self.challenges.list_active_instances(user_id).await {
            Ok(instances) => instances,
            Err(error) => {
                warn!(%error, user_id = %user_id, "active challenges unavailable; returning empty list");
                return Ok(Vec::new());
            }
        };

        let mut catalogue: BTreeMap<i64, Option<Challenge>> = BTreeMap::new();
        let mut active = Vec::with_capacity(instances.len());
        for instance in instances {
            if !catalogue.contains_key(&instance.challenge_id) {
                let found = match self.challenges.find_challenge(instance.challenge_id).await {
                    Ok(found) => found,
                    Err(error) => {
                        warn!(%error, challenge_id = instance.challenge_id, "challenge lookup failed");
                        None
                    }
                };
                catalogue.insert(instance.challenge_id, found);
            }
            if let Some(Some(challenge)) = catalogue.get(&instance.challenge_id) {
                active.push(ActiveChallenge {
                    challenge: challenge.clone(),
                    instance,
                });
            }
        }
        Ok(active)
    }
}

#[async_trait]
impl<C, H> ChallengeCommand for ChallengeService<C, H>
where
    C: ChallengeRepository,
    H: CartHistoryRepository,
{
    async fn activate(
        &self,
        request: ActivateChallengeRequest,
    ) -> Result<ActivateChallengeResponse, Error> {
        let challenge = self.require_challenge(request.challenge_id).await?;
        if !challenge.active {
            return Err(Error::not_found(format!(
                "challenge {} not found",
                request.challenge_id
            )));
        }

        let now = self.clock.utc();
        let record = self
            .challenges
            .activate(&NewChallengeInstance {
                user_id: request.user_id,
                challenge_id: challenge.id,
                period: challenge.period_type.activation_period(now),
                target_value: normalize_target(challenge.default_target_value),
                created_at: now,
            })
            .await
            .map_err(Self::map_challenge_error)?;

        if record.created {
            record_best_effort(
                self.audit.as_ref(),
                NewAuditEvent::new(
                    "challenge_activated",
                    format!(
                        "user={} challenge={} instance={}",
                        request.user_id, challenge.code, record.instance.id
                    ),
                ),
            )
            .await;
        }

        Ok(ActivateChallengeResponse {
            active: ActiveChallenge {
                challenge,
                instance: record.instance,
            },
            created: record.created,
        })
    }

    async fn evaluate(&self, request: EvaluateChallengeRequest) -> Result<ChallengeEvaluation, Error> {
        let instance = self
            .challenges
            .find_instance(&request.user_id, request.instance_id)
            .await
            .map_err(Self::map_challenge_error)?
            .ok_or_else(|| {
                Error::not_found(format!(
                    "challenge instance {} not found",
                    request.instance_id
                ))
            })?;
        let challenge = self.require_challenge(instance.challenge_id).await?;
        if !challenge.is_evaluable() {
            return Err(Error::invalid_request(format!(
                "challenge {} cannot be evaluated yet",
                challenge.code
            ))
            .with_details(serde_json::json!({
                "code": "unsupported_challenge",
                "challengeCode": challenge.code,
            })));
        }

        if instance.status.is_terminal() {
            return Ok(ChallengeEvaluation {
                instance_id: instance.id,
                challenge_id: challenge.id,
                evaluation: Evaluation::from_stored(&instance, challenge.default_target_value),
                evaluated_at: instance.last_evaluated_at.unwrap_or(instance.created_at),
                code: challenge.code,
                name: challenge.name,
            });
        }

        let evaluation = self
            .compute(&request.user_id, &challenge, &instance)
            .await?;
        let evaluated_at = self.clock.utc();
        let update = EvaluationUpdate {
            instance_id: instance.id,
            evaluation,
            evaluated_at,
        };
        if let Err(error) = self.challenges.save_evaluation(&update).await {
            warn!(
                %error,
                instance_id = instance.id,
                "failed to persist challenge evaluation; returning computed result"
            );
        }

        Ok(ChallengeEvaluation {
            instance_id: instance.id,
            challenge_id: challenge.id,
            code: challenge.code,
            name: challenge.name,
            evaluation: update.evaluation,
            evaluated_at,
        })
    }
}

#[cfg(test)]
#[path = "challenge_service_tests.rs"]
mod tests;
