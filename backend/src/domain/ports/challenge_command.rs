//! Driving port for activating and evaluating challenges.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::challenge::{ActiveChallenge, Evaluation};
use crate::domain::{Error, UserId};

use super::challenge_repository::{
    ChallengeRepository, FixtureChallengeRepository, NewChallengeInstance, seeded_co2_challenge,
};

/// Request to activate a catalogue challenge for a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActivateChallengeRequest {
    pub user_id: UserId,
    pub challenge_id: i64,
}

/// Activation outcome.
#[derive(Debug, Clone, PartialEq)]
pub struct ActivateChallengeResponse {
    pub active: ActiveChallenge,
    /// False when an existing instance was reused.
    pub created: bool,
}

/// Request to recompute an instance's progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvaluateChallengeRequest {
    pub user_id: UserId,
    pub instance_id: i64,
}

/// Evaluation outcome with the identifying catalogue fields.
#[derive(Debug, Clone, PartialEq)]
pub struct ChallengeEvaluation {
    pub instance_id: i64,
    pub challenge_id: i64,
    pub code: String,
    pub name: String,
    pub evaluation: Evaluation,
    pub evaluated_at: DateTime<Utc>,
}

/// Domain use-case port for challenge mutations.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChallengeCommand: Send + Sync {
    async fn activate(
        &self,
        request: ActivateChallengeRequest,
    ) -> Result<ActivateChallengeResponse, Error>;

    async fn evaluate(&self, request: EvaluateChallengeRequest) -> Result<ChallengeEvaluation, Error>;
}

/// Fixture command activating the seeded challenge and evaluating nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureChallengeCommand;

#[async_trait]
impl ChallengeCommand for FixtureChallengeCommand {
    async fn activate(
        &self,
        request: ActivateChallengeRequest,
    ) -> Result<ActivateChallengeResponse, Error> {
        let challenge = seeded_co2_challenge();
        if challenge.id != request.challenge_id {
            return Err(Error::not_found(format!(
                "challenge {} not found",
                request.challenge_id
            )));
        }
        let now = Utc::now();
        let record = FixtureChallengeRepository
            .activate(&NewChallengeInstance {
                user_id: request.user_id,
                challenge_id: challenge.id,
                period: challenge.period_type.activation_period(now),
                target_value: challenge.default_target_value,
                created_at: now,
            })
            .await
            .map_err(|err| Error::internal(err.to_string()))?;
        Ok(ActivateChallengeResponse {
            active: ActiveChallenge {
                challenge,
                instance: record.instance,
            },
            created: record.created,
        })
    }

    async fn evaluate(&self, request: EvaluateChallengeRequest) -> Result<ChallengeEvaluation, Error> {
        Err(Error::not_found(format!(
            "challenge instance {} not found",
            request.instance_id
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ErrorCode;

    #[tokio::test]
    async fn fixture_activates_seeded_challenge_only() {
        let user_id = UserId::from_legacy(1);
        let response = FixtureChallengeCommand
            .activate(ActivateChallengeRequest {
                user_id,
                challenge_id: 1,
            })
            .await
            .expect("seeded challenge activates");
        assert!(response.created);
        assert_eq!(response.active.instance.user_id, user_id);

        let error = FixtureChallengeCommand
            .activate(ActivateChallengeRequest {
                user_id,
                challenge_id: 2,
            })
            .await
            .expect_err("unknown challenge");
        assert_eq!(error.code(), ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn fixture_evaluate_reports_missing_instance() {
        let error = FixtureChallengeCommand
            .evaluate(EvaluateChallengeRequest {
                user_id: UserId::random(),
                instance_id: 7,
            })
            .await
            .expect_err("fixture has no instances");
        assert_eq!(error.code(), ErrorCode::NotFound);
    }
}
