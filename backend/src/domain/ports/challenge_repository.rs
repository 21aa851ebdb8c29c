//! Port for challenge catalogue and instance persistence.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::UserId;
use crate::domain::challenge::{
    Challenge, ChallengeInstance, ChallengePeriod, ChallengeStatus, Evaluation, PeriodType,
};

use super::define_port_error;

define_port_error! {
    /// Errors raised by challenge repository adapters.
    pub enum ChallengeRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } =>
            "challenge repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } =>
            "challenge repository query failed: {message}",
    }
}

/// Instance to create when a user activates a challenge.
#[derive(Debug, Clone, PartialEq)]
pub struct NewChallengeInstance {
    pub user_id: UserId,
    pub challenge_id: i64,
    pub period: ChallengePeriod,
    pub target_value: f64,
    pub created_at: DateTime<Utc>,
}

/// Outcome of an activate-or-reuse call.
#[derive(Debug, Clone, PartialEq)]
pub struct ActivationRecord {
    pub instance: ChallengeInstance,
    /// False when an existing non-terminal instance was reused.
    pub created: bool,
}

/// Evaluation result to persist against an instance.
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationUpdate {
    pub instance_id: i64,
    pub evaluation: Evaluation,
    pub evaluated_at: DateTime<Utc>,
}

/// Port for challenge storage.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChallengeRepository: Send + Sync {
    /// List active catalogue entries ordered by id.
    async fn list_catalogue(&self) -> Result<Vec<Challenge>, ChallengeRepositoryError>;

    /// Fetch one catalogue entry regardless of its active flag.
    async fn find_challenge(
        &self,
        challenge_id: i64,
    ) -> Result<Option<Challenge>, ChallengeRepositoryError>;

    /// Return the user's non-terminal instance for the challenge, creating
    /// one only if none exists.
    ///
    /// Adapters serialise concurrent calls for the same (user, challenge) and
    /// remove stale duplicates, keeping the most recent instance.
    async fn activate(
        &self,
        instance: &NewChallengeInstance,
    ) -> Result<ActivationRecord, ChallengeRepositoryError>;

    /// Fetch an instance owned by `user_id`.
    async fn find_instance(
        &self,
        user_id: &UserId,
        instance_id: i64,
    ) -> Result<Option<ChallengeInstance>, ChallengeRepositoryError>;

    /// List the user's instances that are still `Active`, newest first.
    async fn list_active_instances(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<ChallengeInstance>, ChallengeRepositoryError>;

    /// Persist an evaluation outcome.
    async fn save_evaluation(
        &self,
        update: &EvaluationUpdate,
    ) -> Result<(), ChallengeRepositoryError>;
}

/// The catalogue entry seeded by the initial migration.
pub fn seeded_co2_challenge() -> Challenge {
    Challenge {
        id: 1,
        code: crate::domain::challenge::CO2_REDUCTION_CODE.to_owned(),
        name: "Réduire -10% CO2 sur 30 jours".to_owned(),
        description: Some(
            "Réduire de 10 % les émissions CO2 de vos paniers par rapport aux 30 jours précédents."
                .to_owned(),
        ),
        metric: "co2".to_owned(),
        logic_type: "reduction_relative".to_owned(),
        period_type: PeriodType::Rolling30Days,
        default_target_value: 0.10,
        scope_type: "individuel".to_owned(),
        active: true,
    }
}

/// In-memory fixture serving the seeded catalogue without storing instances.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureChallengeRepository;

#[async_trait]
impl ChallengeRepository for FixtureChallengeRepository {
    async fn list_catalogue(&self) -> Result<Vec<Challenge>, ChallengeRepositoryError> {
        Ok(vec![seeded_co2_challenge()])
    }

    async fn find_challenge(
        &self,
        challenge_id: i64,
    ) -> Result<Option<Challenge>, ChallengeRepositoryError> {
        let seeded = seeded_co2_challenge();
        Ok((seeded.id == challenge_id).then_some(seeded))
    }

    async fn activate(
        &self,
        instance: &NewChallengeInstance,
    ) -> Result<ActivationRecord, ChallengeRepositoryError> {
        Ok(ActivationRecord {
            instance: ChallengeInstance {
                id: 1,
                user_id: instance.user_id,
                challenge_id: instance.challenge_id,
                period: instance.period,
                status: ChallengeStatus::Active,
                reference_value: None,
                current_value: None,
                target_value: Some(instance.target_value),
                progress_percent: None,
                message: None,
                created_at: instance.created_at,
                last_evaluated_at: None,
            },
            created: true,
        })
    }

    async fn find_instance(
        &self,
        _user_id: &UserId,
        _instance_id: i64,
    ) -> Result<Option<ChallengeInstance>, ChallengeRepositoryError> {
        Ok(None)
    }

    async fn list_active_instances(
        &self,
        _user_id: &UserId,
    ) -> Result<Vec<ChallengeInstance>, ChallengeRepositoryError> {
        Ok(Vec::new())
    }

    async fn save_evaluation(
        &self,
        _update: &EvaluationUpdate,
    ) -> Result<(), ChallengeRepositoryError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[tokio::test]
    async fn fixture_lists_the_seeded_challenge() {
        let challenges = FixtureChallengeRepository
            .list_catalogue()
            .await
            .expect("fixture catalogue");
        assert_eq!(challenges.len(), 1);
        assert!(challenges[0].is_evaluable());
    }

    #[tokio::test]
    async fn fixture_activation_echoes_the_request() {
        let now = Utc
            .with_ymd_and_hms(2025, 6, 1, 0, 0, 0)
            .single()
            .expect("valid timestamp");
        let request = NewChallengeInstance {
            user_id: UserId::from_legacy(3),
            challenge_id: 1,
            period: PeriodType::Rolling30Days.activation_period(now),
            target_value: 0.1,
            created_at: now,
        };

        let record = FixtureChallengeRepository
            .activate(&request)
            .await
            .expect("fixture activation");
        assert!(record.created);
        assert_eq!(record.instance.user_id, request.user_id);
        assert_eq!(record.instance.status, ChallengeStatus::Active);
    }

    #[tokio::test]
    async fn fixture_find_challenge_matches_seeded_id_only() {
        let repo = FixtureChallengeRepository;
        assert!(repo.find_challenge(1).await.expect("lookup").is_some());
        assert!(repo.find_challenge(99).await.expect("lookup").is_none());
    }
}
