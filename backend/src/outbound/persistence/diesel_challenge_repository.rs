//! PostgreSQL-backed `ChallengeRepository` implementation using Diesel ORM.
//!
//! Activation runs in one transaction guarded by a transaction-scoped
//! advisory lock keyed on (user, challenge). Inside the lock the newest
//! `ACTIVE` instance is kept, older duplicates are deleted, and a row is only
//! inserted when none exists. The partial unique index on `ACTIVE` rows backs
//! this up for writers that bypass the lock.
//!
//! Evaluation writes degrade through three statement shapes so that older
//! schemas lacking a column still record at least the status.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::sql_types::Text;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, AsyncPgConnection, RunQueryDsl};
use tracing::{debug, warn};

use crate::domain::UserId;
use crate::domain::challenge::{
    Challenge, ChallengeInstance, ChallengePeriod, ChallengeStatus, PeriodType,
};
use crate::domain::ports::{
    ActivationRecord, ChallengeRepository, ChallengeRepositoryError, EvaluationUpdate,
    NewChallengeInstance,
};

use super::diesel_basic_error_mapping::{basic_error_mappers, is_undefined_column};
use super::models::{
    ChallengeInstanceRow, ChallengeRow, EvaluationChangeset, EvaluationWithoutMessageChangeset,
    NewChallengeInstanceRow,
};
use super::pool::DbPool;
use super::schema::{challenge_instances, challenges};

/// Diesel-backed implementation of the challenge repository port.
#[derive(Clone)]
pub struct DieselChallengeRepository {
    pool: DbPool,
}

impl DieselChallengeRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

basic_error_mappers!(ChallengeRepositoryError);

/// Advisory lock key shared by every activation of one (user, challenge).
fn activation_lock_key(user_id: &UserId, challenge_id: i64) -> String {
    format!("challenge_activation:{user_id}:{challenge_id}")
}

fn row_to_challenge(row: ChallengeRow) -> Challenge {
    Challenge {
        id: row.id,
        code: row.code,
        name: row.name,
        description: row.description,
        metric: row.metric,
        logic_type: row.logic_type,
        period_type: PeriodType::from(row.period_type.as_str()),
        default_target_value: row.default_target_value,
        scope_type: row.scope_type,
        active: row.active,
    }
}

fn row_to_instance(row: ChallengeInstanceRow) -> Result<ChallengeInstance, ChallengeRepositoryError> {
    let status: ChallengeStatus = row.status.parse().map_err(|err| {
        ChallengeRepositoryError::query(format!("invalid challenge status in database: {err}"))
    })?;
    Ok(ChallengeInstance {
        id: row.id,
        user_id: UserId::from_uuid(row.user_id),
        challenge_id: row.challenge_id,
        period: ChallengePeriod {
            start: row.start_date,
            end: row.end_date,
        },
        status,
        reference_value: row.reference_value,
        current_value: row.current_value,
        target_value: row.target_value,
        progress_percent: row.progress_percent,
        message: row.message,
        created_at: row.created_at,
        last_evaluated_at: row.last_evaluated_at,
    })
}

/// Take the lock, prune duplicates and insert only if nothing survives.
async fn activate_locked(
    conn: &mut AsyncPgConnection,
    instance: &NewChallengeInstance,
) -> Result<(ChallengeInstanceRow, bool), diesel::result::Error> {
    let user_uuid = *instance.user_id.as_uuid();
    diesel::sql_query("SELECT pg_advisory_xact_lock(hashtextextended($1, 0))")
        .bind::<Text, _>(activation_lock_key(&instance.user_id, instance.challenge_id))
        .execute(conn)
        .await?;

    let running: Vec<ChallengeInstanceRow> = challenge_instances::table
        .filter(challenge_instances::user_id.eq(user_uuid))
        .filter(challenge_instances::challenge_id.eq(instance.challenge_id))
        .filter(challenge_instances::status.eq(ChallengeStatus::Active.as_db_str()))
        .order((
            challenge_instances::created_at.desc(),
            challenge_instances::id.desc(),
        ))
        .select(ChallengeInstanceRow::as_select())
        .load(conn)
        .await?;

    let mut running = running.into_iter();
    if let Some(kept) = running.next() {
        let stale: Vec<i64> = running.map(|row| row.id).collect();
        if !stale.is_empty() {
            warn!(
                user_id = %instance.user_id,
                challenge_id = instance.challenge_id,
                removed = stale.len(),
                "removing duplicate active challenge instances"
            );
            diesel::delete(challenge_instances::table)
                .filter(challenge_instances::id.eq_any(&stale))
                .execute(conn)
                .await?;
        }
        return Ok((kept, false));
    }

    let new_row = NewChallengeInstanceRow {
        user_id: user_uuid,
        challenge_id: instance.challenge_id,
        start_date: instance.period.start,
        end_date: instance.period.end,
        status: ChallengeStatus::Active.as_db_str(),
        target_value: Some(instance.target_value),
        created_at: instance.created_at,
    };
    let inserted: Option<ChallengeInstanceRow> = diesel::insert_into(challenge_instances::table)
        .values(&new_row)
        .on_conflict_do_nothing()
        .returning(ChallengeInstanceRow::as_returning())
        .get_result(conn)
        .await
        .optional()?;

    match inserted {
        Some(row) => Ok((row, true)),
        None => {
            debug!(
                user_id = %instance.user_id,
                challenge_id = instance.challenge_id,
                "activation insert conflicted; re-reading running instance"
            );
            let row = challenge_instances::table
                .filter(challenge_instances::user_id.eq(user_uuid))
                .filter(challenge_instances::challenge_id.eq(instance.challenge_id))
                .filter(challenge_instances::status.eq(ChallengeStatus::Active.as_db_str()))
                .select(ChallengeInstanceRow::as_select())
                .first(conn)
                .await?;
            Ok((row, false))
        }
    }
}

#[async_trait]
impl ChallengeRepository for DieselChallengeRepository {
    async fn list_catalogue(&self) -> Result<Vec<Challenge>, ChallengeRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let rows: Vec<ChallengeRow> = challenges::table
            .filter(challenges::active.eq(true))
            .order_by(challenges::id.asc())
            .select(ChallengeRow::as_select())
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(rows.into_iter().map(row_to_challenge).collect())
    }

    async fn find_challenge(
        &self,
        challenge_id: i64,
    ) -> Result<Option<Challenge>, ChallengeRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row: Option<ChallengeRow> = challenges::table
            .find(challenge_id)
            .select(ChallengeRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        Ok(row.map(row_to_challenge))
    }

    async fn activate(
        &self,
        instance: &NewChallengeInstance,
    ) -> Result<ActivationRecord, ChallengeRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let (row, created) = conn
            .transaction(|conn| activate_locked(conn, instance).scope_boxed())
            .await
            .map_err(map_diesel_error)?;
        Ok(ActivationRecord {
            instance: row_to_instance(row)?,
            created,
        })
    }

    async fn find_instance(
        &self,
        user_id: &UserId,
        instance_id: i64,
    ) -> Result<Option<ChallengeInstance>, ChallengeRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row: Option<ChallengeInstanceRow> = challenge_instances::table
            .filter(challenge_instances::id.eq(instance_id))
            .filter(challenge_instances::user_id.eq(user_id.as_uuid()))
            .select(ChallengeInstanceRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        row.map(row_to_instance).transpose()
    }

    async fn list_active_instances(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<ChallengeInstance>, ChallengeRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let rows: Vec<ChallengeInstanceRow> = challenge_instances::table
            .filter(challenge_instances::user_id.eq(user_id.as_uuid()))
            .filter(challenge_instances::status.eq(ChallengeStatus::Active.as_db_str()))
            .order((
                challenge_instances::created_at.desc(),
                challenge_instances::id.desc(),
            ))
            .select(ChallengeInstanceRow::as_select())
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        rows.into_iter().map(row_to_instance).collect()
    }

    async fn save_evaluation(
        &self,
        update: &EvaluationUpdate,
    ) -> Result<(), ChallengeRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let evaluation = &update.evaluation;
        let status = evaluation.status.as_db_str();
        let evaluated_at: Option<DateTime<Utc>> = Some(update.evaluated_at);
        let target = challenge_instances::table.find(update.instance_id);

        let full = EvaluationChangeset {
            status,
            reference_value: evaluation.reference_value,
            current_value: evaluation.current_value,
            target_value: Some(evaluation.target_value),
            progress_percent: evaluation.progress_percent,
            message: Some(evaluation.message.as_str()),
            last_evaluated_at: evaluated_at,
        };
        let full_error = match diesel::update(target).set(&full).execute(&mut conn).await {
            Ok(_) => return Ok(()),
            Err(error) => error,
        };
        debug!(
            instance_id = update.instance_id,
            error = %full_error,
            undefined_column = is_undefined_column(&full_error),
            "full evaluation update failed; retrying without message"
        );

        let without_message = EvaluationWithoutMessageChangeset {
            status,
            reference_value: evaluation.reference_value,
            current_value: evaluation.current_value,
            target_value: Some(evaluation.target_value),
            progress_percent: evaluation.progress_percent,
            last_evaluated_at: evaluated_at,
        };
        let reduced_error = match diesel::update(target)
            .set(&without_message)
            .execute(&mut conn)
            .await
        {
            Ok(_) => return Ok(()),
            Err(error) => error,
        };
        debug!(
            instance_id = update.instance_id,
            error = %reduced_error,
            "evaluation update without message failed; retrying status only"
        );

        diesel::update(target)
            .set(challenge_instances::status.eq(status))
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(map_diesel_error)
    }
}
