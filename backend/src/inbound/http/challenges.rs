//! Challenge catalogue, activation and evaluation handlers.
//!
//! ```text
//! GET  /challenges
//! POST /users/{user_id}/challenges/activate
//! GET  /users/{user_id}/challenges/active
//! POST /users/{user_id}/challenges/{instance_id}/evaluate
//! ```

use actix_web::{HttpResponse, get, post, web};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::challenge::{ActiveChallenge, Challenge};
use crate::domain::ports::{
    ActivateChallengeRequest, ChallengeEvaluation, EvaluateChallengeRequest,
};
use crate::inbound::http::ApiResult;
use crate::inbound::http::schemas::ErrorSchema;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{FieldName, missing_field_error, parse_user_id};

/// Catalogue entry.
#[derive(Debug, Serialize, ToSchema)]
pub struct ChallengeResponse {
    pub id: i64,
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub metric: String,
    pub logic_type: String,
    pub period_type: String,
    pub default_target_value: f64,
    pub scope_type: String,
}

impl From<Challenge> for ChallengeResponse {
    fn from(value: Challenge) -> Self {
        Self {
            id: value.id,
            code: value.code,
            name: value.name,
            description: value.description,
            metric: value.metric,
            logic_type: value.logic_type,
            period_type: value.period_type.as_str().to_owned(),
            default_target_value: value.default_target_value,
            scope_type: value.scope_type,
        }
    }
}

/// A user's challenge instance with its catalogue identity.
#[derive(Debug, Serialize, ToSchema)]
pub struct ChallengeInstanceResponse {
    pub instance_id: i64,
    pub challenge_id: i64,
    pub code: String,
    pub name: String,
    pub user_id: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    /// `en_cours`, `reussi` or `echoue`.
    pub status: String,
    pub reference_value: Option<f64>,
    pub current_value: Option<f64>,
    pub target_value: Option<f64>,
    pub progress_percent: Option<f64>,
    pub message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_evaluated_at: Option<DateTime<Utc>>,
}

impl From<ActiveChallenge> for ChallengeInstanceResponse {
    fn from(value: ActiveChallenge) -> Self {
        let ActiveChallenge {
            challenge,
            instance,
        } = value;
        Self {
            instance_id: instance.id,
            challenge_id: challenge.id,
            code: challenge.code,
            name: challenge.name,
            user_id: instance.user_id.to_string(),
            start_date: instance.period.start,
            end_date: instance.period.end,
            status: instance.status.display_label().to_owned(),
            reference_value: instance.reference_value,
            current_value: instance.current_value,
            target_value: instance.target_value,
            progress_percent: instance.progress_percent,
            message: instance.message,
            created_at: instance.created_at,
            last_evaluated_at: instance.last_evaluated_at,
        }
    }
}

/// Activation outcome.
#[derive(Debug, Serialize, ToSchema)]
pub struct ActivationResponse {
    #[serde(flatten)]
    pub instance: ChallengeInstanceResponse,
    /// False when an existing non-terminal instance was reused.
    pub created: bool,
}

/// Request payload for activation.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct ActivateChallengeBody {
    pub challenge_id: Option<i64>,
}

/// Result of an evaluation pass.
#[derive(Debug, Serialize, ToSchema)]
pub struct EvaluationResponse {
    pub instance_id: i64,
    pub challenge_id: i64,
    pub code: String,
    pub name: String,
    /// `en_cours`, `reussi` or `echoue`.
    pub status: String,
    pub reference_value: Option<f64>,
    pub current_value: Option<f64>,
    pub target_value: f64,
    pub progress_percent: Option<f64>,
    pub message: String,
    pub last_evaluated_at: DateTime<Utc>,
}

impl From<ChallengeEvaluation> for EvaluationResponse {
    fn from(value: ChallengeEvaluation) -> Self {
        let evaluation = value.evaluation;
        Self {
            instance_id: value.instance_id,
            challenge_id: value.challenge_id,
            code: value.code,
            name: value.name,
            status: evaluation.status.display_label().to_owned(),
            reference_value: evaluation.reference_value,
            current_value: evaluation.current_value,
            target_value: evaluation.target_value,
            progress_percent: evaluation.progress_percent,
            message: evaluation.message,
            last_evaluated_at: value.evaluated_at,
        }
    }
}

/// List active catalogue challenges.
#[utoipa::path(
    get,
    path = "/challenges",
    responses((status = 200, description = "Catalogue", body = [ChallengeResponse])),
    tags = ["challenges"],
    operation_id = "listChallenges"
)]
#[get("/challenges")]
pub async fn list_challenges(
    state: web::Data<HttpState>,
) -> ApiResult<web::Json<Vec<ChallengeResponse>>> {
    let catalogue = state.challenges_query.list_catalogue().await?;
    Ok(web::Json(catalogue.into_iter().map(Into::into).collect()))
}

/// Activate a challenge, reusing any non-terminal instance.
#[utoipa::path(
    post,
    path = "/users/{user_id}/challenges/activate",
    params(("user_id" = String, Path, description = "UUID or legacy integer id")),
    request_body = ActivateChallengeBody,
    responses(
        (status = 201, description = "Instance created", body = ActivationResponse),
        (status = 200, description = "Existing instance reused", body = ActivationResponse),
        (status = 400, description = "Invalid user id", body = ErrorSchema),
        (status = 404, description = "Unknown or inactive challenge", body = ErrorSchema),
        (status = 503, description = "Service unavailable", body = ErrorSchema)
    ),
    tags = ["challenges"],
    operation_id = "activateChallenge"
)]
#[post("/users/{user_id}/challenges/activate")]
pub async fn activate_challenge(
    state: web::Data<HttpState>,
    path: web::Path<String>,
    payload: web::Json<ActivateChallengeBody>,
) -> ApiResult<HttpResponse> {
    let user_id = parse_user_id(&path.into_inner(), FieldName::new("user_id"))?;
    let challenge_id = payload
        .challenge_id
        .ok_or_else(|| missing_field_error(FieldName::new("challenge_id")))?;
    let response = state
        .challenges
        .activate(ActivateChallengeRequest {
            user_id,
            challenge_id,
        })
        .await?;
    let mut builder = if response.created {
        HttpResponse::Created()
    } else {
        HttpResponse::Ok()
    };
    Ok(builder.json(ActivationResponse {
        instance: response.active.into(),
        created: response.created,
    }))
}

/// List the user's active challenge instances.
#[utoipa::path(
    get,
    path = "/users/{user_id}/challenges/active",
    params(("user_id" = String, Path, description = "UUID or legacy integer id")),
    responses(
        (status = 200, description = "Active instances", body = [ChallengeInstanceResponse]),
        (status = 400, description = "Invalid user id", body = ErrorSchema)
    ),
    tags = ["challenges"],
    operation_id = "listActiveChallenges"
)]
#[get("/users/{user_id}/challenges/active")]
pub async fn list_active_challenges(
    state: web::Data<HttpState>,
    path: web::Path<String>,
) -> ApiResult<web::Json<Vec<ChallengeInstanceResponse>>> {
    let user_id = parse_user_id(&path.into_inner(), FieldName::new("user_id"))?;
    let active = state.challenges_query.list_active(&user_id).await?;
    Ok(web::Json(active.into_iter().map(Into::into).collect()))
}

/// Recompute an instance's progress.
#[utoipa::path(
    post,
    path = "/users/{user_id}/challenges/{instance_id}/evaluate",
    params(
        ("user_id" = String, Path, description = "UUID or legacy integer id"),
        ("instance_id" = i64, Path, description = "Challenge instance id")
    ),
    responses(
        (status = 200, description = "Evaluation", body = EvaluationResponse),
        (status = 400, description = "Unsupported challenge or invalid user", body = ErrorSchema),
        (status = 404, description = "Instance not found", body = ErrorSchema),
        (status = 503, description = "Service unavailable", body = ErrorSchema)
    ),
    tags = ["challenges"],
    operation_id = "evaluateChallenge"
)]
#[post("/users/{user_id}/challenges/{instance_id}/evaluate")]
pub async fn evaluate_challenge(
    state: web::Data<HttpState>,
    path: web::Path<(String, i64)>,
) -> ApiResult<web::Json<EvaluationResponse>> {
    let (raw_user, instance_id) = path.into_inner();
    let user_id = parse_user_id(&raw_user, FieldName::new("user_id"))?;
    let evaluation = state
        .challenges
        .evaluate(EvaluateChallengeRequest {
            user_id,
            instance_id,
        })
        .await?;
    Ok(web::Json(evaluation.into()))
}
