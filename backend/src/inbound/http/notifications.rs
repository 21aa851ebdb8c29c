//! Notification preference and send handlers.
//!
//! ```text
//! GET   /notifications/preferences   Read, creating defaults on first use
//! POST  /notifications/preferences   Replace
//! PATCH /notifications/preferences   Partial update
//! POST  /notifications/send          Dispatch through the configured sender
//! ```
//!
//! The user comes from the `user_id` query parameter, falling back to the
//! `sub` claim of a verified bearer token.

use actix_web::{HttpRequest, get, patch, post, web};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::{IntoParams, ToSchema};

use crate::domain::notification::{
    DEFAULT_NOTIFICATION_TYPE, NotificationFrequency, NotificationPreferences, ParseFrequencyError,
    PreferencesPatch, PreferencesUpdate, SendOutcome,
};
use crate::domain::{Error, UserId};
use crate::inbound::http::ApiResult;
use crate::inbound::http::auth::bearer_token;
use crate::inbound::http::schemas::ErrorSchema;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{
    FieldName, invalid_value_error, missing_field_error, parse_user_id,
};

/// Query parameters identifying the user.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct NotificationUserQuery {
    /// UUID or legacy integer id; defaults to the bearer token subject.
    pub user_id: Option<String>,
}

fn resolve_user(state: &HttpState, request: &HttpRequest, query: &NotificationUserQuery) -> Result<UserId, Error> {
    let explicit = query
        .user_id
        .as_deref()
        .map(str::trim)
        .filter(|raw| !raw.is_empty())
        .map(str::to_owned);
    let raw = explicit
        .or_else(|| {
            bearer_token(request.headers())
                .and_then(|token| state.token_introspection.subject(&token))
        })
        .ok_or_else(|| {
            Error::invalid_request("user_id or a bearer token is required").with_details(json!({
                "field": "user_id",
                "code": "missing_field",
            }))
        })?;
    parse_user_id(&raw, FieldName::new("user_id"))
}

fn parse_frequency(raw: &str) -> Result<NotificationFrequency, Error> {
    raw.parse().map_err(|err: ParseFrequencyError| {
        invalid_value_error(FieldName::new("frequency"), raw, err.to_string())
    })
}

/// Stored preferences.
#[derive(Debug, Serialize, ToSchema)]
pub struct PreferencesResponse {
    pub user_id: String,
    pub enabled: bool,
    pub frequency: String,
    pub types: Vec<String>,
    pub allow_email: bool,
    pub allow_push: bool,
    pub allow_sms: bool,
    pub last_notified_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl From<NotificationPreferences> for PreferencesResponse {
    fn from(value: NotificationPreferences) -> Self {
        Self {
            user_id: value.user_id.to_string(),
            enabled: value.enabled,
            frequency: value.frequency.to_string(),
            types: value.types,
            allow_email: value.allow_email,
            allow_push: value.allow_push,
            allow_sms: value.allow_sms,
            last_notified_at: value.last_notified_at,
            updated_at: value.updated_at,
        }
    }
}

/// Preference fields; absent fields take defaults on replace and are left
/// untouched on patch.
#[derive(Debug, Default, Deserialize, Serialize, ToSchema)]
pub struct PreferencesBody {
    pub enabled: Option<bool>,
    /// `immediate`, `hourly`, `daily` or `weekly`.
    pub frequency: Option<String>,
    pub types: Option<Vec<String>>,
    pub allow_email: Option<bool>,
    pub allow_push: Option<bool>,
    pub allow_sms: Option<bool>,
    pub last_notified_at: Option<DateTime<Utc>>,
}

impl TryFrom<PreferencesBody> for PreferencesPatch {
    type Error = Error;

    fn try_from(value: PreferencesBody) -> Result<Self, Self::Error> {
        Ok(Self {
            enabled: value.enabled,
            frequency: value.frequency.as_deref().map(parse_frequency).transpose()?,
            types: value.types,
            allow_email: value.allow_email,
            allow_push: value.allow_push,
            allow_sms: value.allow_sms,
            last_notified_at: value.last_notified_at,
        })
    }
}

impl TryFrom<PreferencesBody> for PreferencesUpdate {
    type Error = Error;

    fn try_from(value: PreferencesBody) -> Result<Self, Self::Error> {
        Ok(Self {
            enabled: value.enabled.unwrap_or(true),
            frequency: value
                .frequency
                .as_deref()
                .map(parse_frequency)
                .transpose()?
                .unwrap_or_default(),
            types: value.types.unwrap_or_default(),
            allow_email: value.allow_email.unwrap_or(true),
            allow_push: value.allow_push.unwrap_or(true),
            allow_sms: value.allow_sms.unwrap_or(false),
            last_notified_at: value.last_notified_at,
        })
    }
}

/// Request payload for `POST /notifications/send`.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct SendNotificationRequest {
    pub message: Option<String>,
    /// Defaults to `info`.
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

/// Sender acknowledgement.
#[derive(Debug, Serialize, ToSchema)]
pub struct ServiceResultResponse {
    pub mock: bool,
    pub channel: String,
    pub user_id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub message: String,
}

/// Outcome of `POST /notifications/send`.
#[derive(Debug, Serialize, ToSchema)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SendNotificationResponse {
    Blocked {
        reason: String,
    },
    Sent {
        user_id: String,
        message: String,
        #[serde(rename = "type")]
        kind: String,
        service_result: ServiceResultResponse,
    },
}

impl From<SendOutcome> for SendNotificationResponse {
    fn from(value: SendOutcome) -> Self {
        match value {
            SendOutcome::Blocked { reason } => Self::Blocked { reason },
            SendOutcome::Sent(receipt) => Self::Sent {
                user_id: receipt.user_id.to_string(),
                message: receipt.message.clone(),
                kind: receipt.kind.clone(),
                service_result: ServiceResultResponse {
                    mock: receipt.mock,
                    channel: receipt.channel.as_str().to_owned(),
                    user_id: receipt.user_id.to_string(),
                    kind: receipt.kind,
                    message: receipt.message,
                },
            },
        }
    }
}

/// Read a user's preferences.
#[utoipa::path(
    get,
    path = "/notifications/preferences",
    params(NotificationUserQuery),
    responses(
        (status = 200, description = "Preferences", body = PreferencesResponse),
        (status = 400, description = "Missing or invalid user", body = ErrorSchema)
    ),
    tags = ["notifications"],
    operation_id = "getNotificationPreferences"
)]
#[get("/notifications/preferences")]
pub async fn get_preferences(
    state: web::Data<HttpState>,
    request: HttpRequest,
    query: web::Query<NotificationUserQuery>,
) -> ApiResult<web::Json<PreferencesResponse>> {
    let user_id = resolve_user(&state, &request, &query)?;
    let preferences = state.notifications.preferences(user_id).await?;
    Ok(web::Json(preferences.into()))
}

/// Replace a user's preferences.
#[utoipa::path(
    post,
    path = "/notifications/preferences",
    params(NotificationUserQuery),
    request_body = PreferencesBody,
    responses(
        (status = 200, description = "Stored preferences", body = PreferencesResponse),
        (status = 400, description = "Missing or invalid user", body = ErrorSchema),
        (status = 422, description = "Invalid preferences", body = ErrorSchema)
    ),
    tags = ["notifications"],
    operation_id = "replaceNotificationPreferences"
)]
#[post("/notifications/preferences")]
pub async fn replace_preferences(
    state: web::Data<HttpState>,
    request: HttpRequest,
    query: web::Query<NotificationUserQuery>,
    payload: web::Json<PreferencesBody>,
) -> ApiResult<web::Json<PreferencesResponse>> {
    let user_id = resolve_user(&state, &request, &query)?;
    let update = PreferencesUpdate::try_from(payload.into_inner())?;
    let preferences = state
        .notifications
        .replace_preferences(user_id, update)
        .await?;
    Ok(web::Json(preferences.into()))
}

/// Update selected preference fields.
#[utoipa::path(
    patch,
    path = "/notifications/preferences",
    params(NotificationUserQuery),
    request_body = PreferencesBody,
    responses(
        (status = 200, description = "Stored preferences", body = PreferencesResponse),
        (status = 400, description = "Missing or invalid user", body = ErrorSchema),
        (status = 422, description = "Invalid preferences", body = ErrorSchema)
    ),
    tags = ["notifications"],
    operation_id = "patchNotificationPreferences"
)]
#[patch("/notifications/preferences")]
pub async fn patch_preferences(
    state: web::Data<HttpState>,
    request: HttpRequest,
    query: web::Query<NotificationUserQuery>,
    payload: web::Json<PreferencesBody>,
) -> ApiResult<web::Json<PreferencesResponse>> {
    let user_id = resolve_user(&state, &request, &query)?;
    let patch = PreferencesPatch::try_from(payload.into_inner())?;
    let preferences = state.notifications.patch_preferences(user_id, patch).await?;
    Ok(web::Json(preferences.into()))
}

/// Send a notification unless the user disabled them.
#[utoipa::path(
    post,
    path = "/notifications/send",
    params(NotificationUserQuery),
    request_body = SendNotificationRequest,
    responses(
        (status = 200, description = "Sent or blocked", body = SendNotificationResponse),
        (status = 400, description = "Missing or invalid user", body = ErrorSchema),
        (status = 422, description = "Missing message", body = ErrorSchema),
        (status = 503, description = "Sender unavailable", body = ErrorSchema)
    ),
    tags = ["notifications"],
    operation_id = "sendNotification"
)]
#[post("/notifications/send")]
pub async fn send_notification(
    state: web::Data<HttpState>,
    request: HttpRequest,
    query: web::Query<NotificationUserQuery>,
    payload: web::Json<SendNotificationRequest>,
) -> ApiResult<web::Json<SendNotificationResponse>> {
    let user_id = resolve_user(&state, &request, &query)?;
    let payload = payload.into_inner();
    let message = payload
        .message
        .map(|message| message.trim().to_owned())
        .filter(|message| !message.is_empty())
        .ok_or_else(|| missing_field_error(FieldName::new("message")))?;
    let kind = payload
        .kind
        .map(|kind| kind.trim().to_owned())
        .filter(|kind| !kind.is_empty())
        .unwrap_or_else(|| DEFAULT_NOTIFICATION_TYPE.to_owned());
    let outcome = state.notifications.send(user_id, message, kind).await?;
    Ok(web::Json(outcome.into()))
}
