//! Access token issue and rotation handlers.
//!
//! ```text
//! POST /tokens/issue    Issue a signed token for a user
//! POST /tokens/rotate   Exchange the bearer token for a new one
//! ```

use actix_web::{HttpRequest, HttpResponse, post, web};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::token::{IssuedToken, RotatedToken};
use crate::inbound::http::ApiResult;
use crate::inbound::http::auth::{bearer_token, client_meta};
use crate::inbound::http::schemas::ErrorSchema;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{FieldName, missing_field_error};

const TOKEN_TYPE: &str = "bearer";

/// Request payload for `POST /tokens/issue`.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct IssueTokenRequest {
    pub user_id: Option<String>,
}

/// A signed access token.
#[derive(Debug, Serialize, ToSchema)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub jti: String,
    /// Seconds until expiry.
    pub expires_in: i64,
}

impl From<IssuedToken> for TokenResponse {
    fn from(value: IssuedToken) -> Self {
        Self {
            access_token: value.access_token,
            token_type: TOKEN_TYPE.to_owned(),
            jti: value.jti,
            expires_in: value.expires_in,
        }
    }
}

/// Rotation result.
#[derive(Debug, Serialize, ToSchema)]
pub struct RotateTokenResponse {
    #[serde(flatten)]
    pub token: TokenResponse,
    /// `jti` of the revoked token.
    pub rotated_from: String,
    pub revoked_old: bool,
}

impl From<RotatedToken> for RotateTokenResponse {
    fn from(value: RotatedToken) -> Self {
        Self {
            token: value.token.into(),
            rotated_from: value.rotated_from,
            revoked_old: true,
        }
    }
}

/// Issue a token and record it in the ledger.
#[utoipa::path(
    post,
    path = "/tokens/issue",
    request_body = IssueTokenRequest,
    responses(
        (status = 201, description = "Token issued", body = TokenResponse),
        (status = 422, description = "Invalid user id", body = ErrorSchema),
        (status = 503, description = "Service unavailable", body = ErrorSchema)
    ),
    tags = ["tokens"],
    operation_id = "issueToken"
)]
#[post("/tokens/issue")]
pub async fn issue_token(
    state: web::Data<HttpState>,
    request: HttpRequest,
    payload: web::Json<IssueTokenRequest>,
) -> ApiResult<HttpResponse> {
    let subject = payload
        .into_inner()
        .user_id
        .ok_or_else(|| missing_field_error(FieldName::new("user_id")))?;
    let issued = state.tokens.issue(subject, client_meta(&request)).await?;
    Ok(HttpResponse::Created().json(TokenResponse::from(issued)))
}

/// Rotate the presented bearer token.
#[utoipa::path(
    post,
    path = "/tokens/rotate",
    responses(
        (status = 200, description = "Token rotated", body = RotateTokenResponse),
        (status = 401, description = "Missing, invalid or revoked token", body = ErrorSchema),
        (status = 503, description = "Service unavailable", body = ErrorSchema)
    ),
    security(("bearer" = [])),
    tags = ["tokens"],
    operation_id = "rotateToken"
)]
#[post("/tokens/rotate")]
pub async fn rotate_token(
    state: web::Data<HttpState>,
    request: HttpRequest,
) -> ApiResult<web::Json<RotateTokenResponse>> {
    let bearer = bearer_token(request.headers());
    let rotated = state.tokens.rotate(bearer, client_meta(&request)).await?;
    Ok(web::Json(rotated.into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Error;
    use crate::domain::ports::MockTokenCommand;
    use actix_web::http::StatusCode;
    use actix_web::http::header::AUTHORIZATION;
    use actix_web::{App, test as actix_test};
    use serde_json::{Value, json};
    use std::sync::Arc;

    fn issued(jti: &str) -> IssuedToken {
        IssuedToken {
            access_token: format!("token-{jti}"),
            jti: jti.to_owned(),
            subject: "user-1".to_owned(),
            expires_in: 3600,
        }
    }

    fn state_with(command: MockTokenCommand) -> HttpState {
        HttpState {
            tokens: Arc::new(command),
            ..HttpState::default()
        }
    }

    #[actix_web::test]
    async fn issue_records_client_metadata() {
        let mut command = MockTokenCommand::new();
        command
            .expect_issue()
            .withf(|subject, client| {
                subject == "user-1" && client.ip() == Some("203.0.113.9")
            })
            .times(1)
            .return_once(|_, _| Ok(issued("abc")));
        let app = actix_test::init_service(
            App::new()
                .app_data(web::Data::new(state_with(command)))
                .service(issue_token),
        )
        .await;
        let response = actix_test::call_service(
            &app,
            actix_test::TestRequest::post()
                .uri("/tokens/issue")
                .insert_header(("X-Forwarded-For", "203.0.113.9"))
                .set_json(json!({"user_id": "user-1"}))
                .to_request(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let body: Value = actix_test::read_body_json(response).await;
        assert_eq!(body["token_type"], "bearer");
        assert_eq!(body["expires_in"], 3600);
    }

    #[actix_web::test]
    async fn rotate_passes_bearer_and_flattens_response() {
        let mut command = MockTokenCommand::new();
        command
            .expect_rotate()
            .withf(|bearer, _| bearer.as_deref() == Some("old.token"))
            .times(1)
            .return_once(|_, _| {
                Ok(RotatedToken {
                    token: issued("new"),
                    rotated_from: "old".to_owned(),
                })
            });
        let app = actix_test::init_service(
            App::new()
                .app_data(web::Data::new(state_with(command)))
                .service(rotate_token),
        )
        .await;
        let response = actix_test::call_service(
            &app,
            actix_test::TestRequest::post()
                .uri("/tokens/rotate")
                .insert_header((AUTHORIZATION, "Bearer old.token"))
                .to_request(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body: Value = actix_test::read_body_json(response).await;
        assert_eq!(body["jti"], "new");
        assert_eq!(body["rotated_from"], "old");
        assert_eq!(body["revoked_old"], true);
    }

    #[actix_web::test]
    async fn rotate_without_bearer_is_unauthorised() {
        let mut command = MockTokenCommand::new();
        command
            .expect_rotate()
            .withf(|bearer, _| bearer.is_none())
            .return_once(|_, _| Err(Error::unauthorized("Missing Bearer token")));
        let app = actix_test::init_service(
            App::new()
                .app_data(web::Data::new(state_with(command)))
                .service(rotate_token),
        )
        .await;
        let response = actix_test::call_service(
            &app,
            actix_test::TestRequest::post().uri("/tokens/rotate").to_request(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body: Value = actix_test::read_body_json(response).await;
        assert_eq!(body["message"], "Missing Bearer token");
    }
}
