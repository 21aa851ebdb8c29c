//! Audit log handler.

use actix_web::{get, web};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::domain::AuditEvent;
use crate::domain::audit::{DEFAULT_RECENT_LIMIT, MAX_RECENT_LIMIT};
use crate::inbound::http::ApiResult;
use crate::inbound::http::schemas::ErrorSchema;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{FieldName, bounded};

/// Query parameters for `GET /logs/recent`.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct RecentLogsQuery {
    /// 1 to 200, default 20.
    pub limit: Option<u32>,
}

/// One audit event.
#[derive(Debug, Serialize, ToSchema)]
pub struct AuditEventResponse {
    pub id: i64,
    pub event_type: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

impl From<AuditEvent> for AuditEventResponse {
    fn from(value: AuditEvent) -> Self {
        Self {
            id: value.id,
            event_type: value.event_type,
            message: value.message,
            created_at: value.created_at,
        }
    }
}

/// Most recent audit events, newest first.
#[utoipa::path(
    get,
    path = "/logs/recent",
    params(RecentLogsQuery),
    responses(
        (status = 200, description = "Recent events", body = [AuditEventResponse]),
        (status = 422, description = "Limit out of range", body = ErrorSchema)
    ),
    tags = ["audit"],
    operation_id = "listRecentLogs"
)]
#[get("/logs/recent")]
pub async fn recent_logs(
    state: web::Data<HttpState>,
    query: web::Query<RecentLogsQuery>,
) -> ApiResult<web::Json<Vec<AuditEventResponse>>> {
    let limit = bounded(
        query.limit,
        FieldName::new("limit"),
        1,
        MAX_RECENT_LIMIT,
        DEFAULT_RECENT_LIMIT,
    )?;
    let events = state.audit.list_recent(Some(limit)).await?;
    Ok(web::Json(events.into_iter().map(Into::into).collect()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::MockAuditQuery;
    use actix_web::http::StatusCode;
    use actix_web::{App, test as actix_test};
    use rstest::rstest;
    use serde_json::Value;
    use std::sync::Arc;

    #[actix_web::test]
    async fn lists_events_with_default_limit() {
        let mut audit = MockAuditQuery::new();
        audit
            .expect_list_recent()
            .withf(|limit| *limit == Some(DEFAULT_RECENT_LIMIT))
            .times(1)
            .return_once(|_| {
                Ok(vec![AuditEvent {
                    id: 3,
                    event_type: "token_rotated".to_owned(),
                    message: "jti abc rotated".to_owned(),
                    created_at: Utc::now(),
                }])
            });
        let state = HttpState {
            audit: Arc::new(audit),
            ..HttpState::default()
        };
        let app = actix_test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .service(recent_logs),
        )
        .await;
        let response = actix_test::call_service(
            &app,
            actix_test::TestRequest::get().uri("/logs/recent").to_request(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body: Value = actix_test::read_body_json(response).await;
        assert_eq!(body[0]["event_type"], "token_rotated");
    }

    #[rstest]
    #[case("/logs/recent?limit=0")]
    #[case("/logs/recent?limit=201")]
    #[actix_web::test]
    async fn rejects_out_of_range_limits(#[case] uri: &str) {
        let app = actix_test::init_service(
            App::new()
                .app_data(web::Data::new(HttpState::default()))
                .service(recent_logs),
        )
        .await;
        let response = actix_test::call_service(
            &app,
            actix_test::TestRequest::get().uri(uri).to_request(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
