//! Cart history handlers.
//!
//! ```text
//! POST /api/cart/history   Record a validated cart for X-User-Id
//! GET  /api/cart/history   List the caller's recent carts
//! ```

use actix_web::{HttpRequest, get, post, web};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::{IntoParams, ToSchema};

use crate::domain::cart_history::{CartHistoryEntry, CartHistoryReceipt, CartMetrics};
use crate::domain::{Error, UserId};
use crate::inbound::http::ApiResult;
use crate::inbound::http::schemas::ErrorSchema;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{FieldName, missing_field_error, parse_user_id};

/// Header carrying the caller's user identifier.
pub const USER_ID_HEADER: &str = "X-User-Id";

fn user_from_header(request: &HttpRequest) -> Result<UserId, Error> {
    let raw = request
        .headers()
        .get(USER_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| {
            Error::invalid_request(format!("Missing {USER_ID_HEADER}")).with_details(json!({
                "field": USER_ID_HEADER,
                "code": "missing_field",
            }))
        })?;
    parse_user_id(raw, FieldName::new(USER_ID_HEADER))
}

/// Metrics of a validated cart.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct CartHistoryRequest {
    pub total_co2_g: Option<i64>,
    #[serde(default)]
    pub nb_articles: i32,
    #[serde(default)]
    pub nb_distinct_products: i32,
    #[serde(default)]
    pub total_distance_km: f64,
    #[serde(default)]
    pub days_captured_by_tree: f64,
    #[serde(default)]
    pub tree_equivalent: f64,
}

impl TryFrom<CartHistoryRequest> for CartMetrics {
    type Error = Error;

    fn try_from(value: CartHistoryRequest) -> Result<Self, Self::Error> {
        Ok(Self {
            total_co2_g: value
                .total_co2_g
                .ok_or_else(|| missing_field_error(FieldName::new("total_co2_g")))?,
            article_count: value.nb_articles,
            distinct_product_count: value.nb_distinct_products,
            total_distance_km: value.total_distance_km,
            days_captured_by_tree: value.days_captured_by_tree,
            tree_equivalent: value.tree_equivalent,
        })
    }
}

/// Confirmation of a recorded cart.
#[derive(Debug, Serialize, ToSchema)]
pub struct CartHistoryReceiptResponse {
    pub id: i64,
    pub status: String,
    pub validated_at: DateTime<Utc>,
    pub period_month: String,
    pub period_week: String,
}

impl From<CartHistoryReceipt> for CartHistoryReceiptResponse {
    fn from(value: CartHistoryReceipt) -> Self {
        Self {
            id: value.id,
            status: "ok".to_owned(),
            validated_at: value.validated_at,
            period_month: value.labels.month,
            period_week: value.labels.week,
        }
    }
}

/// Stored cart summary.
#[derive(Debug, Serialize, ToSchema)]
pub struct CartHistoryItem {
    pub id: i64,
    pub user_id: String,
    pub period_type: String,
    pub period_label: String,
    pub total_co2_g: i64,
    pub nb_articles: i32,
    pub nb_distinct_products: i32,
    pub total_distance_km: f64,
    pub days_captured_by_tree: f64,
    pub tree_equivalent: f64,
    pub created_at: DateTime<Utc>,
}

impl From<CartHistoryEntry> for CartHistoryItem {
    fn from(value: CartHistoryEntry) -> Self {
        Self {
            id: value.id,
            user_id: value.user_id.to_string(),
            period_type: value.period_type,
            period_label: value.period_label,
            total_co2_g: value.metrics.total_co2_g,
            nb_articles: value.metrics.article_count,
            nb_distinct_products: value.metrics.distinct_product_count,
            total_distance_km: value.metrics.total_distance_km,
            days_captured_by_tree: value.metrics.days_captured_by_tree,
            tree_equivalent: value.metrics.tree_equivalent,
            created_at: value.created_at,
        }
    }
}

/// Query parameters for `GET /api/cart/history`.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CartHistoryListQuery {
    /// Default 50, capped at 500.
    pub limit: Option<u32>,
}

/// Record a validated cart.
#[utoipa::path(
    post,
    path = "/api/cart/history",
    request_body = CartHistoryRequest,
    params(("X-User-Id" = String, Header, description = "Caller's user identifier")),
    responses(
        (status = 200, description = "Cart recorded", body = CartHistoryReceiptResponse),
        (status = 400, description = "Missing or invalid user", body = ErrorSchema),
        (status = 422, description = "Invalid metrics", body = ErrorSchema),
        (status = 500, description = "Insert failed", body = ErrorSchema)
    ),
    tags = ["cart"],
    operation_id = "recordCartHistory"
)]
#[post("/api/cart/history")]
pub async fn record_cart_history(
    state: web::Data<HttpState>,
    request: HttpRequest,
    payload: web::Json<CartHistoryRequest>,
) -> ApiResult<web::Json<CartHistoryReceiptResponse>> {
    let user_id = user_from_header(&request)?;
    let metrics = CartMetrics::try_from(payload.into_inner())?;
    let receipt = state.cart_history.record(user_id, metrics).await?;
    Ok(web::Json(receipt.into()))
}

/// List the caller's most recent carts, newest first.
#[utoipa::path(
    get,
    path = "/api/cart/history",
    params(
        CartHistoryListQuery,
        ("X-User-Id" = String, Header, description = "Caller's user identifier")
    ),
    responses(
        (status = 200, description = "Recent carts", body = [CartHistoryItem]),
        (status = 400, description = "Missing or invalid user", body = ErrorSchema)
    ),
    tags = ["cart"],
    operation_id = "listCartHistory"
)]
#[get("/api/cart/history")]
pub async fn list_cart_history(
    state: web::Data<HttpState>,
    request: HttpRequest,
    query: web::Query<CartHistoryListQuery>,
) -> ApiResult<web::Json<Vec<CartHistoryItem>>> {
    let user_id = user_from_header(&request)?;
    let entries = state
        .cart_history_query
        .list_recent(user_id, query.limit)
        .await?;
    Ok(web::Json(entries.into_iter().map(Into::into).collect()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::cart_history::PeriodLabels;
    use crate::domain::ports::{MockCartHistoryCommand, MockCartHistoryQuery};
    use actix_web::http::StatusCode;
    use actix_web::{App, test as actix_test};
    use chrono::TimeZone;
    use rstest::rstest;
    use serde_json::Value;
    use std::sync::Arc;

    const USER: &str = "3fa85f64-5717-4562-b3fc-2c963f66afa6";

    fn body() -> Value {
        json!({
            "total_co2_g": 12_500,
            "nb_articles": 8,
            "nb_distinct_products": 6,
            "total_distance_km": 420.5,
            "days_captured_by_tree": 0.8,
            "tree_equivalent": 0.002,
        })
    }

    #[actix_web::test]
    async fn record_returns_period_labels() {
        let mut command = MockCartHistoryCommand::new();
        command
            .expect_record()
            .withf(|user, metrics| user.to_string() == USER && metrics.article_count == 8)
            .times(1)
            .return_once(|_, _| {
                let at = Utc.with_ymd_and_hms(2025, 11, 19, 10, 30, 0).single().expect("ts");
                Ok(CartHistoryReceipt {
                    id: 7,
                    validated_at: at,
                    labels: PeriodLabels::for_instant(at),
                })
            });
        let state = HttpState {
            cart_history: Arc::new(command),
            ..HttpState::default()
        };
        let app = actix_test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .service(record_cart_history),
        )
        .await;

        let response = actix_test::call_service(
            &app,
            actix_test::TestRequest::post()
                .uri("/api/cart/history")
                .insert_header((USER_ID_HEADER, USER))
                .set_json(body())
                .to_request(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body: Value = actix_test::read_body_json(response).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["period_month"], "2025-11");
        assert_eq!(body["period_week"], "2025-W47");
    }

    #[rstest]
    #[case(None)]
    #[case(Some("not-a-user"))]
    #[actix_web::test]
    async fn record_requires_a_valid_user_header(#[case] header: Option<&str>) {
        let app = actix_test::init_service(
            App::new()
                .app_data(web::Data::new(HttpState::default()))
                .service(record_cart_history),
        )
        .await;
        let mut request = actix_test::TestRequest::post()
            .uri("/api/cart/history")
            .set_json(body());
        if let Some(value) = header {
            request = request.insert_header((USER_ID_HEADER, value));
        }
        let response = actix_test::call_service(&app, request.to_request()).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn list_forwards_limit() {
        let mut query = MockCartHistoryQuery::new();
        query
            .expect_list_recent()
            .withf(|_, limit| *limit == Some(3))
            .times(1)
            .return_once(|_, _| Ok(Vec::new()));
        let state = HttpState {
            cart_history_query: Arc::new(query),
            ..HttpState::default()
        };
        let app = actix_test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .service(list_cart_history),
        )
        .await;

        let response = actix_test::call_service(
            &app,
            actix_test::TestRequest::get()
                .uri("/api/cart/history?limit=3")
                .insert_header((USER_ID_HEADER, "42"))
                .to_request(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body: Value = actix_test::read_body_json(response).await;
        assert_eq!(body, json!([]));
    }
}
