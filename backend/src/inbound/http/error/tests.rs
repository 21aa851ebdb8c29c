//! Tests for HTTP error mapping.

use super::*;
use actix_web::ResponseError;
use actix_web::body::to_bytes;
use actix_web::http::StatusCode;
use rstest::{fixture, rstest};
use serde_json::{Value, json};

const TRACE_ID: &str = "00000000-0000-0000-0000-000000000000";

#[fixture]
fn expected_trace_id() -> String {
    TRACE_ID.to_owned()
}

#[rstest]
#[case(Error::invalid_request("bad"), StatusCode::BAD_REQUEST)]
#[case(Error::unprocessable("bad"), StatusCode::UNPROCESSABLE_ENTITY)]
#[case(Error::unauthorized("no auth"), StatusCode::UNAUTHORIZED)]
#[case(Error::forbidden("denied"), StatusCode::FORBIDDEN)]
#[case(Error::not_found("missing"), StatusCode::NOT_FOUND)]
#[case(Error::conflict("taken"), StatusCode::CONFLICT)]
#[case(Error::service_unavailable("down"), StatusCode::SERVICE_UNAVAILABLE)]
#[case(Error::internal("boom"), StatusCode::INTERNAL_SERVER_ERROR)]
fn status_code_matches_error_code(#[case] error: Error, #[case] status: StatusCode) {
    assert_eq!(ResponseError::status_code(&error), status);
}

async fn body_of(response: HttpResponse) -> Value {
    let bytes = to_bytes(response.into_body())
        .await
        .expect("reading response body succeeds");
    serde_json::from_slice(&bytes).expect("error JSON")
}

#[rstest]
#[actix_web::test]
async fn internal_errors_are_redacted_with_diagnostic(expected_trace_id: String) {
    let error = Error::internal("pool exhausted\nretry later")
        .with_trace_id(expected_trace_id.clone())
        .with_details(json!({"secret": "x"}));

    let response = ResponseError::error_response(&error);
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let headers = response.headers().clone();
    assert_eq!(
        headers
            .get(TRACE_ID_HEADER)
            .and_then(|value| value.to_str().ok()),
        Some(expected_trace_id.as_str())
    );
    assert_eq!(
        headers
            .get(ERROR_DIAGNOSTIC_HEADER)
            .and_then(|value| value.to_str().ok()),
        Some("pool exhausted retry later")
    );

    let body = body_of(response).await;
    assert_eq!(body["code"], "internal_error");
    assert_eq!(body["message"], "Internal server error");
    assert_eq!(body["traceId"], TRACE_ID);
    assert!(body.get("details").is_none());
}

#[rstest]
#[actix_web::test]
async fn client_errors_keep_message_and_details() {
    let error = Error::unprocessable("name must not be empty")
        .with_details(json!({"field": "name", "code": "empty"}));

    let response = ResponseError::error_response(&error);
    assert!(response.headers().get(ERROR_DIAGNOSTIC_HEADER).is_none());
    assert!(response.headers().get(TRACE_ID_HEADER).is_none());

    let body = body_of(response).await;
    assert_eq!(body["code"], "unprocessable_entity");
    assert_eq!(body["message"], "name must not be empty");
    assert_eq!(body["details"]["field"], "name");
}

#[rstest]
fn diagnostic_values_are_truncated() {
    let long = "x".repeat(500);
    assert_eq!(diagnostic_header_value(&long).len(), 200);
}
