//! Helpers for parsing idempotency keys in HTTP handlers.

use actix_web::http::header::HeaderMap;
use serde_json::json;

use crate::domain::{Error, IdempotencyKey, IdempotencyKeyValidationError};

/// HTTP header name for idempotency keys.
pub const IDEMPOTENCY_KEY_HEADER: &str = "Idempotency-Key";

/// Extract the idempotency key from request headers.
pub fn extract_idempotency_key(
    headers: &HeaderMap,
) -> Result<Option<IdempotencyKey>, IdempotencyKeyValidationError> {
    let Some(header_value) = headers.get(IDEMPOTENCY_KEY_HEADER) else {
        return Ok(None);
    };

    let key_str = header_value
        .to_str()
        .map_err(|_| IdempotencyKeyValidationError::InvalidKey)?;

    IdempotencyKey::new(key_str).map(Some)
}

/// Resolve the key from the header, falling back to a body field.
///
/// The header wins when both are present; a missing key is an error.
pub fn resolve_idempotency_key(
    headers: &HeaderMap,
    body_key: Option<&str>,
) -> Result<IdempotencyKey, Error> {
    if let Some(key) = extract_idempotency_key(headers).map_err(map_idempotency_key_error)? {
        return Ok(key);
    }
    match body_key {
        Some(raw) => IdempotencyKey::new(raw).map_err(map_idempotency_key_error),
        None => Err(Error::unprocessable("idempotency key is required").with_details(json!({
            "field": "idempotency_key",
            "code": "missing_field",
        }))),
    }
}

/// Map idempotency key validation errors to domain errors.
pub fn map_idempotency_key_error(err: IdempotencyKeyValidationError) -> Error {
    Error::unprocessable(err.to_string()).with_details(json!({
        "field": "idempotency_key",
        "code": "invalid_idempotency_key",
    }))
}
