//! HTTP adapter mapping for domain errors.
//!
//! Purpose: keep the domain error type HTTP-agnostic while allowing Actix
//! handlers to turn domain failures into consistent JSON responses and status
//! codes.

use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use tracing::error;

use crate::domain::{Error, ErrorCode, TRACE_ID_HEADER};

/// Convenient result alias for HTTP handlers.
pub type ApiResult<T> = Result<T, Error>;

/// Header carrying a sanitised copy of a redacted internal error message.
pub const ERROR_DIAGNOSTIC_HEADER: &str = "X-Error-Diagnostic";
const DIAGNOSTIC_MAX_LEN: usize = 200;

fn status_for(code: ErrorCode) -> StatusCode {
    match code {
        ErrorCode::InvalidRequest => StatusCode::BAD_REQUEST,
        ErrorCode::UnprocessableEntity => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
        ErrorCode::Forbidden => StatusCode::FORBIDDEN,
        ErrorCode::NotFound => StatusCode::NOT_FOUND,
        ErrorCode::Conflict => StatusCode::CONFLICT,
        ErrorCode::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn is_internal(error: &Error) -> bool {
    matches!(error.code(), ErrorCode::InternalError)
}

fn redact_if_internal(error: &Error) -> Error {
    if is_internal(error) {
        let mut redacted = Error::internal("Internal server error");
        if let Some(id) = error.trace_id() {
            redacted = redacted.with_trace_id(id.to_owned());
        }
        redacted
    } else {
        error.clone()
    }
}

/// Reduce `message` to printable ASCII of at most 200 characters so it is
/// always a valid header value.
///
/// # Examples
/// ```
/// use carbon_tracker::inbound::http::error::diagnostic_header_value;
///
/// assert_eq!(diagnostic_header_value("pool\ntimed out: é"), "pool timed out: ?");
/// ```
pub fn diagnostic_header_value(message: &str) -> String {
    message
        .chars()
        .map(|c| match c {
            ' '..='~' => c,
            '\n' | '\r' | '\t' => ' ',
            _ => '?',
        })
        .take(DIAGNOSTIC_MAX_LEN)
        .collect()
}

impl ResponseError for Error {
    fn status_code(&self) -> StatusCode {
        status_for(self.code())
    }

    fn error_response(&self) -> HttpResponse {
        let mut builder = HttpResponse::build(self.status_code());
        if let Some(id) = self.trace_id() {
            builder.insert_header((TRACE_ID_HEADER, id.to_owned()));
        }
        if is_internal(self) {
            error!(message = self.message(), "internal error returned to client");
            builder.insert_header((
                ERROR_DIAGNOSTIC_HEADER,
                diagnostic_header_value(self.message()),
            ));
        }

        builder.json(redact_if_internal(self))
    }
}

impl From<actix_web::Error> for Error {
    fn from(err: actix_web::Error) -> Self {
        error!(error = %err, "actix error promoted to domain error");
        Error::internal("Internal server error")
    }
}

#[cfg(test)]
mod tests;
