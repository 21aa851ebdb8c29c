//! Bearer token and client metadata helpers used by HTTP handlers.
//!
//! Keep the HTTP modules focused on request/response mapping by concentrating
//! header parsing for credentials and caller identity here.

use actix_web::HttpRequest;
use actix_web::http::header::{self, HeaderMap};

use crate::domain::token::ClientMeta;

const BEARER_PREFIX: &str = "bearer ";
const FORWARDED_FOR_HEADER: &str = "X-Forwarded-For";

/// Token from an `Authorization: Bearer <token>` header.
///
/// The scheme is matched case-insensitively; blank tokens yield `None`.
pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?.trim();
    let prefix = value.get(..BEARER_PREFIX.len())?;
    if !prefix.eq_ignore_ascii_case(BEARER_PREFIX) {
        return None;
    }
    let token = value.get(BEARER_PREFIX.len()..)?.trim();
    (!token.is_empty()).then(|| token.to_owned())
}

/// Client address and user agent for the token ledger.
///
/// The first `X-Forwarded-For` hop wins over the peer address.
pub fn client_meta(request: &HttpRequest) -> ClientMeta {
    let headers = request.headers();
    let forwarded = headers
        .get(FORWARDED_FOR_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_owned);
    let ip = forwarded.or_else(|| request.peer_addr().map(|addr| addr.ip().to_string()));
    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|value| value.to_str().ok());
    ClientMeta::new(ip.as_deref(), user_agent)
}
