//! Domain primitives, aggregates and services.
//!
//! Purpose: define strongly typed entities used by the API and persistence
//! layers, and the services that implement the driving ports in
//! [`ports`]. Types stay transport agnostic; inbound adapters own the
//! serialisation contracts.
//!
//! Public surface:
//! - Error (alias to `error::Error`): API error response payload.
//! - ErrorCode (alias to `error::ErrorCode`): stable error identifier.
//! - TraceId: per-request correlation identifier.
//! - UserId: user identity accepting UUIDs and legacy integers.
//! - One service per bounded area: challenges, products, emissions,
//!   reporting, cart history, groups, notifications, tokens and audit.

pub mod aggregation;
pub mod audit;
mod audit_service;
pub mod cart_history;
mod cart_history_service;
pub mod challenge;
mod challenge_service;
pub mod emission;
mod emission_service;
pub mod error;
pub mod group;
mod group_service;
pub mod idempotency;
pub mod notification;
mod notification_service;
pub mod ports;
pub mod product;
mod product_service;
mod reporting_service;
pub mod token;
mod token_service;
pub mod trace_id;
pub mod user;

#[cfg(test)]
pub(crate) mod test_fixtures;

pub use self::audit::{AuditEvent, NewAuditEvent};
pub use self::audit_service::AuditService;
pub use self::cart_history_service::CartHistoryService;
pub use self::challenge_service::ChallengeService;
pub use self::emission_service::EmissionService;
pub use self::error::{Error, ErrorCode, ErrorValidationError, TRACE_ID_HEADER};
pub use self::group_service::GroupService;
pub use self::idempotency::{
    IdempotencyKey, IdempotencyKeyValidationError, PayloadHash, canonicalize_and_hash,
};
pub use self::notification_service::NotificationService;
pub use self::product_service::ProductService;
pub use self::reporting_service::ReportingService;
pub use self::token_service::TokenService;
pub use self::trace_id::TraceId;
pub use self::user::{UserId, UserValidationError};

/// Convenient API result alias.
///
/// # Examples
/// ```
/// use actix_web::HttpResponse;
/// use carbon_tracker::domain::{ApiResult, Error};
///
/// fn handler() -> ApiResult<HttpResponse> {
///     Err(Error::forbidden("nope"))
/// }
/// ```
pub type ApiResult<T> = Result<T, Error>;
