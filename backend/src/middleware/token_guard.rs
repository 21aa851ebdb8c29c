//! Revocation guard rejecting requests that present a blacklisted token.
//!
//! The guard only blocks tokens it can prove are revoked. Requests with no
//! bearer token, an undecodable token or a token without `jti` pass through
//! so that endpoints can apply their own rules. Probe, docs and metrics paths
//! are never inspected.

use std::rc::Rc;
use std::sync::Arc;
use std::task::{Context, Poll};

use actix_web::body::EitherBody;
use actix_web::dev::{Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::{Error, HttpResponse, ResponseError};
use futures_util::future::{LocalBoxFuture, Ready, ready};
use serde_json::json;
use tracing::{debug, warn};

use crate::domain::ports::RevocationCheck;
use crate::domain::token::RevocationStatus;
use crate::inbound::http::auth::bearer_token;

const EXEMPT_PREFIXES: [&str; 4] = ["/health", "/docs", "/api-docs", "/metrics"];
const REVOKED_DETAIL: &str = "Token revoked";

fn is_exempt(path: &str) -> bool {
    EXEMPT_PREFIXES
        .iter()
        .any(|prefix| path.starts_with(prefix))
}

/// Middleware factory holding the revocation port.
///
/// # Examples
/// ```
/// use std::sync::Arc;
/// use actix_web::App;
/// use carbon_tracker::domain::ports::FixtureTokenService;
/// use carbon_tracker::middleware::TokenGuard;
///
/// let app = App::new().wrap(TokenGuard::new(Arc::new(FixtureTokenService)));
/// ```
#[derive(Clone)]
pub struct TokenGuard {
    check: Arc<dyn RevocationCheck>,
}

impl TokenGuard {
    pub fn new(check: Arc<dyn RevocationCheck>) -> Self {
        Self { check }
    }
}

impl<S, B> Transform<S, ServiceRequest> for TokenGuard
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = TokenGuardMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(TokenGuardMiddleware {
            service: Rc::new(service),
            check: Arc::clone(&self.check),
        }))
    }
}

/// Service wrapper produced by [`TokenGuard`].
pub struct TokenGuardMiddleware<S> {
    service: Rc<S>,
    check: Arc<dyn RevocationCheck>,
}

impl<S, B> Service<ServiceRequest> for TokenGuardMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(cx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let check = Arc::clone(&self.check);
        Box::pin(async move {
            let bearer = if is_exempt(req.path()) {
                None
            } else {
                bearer_token(req.headers())
            };
            let Some(bearer) = bearer else {
                return service.call(req).await.map(|res| res.map_into_left_body());
            };

            match check.status(&bearer).await {
                Ok(RevocationStatus::Revoked) => {
                    debug!(path = req.path(), "rejected revoked token");
                    let response = HttpResponse::Unauthorized().json(json!({
                        "detail": REVOKED_DETAIL,
                    }));
                    Ok(req.into_response(response).map_into_right_body())
                }
                Ok(RevocationStatus::Active | RevocationStatus::Unchecked) => {
                    service.call(req).await.map(|res| res.map_into_left_body())
                }
                Err(error) => {
                    warn!(%error, "revocation check failed");
                    let response = error.error_response();
                    Ok(req.into_response(response).map_into_right_body())
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Error as DomainError;
    use crate::domain::ports::MockRevocationCheck;
    use actix_web::http::StatusCode;
    use actix_web::http::header::AUTHORIZATION;
    use actix_web::{App, test as actix_test, web};
    use rstest::rstest;
    use serde_json::Value;

    async fn call_guarded(
        check: MockRevocationCheck,
        path: &str,
        bearer: Option<&str>,
    ) -> actix_web::dev::ServiceResponse<EitherBody<actix_web::body::BoxBody>> {
        let app = actix_test::init_service(
            App::new()
                .wrap(TokenGuard::new(Arc::new(check)))
                .default_service(web::to(|| async { HttpResponse::Ok().finish() })),
        )
        .await;
        let mut req = actix_test::TestRequest::get().uri(path);
        if let Some(token) = bearer {
            req = req.insert_header((AUTHORIZATION, format!("Bearer {token}")));
        }
        actix_test::call_service(&app, req.to_request()).await
    }

    #[rstest]
    #[case("/health/ready", true)]
    #[case("/docs/index.html", true)]
    #[case("/api-docs/openapi.json", true)]
    #[case("/metrics", true)]
    #[case("/products", false)]
    #[case("/tokens/rotate", false)]
    fn exempt_paths(#[case] path: &str, #[case] expected: bool) {
        assert_eq!(is_exempt(path), expected);
    }

    #[actix_web::test]
    async fn revoked_token_is_rejected() {
        let mut check = MockRevocationCheck::new();
        check
            .expect_status()
            .withf(|bearer| bearer == "old.token")
            .times(1)
            .return_once(|_| Ok(RevocationStatus::Revoked));
        let res = call_guarded(check, "/products", Some("old.token")).await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        let body: Value = actix_test::read_body_json(res).await;
        assert_eq!(body["detail"], "Token revoked");
    }

    #[rstest]
    #[case(RevocationStatus::Active)]
    #[case(RevocationStatus::Unchecked)]
    #[actix_web::test]
    async fn non_revoked_tokens_pass(#[case] status: RevocationStatus) {
        let mut check = MockRevocationCheck::new();
        check.expect_status().return_once(move |_| Ok(status));
        let res = call_guarded(check, "/products", Some("some.token")).await;
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[actix_web::test]
    async fn requests_without_bearer_skip_the_check() {
        let mut check = MockRevocationCheck::new();
        check.expect_status().never();
        let res = call_guarded(check, "/products", None).await;
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[actix_web::test]
    async fn exempt_paths_skip_the_check() {
        let mut check = MockRevocationCheck::new();
        check.expect_status().never();
        let res = call_guarded(check, "/health/live", Some("old.token")).await;
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[actix_web::test]
    async fn ledger_outage_maps_to_service_unavailable() {
        let mut check = MockRevocationCheck::new();
        check
            .expect_status()
            .return_once(|_| Err(DomainError::service_unavailable("database down")));
        let res = call_guarded(check, "/products", Some("some.token")).await;
        assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
