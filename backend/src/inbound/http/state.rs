//! Shared HTTP adapter state.
//!
//! HTTP handlers accept this state via `actix_web::web::Data` so they only
//! depend on domain ports (use-cases) and remain testable without I/O.

use std::sync::Arc;

use crate::domain::ports::{
    AuditQuery, CartHistoryCommand, CartHistoryQuery, ChallengeCommand, ChallengeQuery,
    EmissionCommand, EmissionReportQuery, GroupCommand, GroupQuery, NotificationCommand,
    ProductCommand, ProductQuery, TokenCommand, TokenIntrospection,
};
use crate::domain::ports::{
    FixtureCartHistoryService, FixtureChallengeCommand, FixtureChallengeQuery,
    FixtureEmissionCommand, FixtureEmissionReportQuery, FixtureGroupService,
    FixtureNotificationCommand, FixtureProductCommand, FixtureProductQuery, FixtureTokenService,
};
use crate::domain::AuditService;
use crate::domain::ports::FixtureAuditRepository;

/// Dependency bundle for HTTP handlers.
///
/// [`Default`] wires every port to its fixture, which lets tests replace
/// only the ports they exercise:
///
/// ```
/// use std::sync::Arc;
///
/// use carbon_tracker::domain::ports::FixtureProductQuery;
/// use carbon_tracker::inbound::http::state::HttpState;
///
/// let state = HttpState {
///     products: Arc::new(FixtureProductQuery),
///     ..HttpState::default()
/// };
/// let _groups = state.groups.clone();
/// ```
#[derive(Clone)]
pub struct HttpState {
    pub products: Arc<dyn ProductQuery>,
    pub products_command: Arc<dyn ProductCommand>,
    pub emissions: Arc<dyn EmissionCommand>,
    pub reports: Arc<dyn EmissionReportQuery>,
    pub cart_history: Arc<dyn CartHistoryCommand>,
    pub cart_history_query: Arc<dyn CartHistoryQuery>,
    pub challenges: Arc<dyn ChallengeCommand>,
    pub challenges_query: Arc<dyn ChallengeQuery>,
    pub groups: Arc<dyn GroupCommand>,
    pub groups_query: Arc<dyn GroupQuery>,
    pub notifications: Arc<dyn NotificationCommand>,
    pub tokens: Arc<dyn TokenCommand>,
    pub token_introspection: Arc<dyn TokenIntrospection>,
    pub audit: Arc<dyn AuditQuery>,
}

impl Default for HttpState {
    fn default() -> Self {
        Self {
            products: Arc::new(FixtureProductQuery),
            products_command: Arc::new(FixtureProductCommand),
            emissions: Arc::new(FixtureEmissionCommand),
            reports: Arc::new(FixtureEmissionReportQuery),
            cart_history: Arc::new(FixtureCartHistoryService),
            cart_history_query: Arc::new(FixtureCartHistoryService),
            challenges: Arc::new(FixtureChallengeCommand),
            challenges_query: Arc::new(FixtureChallengeQuery),
            groups: Arc::new(FixtureGroupService),
            groups_query: Arc::new(FixtureGroupService),
            notifications: Arc::new(FixtureNotificationCommand),
            tokens: Arc::new(FixtureTokenService),
            token_introspection: Arc::new(FixtureTokenService),
            audit: Arc::new(AuditService::new(Arc::new(FixtureAuditRepository))),
        }
    }
}
