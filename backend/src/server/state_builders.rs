//! Builders for HTTP state ports and the revocation check.
//!
//! Every service is constructed over either the Diesel adapters or the
//! fixture repositories, so both modes exercise the same domain logic.

use std::sync::Arc;

use actix_web::web;
use mockable::{Clock, DefaultClock};

use carbon_tracker::domain::ports::{
    AuditRepository, CartHistoryRepository, ChallengeRepository, EmissionAggregateRepository,
    EmissionRepository, FixtureAuditRepository, FixtureCartHistoryRepository,
    FixtureChallengeRepository, FixtureEmissionAggregateRepository, FixtureEmissionRepository,
    FixtureGroupRepository, FixtureNotificationPreferencesRepository, FixtureProductRepository,
    FixtureTokenLedgerRepository, GroupRepository, NotificationPreferencesRepository,
    ProductRepository, RevocationCheck, TokenCodec, TokenLedgerRepository,
};
use carbon_tracker::domain::{
    AuditService, CartHistoryService, ChallengeService, EmissionService, GroupService,
    NotificationService, ProductService, ReportingService, TokenService,
};
use carbon_tracker::inbound::http::state::HttpState;
use carbon_tracker::outbound::notifications::LoggingNotificationSender;
use carbon_tracker::outbound::persistence::{
    DbPool, DieselAuditRepository, DieselCartHistoryRepository, DieselChallengeRepository,
    DieselEmissionAggregateRepository, DieselEmissionRepository, DieselGroupRepository,
    DieselNotificationPreferencesRepository, DieselProductRepository, DieselTokenLedgerRepository,
};

use super::ServerConfig;

/// Driven adapters handed to the services.
struct Adapters<P, E, A, C, H, G, N, L> {
    products: Arc<P>,
    emissions: Arc<E>,
    aggregates: Arc<A>,
    challenges: Arc<C>,
    history: Arc<H>,
    groups: Arc<G>,
    notifications: Arc<N>,
    ledger: Arc<L>,
    audit: Arc<dyn AuditRepository>,
}

/// State handed to the application factory.
pub(super) struct BuiltState {
    pub(super) http_state: web::Data<HttpState>,
    pub(super) revocation: Arc<dyn RevocationCheck>,
}

fn diesel_adapters(
    pool: &DbPool,
) -> Adapters<
    DieselProductRepository,
    DieselEmissionRepository,
    DieselEmissionAggregateRepository,
    DieselChallengeRepository,
    DieselCartHistoryRepository,
    DieselGroupRepository,
    DieselNotificationPreferencesRepository,
    DieselTokenLedgerRepository,
> {
    Adapters {
        products: Arc::new(DieselProductRepository::new(pool.clone())),
        emissions: Arc::new(DieselEmissionRepository::new(pool.clone())),
        aggregates: Arc::new(DieselEmissionAggregateRepository::new(pool.clone())),
        challenges: Arc::new(DieselChallengeRepository::new(pool.clone())),
        history: Arc::new(DieselCartHistoryRepository::new(pool.clone())),
        groups: Arc::new(DieselGroupRepository::new(pool.clone())),
        notifications: Arc::new(DieselNotificationPreferencesRepository::new(pool.clone())),
        ledger: Arc::new(DieselTokenLedgerRepository::new(pool.clone())),
        audit: Arc::new(DieselAuditRepository::new(pool.clone())),
    }
}

fn fixture_adapters() -> Adapters<
    FixtureProductRepository,
    FixtureEmissionRepository,
    FixtureEmissionAggregateRepository,
    FixtureChallengeRepository,
    FixtureCartHistoryRepository,
    FixtureGroupRepository,
    FixtureNotificationPreferencesRepository,
    FixtureTokenLedgerRepository,
> {
    Adapters {
        products: Arc::new(FixtureProductRepository),
        emissions: Arc::new(FixtureEmissionRepository),
        aggregates: Arc::new(FixtureEmissionAggregateRepository),
        challenges: Arc::new(FixtureChallengeRepository),
        history: Arc::new(FixtureCartHistoryRepository),
        groups: Arc::new(FixtureGroupRepository),
        notifications: Arc::new(FixtureNotificationPreferencesRepository),
        ledger: Arc::new(FixtureTokenLedgerRepository),
        audit: Arc::new(FixtureAuditRepository),
    }
}

/// Wire services over `adapters` and pair each with its driving ports.
fn assemble<P, E, A, C, H, G, N, L, K>(
    adapters: Adapters<P, E, A, C, H, G, N, L>,
    codec: Arc<K>,
    token_lifetime: chrono::Duration,
    clock: Arc<dyn Clock>,
) -> BuiltState
where
    P: ProductRepository + 'static,
    E: EmissionRepository + 'static,
    A: EmissionAggregateRepository + 'static,
    C: ChallengeRepository + 'static,
    H: CartHistoryRepository + 'static,
    G: GroupRepository + 'static,
    N: NotificationPreferencesRepository + 'static,
    L: TokenLedgerRepository + 'static,
    K: TokenCodec + 'static,
{
    let Adapters {
        products,
        emissions,
        aggregates,
        challenges,
        history,
        groups,
        notifications,
        ledger,
        audit,
    } = adapters;

    let product_service = Arc::new(ProductService::new(products, audit.clone()));
    let cart_history = Arc::new(CartHistoryService::new(history.clone(), clock.clone()));
    let challenge_service = Arc::new(ChallengeService::new(
        challenges,
        history,
        audit.clone(),
        clock.clone(),
    ));
    let group_service = Arc::new(GroupService::new(groups));
    let token_service = Arc::new(TokenService::new(
        ledger,
        codec,
        audit.clone(),
        clock.clone(),
        token_lifetime,
    ));

    let http_state = HttpState {
        products: product_service.clone(),
        products_command: product_service,
        emissions: Arc::new(EmissionService::new(emissions, clock.clone())),
        reports: Arc::new(ReportingService::new(aggregates)),
        cart_history: cart_history.clone(),
        cart_history_query: cart_history,
        challenges: challenge_service.clone(),
        challenges_query: challenge_service,
        groups: group_service.clone(),
        groups_query: group_service,
        notifications: Arc::new(NotificationService::new(
            notifications,
            Arc::new(LoggingNotificationSender),
            clock,
        )),
        tokens: token_service.clone(),
        token_introspection: token_service.clone(),
        audit: Arc::new(AuditService::new(audit)),
    };

    BuiltState {
        http_state: web::Data::new(http_state),
        revocation: token_service,
    }
}

/// Build the shared HTTP state from configured ports and fixture fallbacks.
pub(super) fn build_http_state(config: &ServerConfig) -> BuiltState {
    let clock: Arc<dyn Clock> = Arc::new(DefaultClock);
    match &config.db_pool {
        Some(pool) => assemble(
            diesel_adapters(pool),
            config.codec.clone(),
            config.token_lifetime,
            clock,
        ),
        None => assemble(
            fixture_adapters(),
            config.codec.clone(),
            config.token_lifetime,
            clock,
        ),
    }
}
