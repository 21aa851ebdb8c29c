//! OpenAPI documentation configuration.
//!
//! [`ApiDoc`] registers every REST endpoint of the inbound layer. Request and
//! response schemas are collected from the handler annotations; the error
//! payload is registered explicitly through the wrappers in
//! [`crate::inbound::http::schemas`] so domain types stay free of utoipa.
//!
//! The document backs Swagger UI in debug builds and is exported with
//! `cargo run --bin openapi-dump -- --output openapi.json`.

use crate::inbound::http::schemas::{ErrorCodeSchema, ErrorSchema};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

/// Enrich the generated document with the bearer token security scheme.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi
            .components
            .get_or_insert_with(utoipa::openapi::Components::default);

        components.add_security_scheme(
            "bearer",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .description(Some("Access token issued by POST /tokens/issue."))
                    .build(),
            ),
        );
    }
}

/// OpenAPI document for the REST API.
/// Swagger UI is enabled in debug builds only and used by tooling.
#[derive(OpenApi)]
#[openapi(
    modifiers(&SecurityAddon),
    info(
        title = "Carbon tracker API",
        description = "Product footprints, emission calculations, reporting, challenges, groups, notifications and token management."
    ),
    servers(
        (url = "/", description = "Relative to the deployment base URL")
    ),
    paths(
        crate::inbound::http::products::list_products,
        crate::inbound::http::products::get_product,
        crate::inbound::http::products::create_product,
        crate::inbound::http::products::compare_products,
        crate::inbound::http::emissions::calculate_emission,
        crate::inbound::http::emissions::emission_history,
        crate::inbound::http::emissions::emission_summary,
        crate::inbound::http::emissions::emission_summary_groups,
        crate::inbound::http::cart_history::record_cart_history,
        crate::inbound::http::cart_history::list_cart_history,
        crate::inbound::http::challenges::list_challenges,
        crate::inbound::http::challenges::activate_challenge,
        crate::inbound::http::challenges::list_active_challenges,
        crate::inbound::http::challenges::evaluate_challenge,
        crate::inbound::http::groups::create_group,
        crate::inbound::http::groups::list_groups,
        crate::inbound::http::groups::delete_group,
        crate::inbound::http::groups::add_group_session,
        crate::inbound::http::groups::remove_group_session,
        crate::inbound::http::groups::compare_groups,
        crate::inbound::http::notifications::get_preferences,
        crate::inbound::http::notifications::replace_preferences,
        crate::inbound::http::notifications::patch_preferences,
        crate::inbound::http::notifications::send_notification,
        crate::inbound::http::tokens::issue_token,
        crate::inbound::http::tokens::rotate_token,
        crate::inbound::http::logs::recent_logs,
        crate::inbound::http::health::ready,
        crate::inbound::http::health::live,
    ),
    components(schemas(ErrorSchema, ErrorCodeSchema)),
    tags(
        (name = "products", description = "Product catalogue and footprint comparison"),
        (name = "emissions", description = "Idempotent emission calculations and reports"),
        (name = "cart", description = "Validated cart history"),
        (name = "challenges", description = "CO2 reduction challenges"),
        (name = "groups", description = "Session groups and their comparison"),
        (name = "notifications", description = "Notification preferences and delivery"),
        (name = "tokens", description = "Access token issuance and rotation"),
        (name = "audit", description = "Recent audit events"),
        (name = "health", description = "Endpoints for health checks")
    )
)]
pub struct ApiDoc;
