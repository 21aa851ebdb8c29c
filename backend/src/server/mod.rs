//! Server construction and middleware wiring.

mod config;
#[cfg(feature = "metrics")]
mod metrics;
mod settings;
mod state_builders;

pub use config::ServerConfig;
pub use settings::AppSettings;

#[cfg(feature = "metrics")]
use metrics::MetricsLayer;
use state_builders::{BuiltState, build_http_state};

use std::sync::Arc;

use actix_web::dev::{Server, ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::{App, HttpServer, web};

#[cfg(debug_assertions)]
use carbon_tracker::doc::ApiDoc;
use carbon_tracker::domain::ports::RevocationCheck;
use carbon_tracker::inbound::http::cart_history::{list_cart_history, record_cart_history};
use carbon_tracker::inbound::http::challenges::{
    activate_challenge, evaluate_challenge, list_active_challenges, list_challenges,
};
use carbon_tracker::inbound::http::emissions::{
    calculate_emission, emission_history, emission_summary, emission_summary_groups,
};
use carbon_tracker::inbound::http::groups::{
    add_group_session, compare_groups, create_group, delete_group, list_groups,
    remove_group_session,
};
use carbon_tracker::inbound::http::health::{HealthState, live, ready};
use carbon_tracker::inbound::http::logs::recent_logs;
use carbon_tracker::inbound::http::notifications::{
    get_preferences, patch_preferences, replace_preferences, send_notification,
};
use carbon_tracker::inbound::http::products::{
    compare_products, create_product, get_product, list_products,
};
use carbon_tracker::inbound::http::state::HttpState;
use carbon_tracker::inbound::http::tokens::{issue_token, rotate_token};
use carbon_tracker::{TokenGuard, Trace};
#[cfg(debug_assertions)]
use utoipa::OpenApi;
#[cfg(debug_assertions)]
use utoipa_swagger_ui::SwaggerUi;

#[derive(Clone)]
struct AppDependencies {
    health_state: web::Data<HealthState>,
    http_state: web::Data<HttpState>,
    revocation: Arc<dyn RevocationCheck>,
}

/// Register every REST endpoint on `cfg`.
///
/// `/groups/compare` is registered before `/groups/{group_id}` routes so the
/// literal segment wins.
pub(crate) fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(list_products)
        .service(get_product)
        .service(create_product)
        .service(compare_products)
        .service(calculate_emission)
        .service(emission_history)
        .service(emission_summary)
        .service(emission_summary_groups)
        .service(record_cart_history)
        .service(list_cart_history)
        .service(list_challenges)
        .service(activate_challenge)
        .service(list_active_challenges)
        .service(evaluate_challenge)
        .service(compare_groups)
        .service(create_group)
        .service(list_groups)
        .service(delete_group)
        .service(add_group_session)
        .service(remove_group_session)
        .service(get_preferences)
        .service(replace_preferences)
        .service(patch_preferences)
        .service(send_notification)
        .service(issue_token)
        .service(rotate_token)
        .service(recent_logs)
        .service(ready)
        .service(live);
}

fn build_app(
    deps: AppDependencies,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse<impl actix_web::body::MessageBody>,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    let AppDependencies {
        health_state,
        http_state,
        revocation,
    } = deps;

    let app = App::new()
        .app_data(health_state)
        .app_data(http_state)
        .configure(configure_routes);

    #[cfg(debug_assertions)]
    let app = app.service(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // Trace is outermost so guard rejections also carry a trace id.
    app.wrap(TokenGuard::new(revocation)).wrap(Trace)
}

/// Construct an Actix HTTP server using the provided health state and configuration.
///
/// # Errors
/// Propagates [`std::io::Error`] when binding the socket or starting the server fails.
pub fn create_server(
    health_state: web::Data<HealthState>,
    config: ServerConfig,
) -> std::io::Result<Server> {
    let server_health_state = health_state.clone();
    let BuiltState {
        http_state,
        revocation,
    } = build_http_state(&config);
    let ServerConfig {
        bind_addr,
        #[cfg(feature = "metrics")]
        prometheus,
        ..
    } = config;

    #[cfg(feature = "metrics")]
    let metrics_layer = MetricsLayer::from_option(prometheus);

    let server = HttpServer::new(move || {
        let app = build_app(AppDependencies {
            health_state: server_health_state.clone(),
            http_state: http_state.clone(),
            revocation: revocation.clone(),
        });

        #[cfg(feature = "metrics")]
        let app = app.wrap(metrics_layer.clone());

        app
    })
    .bind(bind_addr)?
    .run();

    health_state.mark_ready();
    Ok(server)
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::StatusCode;
    use actix_web::test;
    use carbon_tracker::outbound::token::JwtTokenCodec;
    use rstest::rstest;

    fn deps() -> AppDependencies {
        let codec = JwtTokenCodec::new("devsecret", "HS256").expect("valid codec");
        let config = ServerConfig::new(
            "127.0.0.1:0".parse().expect("valid address"),
            codec,
            chrono::Duration::hours(1),
        );
        let BuiltState {
            http_state,
            revocation,
        } = build_http_state(&config);
        let health_state = web::Data::new(HealthState::new());
        health_state.mark_ready();
        AppDependencies {
            health_state,
            http_state,
            revocation,
        }
    }

    #[rstest]
    #[case("/health/ready", StatusCode::OK)]
    #[case("/health/live", StatusCode::OK)]
    #[case("/challenges", StatusCode::OK)]
    #[case("/groups/compare?ids=1,2", StatusCode::OK)]
    #[actix_web::test]
    async fn fixture_app_serves_routes(#[case] uri: &str, #[case] expected: StatusCode) {
        let app = test::init_service(build_app(deps())).await;
        let response = test::call_service(&app, test::TestRequest::get().uri(uri).to_request()).await;
        assert_eq!(response.status(), expected);
        assert!(response.headers().contains_key("trace-id"));
    }

    #[actix_web::test]
    async fn issued_tokens_rotate_in_fixture_mode() {
        let app = test::init_service(build_app(deps())).await;
        let issued: serde_json::Value = test::call_and_read_body_json(
            &app,
            test::TestRequest::post()
                .uri("/tokens/issue")
                .set_json(serde_json::json!({"user_id": "user-1"}))
                .to_request(),
        )
        .await;
        let token = issued["access_token"].as_str().expect("token issued");

        let rotate = test::call_service(
            &app,
            test::TestRequest::post()
                .uri("/tokens/rotate")
                .insert_header(("Authorization", format!("Bearer {token}")))
                .to_request(),
        )
        .await;
        assert_eq!(rotate.status(), StatusCode::OK);
        let body: serde_json::Value = test::read_body_json(rotate).await;
        assert_eq!(body["revoked_old"], serde_json::json!(true));
        assert_ne!(body["jti"], issued["jti"]);
    }
}
