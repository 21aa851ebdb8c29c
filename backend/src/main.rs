//! Backend entry-point: loads settings, prepares adapters and serves the REST API.

mod server;

#[cfg(feature = "metrics")]
use actix_web_prom::{PrometheusMetrics, PrometheusMetricsBuilder};
use actix_web::web;
use color_eyre::eyre::{Result, WrapErr, eyre};
use ortho_config::OrthoConfig;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use carbon_tracker::inbound::http::health::HealthState;
use carbon_tracker::outbound::persistence::{DbPool, PoolConfig, run_pending_migrations};
use carbon_tracker::outbound::token::JwtTokenCodec;

use server::{AppSettings, ServerConfig, create_server};

/// Application bootstrap.
#[actix_web::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let settings = AppSettings::load().map_err(|err| eyre!("failed to load settings: {err}"))?;
    let config = build_server_config(&settings).await?;
    let bind_addr = config.bind_addr();

    let health_state = web::Data::new(HealthState::new());
    let server = create_server(health_state, config)
        .wrap_err_with(|| format!("failed to bind {bind_addr}"))?;
    info!(%bind_addr, "carbon tracker listening");
    server.await.wrap_err("server terminated with an error")
}

async fn build_server_config(settings: &AppSettings) -> Result<ServerConfig> {
    if settings.uses_dev_secret() {
        warn!("CARBON_JWT_SECRET is unset; signing tokens with the development secret");
    }
    let codec = JwtTokenCodec::new(settings.jwt_secret(), settings.jwt_algorithm())
        .wrap_err("invalid token signing configuration")?;
    let config = ServerConfig::new(settings.bind_addr()?, codec, settings.token_lifetime()?);

    let config = match settings.database_url.as_deref() {
        Some(url) => {
            if settings.run_migrations {
                run_pending_migrations(url).await?;
            }
            let pool = DbPool::new(PoolConfig::new(url).with_max_size(settings.db_pool_max_size()))
                .await
                .wrap_err("failed to connect to PostgreSQL")?;
            config.with_db_pool(pool)
        }
        None => {
            warn!("no database_url configured; serving fixture data");
            config
        }
    };

    #[cfg(feature = "metrics")]
    let config = config.with_metrics(Some(make_metrics()?));

    Ok(config)
}

#[cfg(feature = "metrics")]
fn make_metrics() -> Result<PrometheusMetrics> {
    PrometheusMetricsBuilder::new("carbon_tracker")
        .endpoint("/metrics")
        .registry(prometheus::Registry::new())
        .build()
        .map_err(|err| eyre!("configure Prometheus metrics: {err}"))
}
