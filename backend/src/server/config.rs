//! HTTP server configuration object and helpers.

use std::net::SocketAddr;
use std::sync::Arc;

use carbon_tracker::outbound::persistence::DbPool;
use carbon_tracker::outbound::token::JwtTokenCodec;

#[cfg(feature = "metrics")]
use actix_web_prom::PrometheusMetrics;

/// Builder-style configuration for creating the HTTP server.
pub struct ServerConfig {
    pub(crate) bind_addr: SocketAddr,
    pub(crate) db_pool: Option<DbPool>,
    pub(crate) codec: Arc<JwtTokenCodec>,
    pub(crate) token_lifetime: chrono::Duration,
    #[cfg(feature = "metrics")]
    pub(crate) prometheus: Option<PrometheusMetrics>,
}

impl ServerConfig {
    /// Construct a server configuration around a token codec.
    #[must_use]
    pub fn new(
        bind_addr: SocketAddr,
        codec: JwtTokenCodec,
        token_lifetime: chrono::Duration,
    ) -> Self {
        Self {
            bind_addr,
            db_pool: None,
            codec: Arc::new(codec),
            token_lifetime,
            #[cfg(feature = "metrics")]
            prometheus: None,
        }
    }

    /// Attach a database connection pool for persistence adapters.
    ///
    /// Without a pool every repository port is served by its fixture.
    #[must_use]
    pub fn with_db_pool(mut self, pool: DbPool) -> Self {
        self.db_pool = Some(pool);
        self
    }

    /// Return the socket address the server will bind to.
    #[must_use]
    pub fn bind_addr(&self) -> SocketAddr {
        self.bind_addr
    }

    #[cfg(feature = "metrics")]
    /// Attach Prometheus middleware to the configuration.
    #[must_use]
    pub fn with_metrics(mut self, prometheus: Option<PrometheusMetrics>) -> Self {
        self.prometheus = prometheus;
        self
    }
}
