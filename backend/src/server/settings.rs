//! Startup settings loaded via OrthoConfig.
//!
//! Values layer CLI flags over `CARBON_*` environment variables and
//! configuration files. Unset optional values fall back to the defaults
//! exposed by the accessor methods.

use std::net::SocketAddr;

use ortho_config::OrthoConfig;
use serde::Deserialize;

use carbon_tracker::outbound::persistence::DEFAULT_POOL_MAX_SIZE;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEV_JWT_SECRET: &str = "devsecret";
const DEFAULT_JWT_ALGORITHM: &str = "HS256";
const DEFAULT_JWT_EXPIRES_SECS: i64 = 3600;

/// Configuration values for the HTTP server and its adapters.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "CARBON")]
pub struct AppSettings {
    /// Socket address to listen on.
    pub bind_addr: Option<String>,
    /// PostgreSQL URL; without it the server runs on fixture adapters.
    pub database_url: Option<String>,
    /// Upper bound on pooled connections.
    pub db_pool_max_size: Option<u32>,
    /// Shared secret for signing access tokens.
    pub jwt_secret: Option<String>,
    /// HMAC algorithm name.
    pub jwt_algorithm: Option<String>,
    /// Access token lifetime in seconds.
    pub jwt_expires_secs: Option<i64>,
    /// Apply embedded migrations before serving.
    #[ortho_config(default = true)]
    pub run_migrations: bool,
}

/// Error raised for settings that cannot be interpreted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SettingsError {
    #[error("invalid bind address {value}: {message}")]
    BindAddr { value: String, message: String },
    #[error("jwt_expires_secs must be positive, got {0}")]
    TokenLifetime(i64),
}

impl AppSettings {
    /// Parsed listen address.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::BindAddr`] when the value is not `host:port`.
    pub fn bind_addr(&self) -> Result<SocketAddr, SettingsError> {
        let raw = self.bind_addr.as_deref().unwrap_or(DEFAULT_BIND_ADDR);
        raw.parse().map_err(|err: std::net::AddrParseError| SettingsError::BindAddr {
            value: raw.to_owned(),
            message: err.to_string(),
        })
    }

    pub fn db_pool_max_size(&self) -> u32 {
        self.db_pool_max_size.unwrap_or(DEFAULT_POOL_MAX_SIZE)
    }

    /// Signing secret, falling back to the development value.
    pub fn jwt_secret(&self) -> &str {
        self.jwt_secret
            .as_deref()
            .filter(|secret| !secret.is_empty())
            .unwrap_or(DEV_JWT_SECRET)
    }

    /// Whether the development secret is in use.
    pub fn uses_dev_secret(&self) -> bool {
        self.jwt_secret() == DEV_JWT_SECRET
    }

    pub fn jwt_algorithm(&self) -> &str {
        self.jwt_algorithm.as_deref().unwrap_or(DEFAULT_JWT_ALGORITHM)
    }

    /// Token lifetime.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::TokenLifetime`] for zero or negative values.
    pub fn token_lifetime(&self) -> Result<chrono::Duration, SettingsError> {
        let secs = self.jwt_expires_secs.unwrap_or(DEFAULT_JWT_EXPIRES_SECS);
        if secs <= 0 {
            return Err(SettingsError::TokenLifetime(secs));
        }
        Ok(chrono::Duration::seconds(secs))
    }
}
