//! HTTP server configuration object and helpers.

use std::net::SocketAddr;

use chrono::TimeDelta;
use prakriti_backend::outbound::persistence::DbPool;
use prakriti_backend::settings::StreamSettings;
use zeroize::Zeroizing;

#[cfg(feature = "metrics")]
use actix_web_prom::PrometheusMetrics;

/// Builder-style configuration for creating the HTTP server.
pub struct ServerConfig {
    pub(crate) bind_addr: SocketAddr,
    pub(crate) db_pool: DbPool,
    pub(crate) token_secret: Zeroizing<Vec<u8>>,
    pub(crate) token_ttl: TimeDelta,
    pub(crate) chat: Option<StreamSettings>,
    pub(crate) cors_allowed_origin: Option<String>,
    #[cfg(feature = "metrics")]
    pub(crate) prometheus: Option<PrometheusMetrics>,
}

impl ServerConfig {
    /// Construct a server configuration around the database pool and the
    /// access token signing parameters.
    #[must_use]
    pub fn new(
        bind_addr: SocketAddr,
        db_pool: DbPool,
        token_secret: Zeroizing<Vec<u8>>,
        token_ttl: TimeDelta,
    ) -> Self {
        Self {
            bind_addr,
            db_pool,
            token_secret,
            token_ttl,
            chat: None,
            cors_allowed_origin: None,
            #[cfg(feature = "metrics")]
            prometheus: None,
        }
    }

    /// Enable the chat endpoints against the configured Stream application.
    #[must_use]
    pub fn with_chat(mut self, chat: Option<StreamSettings>) -> Self {
        self.chat = chat;
        self
    }

    /// Restrict browser access to one origin. Any origin is allowed otherwise.
    #[must_use]
    pub fn with_cors_origin(mut self, origin: Option<String>) -> Self {
        self.cors_allowed_origin = origin;
        self
    }

    #[cfg(feature = "metrics")]
    /// Attach Prometheus middleware to the configuration.
    #[must_use]
    pub fn with_metrics(mut self, prometheus: Option<PrometheusMetrics>) -> Self {
        self.prometheus = prometheus;
        self
    }
}
