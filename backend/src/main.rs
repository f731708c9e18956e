//! Backend entry-point: loads settings, prepares the database and serves the
//! REST API.

use std::net::SocketAddr;

use actix_web::web;
#[cfg(feature = "metrics")]
use actix_web_prom::{PrometheusMetrics, PrometheusMetricsBuilder};
use ortho_config::OrthoConfig;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use prakriti_backend::inbound::http::health::HealthState;
use prakriti_backend::outbound::persistence::{DbPool, PoolConfig, run_pending_migrations};
use prakriti_backend::settings::{AppSettings, BuildMode};

mod server;

use server::{ServerConfig, create_server};

/// Application bootstrap.
#[actix_web::main]
async fn main() -> std::io::Result<()> {
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let settings = AppSettings::load()
        .map_err(|e| std::io::Error::other(format!("failed to load settings: {e}")))?;
    let config = server_config(&settings).await?;

    let health_state = web::Data::new(HealthState::new());
    let server = create_server(health_state, config)?;
    info!(bind_addr = %settings.bind_addr(), "server listening");
    server.await
}

async fn server_config(settings: &AppSettings) -> std::io::Result<ServerConfig> {
    let bind_addr: SocketAddr = settings.bind_addr().parse().map_err(|e| {
        std::io::Error::other(format!("invalid bind address {}: {e}", settings.bind_addr()))
    })?;
    let database_url = settings.database_url().map_err(std::io::Error::other)?;
    let token_secret = settings
        .jwt_secret(BuildMode::from_debug_assertions())
        .map_err(std::io::Error::other)?;
    let chat = settings.stream().map_err(std::io::Error::other)?;

    run_pending_migrations(database_url.to_owned())
        .await
        .map_err(std::io::Error::other)?;

    let pool_config = PoolConfig::new(database_url).with_max_size(settings.db_max_connections());
    info!(pool = ?pool_config, "connecting to database");
    let pool = DbPool::new(pool_config)
        .await
        .map_err(std::io::Error::other)?;

    let config = ServerConfig::new(bind_addr, pool, token_secret, settings.jwt_ttl())
        .with_chat(chat)
        .with_cors_origin(settings.cors_allowed_origin().map(str::to_owned));
    #[cfg(feature = "metrics")]
    let config = config.with_metrics(make_metrics());
    Ok(config)
}

#[cfg(feature = "metrics")]
fn make_metrics() -> Option<PrometheusMetrics> {
    match PrometheusMetricsBuilder::new("prakriti")
        .endpoint("/metrics")
        .build()
    {
        Ok(metrics) => Some(metrics),
        Err(e) => {
            warn!(error = %e, "metrics disabled: prometheus registration failed");
            None
        }
    }
}
