//! campus-care server entry point.
//!
//! Starts the Axum HTTP server with REST and WebSocket endpoints.

use std::sync::Arc;

use anyhow::Context;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use campus_care::api;
use campus_care::app_state::AppState;
use campus_care::config::{CareConfig, LogFormat};
use campus_care::domain::EventBus;
use campus_care::notify::LogMailer;
use campus_care::persistence::{MemoryStore, PostgresStore, SlotStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = CareConfig::from_env()
        .map_err(|e| anyhow::anyhow!(e))
        .context("loading configuration")?;

    init_tracing(config.log_format);
    tracing::info!(addr = %config.listen_addr, "starting campus-care");

    let store = open_store(&config).await?;
    let event_bus = EventBus::new(config.event_bus_capacity);
    let app_state = AppState::new(store, event_bus);
    let _subscribers = app_state.spawn_subscribers(Arc::new(LogMailer));

    let app = api::build_app(app_state)
        .layer(TimeoutLayer::new(config.request_timeout()))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("binding {}", config.listen_addr))?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.init(),
    }
}

async fn open_store(config: &CareConfig) -> anyhow::Result<Arc<dyn SlotStore>> {
    if config.persistence_enabled {
        let store = PostgresStore::connect(config)
            .await
            .context("connecting to PostgreSQL")?;
        return Ok(Arc::new(store));
    }

    let store = MemoryStore::new(config.lock_timeout());
    let accounts = store.seed_demo().await;
    for user in &accounts {
        tracing::info!(user_id = %user.id, role = %user.role, name = %user.name, "demo account");
    }
    tracing::warn!("persistence disabled, running on the in-memory store");
    Ok(Arc::new(store))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
