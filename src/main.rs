use anyhow::{Context, Result};
use authlink::api::{create_router, ApiState};
use authlink::config::{AuthlinkConfig, ENCRYPTION_KEY_ENV};
use authlink::connection::run_expiry_sweep;
use authlink::Platform;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "authlink=info".into()),
        )
        .init();

    info!("Authlink starting...");

    let config = AuthlinkConfig::from_env().context("Failed to load configuration")?;
    let encryption_key = std::env::var(ENCRYPTION_KEY_ENV).ok();

    info!(
        bind_addr = %config.server.bind_addr,
        callback_base_url = %config.server.callback_base_url,
        poll_interval_ms = config.watcher.poll_interval_ms,
        authorization_window_seconds = config.authorization.window_seconds,
        probe_enabled = config.probe.enabled,
        "Configuration loaded"
    );

    let platform = Platform::from_config(&config, encryption_key.as_deref())?;

    // Expire interactive connections whose authorization window has passed
    let sweep_handle = tokio::spawn(run_expiry_sweep(
        Arc::clone(platform.orchestrator()),
        config.authorization.sweep_interval_seconds,
    ));

    let api_state = ApiState {
        platform,
        max_wait: Duration::from_secs(config.watcher.max_wait_seconds),
    };
    let router = create_router(api_state).layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(&config.server.bind_addr)
        .await
        .context("Failed to bind API address")?;
    info!(addr = %config.server.bind_addr, "Authlink API listening");

    let server_handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, router).await {
            tracing::error!(error = %e, "API server error");
        }
    });

    // Wait for shutdown signal
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for ctrl_c signal")?;
    info!("Shutdown signal received");

    server_handle.abort();
    sweep_handle.abort();
    info!("Authlink stopped");

    Ok(())
}
