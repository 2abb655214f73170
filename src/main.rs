// Main entry point - Dependency injection and server setup
use std::sync::Arc;
use anyhow::Context;
use axum::{routing::get, Router};
use tower_http::trace::TraceLayer;

use telemetry_dashboard::application::history_feed::HistoryFeed;
use telemetry_dashboard::application::poller::Poller;
use telemetry_dashboard::infrastructure::config::load_dashboard_config;
use telemetry_dashboard::infrastructure::http_source::HttpTelemetrySource;
use telemetry_dashboard::presentation::app_state::AppState;
use telemetry_dashboard::presentation::handlers::{get_history, get_latest, get_status, health_check};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    // Load configuration
    let config = load_dashboard_config()?;

    // Create telemetry source (infrastructure layer)
    let source = Arc::new(HttpTelemetrySource::new(
        &config.source.base_url,
        config.request_timeout(),
    )?);
    tracing::info!(url = source.data_url(), "Polling telemetry source");

    // Buffer starts empty and lives as long as the poller's sink
    let (feed, history) = HistoryFeed::new(config.history.capacity)?;

    // Start polling (application layer)
    let poller = Poller::new(source, config.poll_interval())?;
    let mut poller_handle = poller.start(feed.into_sink());

    // Create application state
    let state = Arc::new(AppState {
        history,
        fields: config.display.fields.clone(),
        poll_stats: poller.stats(),
    });

    // Build router (presentation layer)
    let router = Router::new()
        .route("/healthz", get(health_check))
        .route("/status", get(get_status))
        .route("/history", get(get_history))
        .route("/latest", get(get_latest))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start server
    let addr = config.server.bind;
    tracing::info!(%addr, capacity = config.history.capacity, "Starting telemetry dashboard");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    poller_handle.stop();
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutting down");
}
