use anyhow::Context;
use clap::Parser;
use config::ServerConfig;
use game_manager::AppState;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

mod config;
mod error;
mod game_manager;
mod routes;
mod ws;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,server=debug,tower_http=info")),
        )
        .init();

    let config = ServerConfig::parse();
    let addr = config.socket_addr().context("invalid bind address")?;

    let state = Arc::new(AppState::new(config.session_settings()));
    let sweeper = Arc::clone(&state).spawn_sweeper();

    let app = routes::app(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {addr}"))?;
    tracing::info!("Tic-tac-toe server listening on {}", addr);
    tracing::info!("Health check available at http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    sweeper.abort();
    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "Failed to listen for shutdown signal");
    }
}
