mod error;
mod extract;
mod routes;

use std::sync::Arc;

use anyhow::Result;
use swoon_core::config::SwoonConfig;
use swoon_core::storage::{self, Storage};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub struct AppState {
    pub storage: Storage,
    pub config: SwoonConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "swoon_web=info,swoon_core=info,tower_http=info".into()),
        )
        .init();

    let config = SwoonConfig::load(std::env::current_dir().ok().as_deref()).unwrap_or_else(|e| {
        tracing::warn!("failed to load config, using defaults: {e}");
        SwoonConfig::default_config()
    });

    let storage = storage::create_backend(&config)?;
    tracing::info!(storage = %storage.describe(), "storage ready");

    let addr = format!("{}:{}", config.web.host, config.web.port);
    let state = Arc::new(AppState { storage, config });

    let app = routes::router()
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    tracing::info!("swoon-web listening on http://{addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {e}");
        return;
    }
    tracing::info!("shutting down");
}
