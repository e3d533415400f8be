//! HTTP server startup.
//!
//! [`build_router`] wires the configured store and generation provider into the
//! API router; [`serve`] binds it and runs until ctrl-c.

use crate::api::{self, AppState};
use crate::config::KitchenConfig;
use crate::generation::{self, MemoryGenerator};
use crate::memory;
use anyhow::{Context, Result};
use axum::extract::DefaultBodyLimit;
use axum::Router;
use tower_http::trace::TraceLayer;

/// Shared setup: open the store, create the model, build the generator.
fn setup_state(config: &KitchenConfig) -> Result<AppState> {
    let store = memory::create_store(config)?;
    tracing::info!(backend = store.backend(), "record store ready");

    let model = generation::create_model(&config.generation)?;
    tracing::info!(provider = model.name(), "generation provider ready");

    let generator = MemoryGenerator::with_threshold(model, config.generation.match_threshold);
    Ok(AppState::new(store, generator))
}

/// Build the full application router with body limit and request tracing.
pub fn build_router(state: AppState, max_body_bytes: usize) -> Router {
    api::router(state)
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(TraceLayer::new_for_http())
}

/// Start the HTTP server and block until shutdown.
pub async fn serve(config: KitchenConfig) -> Result<()> {
    let bind_addr = config.bind_addr();
    tracing::info!(addr = %bind_addr, "starting kitchen memories server");

    let state = setup_state(&config)?;
    let router = build_router(state, config.server.max_body_bytes);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;
    tracing::info!(addr = %bind_addr, "listening on http://{bind_addr}/api");

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for ctrl-c");
                std::future::pending::<()>().await;
            }
            tracing::info!("shutting down server");
        })
        .await?;

    Ok(())
}
