//! HTTP surface: JSON handlers over the record store and the generator.

mod error;
pub mod memories;
pub mod remember;

pub use error::ApiError;

use axum::extract::State;
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use serde::Serialize;
use std::sync::Arc;

use crate::generation::MemoryGenerator;
use crate::memory::store::MemoryStore;

/// Shared handles passed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn MemoryStore>,
    pub generator: Arc<MemoryGenerator>,
}

impl AppState {
    pub fn new(store: Arc<dyn MemoryStore>, generator: MemoryGenerator) -> Self {
        Self {
            store,
            generator: Arc::new(generator),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub backend: &'static str,
    pub records: usize,
}

async fn health(State(state): State<AppState>) -> Result<Json<HealthResponse>, ApiError> {
    let records = state.store.count().await?;
    Ok(Json(HealthResponse {
        status: "ok",
        backend: state.store.backend(),
        records,
    }))
}

/// Build the `/api` router. Layers (body limit, tracing) are added by the caller.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route(
            "/api/memories",
            get(memories::list_memories).post(memories::create_memory),
        )
        .route(
            "/api/memories/{id}",
            get(memories::get_memory).patch(memories::update_memory),
        )
        .route("/api/memories/{id}/generate", post(memories::generate_memory))
        .route("/api/memories/{id}/image", patch(memories::replace_image))
        .route("/api/remember/match", post(remember::match_memory))
        .with_state(state)
}
