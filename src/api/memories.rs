//! `/api/memories` handlers.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use super::{AppState, ApiError};
use crate::generation::InlineImage;
use crate::memory::types::{FieldUpdate, GuardedUpdate, MemoryPatch, NewObjectMemory, ObjectMemory};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateMemoryRequest {
    pub session_id: String,
    #[serde(default)]
    pub user_image_base64: Option<String>,
}

impl CreateMemoryRequest {
    fn validate(self) -> Result<NewObjectMemory, ApiError> {
        let session_id = self.session_id.trim();
        if session_id.is_empty() {
            return Err(ApiError::Validation(
                "Validation error: sessionId must not be empty".into(),
            ));
        }
        let user_image_base64 = match self.user_image_base64 {
            Some(image) if !image.trim().is_empty() => {
                Some(validate_image("userImageBase64", image)?)
            }
            _ => None,
        };
        Ok(NewObjectMemory {
            session_id: session_id.to_string(),
            user_image_base64,
        })
    }
}

/// Body of `PATCH /api/memories/{id}`: only the narrative is user-editable.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateMemoryRequest {
    #[serde(default)]
    pub object_memory: FieldUpdate<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ReplaceImageRequest {
    #[serde(default)]
    pub user_image_base64: Option<String>,
}

/// Check that an image field decodes; returns it unchanged for storage.
pub(super) fn validate_image(field: &str, image: String) -> Result<String, ApiError> {
    InlineImage::parse(&image)
        .map_err(|e| ApiError::Validation(format!("Validation error: {e} at \"{field}\"")))?;
    Ok(image)
}

/// GET /api/memories
pub async fn list_memories(
    State(state): State<AppState>,
) -> Result<Json<Vec<ObjectMemory>>, ApiError> {
    Ok(Json(state.store.list_all().await?))
}

/// POST /api/memories
pub async fn create_memory(
    State(state): State<AppState>,
    payload: Result<Json<CreateMemoryRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ObjectMemory>), ApiError> {
    let Json(request) = payload?;
    let input = request.validate()?;

    let memory = state.store.create(input).await?;
    tracing::info!(
        id = %memory.id,
        session = %memory.session_id,
        has_image = memory.user_image_base64.is_some(),
        "memory created"
    );
    Ok((StatusCode::CREATED, Json(memory)))
}

/// GET /api/memories/{id}
pub async fn get_memory(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ObjectMemory>, ApiError> {
    let memory = state.store.get(&id).await?.ok_or(ApiError::NotFound)?;
    Ok(Json(memory))
}

/// POST /api/memories/{id}/generate
///
/// Analyzes the user's photo when the record has one, otherwise invents a
/// random kitchen object. Runs for the full duration of the model calls.
/// The result is discarded with 409 if the photo was replaced meanwhile.
pub async fn generate_memory(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ObjectMemory>, ApiError> {
    let memory = state.store.get(&id).await?.ok_or(ApiError::NotFound)?;
    let source_image = memory.user_image_base64.clone();

    let patch = match memory
        .user_image_base64
        .as_deref()
        .filter(|image| !image.trim().is_empty())
    {
        Some(image) => {
            tracing::info!(id = %id, "analyzing user image");
            let image = InlineImage::parse(image)?;
            let analysis = state.generator.analyze_user_image(&image).await?;
            MemoryPatch {
                object_description: FieldUpdate::Set(analysis.description),
                object_memory: FieldUpdate::Set(analysis.memory),
                ..Default::default()
            }
        }
        None => {
            tracing::info!(id = %id, "generating random object memory");
            let generated = state.generator.generate_random_object_memory().await?;
            MemoryPatch {
                object_image_base64: FieldUpdate::Set(generated.object_image_base64),
                object_description: FieldUpdate::Set(generated.object_description),
                object_memory: FieldUpdate::Set(generated.object_memory),
                ..Default::default()
            }
        }
    };

    match state
        .store
        .update_if_image(&id, source_image.as_deref(), patch)
        .await?
    {
        GuardedUpdate::Applied(updated) => {
            tracing::info!(id = %id, "memory generated");
            Ok(Json(updated))
        }
        GuardedUpdate::Stale(_) => {
            tracing::warn!(id = %id, "photo replaced during generation, result discarded");
            Err(ApiError::Conflict(
                "Memory image changed during generation".into(),
            ))
        }
        GuardedUpdate::NotFound => Err(ApiError::NotFound),
    }
}

/// PATCH /api/memories/{id}
pub async fn update_memory(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateMemoryRequest>, JsonRejection>,
) -> Result<Json<ObjectMemory>, ApiError> {
    let Json(request) = payload?;
    let patch = MemoryPatch {
        object_memory: request.object_memory,
        ..Default::default()
    };
    if patch.is_empty() {
        tracing::debug!(id = %id, "empty patch, only lastUpdated changes");
    }

    let memory = state.store.update(&id, patch).await?.ok_or(ApiError::NotFound)?;
    tracing::info!(id = %id, "memory text updated");
    Ok(Json(memory))
}

/// PATCH /api/memories/{id}/image
///
/// Generated text described the old photo, so it is cleared along with any
/// illustration until the next generate call.
pub async fn replace_image(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<ReplaceImageRequest>, JsonRejection>,
) -> Result<Json<ObjectMemory>, ApiError> {
    let Json(request) = payload?;
    let image = request
        .user_image_base64
        .filter(|image| !image.trim().is_empty())
        .ok_or_else(|| ApiError::Validation("Validation error: userImageBase64 is required".into()))?;
    let image = validate_image("userImageBase64", image)?;

    let patch = MemoryPatch {
        user_image_base64: FieldUpdate::Set(image),
        object_image_base64: FieldUpdate::Clear,
        object_description: FieldUpdate::Clear,
        object_memory: FieldUpdate::Clear,
    };
    let memory = state.store.update(&id, patch).await?.ok_or(ApiError::NotFound)?;
    tracing::info!(id = %id, "user image replaced");
    Ok(Json(memory))
}
