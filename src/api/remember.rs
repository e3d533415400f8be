//! `/api/remember`: recognise a previously saved object from a new photo.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use super::{AppState, ApiError};
use crate::generation::{InlineImage, MatchCandidate, MatchOutcome};
use crate::memory::types::ObjectMemory;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct MatchRequest {
    #[serde(default)]
    pub image_base64: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchResponse {
    pub found: bool,
    /// Description of the new photo.
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_memory: Option<ObjectMemory>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

/// POST /api/remember/match. Reads the store, never writes it.
pub async fn match_memory(
    State(state): State<AppState>,
    payload: Result<Json<MatchRequest>, JsonRejection>,
) -> Result<Json<MatchResponse>, ApiError> {
    let Json(request) = payload?;
    let raw = request
        .image_base64
        .filter(|image| !image.trim().is_empty())
        .ok_or_else(|| ApiError::Validation("Validation error: imageBase64 is required".into()))?;
    let image = InlineImage::parse(&raw)
        .map_err(|e| ApiError::Validation(format!("Validation error: {e} at \"imageBase64\"")))?;

    let description = state.generator.describe_image_for_matching(&image).await?;

    let memories = state.store.list_all().await?;
    let candidates: Vec<MatchCandidate> = memories
        .iter()
        .filter_map(|m| {
            m.match_description().map(|d| MatchCandidate {
                id: m.id.clone(),
                description: d.to_string(),
            })
        })
        .collect();
    tracing::info!(candidates = candidates.len(), "matching photo against stored memories");

    let outcome = state
        .generator
        .find_matching_description(&description, &candidates)
        .await?;

    let response = match outcome {
        MatchOutcome::Matched { id, confidence, .. } => {
            let matched = memories.into_iter().find(|m| m.id == id);
            MatchResponse {
                found: matched.is_some(),
                description,
                confidence: matched.as_ref().map(|_| confidence),
                matched_memory: matched,
            }
        }
        MatchOutcome::NoMatch => MatchResponse {
            found: false,
            description,
            matched_memory: None,
            confidence: None,
        },
    };
    Ok(Json(response))
}
