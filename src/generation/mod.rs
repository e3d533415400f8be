//! Calls to the external generative AI service.
//!
//! [`GenerativeModel`] is the seam to the provider: text (optionally with an
//! image) in, text out, plus prompt-to-image. [`MemoryGenerator`] builds the
//! application operations on top of it. The provider is created once via
//! [`create_model`] from configuration.

pub mod extract;
pub mod gemini;
pub mod generator;
pub mod mock;
pub mod prompts;

use async_trait::async_trait;
use base64::Engine;
use std::sync::Arc;

pub use generator::{
    AnalysisTier, ImageAnalysis, MatchCandidate, MatchOutcome, MemoryGenerator,
    RandomObjectMemory,
};

const DEFAULT_MIME_TYPE: &str = "image/jpeg";

/// Failures talking to the generation service.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("request to generation service failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("generation service returned HTTP {status}: {body}")]
    Api { status: u16, body: String },

    #[error("generation service returned no content")]
    EmptyResponse,

    #[error("generation service returned no image data")]
    MissingImage,

    #[error("invalid image: {0}")]
    InvalidImage(String),

    #[error("generation service is not configured: {0}")]
    NotConfigured(String),
}

/// A base64 image payload with its MIME type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineImage {
    pub mime_type: String,
    /// Standard base64, no `data:` prefix.
    pub data: String,
}

impl InlineImage {
    /// Parse raw base64 or a `data:<mime>;base64,<payload>` URL as sent by browsers.
    /// The payload must decode as base64; the MIME type defaults to JPEG.
    pub fn parse(input: &str) -> Result<Self, GenerationError> {
        let trimmed = input.trim();
        let (mime_type, data) = match trimmed.strip_prefix("data:") {
            Some(rest) => {
                let (header, data) = rest.split_once(',').ok_or_else(|| {
                    GenerationError::InvalidImage("data URL has no payload".into())
                })?;
                let mime = header.strip_suffix(";base64").ok_or_else(|| {
                    GenerationError::InvalidImage("data URL is not base64-encoded".into())
                })?;
                (if mime.is_empty() { DEFAULT_MIME_TYPE } else { mime }, data)
            }
            None => (DEFAULT_MIME_TYPE, trimmed),
        };

        if data.is_empty() {
            return Err(GenerationError::InvalidImage("image payload is empty".into()));
        }
        base64::engine::general_purpose::STANDARD
            .decode(data)
            .map_err(|e| GenerationError::InvalidImage(format!("payload is not valid base64: {e}")))?;

        Ok(Self {
            mime_type: mime_type.to_string(),
            data: data.to_string(),
        })
    }
}

/// A text/image generation backend.
#[async_trait]
pub trait GenerativeModel: Send + Sync {
    /// Generate text for `prompt`, optionally grounded on an image.
    async fn generate_text(
        &self,
        prompt: &str,
        image: Option<&InlineImage>,
    ) -> Result<String, GenerationError>;

    /// Generate an image for `prompt`.
    async fn generate_image(&self, prompt: &str) -> Result<InlineImage, GenerationError>;

    /// Provider name for logs.
    fn name(&self) -> &str;
}

/// Create a generation backend from config.
///
/// `"gemini"` talks to the Gemini REST API; `"mock"` returns canned output
/// without network access.
pub fn create_model(
    config: &crate::config::GenerationConfig,
) -> anyhow::Result<Arc<dyn GenerativeModel>> {
    match config.provider.as_str() {
        "gemini" => {
            if config.api_key.is_empty() {
                tracing::warn!(
                    "{} is not set, generation requests will fail",
                    crate::config::ENV_API_KEY
                );
            }
            Ok(Arc::new(gemini::GeminiModel::new(config)?))
        }
        "mock" => Ok(Arc::new(mock::MockModel::new())),
        other => anyhow::bail!("unknown generation provider: {other}. Supported: gemini, mock"),
    }
}
