//! Mock provider: deterministic responses for running without an API key.

use async_trait::async_trait;
use std::time::Duration;

use super::{GenerationError, GenerativeModel, InlineImage};

/// A 1x1 transparent PNG.
const PLACEHOLDER_PNG: &str =
    "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAQAAAC1HAwCAAAAC0lEQVR42mNkYAAAAAYAAjCB0C8AAAAASUVORK5CYII=";

#[derive(Debug, Clone)]
pub struct MockModel {
    latency: Duration,
}

impl MockModel {
    pub fn new() -> Self {
        Self {
            latency: Duration::from_millis(200),
        }
    }
}

impl Default for MockModel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GenerativeModel for MockModel {
    async fn generate_text(
        &self,
        prompt: &str,
        image: Option<&InlineImage>,
    ) -> Result<String, GenerationError> {
        tokio::time::sleep(self.latency).await;

        // Answer in whatever shape the prompt asks for.
        let reply = if prompt.contains("\"matchedId\"") {
            r#"{"matchedId": null, "confidence": 0, "reasoning": "(mock) no comparison performed"}"#
                .to_string()
        } else if prompt.contains("\"description\"") && prompt.contains("\"memory\"") {
            serde_json::json!({
                "description": "(mock) A well-loved object photographed on a kitchen counter.",
                "memory": "(mock) I remember using this every Sunday morning.",
            })
            .to_string()
        } else if image.is_some() {
            "(mock) A detailed description of the pictured object.".to_string()
        } else {
            "(mock) A short nostalgic memory about a kitchen object.".to_string()
        };
        Ok(reply)
    }

    async fn generate_image(&self, _prompt: &str) -> Result<InlineImage, GenerationError> {
        tokio::time::sleep(self.latency).await;
        Ok(InlineImage {
            mime_type: "image/png".into(),
            data: PLACEHOLDER_PNG.into(),
        })
    }

    fn name(&self) -> &str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::prompts;

    fn instant() -> MockModel {
        MockModel {
            latency: Duration::ZERO,
        }
    }

    #[tokio::test]
    async fn analysis_prompt_gets_json() {
        let image = InlineImage::parse(PLACEHOLDER_PNG).unwrap();
        let reply = instant()
            .generate_text(prompts::ANALYSIS_PROMPT, Some(&image))
            .await
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&reply).unwrap();
        assert!(value["description"].is_string());
        assert!(value["memory"].is_string());
    }

    #[tokio::test]
    async fn match_prompt_gets_no_match() {
        let reply = instant()
            .generate_text(&prompts::match_prompt("a mug", &[]), None)
            .await
            .unwrap();
        assert!(reply.contains("\"matchedId\": null"));
    }

    #[tokio::test]
    async fn image_is_valid_base64() {
        let image = instant().generate_image("a whisk").await.unwrap();
        assert!(InlineImage::parse(&image.data).is_ok());
    }
}
