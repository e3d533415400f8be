//! Gemini REST provider (`models/{model}:generateContent`).

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

use super::{GenerationError, GenerativeModel, InlineImage};
use crate::config::GenerationConfig;

#[derive(Debug, Clone)]
pub struct GeminiModel {
    client: Client,
    api_key: String,
    base_url: String,
    text_model: String,
    vision_model: String,
    image_model: String,
}

impl GeminiModel {
    pub fn new(config: &GenerationConfig) -> anyhow::Result<Self> {
        Ok(Self {
            client: Client::builder()
                .timeout(Duration::from_secs(config.timeout_secs))
                .build()?,
            api_key: config.api_key.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            text_model: config.text_model.clone(),
            vision_model: config.vision_model.clone(),
            image_model: config.image_model.clone(),
        })
    }

    async fn generate_content(
        &self,
        model: &str,
        request: &GenerateContentRequest<'_>,
    ) -> Result<GenerateContentResponse, GenerationError> {
        if self.api_key.is_empty() {
            return Err(GenerationError::NotConfigured(format!(
                "{} is not set",
                crate::config::ENV_API_KEY
            )));
        }

        let url = format!("{}/models/{}:generateContent", self.base_url, model);
        let started = Instant::now();
        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(model, status = status.as_u16(), "generation request rejected");
            return Err(GenerationError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GenerateContentResponse = response.json().await?;
        tracing::debug!(
            model,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "generation request completed"
        );
        Ok(parsed)
    }
}

#[async_trait]
impl GenerativeModel for GeminiModel {
    async fn generate_text(
        &self,
        prompt: &str,
        image: Option<&InlineImage>,
    ) -> Result<String, GenerationError> {
        let mut parts = vec![RequestPart::Text { text: prompt }];
        if let Some(image) = image {
            parts.push(RequestPart::InlineData {
                inline_data: RequestInlineData {
                    mime_type: &image.mime_type,
                    data: &image.data,
                },
            });
        }
        let request = GenerateContentRequest {
            contents: vec![Content { parts }],
            generation_config: None,
        };
        let model = if image.is_some() {
            &self.vision_model
        } else {
            &self.text_model
        };

        // Blocked or truncated candidates come back without parts. That is
        // still a reply; callers decide whether empty text is usable.
        let response = self.generate_content(model, &request).await?;
        let text = response.text();
        if text.is_empty() {
            tracing::warn!(
                model = %model,
                finish_reason = response.finish_reason().unwrap_or("none"),
                "generation returned no text"
            );
        }
        Ok(text)
    }

    async fn generate_image(&self, prompt: &str) -> Result<InlineImage, GenerationError> {
        let request = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![RequestPart::Text { text: prompt }],
            }],
            generation_config: Some(RequestGenerationConfig {
                response_modalities: vec!["TEXT", "IMAGE"],
            }),
        };

        self.generate_content(&self.image_model, &request)
            .await?
            .first_image()
            .ok_or(GenerationError::MissingImage)
    }

    fn name(&self) -> &str {
        "gemini"
    }
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<RequestGenerationConfig>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum RequestPart<'a> {
    Text {
        text: &'a str,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: RequestInlineData<'a>,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RequestInlineData<'a> {
    mime_type: &'a str,
    data: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RequestGenerationConfig {
    response_modalities: Vec<&'static str>,
}

#[derive(Debug, Default, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponsePart {
    text: Option<String>,
    inline_data: Option<ResponseInlineData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponseInlineData {
    mime_type: String,
    data: String,
}

impl GenerateContentResponse {
    fn parts(&self) -> impl Iterator<Item = &ResponsePart> {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .into_iter()
            .flat_map(|content| content.parts.iter())
    }

    fn finish_reason(&self) -> Option<&str> {
        self.candidates.first()?.finish_reason.as_deref()
    }

    /// Concatenated text parts of the first candidate, trimmed.
    fn text(&self) -> String {
        self.parts()
            .filter_map(|p| p.text.as_deref())
            .collect::<String>()
            .trim()
            .to_string()
    }

    fn first_image(&self) -> Option<InlineImage> {
        self.parts()
            .filter_map(|p| p.inline_data.as_ref())
            .find(|d| !d.data.is_empty())
            .map(|d| InlineImage {
                mime_type: d.mime_type.clone(),
                data: d.data.clone(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_serializes_to_gemini_shape() {
        let image = InlineImage {
            mime_type: "image/png".into(),
            data: "aGk=".into(),
        };
        let request = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![
                    RequestPart::Text { text: "describe" },
                    RequestPart::InlineData {
                        inline_data: RequestInlineData {
                            mime_type: &image.mime_type,
                            data: &image.data,
                        },
                    },
                ],
            }],
            generation_config: Some(RequestGenerationConfig {
                response_modalities: vec!["TEXT", "IMAGE"],
            }),
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["contents"][0]["parts"][0]["text"], "describe");
        assert_eq!(
            json["contents"][0]["parts"][1]["inlineData"]["mimeType"],
            "image/png"
        );
        assert_eq!(json["generationConfig"]["responseModalities"][1], "IMAGE");
    }

    #[test]
    fn response_text_joins_parts() {
        let response: GenerateContentResponse = serde_json::from_str(
            r#"{"candidates": [{"content": {"parts": [{"text": "Hello "}, {"text": "there\n"}]}}]}"#,
        )
        .unwrap();
        assert_eq!(response.text(), "Hello there");
        assert!(response.first_image().is_none());
    }

    #[test]
    fn response_image_is_extracted() {
        let response: GenerateContentResponse = serde_json::from_str(
            r#"{"candidates": [{"content": {"parts": [
                {"text": "Here is your whisk"},
                {"inlineData": {"mimeType": "image/png", "data": "aGk="}}
            ]}}]}"#,
        )
        .unwrap();
        let image = response.first_image().unwrap();
        assert_eq!(image.mime_type, "image/png");
        assert_eq!(image.data, "aGk=");
    }

    #[test]
    fn empty_response_has_no_text() {
        let response: GenerateContentResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(response.text(), "");
    }

    #[tokio::test]
    async fn missing_key_fails_before_network() {
        let model = GeminiModel::new(&GenerationConfig::default()).unwrap();
        let err = model.generate_text("hi", None).await.unwrap_err();
        assert!(matches!(err, GenerationError::NotConfigured(_)));
    }

    #[test]
    fn finish_reason_is_read() {
        let response: GenerateContentResponse = serde_json::from_str(
            r#"{"candidates": [{"content": {"parts": []}, "finishReason": "SAFETY"}]}"#,
        )
        .unwrap();
        assert_eq!(response.finish_reason(), Some("SAFETY"));
        assert_eq!(response.text(), "");
    }
}

/// `GeminiModel` against a local stand-in for the REST endpoint.
#[cfg(test)]
mod http_tests {
    use super::*;
    use crate::generation::prompts::{PLACEHOLDER_DESCRIPTION, PLACEHOLDER_MEMORY};
    use crate::generation::{AnalysisTier, MatchCandidate, MatchOutcome, MemoryGenerator};
    use axum::http::{header, HeaderMap, StatusCode};
    use axum::response::IntoResponse;
    use axum::Router;
    use std::sync::Arc;

    const API_KEY: &str = "test-key";
    const BLOCKED: &str =
        r#"{"candidates": [{"content": {"parts": []}, "finishReason": "SAFETY"}]}"#;

    /// Serve `body` with `status` for every path; requests without the API key get 401.
    async fn fake_gemini(status: StatusCode, body: &'static str) -> GeminiModel {
        let app = Router::new().fallback(move |headers: HeaderMap| async move {
            let key = headers.get("x-goog-api-key").and_then(|v| v.to_str().ok());
            if key != Some(API_KEY) {
                return StatusCode::UNAUTHORIZED.into_response();
            }
            (status, [(header::CONTENT_TYPE, "application/json")], body).into_response()
        });

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        GeminiModel::new(&GenerationConfig {
            api_key: API_KEY.into(),
            base_url: format!("http://{addr}"),
            timeout_secs: 5,
            ..Default::default()
        })
        .unwrap()
    }

    fn photo() -> InlineImage {
        InlineImage::parse("cGhvdG8=").unwrap()
    }

    #[tokio::test]
    async fn text_reply_is_returned_trimmed() {
        let model = fake_gemini(
            StatusCode::OK,
            r#"{"candidates": [{"content": {"parts": [{"text": " A tin whisk. "}]}}]}"#,
        )
        .await;
        let text = model.generate_text("describe", Some(&photo())).await.unwrap();
        assert_eq!(text, "A tin whisk.");
    }

    #[tokio::test]
    async fn error_status_maps_to_api_error() {
        let model = fake_gemini(
            StatusCode::SERVICE_UNAVAILABLE,
            r#"{"error": {"message": "overloaded"}}"#,
        )
        .await;
        let err = model.generate_text("hi", None).await.unwrap_err();
        match err {
            GenerationError::Api { status, body } => {
                assert_eq!(status, 503);
                assert!(body.contains("overloaded"));
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn undecodable_body_is_a_request_error() {
        let model = fake_gemini(StatusCode::OK, "<html>gateway</html>").await;
        let err = model.generate_text("hi", None).await.unwrap_err();
        assert!(matches!(err, GenerationError::Request(_)));
    }

    #[tokio::test]
    async fn image_reply_without_data_is_missing_image() {
        let model = fake_gemini(StatusCode::OK, r#"{"candidates": []}"#).await;
        let err = model.generate_image("a whisk").await.unwrap_err();
        assert!(matches!(err, GenerationError::MissingImage));
    }

    #[tokio::test]
    async fn blocked_candidate_is_empty_text_not_error() {
        let model = fake_gemini(StatusCode::OK, BLOCKED).await;
        let text = model.generate_text("hi", Some(&photo())).await.unwrap();
        assert_eq!(text, "");
    }

    #[tokio::test]
    async fn blocked_analysis_degrades_to_placeholders() {
        let generator = MemoryGenerator::new(Arc::new(fake_gemini(StatusCode::OK, BLOCKED).await));

        let analysis = generator.analyze_user_image(&photo()).await.unwrap();
        assert_eq!(analysis.tier, AnalysisTier::Placeholder);
        assert_eq!(analysis.description, PLACEHOLDER_DESCRIPTION);
        assert_eq!(analysis.memory, PLACEHOLDER_MEMORY);
    }

    #[tokio::test]
    async fn blocked_match_is_no_match() {
        let generator = MemoryGenerator::new(Arc::new(fake_gemini(StatusCode::OK, BLOCKED).await));
        let candidates = [MatchCandidate {
            id: "mug-1".into(),
            description: "A white mug".into(),
        }];

        let outcome = generator
            .find_matching_description("A white mug", &candidates)
            .await
            .unwrap();
        assert_eq!(outcome, MatchOutcome::NoMatch);
    }

    #[tokio::test]
    async fn blocked_matching_description_is_still_an_error() {
        let generator = MemoryGenerator::new(Arc::new(fake_gemini(StatusCode::OK, BLOCKED).await));
        let err = generator.describe_image_for_matching(&photo()).await.unwrap_err();
        assert!(matches!(err, GenerationError::EmptyResponse));
    }
}
