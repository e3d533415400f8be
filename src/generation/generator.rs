//! The four application-level generation operations.
//!
//! [`MemoryGenerator`] is stateless apart from the model handle and the match
//! threshold; every operation is a fresh round of requests to the model.

use rand::seq::IndexedRandom;
use serde::Deserialize;
use std::sync::Arc;

use super::extract::{extract_string_field, parse_json, Extraction};
use super::prompts::{self, KITCHEN_OBJECTS, PLACEHOLDER_DESCRIPTION, PLACEHOLDER_MEMORY};
use super::{GenerationError, GenerativeModel, InlineImage};

/// Default minimum confidence (0-100) for accepting a match.
pub const DEFAULT_MATCH_THRESHOLD: f64 = 70.0;

/// Output of the random-object branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RandomObjectMemory {
    pub object: String,
    pub object_image_base64: String,
    pub object_description: String,
    pub object_memory: String,
}

/// How much of an analysis response was usable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisTier {
    /// The response was (or contained) the requested JSON object.
    Json,
    /// At least one field was pulled out of malformed output.
    Fields,
    /// Nothing usable; both fields are placeholders.
    Placeholder,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageAnalysis {
    pub description: String,
    pub memory: String,
    pub tier: AnalysisTier,
}

/// A stored record offered to the matcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchCandidate {
    pub id: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MatchOutcome {
    Matched {
        id: String,
        confidence: f64,
        reasoning: Option<String>,
    },
    NoMatch,
}

#[derive(Debug, Deserialize)]
struct AnalysisResponse {
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    memory: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MatchResponse {
    #[serde(default)]
    matched_id: Option<String>,
    #[serde(default)]
    confidence: f64,
    #[serde(default)]
    reasoning: Option<String>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Pick one catalog entry uniformly at random.
pub fn pick_kitchen_object() -> &'static str {
    KITCHEN_OBJECTS
        .choose(&mut rand::rng())
        .copied()
        .unwrap_or(KITCHEN_OBJECTS[0])
}

pub struct MemoryGenerator {
    model: Arc<dyn GenerativeModel>,
    match_threshold: f64,
}

impl MemoryGenerator {
    pub fn new(model: Arc<dyn GenerativeModel>) -> Self {
        Self::with_threshold(model, DEFAULT_MATCH_THRESHOLD)
    }

    pub fn with_threshold(model: Arc<dyn GenerativeModel>, match_threshold: f64) -> Self {
        Self {
            model,
            match_threshold,
        }
    }

    pub fn match_threshold(&self) -> f64 {
        self.match_threshold
    }

    /// Invent a memory about a random kitchen object: narrative, illustration,
    /// and a detailed description of that specific illustration.
    pub async fn generate_random_object_memory(
        &self,
    ) -> Result<RandomObjectMemory, GenerationError> {
        self.generate_object_memory(pick_kitchen_object()).await
    }

    /// The random branch for a chosen object. Any failed request, or an empty
    /// narrative or description, fails the whole call.
    pub async fn generate_object_memory(
        &self,
        object: &str,
    ) -> Result<RandomObjectMemory, GenerationError> {
        tracing::info!(object, model = self.model.name(), "generating object memory");

        let narrative_prompt = prompts::narrative_prompt(object);
        let illustration_prompt = prompts::illustration_prompt(object);
        let (narrative, illustration) = tokio::try_join!(
            self.model.generate_text(&narrative_prompt, None),
            self.model.generate_image(&illustration_prompt),
        )?;

        // Described from the generated image itself so later matching has
        // details of this particular item.
        let description = self
            .model
            .generate_text(
                &prompts::generated_image_description_prompt(object),
                Some(&illustration),
            )
            .await?;

        let (narrative, description) = (narrative.trim(), description.trim());
        if narrative.is_empty() || description.is_empty() {
            return Err(GenerationError::EmptyResponse);
        }

        Ok(RandomObjectMemory {
            object: object.to_string(),
            object_image_base64: illustration.data,
            object_description: description.to_string(),
            object_memory: narrative.to_string(),
        })
    }

    /// Describe a user photo and write a narrative for it.
    ///
    /// Only transport and API failures are errors. Malformed output degrades
    /// to field extraction, then to placeholder text.
    pub async fn analyze_user_image(
        &self,
        image: &InlineImage,
    ) -> Result<ImageAnalysis, GenerationError> {
        let raw = self
            .model
            .generate_text(prompts::ANALYSIS_PROMPT, Some(image))
            .await?;
        let analysis = interpret_analysis(&raw);
        tracing::info!(tier = ?analysis.tier, "user image analyzed");
        Ok(analysis)
    }

    /// Describe only the object in a photo, for matching against stored records.
    pub async fn describe_image_for_matching(
        &self,
        image: &InlineImage,
    ) -> Result<String, GenerationError> {
        let description = self
            .model
            .generate_text(prompts::MATCHING_DESCRIPTION_PROMPT, Some(image))
            .await?;
        let description = description.trim();
        if description.is_empty() {
            return Err(GenerationError::EmptyResponse);
        }
        Ok(description.to_string())
    }

    /// Ask the model which candidate, if any, is the same object as `new_description`.
    ///
    /// No candidates means no request. Unparseable output, unknown ids and
    /// confidence below the threshold are all `NoMatch`.
    pub async fn find_matching_description(
        &self,
        new_description: &str,
        candidates: &[MatchCandidate],
    ) -> Result<MatchOutcome, GenerationError> {
        if candidates.is_empty() {
            tracing::debug!("no stored descriptions to match against");
            return Ok(MatchOutcome::NoMatch);
        }

        let raw = self
            .model
            .generate_text(&prompts::match_prompt(new_description, candidates), None)
            .await?;
        let outcome = self.interpret_match(&raw, candidates);
        tracing::info!(
            candidates = candidates.len(),
            matched = matches!(outcome, MatchOutcome::Matched { .. }),
            "match evaluated"
        );
        Ok(outcome)
    }

    fn interpret_match(&self, raw: &str, candidates: &[MatchCandidate]) -> MatchOutcome {
        let Some(response) = parse_json::<MatchResponse>(raw).value() else {
            tracing::warn!("match response was not JSON, treating as no match");
            return MatchOutcome::NoMatch;
        };
        let Some(matched_id) = non_blank(response.matched_id) else {
            return MatchOutcome::NoMatch;
        };
        if !candidates.iter().any(|c| c.id == matched_id) {
            tracing::warn!(id = %matched_id, "match named an unknown candidate");
            return MatchOutcome::NoMatch;
        }
        if response.confidence < self.match_threshold {
            tracing::debug!(
                confidence = response.confidence,
                threshold = self.match_threshold,
                "match confidence below threshold"
            );
            return MatchOutcome::NoMatch;
        }
        MatchOutcome::Matched {
            id: matched_id,
            confidence: response.confidence,
            reasoning: non_blank(response.reasoning),
        }
    }
}

/// Turn raw analysis output into description + narrative, never failing.
pub fn interpret_analysis(raw: &str) -> ImageAnalysis {
    let (description, memory, from_json) = match parse_json::<AnalysisResponse>(raw) {
        Extraction::Parsed(r) | Extraction::Recovered(r) => {
            (non_blank(r.description), non_blank(r.memory), true)
        }
        Extraction::Unparsed(text) => (
            extract_string_field(&text, "description"),
            extract_string_field(&text, "memory"),
            false,
        ),
    };

    let tier = match (&description, &memory) {
        (None, None) => AnalysisTier::Placeholder,
        (Some(_), Some(_)) if from_json => AnalysisTier::Json,
        _ => AnalysisTier::Fields,
    };

    ImageAnalysis {
        description: description.unwrap_or_else(|| PLACEHOLDER_DESCRIPTION.to_string()),
        memory: memory.unwrap_or_else(|| PLACEHOLDER_MEMORY.to_string()),
        tier,
    }
}
