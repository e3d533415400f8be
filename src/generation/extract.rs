//! Best-effort JSON recovery from free-form model output.
//!
//! Models are asked for bare JSON but often wrap it in prose or code fences.
//! [`parse_json`] returns a tagged [`Extraction`] instead of failing, and
//! [`extract_string_field`] pulls single fields out of text that is not JSON
//! at all.

use regex::Regex;
use serde::de::DeserializeOwned;

/// Outcome of parsing model output as `T`.
#[derive(Debug, Clone, PartialEq)]
pub enum Extraction<T> {
    /// The whole response was valid JSON.
    Parsed(T),
    /// JSON was found inside surrounding text.
    Recovered(T),
    /// No usable JSON; the raw text is kept for field-level extraction.
    Unparsed(String),
}

impl<T> Extraction<T> {
    pub fn value(self) -> Option<T> {
        match self {
            Extraction::Parsed(v) | Extraction::Recovered(v) => Some(v),
            Extraction::Unparsed(_) => None,
        }
    }
}

/// Strip a surrounding markdown code fence (```json ... ```), if present.
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Skip the language tag line
    let body = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest,
    };
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

/// Return the first balanced `{...}` block in `text`. Braces inside JSON
/// strings are ignored.
pub fn first_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in text[start..].char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + i + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Strict parse first, then the first balanced object, then give up.
pub fn parse_json<T: DeserializeOwned>(text: &str) -> Extraction<T> {
    let body = strip_code_fence(text);
    if let Ok(value) = serde_json::from_str::<T>(body) {
        return Extraction::Parsed(value);
    }
    if let Some(value) = first_json_object(body).and_then(|obj| serde_json::from_str::<T>(obj).ok())
    {
        return Extraction::Recovered(value);
    }
    tracing::debug!(len = text.len(), "no JSON object in model output");
    Extraction::Unparsed(text.to_string())
}

/// Pull a `"field": "value"` string out of text that failed JSON parsing.
/// Escapes in the value are decoded; blank values count as missing.
pub fn extract_string_field(text: &str, field: &str) -> Option<String> {
    let pattern = format!(r#""{}"\s*:\s*"((?:[^"\\]|\\.)*)""#, regex::escape(field));
    let re = Regex::new(&pattern).ok()?;
    let raw = re.captures(text)?.get(1)?.as_str();

    let value = serde_json::from_str::<String>(&format!("\"{raw}\""))
        .unwrap_or_else(|_| raw.to_string());
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}
