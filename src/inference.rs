//! Gemini multimodal inference.
//!
//! The pipeline only sees [`InferenceBackend`]. Which variant is used (plain or
//! search-grounded) is decided once at startup by [`backend_for`].

use base64::{engine::general_purpose::STANDARD, Engine};
use log::info;
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;

use crate::config::{Credentials, ModelConfig};
use crate::constants::inference::ENDPOINT_BASE;

#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Image bytes plus the MIME type sent alongside them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePayload {
    pub mime_type: &'static str,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SafetyRating {
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub probability: String,
}

/// What the model sent back, reduced to the shapes the pipeline cares about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelReply {
    Text(String),
    Blocked {
        reason: String,
        ratings: Vec<SafetyRating>,
    },
    /// No usable parts and no block reason
    NoContent,
}

pub trait InferenceBackend: Send + Sync {
    fn name(&self) -> &'static str;

    fn generate(&self, prompt: &str, image: &ImagePayload) -> Result<ModelReply, InferenceError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeminiVariant {
    Plain,
    /// Adds the google_search grounding tool to every request
    SearchGrounded,
}

pub struct GeminiClient {
    http: reqwest::blocking::Client,
    api_key: String,
    model: String,
    variant: GeminiVariant,
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>, variant: GeminiVariant) -> Self {
        Self {
            http: reqwest::blocking::Client::new(),
            api_key: api_key.into(),
            model: model.into(),
            variant,
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/{}:generateContent", ENDPOINT_BASE, self.model)
    }

    pub fn request_body(&self, prompt: &str, image: &ImagePayload) -> Value {
        let mut body = json!({
            "contents": [{
                "role": "user",
                "parts": [
                    { "text": prompt },
                    {
                        "inline_data": {
                            "mime_type": image.mime_type,
                            "data": STANDARD.encode(&image.bytes),
                        }
                    }
                ]
            }]
        });

        if self.variant == GeminiVariant::SearchGrounded {
            body["tools"] = json!([{ "google_search": {} }]);
        }
        body
    }
}

impl InferenceBackend for GeminiClient {
    fn name(&self) -> &'static str {
        match self.variant {
            GeminiVariant::Plain => "gemini",
            GeminiVariant::SearchGrounded => "gemini+search",
        }
    }

    fn generate(&self, prompt: &str, image: &ImagePayload) -> Result<ModelReply, InferenceError> {
        let response = self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&self.request_body(prompt, image))
            .send()?;

        let status = response.status();
        let body = response.text()?;
        if !status.is_success() {
            return Err(InferenceError::Status {
                status: status.as_u16(),
                body,
            });
        }

        parse_reply(&body)
    }
}

/// Pick the backend variant once, from configuration.
pub fn backend_for(credentials: &Credentials, model: &ModelConfig) -> Box<dyn InferenceBackend> {
    let variant = if model.search_grounding {
        GeminiVariant::SearchGrounded
    } else {
        GeminiVariant::Plain
    };
    info!("Inference backend: {} ({:?})", model.name, variant);
    Box::new(GeminiClient::new(credentials.api_key.clone(), model.name.clone(), variant))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    finish_reason: Option<String>,
    #[serde(default)]
    safety_ratings: Vec<SafetyRating>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
    #[serde(default)]
    safety_ratings: Vec<SafetyRating>,
}

/// Decode a `generateContent` response body.
pub fn parse_reply(body: &str) -> Result<ModelReply, InferenceError> {
    let response: GenerateContentResponse = serde_json::from_str(body)?;
    Ok(classify(response))
}

fn classify(response: GenerateContentResponse) -> ModelReply {
    if let Some(reason) = response
        .prompt_feedback
        .as_ref()
        .and_then(|feedback| feedback.block_reason.clone())
    {
        let ratings = response
            .prompt_feedback
            .map(|feedback| feedback.safety_ratings)
            .unwrap_or_default();
        return ModelReply::Blocked { reason, ratings };
    }

    let Some(candidate) = response.candidates.into_iter().next() else {
        return ModelReply::NoContent;
    };

    let text: Option<String> = candidate.content.and_then(|content| {
        let texts: Vec<String> = content.parts.into_iter().filter_map(|p| p.text).collect();
        (!texts.is_empty()).then(|| texts.concat())
    });

    match (text, candidate.finish_reason.as_deref()) {
        (Some(text), _) => ModelReply::Text(text),
        (None, Some(reason @ ("SAFETY" | "PROHIBITED_CONTENT" | "BLOCKLIST" | "SPII"))) => {
            ModelReply::Blocked {
                reason: reason.to_string(),
                ratings: candidate.safety_ratings,
            }
        }
        (None, _) => ModelReply::NoContent,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png() -> ImagePayload {
        ImagePayload { mime_type: "image/png", bytes: vec![1, 2, 3] }
    }

    #[test]
    fn test_text_reply() {
        let body = r#"{
            "candidates": [{
                "content": { "role": "model", "parts": [{ "text": " AC\n" }] },
                "finishReason": "STOP"
            }]
        }"#;
        assert_eq!(parse_reply(body).unwrap(), ModelReply::Text(" AC\n".to_string()));
    }

    #[test]
    fn test_multiple_text_parts_are_joined() {
        let body = r##"{"candidates":[{"content":{"parts":[{"text":"#A"},{"text":"D#"}]}}]}"##;
        assert_eq!(parse_reply(body).unwrap(), ModelReply::Text("#AD#".to_string()));
    }

    #[test]
    fn test_prompt_block() {
        let body = r#"{
            "promptFeedback": {
                "blockReason": "SAFETY",
                "safetyRatings": [
                    { "category": "HARM_CATEGORY_DANGEROUS_CONTENT", "probability": "HIGH" }
                ]
            }
        }"#;
        match parse_reply(body).unwrap() {
            ModelReply::Blocked { reason, ratings } => {
                assert_eq!(reason, "SAFETY");
                assert_eq!(ratings.len(), 1);
                assert_eq!(ratings[0].probability, "HIGH");
            }
            other => panic!("Expected Blocked, got {:?}", other),
        }
    }

    #[test]
    fn test_candidate_finished_for_safety() {
        let body = r#"{"candidates":[{"finishReason":"SAFETY","safetyRatings":[]}]}"#;
        assert!(matches!(parse_reply(body).unwrap(), ModelReply::Blocked { .. }));
    }

    #[test]
    fn test_empty_reply() {
        assert_eq!(parse_reply("{}").unwrap(), ModelReply::NoContent);
        let body = r#"{"candidates":[{"content":{"parts":[]},"finishReason":"STOP"}]}"#;
        assert_eq!(parse_reply(body).unwrap(), ModelReply::NoContent);
    }

    #[test]
    fn test_malformed_body() {
        assert!(matches!(parse_reply("not json"), Err(InferenceError::Decode(_))));
    }

    #[test]
    fn test_request_body_parts_order() {
        let client = GeminiClient::new("key", "gemini-2.5-flash", GeminiVariant::Plain);
        let body = client.request_body("PROMPT", &png());

        let parts = &body["contents"][0]["parts"];
        assert_eq!(parts[0]["text"], "PROMPT");
        assert_eq!(parts[1]["inline_data"]["mime_type"], "image/png");
        assert_eq!(parts[1]["inline_data"]["data"], "AQID");
        assert!(body.get("tools").is_none());
    }

    #[test]
    fn test_grounded_request_adds_search_tool() {
        let client = GeminiClient::new("key", "gemini-2.5-flash", GeminiVariant::SearchGrounded);
        let body = client.request_body("PROMPT", &png());
        assert!(body["tools"][0].get("google_search").is_some());
        assert_eq!(client.name(), "gemini+search");
    }

    #[test]
    fn test_endpoint_uses_model() {
        let client = GeminiClient::new("key", "gemini-2.5-pro", GeminiVariant::Plain);
        assert!(client.endpoint().ends_with("/gemini-2.5-pro:generateContent"));
    }
}
