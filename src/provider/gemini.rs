//! Google Gemini generateContent provider

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::EndpointSettings;
use crate::conversation::Role;
use crate::error::{Error, Result};

use super::http::{build_client, join_url, parse_json, send_with_retry};
use super::{CompletionProvider, CompletionRequest};

// ─────────────────────────────────────────────────────────────────
// API Types
// ─────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(rename = "systemInstruction", skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiSystemInstruction>,
    #[serde(rename = "generationConfig")]
    generation_config: GeminiGenerationConfig,
}

#[derive(Debug, Serialize)]
struct GeminiSystemInstruction {
    parts: Vec<GeminiTextPart>,
}

#[derive(Debug, Serialize)]
struct GeminiContent {
    role: &'static str,
    parts: Vec<GeminiTextPart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiTextPart {
    text: String,
}

#[derive(Debug, Serialize)]
struct GeminiGenerationConfig {
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    candidates: Option<Vec<GeminiCandidate>>,
    error: Option<GeminiError>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContentResponse>,
}

#[derive(Debug, Deserialize)]
struct GeminiContentResponse {
    #[serde(default)]
    parts: Vec<GeminiPartResponse>,
}

#[derive(Debug, Deserialize)]
struct GeminiPartResponse {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiError {
    message: String,
}

impl GeminiResponse {
    fn into_text(self) -> std::result::Result<String, String> {
        if let Some(err) = self.error {
            return Err(err.message);
        }
        let text = self
            .candidates
            .unwrap_or_default()
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect::<String>())
            .unwrap_or_default();

        if text.trim().is_empty() {
            Err("Response contained no candidates (possibly blocked)".to_string())
        } else {
            Ok(text)
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Gemini Provider
// ─────────────────────────────────────────────────────────────────

/// Gemini via the generateContent endpoint
pub struct GeminiProvider {
    endpoint: EndpointSettings,
    api_key: String,
    client: reqwest::Client,
}

impl GeminiProvider {
    pub fn new(endpoint: EndpointSettings, api_key: impl Into<String>) -> Result<Self> {
        let client = build_client("gemini", &endpoint)?;

        info!(base_url = %endpoint.base_url, model = %endpoint.model, "Gemini provider created");

        Ok(Self {
            endpoint,
            api_key: api_key.into(),
            client,
        })
    }

    fn build_body(request: &CompletionRequest) -> GeminiRequest {
        let contents = request
            .alternating_messages()
            .into_iter()
            .map(|(role, text)| GeminiContent {
                role: match role {
                    Role::User => "user",
                    Role::Assistant => "model",
                },
                parts: vec![GeminiTextPart { text }],
            })
            .collect();

        GeminiRequest {
            contents,
            system_instruction: request.system_prompt.as_ref().map(|s| GeminiSystemInstruction {
                parts: vec![GeminiTextPart { text: s.clone() }],
            }),
            generation_config: GeminiGenerationConfig {
                max_output_tokens: request.max_tokens,
                temperature: request.temperature,
            },
        }
    }
}

#[async_trait]
impl CompletionProvider for GeminiProvider {
    fn name(&self) -> &'static str {
        "gemini"
    }

    fn model(&self) -> &str {
        &self.endpoint.model
    }

    async fn generate_completion(&self, request: CompletionRequest) -> Result<String> {
        let body = Self::build_body(&request);
        let url = join_url(
            &self.endpoint.base_url,
            &format!("models/{}:generateContent", self.endpoint.model),
        );

        // Key goes in a header so it never shows up in a logged URL
        let response = send_with_retry(self.name(), self.endpoint.max_retries, || {
            self.client
                .post(&url)
                .header("x-goog-api-key", &self.api_key)
                .json(&body)
        })
        .await?;

        let parsed: GeminiResponse = parse_json(self.name(), response).await?;
        parsed
            .into_text()
            .map_err(|message| Error::provider(self.name(), message))
    }
}
