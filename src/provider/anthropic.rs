//! Anthropic Messages API provider

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::EndpointSettings;
use crate::error::{Error, Result};

use super::http::{build_client, join_url, parse_json, send_with_retry};
use super::{CompletionProvider, CompletionRequest};

const ANTHROPIC_VERSION: &str = "2023-06-01";

// ─────────────────────────────────────────────────────────────────
// Messages API types
// ─────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize)]
struct Message {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

impl MessagesResponse {
    /// Concatenated text blocks; other block types are skipped
    fn into_text(self) -> std::result::Result<String, String> {
        let text = self
            .content
            .into_iter()
            .filter(|block| block.kind == "text")
            .filter_map(|block| block.text)
            .collect::<String>();

        if text.trim().is_empty() {
            Err("Response contained no text".to_string())
        } else {
            Ok(text)
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Anthropic Provider
// ─────────────────────────────────────────────────────────────────

/// Claude via the Messages API
pub struct AnthropicProvider {
    endpoint: EndpointSettings,
    api_key: String,
    client: reqwest::Client,
}

impl AnthropicProvider {
    pub fn new(endpoint: EndpointSettings, api_key: impl Into<String>) -> Result<Self> {
        let client = build_client("anthropic", &endpoint)?;

        info!(base_url = %endpoint.base_url, model = %endpoint.model, "Anthropic provider created");

        Ok(Self {
            endpoint,
            api_key: api_key.into(),
            client,
        })
    }

    fn build_body<'a>(&'a self, request: &'a CompletionRequest) -> MessagesRequest<'a> {
        let messages = request
            .alternating_messages()
            .into_iter()
            .map(|(role, content)| Message {
                role: role.as_str(),
                content,
            })
            .collect();

        MessagesRequest {
            model: &self.endpoint.model,
            max_tokens: request.max_tokens,
            system: request.system_prompt.as_deref(),
            messages,
            temperature: request.temperature,
        }
    }
}

#[async_trait]
impl CompletionProvider for AnthropicProvider {
    fn name(&self) -> &'static str {
        "anthropic"
    }

    fn model(&self) -> &str {
        &self.endpoint.model
    }

    async fn generate_completion(&self, request: CompletionRequest) -> Result<String> {
        let body = self.build_body(&request);
        let url = join_url(&self.endpoint.base_url, "messages");

        let response = send_with_retry(self.name(), self.endpoint.max_retries, || {
            self.client
                .post(&url)
                .header("x-api-key", &self.api_key)
                .header("anthropic-version", ANTHROPIC_VERSION)
                .json(&body)
        })
        .await?;

        let parsed: MessagesResponse = parse_json(self.name(), response).await?;
        parsed
            .into_text()
            .map_err(|message| Error::provider(self.name(), message))
    }
}
