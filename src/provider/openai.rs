//! OpenAI-compatible chat-completions provider
//!
//! Serves OpenAI itself and DeepSeek, which speaks the same wire format.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::EndpointSettings;
use crate::error::{Error, Result};

use super::http::{build_client, join_url, parse_json, send_with_retry};
use super::{CompletionProvider, CompletionRequest};

// ─────────────────────────────────────────────────────────────────
// OpenAI API types (request/response)
// ─────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    total_tokens: u32,
}

// ─────────────────────────────────────────────────────────────────
// OpenAI Provider
// ─────────────────────────────────────────────────────────────────

/// OpenAI-compatible chat-completions provider
pub struct OpenAiProvider {
    name: &'static str,
    endpoint: EndpointSettings,
    api_key: String,
    client: reqwest::Client,
}

impl OpenAiProvider {
    /// Create a provider reporting itself as `name` ("openai" or "deepseek")
    pub fn new(name: &'static str, endpoint: EndpointSettings, api_key: impl Into<String>) -> Result<Self> {
        let client = build_client(name, &endpoint)?;

        info!(
            provider = name,
            base_url = %endpoint.base_url,
            model = %endpoint.model,
            "OpenAI-compatible provider created"
        );

        Ok(Self {
            name,
            endpoint,
            api_key: api_key.into(),
            client,
        })
    }

    /// Build the authorization header value (if API key is set)
    fn auth_header(&self) -> Option<String> {
        if self.api_key.is_empty() {
            None
        } else {
            Some(format!("Bearer {}", self.api_key))
        }
    }

    fn build_body<'a>(&'a self, request: &'a CompletionRequest) -> ChatCompletionRequest<'a> {
        let mut messages = Vec::with_capacity(request.history.len() + 2);
        if let Some(ref system) = request.system_prompt {
            messages.push(ChatMessage {
                role: "system",
                content: system,
            });
        }
        for turn in &request.history {
            messages.push(ChatMessage {
                role: turn.role.as_str(),
                content: &turn.text,
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: &request.message,
        });

        ChatCompletionRequest {
            model: &self.endpoint.model,
            messages,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        }
    }
}

#[async_trait]
impl CompletionProvider for OpenAiProvider {
    fn name(&self) -> &'static str {
        self.name
    }

    fn model(&self) -> &str {
        &self.endpoint.model
    }

    async fn generate_completion(&self, request: CompletionRequest) -> Result<String> {
        let body = self.build_body(&request);
        let url = join_url(&self.endpoint.base_url, "chat/completions");
        let auth = self.auth_header();

        let response = send_with_retry(self.name, self.endpoint.max_retries, || {
            let mut req = self.client.post(&url).json(&body);
            if let Some(ref auth) = auth {
                req = req.header("Authorization", auth);
            }
            req
        })
        .await?;

        let parsed: ChatCompletionResponse = parse_json(self.name, response).await?;

        if let Some(usage) = parsed.usage {
            debug!(provider = self.name, total_tokens = usage.total_tokens, "Completion usage");
        }

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|text| !text.trim().is_empty())
            .ok_or_else(|| Error::provider(self.name, "No choices in API response"))
    }
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────
