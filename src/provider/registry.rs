//! Provider Registry
//!
//! Names the supported vendors and builds a provider for the selected one.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::AppConfig;
use crate::error::{Error, Result};

use super::{AnthropicProvider, GeminiProvider, MockProvider, OpenAiProvider, SharedProvider};

// ─────────────────────────────────────────────────────────────────
// Provider Kind
// ─────────────────────────────────────────────────────────────────

/// Supported provider kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// OpenAI chat completions
    OpenAi,
    /// Anthropic Claude
    Anthropic,
    /// Google Gemini
    Gemini,
    /// DeepSeek (OpenAI-compatible)
    DeepSeek,
    /// Local mock (for testing)
    Mock,
}

impl ProviderKind {
    /// Get all provider kinds
    pub fn all() -> &'static [ProviderKind] {
        &[
            ProviderKind::OpenAi,
            ProviderKind::Anthropic,
            ProviderKind::Gemini,
            ProviderKind::DeepSeek,
            ProviderKind::Mock,
        ]
    }

    /// Get the provider name
    pub fn name(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "openai",
            ProviderKind::Anthropic => "anthropic",
            ProviderKind::Gemini => "gemini",
            ProviderKind::DeepSeek => "deepseek",
            ProviderKind::Mock => "mock",
        }
    }

    /// Name shown to the user
    pub fn display_name(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "OpenAI GPT-4o",
            ProviderKind::Anthropic => "Claude (Anthropic)",
            ProviderKind::Gemini => "Google Gemini",
            ProviderKind::DeepSeek => "DeepSeek",
            ProviderKind::Mock => "Mock (offline)",
        }
    }

    /// Vendor environment variable consulted when no key is passed explicitly
    pub fn api_key_env(&self) -> Option<&'static str> {
        match self {
            ProviderKind::OpenAi => Some("OPENAI_API_KEY"),
            ProviderKind::Anthropic => Some("ANTHROPIC_API_KEY"),
            ProviderKind::Gemini => Some("GEMINI_API_KEY"),
            ProviderKind::DeepSeek => Some("DEEPSEEK_API_KEY"),
            ProviderKind::Mock => None,
        }
    }

    /// Whether calls need an API key
    pub fn requires_api_key(&self) -> bool {
        !matches!(self, ProviderKind::Mock)
    }
}

impl std::str::FromStr for ProviderKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "openai" | "gpt" | "gpt-4o" => Ok(ProviderKind::OpenAi),
            "anthropic" | "claude" => Ok(ProviderKind::Anthropic),
            "gemini" | "google" => Ok(ProviderKind::Gemini),
            "deepseek" => Ok(ProviderKind::DeepSeek),
            "mock" => Ok(ProviderKind::Mock),
            _ => Err(Error::UnknownProvider(s.to_string())),
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

// ─────────────────────────────────────────────────────────────────
// Provider Factory
// ─────────────────────────────────────────────────────────────────

/// Factory for creating providers
pub struct ProviderFactory;

impl ProviderFactory {
    /// Create a provider of the given kind.
    ///
    /// The key lives only inside the returned provider.
    pub fn create(kind: ProviderKind, config: &AppConfig, api_key: &str) -> Result<SharedProvider> {
        if kind.requires_api_key() && api_key.trim().is_empty() {
            return Err(Error::MissingApiKey {
                provider: kind.display_name().to_string(),
            });
        }

        let endpoint = || config.endpoint(kind).cloned().unwrap_or_default();

        match kind {
            ProviderKind::OpenAi => Ok(Arc::new(OpenAiProvider::new("openai", endpoint(), api_key)?)),
            ProviderKind::DeepSeek => Ok(Arc::new(OpenAiProvider::new("deepseek", endpoint(), api_key)?)),
            ProviderKind::Anthropic => Ok(Arc::new(AnthropicProvider::new(endpoint(), api_key)?)),
            ProviderKind::Gemini => Ok(Arc::new(GeminiProvider::new(endpoint(), api_key)?)),
            ProviderKind::Mock => Ok(Arc::new(MockProvider::new())),
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────
