//! Provider trait definitions
//!
//! Defines the CompletionProvider trait every LLM vendor adapter implements.

use async_trait::async_trait;
use std::sync::Arc;

use crate::conversation::{ConversationTurn, Role};
use crate::error::Result;

// ─────────────────────────────────────────────────────────────────
// Completion Request
// ─────────────────────────────────────────────────────────────────

/// One request to a completion provider.
///
/// `history` holds the prior turns only; `message` is the new user message
/// and is always sent last.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    /// Roleplay instructions, sent the vendor's way for system text
    pub system_prompt: Option<String>,

    /// Prior turns, oldest first
    pub history: Vec<ConversationTurn>,

    /// The new user message
    pub message: String,

    /// Output token ceiling
    pub max_tokens: u32,

    /// Sampling temperature (vendor default if None)
    pub temperature: Option<f32>,
}

impl CompletionRequest {
    /// A single-shot prompt with no system text or history.
    pub fn single(message: impl Into<String>, max_tokens: u32, temperature: f32) -> Self {
        Self {
            system_prompt: None,
            history: Vec::new(),
            message: message.into(),
            max_tokens,
            temperature: Some(temperature),
        }
    }

    /// A conversation turn: system prompt, windowed history and the new message.
    pub fn conversation(
        system_prompt: impl Into<String>,
        history: &[ConversationTurn],
        message: impl Into<String>,
        max_tokens: u32,
        temperature: Option<f32>,
    ) -> Self {
        Self {
            system_prompt: Some(system_prompt.into()),
            history: history.to_vec(),
            message: message.into(),
            max_tokens,
            temperature,
        }
    }

    /// History plus the new message, shaped for APIs that require the
    /// first message to come from the user and roles to alternate.
    ///
    /// Leading assistant turns are dropped and consecutive turns from the
    /// same role are joined with a blank line.
    pub fn alternating_messages(&self) -> Vec<(Role, String)> {
        let mut out: Vec<(Role, String)> = Vec::with_capacity(self.history.len() + 1);
        let turns = self
            .history
            .iter()
            .map(|t| (t.role, t.text.as_str()))
            .chain(std::iter::once((Role::User, self.message.as_str())))
            .skip_while(|(role, _)| *role == Role::Assistant);

        for (role, text) in turns {
            match out.last_mut() {
                Some((last_role, last_text)) if *last_role == role => {
                    last_text.push_str("\n\n");
                    last_text.push_str(text);
                }
                _ => out.push((role, text.to_string())),
            }
        }
        out
    }
}

// ─────────────────────────────────────────────────────────────────
// CompletionProvider Trait
// ─────────────────────────────────────────────────────────────────

/// A hosted LLM that turns a request into reply text.
///
/// Implementations own their HTTP client and credentials; a failure of any
/// kind is reported as an error, never as reply text.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Provider name (e.g., "openai", "anthropic")
    fn name(&self) -> &'static str;

    /// Model identifier requests are sent to
    fn model(&self) -> &str;

    /// Generate a reply for the request
    async fn generate_completion(&self, request: CompletionRequest) -> Result<String>;
}

/// Type alias for a shared provider reference
pub type SharedProvider = Arc<dyn CompletionProvider>;
