//! Mock provider for testing
//!
//! Answers locally without any network access. Used by unit tests through
//! its scripting hooks and selectable on the command line as `--provider mock`.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::VecDeque;

use crate::error::{Error, Result};

use super::{CompletionProvider, CompletionRequest};

// ─────────────────────────────────────────────────────────────────
// Mock Provider Configuration
// ─────────────────────────────────────────────────────────────────

/// Configuration for mock provider behavior
#[derive(Debug, Clone, Default)]
pub struct MockConfig {
    /// Fail every call with this message
    pub fail_with: Option<String>,

    /// Fixed response text (for deterministic testing)
    pub fixed_response: Option<String>,
}

// ─────────────────────────────────────────────────────────────────
// Mock Provider
// ─────────────────────────────────────────────────────────────────

/// Mock implementation of CompletionProvider for testing
pub struct MockProvider {
    config: MockConfig,
    scripted: RwLock<VecDeque<std::result::Result<String, String>>>,
    requests: RwLock<Vec<CompletionRequest>>,
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MockProvider {
    /// Create a new mock provider with default configuration
    pub fn new() -> Self {
        Self::with_config(MockConfig::default())
    }

    /// Create a new mock provider with custom configuration
    pub fn with_config(config: MockConfig) -> Self {
        Self {
            config,
            scripted: RwLock::new(VecDeque::new()),
            requests: RwLock::new(Vec::new()),
        }
    }

    /// Queue a reply for the next call
    pub fn push_response(&self, text: impl Into<String>) {
        self.scripted.write().push_back(Ok(text.into()));
    }

    /// Queue a failure for the next call
    pub fn push_failure(&self, message: impl Into<String>) {
        self.scripted.write().push_back(Err(message.into()));
    }

    /// Number of completed or failed calls
    pub fn call_count(&self) -> usize {
        self.requests.read().len()
    }

    /// Every request received, oldest first
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.read().clone()
    }

    /// The most recent request
    pub fn last_request(&self) -> Option<CompletionRequest> {
        self.requests.read().last().cloned()
    }

    /// Generate mock response text
    fn generate_response(&self, request: &CompletionRequest) -> String {
        if let Some(ref fixed) = self.config.fixed_response {
            return fixed.clone();
        }

        match request.system_prompt {
            // Introduction requests carry no system prompt
            None => "This is Sam, a mock persona who answers without contacting any provider.".to_string(),
            Some(_) => format!("[nods] You said: {}", request.message),
        }
    }
}

#[async_trait]
impl CompletionProvider for MockProvider {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn model(&self) -> &str {
        "mock"
    }

    async fn generate_completion(&self, request: CompletionRequest) -> Result<String> {
        let scripted = self.scripted.write().pop_front();
        let outcome = match scripted {
            Some(outcome) => outcome,
            None => match self.config.fail_with {
                Some(ref message) => Err(message.clone()),
                None => Ok(self.generate_response(&request)),
            },
        };

        self.requests.write().push(request);
        outcome.map_err(|message| Error::provider(self.name(), message))
    }
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────
