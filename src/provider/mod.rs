//! LLM provider adapters
//!
//! One trait, one adapter per vendor wire format, and a factory keyed by
//! [`ProviderKind`].

mod anthropic;
mod gemini;
mod http;
mod mock;
mod openai;
mod registry;
mod traits;

pub use anthropic::AnthropicProvider;
pub use gemini::GeminiProvider;
pub use mock::{MockConfig, MockProvider};
pub use openai::OpenAiProvider;
pub use registry::*;
pub use traits::*;
