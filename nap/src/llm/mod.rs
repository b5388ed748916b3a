//! Completion provider layer
//!
//! One capability (`LlmClient::complete`) with one concrete client for
//! OpenAI-compatible endpoints, plus the provider selection that binds it to
//! OpenRouter or Groq.

use std::sync::Arc;

use tracing::debug;

pub mod client;
mod error;
mod openai;
mod provider;
mod types;

pub use client::LlmClient;
pub use error::LlmError;
pub use openai::OpenAIClient;
pub use provider::{Provider, ProviderSelection, select_provider};
pub use types::{CompletionRequest, CompletionResponse, Message, Role, StopReason, TokenUsage};

use crate::config::LlmConfig;

/// Create a completion client for the selected provider
pub fn create_client(selection: &ProviderSelection, config: &LlmConfig) -> Result<Arc<dyn LlmClient>, LlmError> {
    debug!(provider = %selection.provider, model = %selection.model, "create_client: called");
    Ok(Arc::new(OpenAIClient::from_selection(selection, config)?))
}
