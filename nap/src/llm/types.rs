//! Completion request/response types
//!
//! Modeled on the OpenAI chat-completions API, which both supported
//! providers implement.

use serde::{Deserialize, Serialize};
use tracing::debug;

/// A completion request - everything needed for one call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionRequest {
    /// Ordered role-tagged messages, system contract first
    pub messages: Vec<Message>,

    /// Max tokens for response (omitted from the wire when `None`)
    pub max_tokens: Option<u32>,
}

impl CompletionRequest {
    /// Build the usual two-message request: one system contract, one user payload
    pub fn new(system_prompt: impl Into<String>, user: impl Into<String>) -> Self {
        debug!("CompletionRequest::new: called");
        Self {
            messages: vec![Message::system(system_prompt), Message::user(user)],
            max_tokens: None,
        }
    }

    /// Set the response token cap
    pub fn with_max_tokens(mut self, max_tokens: Option<u32>) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// The system message content, if the request has one
    pub fn system_prompt(&self) -> Option<&str> {
        self.messages
            .iter()
            .find(|m| m.role == Role::System)
            .map(|m| m.content.as_str())
    }

    /// The last user message content
    pub fn user_content(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
    }
}

/// A message in the conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    /// Create a system message
    pub fn system(text: impl Into<String>) -> Self {
        debug!("Message::system: called");
        Self {
            role: Role::System,
            content: text.into(),
        }
    }

    /// Create a user message
    pub fn user(text: impl Into<String>) -> Self {
        debug!("Message::user: called");
        Self {
            role: Role::User,
            content: text.into(),
        }
    }
}

/// Message role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// Response from a completion request
#[derive(Debug, Clone, Default)]
pub struct CompletionResponse {
    /// Text content (if any)
    pub content: Option<String>,

    /// Why the model stopped
    pub stop_reason: StopReason,

    /// Token usage, logged for diagnostics
    pub usage: TokenUsage,
}

impl CompletionResponse {
    /// A plain text response, mostly useful for test doubles
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Default::default()
        }
    }

    /// Content with surrounding whitespace removed, `None` when blank
    pub fn non_empty_content(&self) -> Option<&str> {
        self.content.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }
}

/// Why the model stopped generating
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum StopReason {
    #[default]
    EndTurn,
    MaxTokens,
    ContentFilter,
}

impl StopReason {
    /// Parse from an OpenAI-style `finish_reason`
    pub fn from_finish_reason(s: Option<&str>) -> Self {
        debug!(?s, "StopReason::from_finish_reason: called");
        match s {
            Some("length") => StopReason::MaxTokens,
            Some("content_filter") => StopReason::ContentFilter,
            _ => StopReason::EndTurn,
        }
    }
}

/// Token usage as reported by the provider
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}
