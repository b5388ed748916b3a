//! OpenAI-compatible chat-completions client
//!
//! Implements the LlmClient trait for any endpoint speaking the
//! `/chat/completions` dialect (OpenRouter and Groq both do).

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info};

use super::{CompletionRequest, CompletionResponse, LlmClient, LlmError, ProviderSelection, StopReason, TokenUsage};
use crate::config::LlmConfig;

/// OpenAI-compatible API client
pub struct OpenAIClient {
    model: String,
    api_key: String,
    base_url: String,
    headers: Vec<(String, String)>,
    http: Client,
    max_tokens: Option<u32>,
    timeout: Duration,
}

impl OpenAIClient {
    /// Create a new client for the selected provider
    pub fn from_selection(selection: &ProviderSelection, config: &LlmConfig) -> Result<Self, LlmError> {
        debug!(?selection, "from_selection: called");
        let timeout = Duration::from_millis(config.timeout_ms);

        let http = Client::builder().timeout(timeout).build().map_err(LlmError::Network)?;

        info!(provider = %selection.provider, model = %selection.model, "completion client initialized");

        Ok(Self {
            model: selection.model.clone(),
            api_key: selection.api_key.clone(),
            base_url: selection.base_url.trim_end_matches('/').to_string(),
            headers: selection.headers.clone(),
            http,
            max_tokens: config.max_tokens,
            timeout,
        })
    }

    /// Build the request body for the chat-completions API
    fn build_request_body(&self, request: &CompletionRequest) -> serde_json::Value {
        debug!(%self.model, message_count = %request.messages.len(), "build_request_body: called");

        let mut body = serde_json::json!({
            "model": self.model,
            "messages": request.messages,
        });

        // The tighter of the request and client caps wins
        let max_tokens = match (request.max_tokens, self.max_tokens) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        if let Some(max_tokens) = max_tokens {
            body["max_tokens"] = serde_json::json!(max_tokens);
        }

        body
    }

    /// Parse the chat-completions response
    fn parse_response(&self, api_response: ChatResponse) -> CompletionResponse {
        debug!(choice_count = %api_response.choices.len(), "parse_response: called");
        let choice = api_response.choices.into_iter().next();

        let (content, stop_reason) = match choice {
            Some(c) => (
                c.message.content,
                StopReason::from_finish_reason(c.finish_reason.as_deref()),
            ),
            None => (None, StopReason::EndTurn),
        };

        let usage = api_response
            .usage
            .map(|u| TokenUsage {
                input_tokens: u.prompt_tokens,
                output_tokens: u.completion_tokens,
            })
            .unwrap_or_default();

        CompletionResponse {
            content,
            stop_reason,
            usage,
        }
    }
}

#[async_trait]
impl LlmClient for OpenAIClient {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        debug!(%self.model, "complete: called");
        let url = format!("{}/chat/completions", self.base_url);
        let body = self.build_request_body(&request);

        let mut builder = self
            .http
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("content-type", "application/json");
        for (name, value) in &self.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::from_reqwest(e, self.timeout))?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            debug!(%status, "complete: API error");
            let text = response.text().await.unwrap_or_default();
            return Err(LlmError::ApiError { status, message: text });
        }

        let text = response
            .text()
            .await
            .map_err(|e| LlmError::from_reqwest(e, self.timeout))?;
        let api_response: ChatResponse = serde_json::from_str(&text)
            .map_err(|e| LlmError::InvalidResponse(format!("{}: {}", e, truncate(&text, 200))))?;

        let parsed = self.parse_response(api_response);
        debug!(
            input_tokens = parsed.usage.input_tokens,
            output_tokens = parsed.usage.output_tokens,
            stop_reason = ?parsed.stop_reason,
            "complete: success"
        );
        Ok(parsed)
    }

    fn model(&self) -> &str {
        &self.model
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

// Chat-completions response types

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
}
