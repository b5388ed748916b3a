//! LlmClient trait definition

use async_trait::async_trait;

use super::{CompletionRequest, CompletionResponse, LlmError};

/// Stateless completion client - each call is independent
///
/// This is the single capability the planning operations need from a
/// provider: ordered role-tagged messages in, one text completion out.
/// Implementations issue exactly one outbound request per call.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Send a single completion request (blocking until complete)
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError>;

    /// Model identifier requests are routed to
    fn model(&self) -> &str;
}
