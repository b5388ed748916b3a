//! Engine error types

use thiserror::Error;

use crate::llm::LlmError;

/// Message returned by every operation when no provider credential is set
pub const NOT_CONFIGURED: &str = "API Key not configured";

/// Errors surfaced by the three planning operations
#[derive(Debug, Error)]
pub enum EngineError {
    /// No provider credential, or a prompt template could not be loaded
    #[error("{0}")]
    Configuration(String),

    /// Transport, HTTP status or decoding failure of the remote call
    #[error(transparent)]
    Provider(#[from] LlmError),

    /// The completion was empty or no JSON value could be recovered from it
    #[error("{message}")]
    MalformedResponse {
        message: String,
        /// The text that failed to parse
        raw: Option<String>,
    },

    /// The compiled graph violated a structural rule
    #[error("Compiler returned invalid structure: Compiler error: {0}")]
    Validation(String),
}

impl EngineError {
    pub fn not_configured() -> Self {
        EngineError::Configuration(NOT_CONFIGURED.to_string())
    }

    pub fn malformed(message: impl Into<String>, raw: Option<String>) -> Self {
        EngineError::MalformedResponse {
            message: message.into(),
            raw,
        }
    }

    /// Short machine-readable kind, used in logs
    pub fn kind(&self) -> &'static str {
        match self {
            EngineError::Configuration(_) => "configuration",
            EngineError::Provider(_) => "provider",
            EngineError::MalformedResponse { .. } => "malformed-response",
            EngineError::Validation(_) => "validation",
        }
    }
}
