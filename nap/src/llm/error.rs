//! LLM error types

use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during a completion call
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("API error {status}: {message}")]
    ApiError { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl LlmError {
    /// Map a reqwest failure, singling out client-side timeouts
    pub fn from_reqwest(err: reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            LlmError::Timeout(timeout)
        } else {
            LlmError::Network(err)
        }
    }

    /// HTTP status of the failed call, when the provider answered at all
    pub fn status(&self) -> Option<u16> {
        match self {
            LlmError::ApiError { status, .. } => Some(*status),
            LlmError::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_display() {
        let err = LlmError::ApiError {
            status: 401,
            message: "No auth credentials found".to_string(),
        };
        assert_eq!(err.to_string(), "API error 401: No auth credentials found");
        assert_eq!(err.status(), Some(401));
    }

    #[test]
    fn test_timeout_display() {
        let err = LlmError::Timeout(Duration::from_secs(30));
        assert_eq!(err.to_string(), "Timeout after 30s");
        assert_eq!(err.status(), None);
    }

    #[test]
    fn test_json_error_converts() {
        let parse = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: LlmError = parse.into();
        assert!(matches!(err, LlmError::Json(_)));
    }
}
