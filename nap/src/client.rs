//! HTTP client for a running `nap serve`
//!
//! Lets the orchestrator run against a remote engine instead of an
//! in-process one.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::domain::{ExecutionGraph, ExecutionStep, RequirementsVerdict};
use crate::server::{ArtifactResponse, ErrorBody, GenerateArtifactRequest, GoalRequest, HealthResponse};
use crate::session::{Backend, SessionError};

/// Default timeout for one API call; generation can be slow
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(180);

/// Client for the engine's HTTP API
#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: String,
    http: Client,
}

impl ApiClient {
    /// Create a client for the server at `base_url` (e.g. `http://127.0.0.1:3000`)
    pub fn new(base_url: impl Into<String>) -> Result<Self, SessionError> {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Result<Self, SessionError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        debug!(%base_url, ?timeout, "ApiClient::with_timeout: called");
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SessionError::Backend(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { base_url, http })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Query the server's health probe
    pub async fn health(&self) -> Result<HealthResponse, SessionError> {
        let url = format!("{}/health", self.base_url);
        debug!(%url, "ApiClient::health: called");
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| SessionError::Backend(format!("Server at {} is not reachable: {}", self.base_url, e)))?;
        let text = response
            .text()
            .await
            .map_err(|e| SessionError::Backend(e.to_string()))?;
        serde_json::from_str(&text).map_err(|e| SessionError::Backend(format!("Invalid health response: {}", e)))
    }

    /// POST a JSON body and decode the JSON answer
    ///
    /// Error statuses carry `{ "error": message }`; when the body does not
    /// have that shape, `fallback` is used as the message.
    async fn post<T, R>(&self, path: &str, body: &T, fallback: &str) -> Result<R, SessionError>
    where
        T: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        debug!(%url, "ApiClient::post: called");

        let response = self
            .http
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| SessionError::Backend(format!("Request to {} failed: {}", url, e)))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| SessionError::Backend(format!("Failed to read response from {}: {}", url, e)))?;
        debug!(%status, body_len = text.len(), "ApiClient::post: response received");

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorBody>(&text)
                .map(|b| b.error)
                .unwrap_or_else(|_| fallback.to_string());
            return Err(SessionError::Backend(message));
        }

        serde_json::from_str(&text).map_err(|e| SessionError::Backend(format!("Invalid response from {}: {}", path, e)))
    }
}

#[async_trait]
impl Backend for ApiClient {
    async fn analyze(&self, goal: &str) -> Result<RequirementsVerdict, SessionError> {
        let body = GoalRequest { goal: goal.to_string() };
        self.post("/api/analyze-requirements", &body, "Requirements analysis failed")
            .await
    }

    async fn compile(&self, goal: &str) -> Result<ExecutionGraph, SessionError> {
        let body = GoalRequest { goal: goal.to_string() };
        self.post("/api/generate-graph", &body, "Failed to generate graph").await
    }

    async fn generate(&self, goal: &str, step: &ExecutionStep) -> Result<Option<String>, SessionError> {
        let body = GenerateArtifactRequest {
            goal: goal.to_string(),
            step: step.clone(),
        };
        let response: ArtifactResponse = self
            .post("/api/generate-artifact", &body, "Artifact generation failed")
            .await?;
        Ok(response.artifact)
    }
}
