//! ArtifactGenerator - produces the content for a single step

use std::sync::Arc;

use tracing::{debug, info, warn};

use super::prompt_error;
use crate::domain::ExecutionStep;
use crate::error::EngineError;
use crate::llm::{CompletionRequest, LlmClient};
use crate::prompts::PromptLoader;

pub struct ArtifactGenerator {
    llm: Arc<dyn LlmClient>,
    prompts: Arc<PromptLoader>,
}

impl ArtifactGenerator {
    pub fn new(llm: Arc<dyn LlmClient>, prompts: Arc<PromptLoader>) -> Self {
        Self { llm, prompts }
    }

    /// Generate the artifact for `step` of `goal`
    ///
    /// The completion is returned as-is. An empty completion is not an
    /// error; it yields `None`.
    pub async fn generate(&self, goal: &str, step: &ExecutionStep) -> Result<Option<String>, EngineError> {
        debug!(step_id = %step.id, artifact_type = %step.artifact_type, "ArtifactGenerator::generate: called");
        let system = self.prompts.artifact_prompt().map_err(prompt_error)?;
        let user = self.prompts.artifact_request(goal, step).map_err(prompt_error)?;

        let response = self.llm.complete(CompletionRequest::new(system, user)).await?;
        match response.content.filter(|c| !c.trim().is_empty()) {
            Some(artifact) => {
                info!(step_id = %step.id, artifact_len = artifact.len(), "Artifact generated");
                Ok(Some(artifact))
            }
            None => {
                warn!(step_id = %step.id, "Provider returned an empty artifact");
                Ok(None)
            }
        }
    }
}
