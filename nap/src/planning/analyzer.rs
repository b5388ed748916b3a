//! RequirementsAnalyzer - decides whether a goal needs clarification

use std::sync::Arc;

use tracing::{debug, info, warn};

use super::{extraction_error, prompt_error};
use crate::domain::RequirementsVerdict;
use crate::error::EngineError;
use crate::extract::{Noise, extract_json};
use crate::llm::{CompletionRequest, LlmClient};
use crate::prompts::PromptLoader;

/// Asks the model which preferences a goal leaves open
pub struct RequirementsAnalyzer {
    llm: Arc<dyn LlmClient>,
    prompts: Arc<PromptLoader>,
}

impl RequirementsAnalyzer {
    pub fn new(llm: Arc<dyn LlmClient>, prompts: Arc<PromptLoader>) -> Self {
        Self { llm, prompts }
    }

    /// Analyze a goal
    ///
    /// The verdict is passed through with no checks beyond JSON syntax:
    /// unknown members are ignored, mistyped ones are coerced and absent
    /// ones take their defaults.
    pub async fn analyze(&self, goal: &str) -> Result<RequirementsVerdict, EngineError> {
        debug!(goal_len = goal.len(), "RequirementsAnalyzer::analyze: called");
        let system = self.prompts.analyze_prompt().map_err(prompt_error)?;

        let response = self.llm.complete(CompletionRequest::new(system, goal)).await?;
        debug!(
            input_tokens = response.usage.input_tokens,
            output_tokens = response.usage.output_tokens,
            "RequirementsAnalyzer::analyze: completion received"
        );

        let content = response.content.as_deref().unwrap_or_default();
        let value = extract_json(content, Noise::Fences).map_err(|e| {
            warn!(error = %e, "RequirementsAnalyzer::analyze: no JSON in completion");
            extraction_error(e, "")
        })?;

        // Any parsed object is a verdict: members are coerced or defaulted
        let verdict: RequirementsVerdict = if value.is_object() {
            serde_json::from_value(value.clone()).map_err(|e| {
                EngineError::malformed(format!("Unexpected requirements shape: {}", e), Some(value.to_string()))
            })?
        } else {
            warn!(raw = %value, "RequirementsAnalyzer::analyze: verdict is not an object, treating as no questions");
            RequirementsVerdict::default()
        };

        info!(
            needs_more_info = verdict.needs_more_info,
            field_count = verdict.fields().len(),
            "Requirements analyzed"
        );
        Ok(verdict)
    }
}
