//! Engine - the three planning operations behind the configuration gate

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::{Config, Credentials};
use crate::domain::{ExecutionGraph, ExecutionStep, RequirementsVerdict};
use crate::error::EngineError;
use crate::llm::{LlmClient, Provider, create_client, select_provider};
use crate::planning::{ArtifactGenerator, GraphCompiler, RequirementsAnalyzer};
use crate::prompts::PromptLoader;

/// Components that only exist once a credential is configured
struct Planning {
    model: String,
    analyzer: RequirementsAnalyzer,
    compiler: GraphCompiler,
    generator: ArtifactGenerator,
}

impl Planning {
    fn new(llm: Arc<dyn LlmClient>, prompts: PromptLoader) -> Self {
        let prompts = Arc::new(prompts);
        Self {
            model: llm.model().to_string(),
            analyzer: RequirementsAnalyzer::new(llm.clone(), prompts.clone()),
            compiler: GraphCompiler::new(llm.clone(), prompts.clone()),
            generator: ArtifactGenerator::new(llm, prompts),
        }
    }
}

/// Bundles analysis, compilation and generation
///
/// Every operation first checks that a provider credential was present
/// when the engine was built. Without one the operation fails with
/// "API Key not configured" and the completion client is never touched.
pub struct Engine {
    planning: Option<Planning>,
    provider: Option<Provider>,
}

impl Engine {
    /// Build an engine on an existing client
    pub fn new(llm: Arc<dyn LlmClient>, credentials: &Credentials) -> Self {
        Self::with_prompts(llm, credentials, PromptLoader::embedded_only())
    }

    pub fn with_prompts(llm: Arc<dyn LlmClient>, credentials: &Credentials, prompts: PromptLoader) -> Self {
        debug!(?credentials, model = %llm.model(), "Engine::with_prompts: called");
        let planning = credentials.is_configured().then(|| Planning::new(llm, prompts));
        Self {
            planning,
            provider: None,
        }
    }

    /// Select the provider from the credentials and build its client
    ///
    /// Without a credential the engine is still built, it just refuses
    /// every operation.
    pub fn from_config(config: &Config, credentials: &Credentials) -> Result<Self, EngineError> {
        debug!("Engine::from_config: called");
        let Some(selection) = select_provider(credentials, &config.llm) else {
            warn!("No provider credential configured; every operation will be refused");
            return Ok(Self {
                planning: None,
                provider: None,
            });
        };

        info!(provider = %selection.provider, model = %selection.model(), "Provider selected");
        let llm = create_client(&selection, &config.llm)?;
        let prompts = PromptLoader::new(&config.prompts.override_dir);
        Ok(Self {
            planning: Some(Planning::new(llm, prompts)),
            provider: Some(selection.provider),
        })
    }

    pub fn is_configured(&self) -> bool {
        self.planning.is_some()
    }

    /// Provider chosen at startup; `None` for injected clients
    pub fn provider(&self) -> Option<Provider> {
        self.provider
    }

    pub fn model(&self) -> Option<&str> {
        self.planning.as_ref().map(|p| p.model.as_str())
    }

    fn gate(&self) -> Result<&Planning, EngineError> {
        self.planning.as_ref().ok_or_else(|| {
            warn!("Engine::gate: refusing operation, no credential configured");
            EngineError::not_configured()
        })
    }

    pub async fn analyze(&self, goal: &str) -> Result<RequirementsVerdict, EngineError> {
        debug!("Engine::analyze: called");
        self.gate()?.analyzer.analyze(goal).await
    }

    pub async fn compile(&self, goal: &str) -> Result<ExecutionGraph, EngineError> {
        debug!("Engine::compile: called");
        self.gate()?.compiler.compile(goal).await
    }

    pub async fn generate(&self, goal: &str, step: &ExecutionStep) -> Result<Option<String>, EngineError> {
        debug!("Engine::generate: called");
        self.gate()?.generator.generate(goal, step).await
    }
}
