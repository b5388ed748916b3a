//! Prompt Loader
//!
//! Loads prompt templates from the override directory or falls back to the
//! embedded defaults.

use std::path::{Path, PathBuf};

use eyre::{Result, eyre};
use handlebars::Handlebars;
use serde::Serialize;
use tracing::debug;

use super::embedded;
use crate::domain::ExecutionStep;

/// Context for the `artifact-request` template
#[derive(Debug, Clone, Serialize)]
pub struct ArtifactRequestContext<'a> {
    pub goal: &'a str,
    pub title: &'a str,
    pub instruction: &'a str,
    pub artifact_type: &'a str,
}

impl<'a> ArtifactRequestContext<'a> {
    pub fn new(goal: &'a str, step: &'a ExecutionStep) -> Self {
        Self {
            goal,
            title: &step.title,
            instruction: &step.instruction,
            artifact_type: step.artifact_type.as_str(),
        }
    }
}

/// Loads and renders prompt templates
pub struct PromptLoader {
    /// Handlebars template engine
    hbs: Handlebars<'static>,
    /// User override directory (e.g., `.notaprompt/prompts/`)
    override_dir: Option<PathBuf>,
}

impl PromptLoader {
    /// Create a loader that checks `override_dir` before the embedded copies
    pub fn new(override_dir: impl AsRef<Path>) -> Self {
        let override_dir = override_dir.as_ref();
        let exists = override_dir.is_dir();
        debug!(?override_dir, %exists, "PromptLoader::new: called");

        Self {
            hbs: Self::engine(),
            override_dir: exists.then(|| override_dir.to_path_buf()),
        }
    }

    /// Create a loader that only uses embedded prompts
    pub fn embedded_only() -> Self {
        debug!("PromptLoader::embedded_only: called");
        Self {
            hbs: Self::engine(),
            override_dir: None,
        }
    }

    /// Prompts are plain text, not HTML
    fn engine() -> Handlebars<'static> {
        let mut hbs = Handlebars::new();
        hbs.register_escape_fn(handlebars::no_escape);
        hbs
    }

    /// Load a template by name
    ///
    /// Checks in order:
    /// 1. User override: `{override_dir}/{name}.pmt`
    /// 2. Embedded fallback
    pub fn load_template(&self, name: &str) -> Result<String> {
        debug!(%name, "PromptLoader::load_template: called");
        if let Some(dir) = &self.override_dir {
            let path = dir.join(format!("{}.pmt", name));
            if path.exists() {
                debug!(?path, "PromptLoader::load_template: found in override directory");
                return std::fs::read_to_string(&path)
                    .map_err(|e| eyre!("Failed to read prompt override {}: {}", path.display(), e));
            }
        }

        embedded::get_embedded(name)
            .map(str::to_string)
            .ok_or_else(|| eyre!("Prompt template not found: {}", name))
    }

    /// Render a template with the given context
    pub fn render<T: Serialize>(&self, name: &str, context: &T) -> Result<String> {
        debug!(%name, "PromptLoader::render: called");
        let template = self.load_template(name)?;
        self.hbs
            .render_template(&template, context)
            .map_err(|e| eyre!("Failed to render template {}: {}", name, e))
    }

    pub fn analyze_prompt(&self) -> Result<String> {
        self.load_template("analyze")
    }

    pub fn compile_prompt(&self) -> Result<String> {
        self.load_template("compile")
    }

    pub fn artifact_prompt(&self) -> Result<String> {
        self.load_template("artifact")
    }

    /// User message for one artifact generation call
    pub fn artifact_request(&self, goal: &str, step: &ExecutionStep) -> Result<String> {
        debug!(step_id = %step.id, "PromptLoader::artifact_request: called");
        self.render("artifact-request", &ArtifactRequestContext::new(goal, step))
    }
}

impl std::fmt::Debug for PromptLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PromptLoader")
            .field("override_dir", &self.override_dir)
            .finish_non_exhaustive()
    }
}

impl Default for PromptLoader {
    fn default() -> Self {
        Self::embedded_only()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ArtifactType;
    use tempfile::TempDir;

    fn step() -> ExecutionStep {
        ExecutionStep::new("2", "Marinate & Rest", ArtifactType::Checklist, "List the <marinade> steps")
    }

    #[test]
    fn test_artifact_request_renders_all_fields() {
        let loader = PromptLoader::embedded_only();
        let msg = loader.artifact_request("Make butter chicken", &step()).unwrap();

        assert!(msg.contains("Goal: Make butter chicken"));
        assert!(msg.contains("Step title: Marinate & Rest"));
        assert!(msg.contains("Instruction: List the <marinade> steps"));
        assert!(msg.contains("Artifact type: checklist"));
    }

    #[test]
    fn test_override_dir_wins() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("compile.pmt"), "custom compiler prompt").unwrap();

        let loader = PromptLoader::new(dir.path());
        assert_eq!(loader.compile_prompt().unwrap(), "custom compiler prompt");
        // Templates without an override still come from the embedded set
        assert!(loader.analyze_prompt().unwrap().contains("needsMoreInfo"));
    }

    #[test]
    fn test_missing_override_dir_uses_embedded() {
        let loader = PromptLoader::new("/nonexistent/notaprompt/prompts");
        assert!(loader.artifact_prompt().unwrap().contains("checklist"));
    }

    #[test]
    fn test_unknown_template() {
        let loader = PromptLoader::embedded_only();
        assert!(loader.load_template("nonexistent-template").is_err());
    }

    #[test]
    fn test_broken_override_fails_render() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("artifact-request.pmt"), "Goal: {{#if goal}}").unwrap();

        let loader = PromptLoader::new(dir.path());
        let err = loader.artifact_request("x", &step()).unwrap_err();
        assert!(err.to_string().contains("Failed to render template artifact-request"));
    }
}
