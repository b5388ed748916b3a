//! Client-side orchestration
//!
//! Drives a goal through analysis, optional clarification, compilation and
//! per-step generation. The orchestrator only sequences calls; the graph
//! it hands back is a fresh value after every change.

use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::domain::{ClarificationField, ExecutionGraph, ExecutionStep, RequirementsVerdict, UnknownStep};
use crate::engine::Engine;
use crate::error::EngineError;

/// Errors seen by the orchestrator
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    UnknownStep(#[from] UnknownStep),

    /// The backend refused or failed the operation; carries its message
    #[error("{0}")]
    Backend(String),

    #[error("Invalid response format from AI. No steps were generated.")]
    EmptyGraph,
}

impl From<EngineError> for SessionError {
    fn from(err: EngineError) -> Self {
        SessionError::Backend(err.to_string())
    }
}

/// Where the three operations run: in-process or behind `nap serve`
#[async_trait]
pub trait Backend: Send + Sync {
    async fn analyze(&self, goal: &str) -> Result<RequirementsVerdict, SessionError>;

    async fn compile(&self, goal: &str) -> Result<ExecutionGraph, SessionError>;

    async fn generate(&self, goal: &str, step: &ExecutionStep) -> Result<Option<String>, SessionError>;
}

#[async_trait]
impl Backend for Engine {
    async fn analyze(&self, goal: &str) -> Result<RequirementsVerdict, SessionError> {
        Ok(Engine::analyze(self, goal).await?)
    }

    async fn compile(&self, goal: &str) -> Result<ExecutionGraph, SessionError> {
        Ok(Engine::compile(self, goal).await?)
    }

    async fn generate(&self, goal: &str, step: &ExecutionStep) -> Result<Option<String>, SessionError> {
        Ok(Engine::generate(self, goal, step).await?)
    }
}

/// Outcome of the analysis phase
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Preparation {
    /// Ask the user these fields, then enrich the goal
    NeedsClarification(RequirementsVerdict),
    /// Compile this goal directly
    Ready(String),
}

/// Append clarification answers to a goal
///
/// One `label: answer` line per answered field, in field order. Fields
/// without an answer are left out; with no answers at all the goal is
/// returned unchanged.
pub fn enrich_goal(goal: &str, fields: &[ClarificationField], answers: &HashMap<String, String>) -> String {
    debug!(field_count = fields.len(), answer_count = answers.len(), "enrich_goal: called");
    let lines: Vec<String> = fields
        .iter()
        .filter_map(|field| {
            answers
                .get(&field.id)
                .map(|answer| format!("{}: {}", field.display_label(), answer))
        })
        .collect();

    if lines.is_empty() {
        return goal.to_string();
    }
    format!("{}\n\nAdditional Context:\n{}", goal, lines.join("\n"))
}

pub struct Orchestrator<B> {
    backend: B,
}

impl<B: Backend> Orchestrator<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Run requirements analysis
    ///
    /// A failed analysis never blocks the user: it is logged and the goal
    /// goes straight to compilation.
    pub async fn prepare(&self, goal: &str) -> Preparation {
        debug!(goal_len = goal.len(), "Orchestrator::prepare: called");
        match self.backend.analyze(goal).await {
            Ok(verdict) if verdict.needs_more_info && !verdict.fields().is_empty() => {
                info!(field_count = verdict.fields().len(), "Clarification requested");
                Preparation::NeedsClarification(verdict)
            }
            Ok(_) => Preparation::Ready(goal.to_string()),
            Err(e) => {
                warn!(error = %e, "Requirements analysis failed, compiling goal as given");
                Preparation::Ready(goal.to_string())
            }
        }
    }

    pub async fn compile(&self, goal: &str) -> Result<ExecutionGraph, SessionError> {
        debug!("Orchestrator::compile: called");
        let graph = self.backend.compile(goal).await?;
        if graph.steps.is_empty() {
            return Err(SessionError::EmptyGraph);
        }
        info!(step_count = graph.steps.len(), "Execution graph ready");
        Ok(graph)
    }

    /// Generate the artifact for one step, at most once
    ///
    /// A step that already carries an artifact is returned untouched
    /// without a backend call. An empty generation leaves the step as is.
    pub async fn generate_step(&self, graph: &ExecutionGraph, step_id: &str) -> Result<ExecutionGraph, SessionError> {
        debug!(%step_id, "Orchestrator::generate_step: called");
        let step = graph.step(step_id).ok_or_else(|| UnknownStep(step_id.to_string()))?;
        if step.artifact.is_some() {
            debug!(%step_id, "Orchestrator::generate_step: artifact present, skipping");
            return Ok(graph.clone());
        }

        match self.backend.generate(&graph.goal, step).await? {
            Some(artifact) => Ok(graph.attach_artifact(step_id, artifact)?),
            None => {
                warn!(%step_id, "No artifact generated");
                Ok(graph.clone())
            }
        }
    }

    /// Drop a step's artifact and generate it again
    pub async fn regenerate_step(&self, graph: &ExecutionGraph, step_id: &str) -> Result<ExecutionGraph, SessionError> {
        debug!(%step_id, "Orchestrator::regenerate_step: called");
        let cleared = graph.clear_artifact(step_id)?;
        self.generate_step(&cleared, step_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Acknowledgment, ArtifactType, FieldKind};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Backend with canned answers that counts generate calls
    struct ScriptedBackend {
        verdict: Result<RequirementsVerdict, String>,
        graph: ExecutionGraph,
        artifact: Option<String>,
        generate_calls: AtomicUsize,
        generated_goals: Mutex<Vec<String>>,
    }

    impl ScriptedBackend {
        fn new(graph: ExecutionGraph) -> Self {
            Self {
                verdict: Ok(RequirementsVerdict::default()),
                graph,
                artifact: Some("# Prep\n**Dice** the onions".to_string()),
                generate_calls: AtomicUsize::new(0),
                generated_goals: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Backend for ScriptedBackend {
        async fn analyze(&self, _goal: &str) -> Result<RequirementsVerdict, SessionError> {
            self.verdict.clone().map_err(SessionError::Backend)
        }

        async fn compile(&self, _goal: &str) -> Result<ExecutionGraph, SessionError> {
            Ok(self.graph.clone())
        }

        async fn generate(&self, goal: &str, _step: &ExecutionStep) -> Result<Option<String>, SessionError> {
            self.generate_calls.fetch_add(1, Ordering::SeqCst);
            self.generated_goals.lock().unwrap().push(goal.to_string());
            Ok(self.artifact.clone())
        }
    }

    fn graph() -> ExecutionGraph {
        ExecutionGraph::new(
            "Refined: butter chicken",
            (1..=4)
                .map(|i| ExecutionStep::new(i.to_string(), format!("Step {}", i), ArtifactType::Text, "Do it"))
                .collect(),
        )
    }

    fn field(id: &str, label: &str) -> ClarificationField {
        ClarificationField {
            id: id.to_string(),
            label: label.to_string(),
            required: true,
            kind: FieldKind::Select,
            options: vec!["A".to_string(), "B".to_string()],
        }
    }

    #[test]
    fn test_enrich_goal_field_order() {
        let fields = vec![field("spice", "Desired Heat Intensity"), field("size", "Serving Size")];
        let answers = HashMap::from([
            ("size".to_string(), "4 people".to_string()),
            ("spice".to_string(), "Medium".to_string()),
        ]);

        assert_eq!(
            enrich_goal("make butter chicken", &fields, &answers),
            "make butter chicken\n\nAdditional Context:\nDesired Heat Intensity: Medium\nServing Size: 4 people"
        );
    }

    #[test]
    fn test_enrich_goal_without_answers() {
        let fields = vec![field("spice", "Heat")];
        assert_eq!(enrich_goal("goal", &fields, &HashMap::new()), "goal");
    }

    #[tokio::test]
    async fn test_prepare_needs_clarification() {
        let mut backend = ScriptedBackend::new(graph());
        backend.verdict = Ok(RequirementsVerdict {
            needs_more_info: true,
            reason: Some("heat".to_string()),
            fields: Some(vec![field("spice", "Heat")]),
        });
        let orchestrator = Orchestrator::new(backend);

        match orchestrator.prepare("make butter chicken").await {
            Preparation::NeedsClarification(verdict) => assert_eq!(verdict.fields().len(), 1),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_prepare_falls_back_on_failure() {
        let mut backend = ScriptedBackend::new(graph());
        backend.verdict = Err("API Key not configured".to_string());
        let orchestrator = Orchestrator::new(backend);

        assert_eq!(orchestrator.prepare("goal").await, Preparation::Ready("goal".to_string()));
    }

    #[tokio::test]
    async fn test_compile_rejects_empty_graph() {
        let orchestrator = Orchestrator::new(ScriptedBackend::new(ExecutionGraph::new("g", vec![])));
        let err = orchestrator.compile("g").await.unwrap_err();
        assert_eq!(err.to_string(), "Invalid response format from AI. No steps were generated.");
    }

    #[tokio::test]
    async fn test_generate_step_at_most_once() {
        let orchestrator = Orchestrator::new(ScriptedBackend::new(graph()));
        let original = orchestrator.compile("butter chicken").await.unwrap();

        let first = orchestrator.generate_step(&original, "1").await.unwrap();
        let second = orchestrator.generate_step(&first, "1").await.unwrap();

        assert!(original.step("1").unwrap().artifact.is_none());
        assert!(first.step("1").unwrap().artifact.is_some());
        assert_eq!(first, second);
        assert_eq!(orchestrator.backend().generate_calls.load(Ordering::SeqCst), 1);
        // Generation runs against the compiled goal
        assert_eq!(
            orchestrator.backend().generated_goals.lock().unwrap().as_slice(),
            ["Refined: butter chicken"]
        );
    }

    #[tokio::test]
    async fn test_generate_step_empty_leaves_step() {
        let mut backend = ScriptedBackend::new(graph());
        backend.artifact = None;
        let orchestrator = Orchestrator::new(backend);

        let graph = graph();
        let after = orchestrator.generate_step(&graph, "2").await.unwrap();
        assert_eq!(after, graph);
    }

    #[tokio::test]
    async fn test_regenerate_calls_again() {
        let orchestrator = Orchestrator::new(ScriptedBackend::new(graph()));
        let g = orchestrator.generate_step(&graph(), "1").await.unwrap();
        let g = orchestrator.regenerate_step(&g, "1").await.unwrap();
        assert!(g.step("1").unwrap().artifact.is_some());
        assert_eq!(orchestrator.backend().generate_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_generate_unknown_step() {
        let orchestrator = Orchestrator::new(ScriptedBackend::new(graph()));
        let err = orchestrator.generate_step(&graph(), "9").await.unwrap_err();
        assert!(matches!(err, SessionError::UnknownStep(_)));
    }

    #[tokio::test]
    async fn test_reset_keeps_artifact_and_session_reaches_done() {
        let orchestrator = Orchestrator::new(ScriptedBackend::new(graph()));
        let mut g = orchestrator.compile("g").await.unwrap();
        for id in ["1", "2", "3", "4"] {
            g = orchestrator.generate_step(&g, id).await.unwrap();
            g = g.acknowledge(id, Acknowledgment::Complete).unwrap();
        }
        assert!(g.is_done());

        let g = g.reset_acknowledgment("3").unwrap();
        assert!(!g.is_done());
        assert!(g.step("3").unwrap().artifact.is_some());
    }
}
