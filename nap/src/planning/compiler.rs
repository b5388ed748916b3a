//! GraphCompiler - decomposes a goal into a validated execution graph
//!
//! The completion is cleaned (reasoning sections, prose, fences), parsed,
//! and then checked structurally. A graph either passes every rule or the
//! whole compilation fails; there is no partial repair.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, warn};

use super::{extraction_error, prompt_error};
use crate::domain::{ArtifactType, ExecutionGraph, ExecutionStep, MAX_STEPS, MIN_STEPS, TerminalState};
use crate::error::EngineError;
use crate::extract::{Noise, extract_json};
use crate::llm::{CompletionRequest, LlmClient};
use crate::prompts::PromptLoader;

/// Prefix for parse failures, matching validation failures
const INVALID_STRUCTURE: &str = "Compiler returned invalid structure: ";

/// Turns a goal into a 4-7 step execution graph
pub struct GraphCompiler {
    llm: Arc<dyn LlmClient>,
    prompts: Arc<PromptLoader>,
}

impl GraphCompiler {
    pub fn new(llm: Arc<dyn LlmClient>, prompts: Arc<PromptLoader>) -> Self {
        Self { llm, prompts }
    }

    /// Compile a goal into a graph
    pub async fn compile(&self, goal: &str) -> Result<ExecutionGraph, EngineError> {
        debug!(goal_len = goal.len(), "GraphCompiler::compile: called");
        let system = self.prompts.compile_prompt().map_err(prompt_error)?;

        let response = self.llm.complete(CompletionRequest::new(system, goal)).await?;
        debug!(
            input_tokens = response.usage.input_tokens,
            output_tokens = response.usage.output_tokens,
            stop_reason = ?response.stop_reason,
            "GraphCompiler::compile: completion received"
        );

        let content = response.content.as_deref().unwrap_or_default();
        let value = extract_json(content, Noise::FencesAndReasoning).map_err(|e| {
            warn!(error = %e, candidate = ?e.candidate(), "GraphCompiler::compile: no JSON in completion");
            extraction_error(e, INVALID_STRUCTURE)
        })?;

        let graph = build_graph(goal, &value).inspect_err(|e| {
            warn!(error = %e, raw = %value, "GraphCompiler::compile: graph rejected");
        })?;

        info!(step_count = graph.steps.len(), "Graph compiled");
        Ok(graph)
    }
}

/// Validate a parsed completion and turn it into a graph
///
/// Rules are checked in order and the first failure wins:
/// `steps` is an array, it holds 4-7 entries, `terminalState` is `DONE`.
/// Steps are then decoded tolerantly; the result carries fresh runtime
/// state and keeps the steps in the order given.
pub fn build_graph(goal: &str, value: &Value) -> Result<ExecutionGraph, EngineError> {
    debug!("build_graph: called");
    let steps = value
        .get("steps")
        .and_then(Value::as_array)
        .ok_or_else(|| EngineError::Validation("Graph missing 'steps' array".to_string()))?;

    if !(MIN_STEPS..=MAX_STEPS).contains(&steps.len()) {
        return Err(EngineError::Validation(format!(
            "Graph must have {}-{} steps, got {}",
            MIN_STEPS,
            MAX_STEPS,
            steps.len()
        )));
    }

    match value.get("terminalState") {
        Some(Value::String(s)) if s == TerminalState::LITERAL => {}
        other => {
            let got = match other {
                None => "<missing>".to_string(),
                Some(Value::String(s)) => s.clone(),
                Some(v) => v.to_string(),
            };
            return Err(EngineError::Validation(format!(
                "terminalState must be {}, got {}",
                TerminalState::LITERAL,
                got
            )));
        }
    }

    let steps = steps
        .iter()
        .enumerate()
        .map(|(i, raw)| decode_step(i + 1, raw))
        .collect::<Result<Vec<_>, _>>()?;

    let goal = value
        .get("goal")
        .and_then(Value::as_str)
        .filter(|g| !g.trim().is_empty())
        .unwrap_or(goal);

    Ok(ExecutionGraph::new(goal, steps))
}

/// Decode the step at 1-based `position`
///
/// Members are read tolerantly, so only an entry that is not an object at
/// all is rejected. A step without an id is addressed by its position.
fn decode_step(position: usize, raw: &Value) -> Result<ExecutionStep, EngineError> {
    let malformed = |reason: String| EngineError::Validation(format!("step {} is malformed: {}", position, reason));

    if !raw.is_object() {
        return Err(malformed(format!("expected an object, got {}", raw)));
    }
    let mut step = serde_json::from_value::<ExecutionStep>(raw.clone())
        .map_err(|e| malformed(e.to_string()))?
        .pristine();

    if step.id.trim().is_empty() {
        debug!(%position, "decode_step: step has no id, using its position");
        step.id = position.to_string();
    }
    if let ArtifactType::Other(name) = &step.artifact_type {
        warn!(%position, artifact_type = %name, "Step has an unrecognized artifact type");
    }
    Ok(step)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::client::mock::MockLlmClient;
    use serde_json::json;

    fn compiler(mock: Arc<MockLlmClient>) -> GraphCompiler {
        GraphCompiler::new(mock, Arc::new(PromptLoader::embedded_only()))
    }

    fn step_json(id: usize) -> Value {
        json!({
            "id": id.to_string(),
            "title": format!("Step {}", id),
            "artifactType": "text",
            "instruction": format!("Do thing {}", id),
            "completed": false
        })
    }

    fn graph_json(step_count: usize, terminal: Value) -> Value {
        json!({
            "goal": "Refined goal",
            "steps": (1..=step_count).map(step_json).collect::<Vec<_>>(),
            "terminalState": terminal
        })
    }

    fn validation_message(result: Result<ExecutionGraph, EngineError>) -> String {
        match result {
            Err(EngineError::Validation(msg)) => msg,
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_too_few_steps() {
        let msg = validation_message(build_graph("g", &graph_json(3, json!("DONE"))));
        assert_eq!(msg, "Graph must have 4-7 steps, got 3");
    }

    #[test]
    fn test_too_many_steps() {
        let msg = validation_message(build_graph("g", &graph_json(8, json!("DONE"))));
        assert_eq!(msg, "Graph must have 4-7 steps, got 8");
    }

    #[test]
    fn test_step_count_bounds_accepted() {
        assert_eq!(build_graph("g", &graph_json(4, json!("DONE"))).unwrap().steps.len(), 4);
        assert_eq!(build_graph("g", &graph_json(7, json!("DONE"))).unwrap().steps.len(), 7);
    }

    #[test]
    fn test_terminal_state_pending() {
        let msg = validation_message(build_graph("g", &graph_json(5, json!("PENDING"))));
        assert_eq!(msg, "terminalState must be DONE, got PENDING");
    }

    #[test]
    fn test_terminal_state_missing() {
        let mut value = graph_json(5, json!("DONE"));
        value.as_object_mut().unwrap().remove("terminalState");
        let msg = validation_message(build_graph("g", &value));
        assert_eq!(msg, "terminalState must be DONE, got <missing>");
    }

    #[test]
    fn test_steps_not_an_array() {
        let value = json!({"steps": "1. Prep 2. Cook", "terminalState": "DONE"});
        let msg = validation_message(build_graph("g", &value));
        assert_eq!(msg, "Graph missing 'steps' array");
    }

    #[test]
    fn test_step_count_checked_before_terminal_state() {
        let msg = validation_message(build_graph("g", &graph_json(3, json!("PENDING"))));
        assert!(msg.starts_with("Graph must have"));
    }

    #[test]
    fn test_unknown_artifact_type_accepted() {
        let mut value = graph_json(4, json!("DONE"));
        value["steps"][2]["artifactType"] = json!("diagram");

        let graph = build_graph("g", &value).unwrap();
        assert_eq!(graph.steps.len(), 4);
        assert_eq!(graph.steps[2].artifact_type, ArtifactType::Other("diagram".to_string()));
    }

    #[test]
    fn test_sparse_steps_accepted() {
        let mut value = graph_json(4, json!("DONE"));
        value["steps"][1].as_object_mut().unwrap().remove("title");
        value["steps"][3].as_object_mut().unwrap().remove("id");
        value["steps"][0]["completed"] = json!("true");

        let graph = build_graph("g", &value).unwrap();
        assert_eq!(graph.steps[1].title, "");
        assert_eq!(graph.steps[3].id, "4");
        assert!(!graph.steps[0].completed);
    }

    #[test]
    fn test_non_object_step() {
        let mut value = graph_json(4, json!("DONE"));
        value["steps"][2] = json!("Cook the chicken");
        let msg = validation_message(build_graph("g", &value));
        assert!(msg.starts_with("step 3 is malformed"), "got {}", msg);
    }

    #[test]
    fn test_exactly_four_steps_order_preserved_and_reset() {
        let mut value = graph_json(4, json!("DONE"));
        value["steps"][1]["completed"] = json!(true);
        value["steps"][2]["skipped"] = json!(true);
        value["steps"][3]["artifact"] = json!("stale");

        let graph = build_graph("g", &value).unwrap();
        let ids: Vec<&str> = graph.steps.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2", "3", "4"]);
        assert!(graph.steps.iter().all(|s| !s.completed && !s.skipped && s.artifact.is_none()));
        assert_eq!(graph.goal, "Refined goal");
        assert_eq!(graph.terminal_state, TerminalState::Done);
    }

    #[test]
    fn test_missing_goal_falls_back_to_request() {
        let mut value = graph_json(4, json!("DONE"));
        value.as_object_mut().unwrap().remove("goal");
        let graph = build_graph("make butter chicken", &value).unwrap();
        assert_eq!(graph.goal, "make butter chicken");
    }

    #[tokio::test]
    async fn test_compile_invalid_display() {
        let text = graph_json(3, json!("DONE")).to_string();
        let mock = Arc::new(MockLlmClient::with_texts(&[text.as_str()]));
        let err = compiler(mock).compile("g").await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Compiler returned invalid structure: Compiler error: Graph must have 4-7 steps, got 3"
        );
    }

    #[tokio::test]
    async fn test_compile_strips_reasoning_and_prose() {
        let text = format!(
            "<thought>\nFirst draft: {{\"steps\": [], \"terminalState\": \"PENDING\"}}\n</thought>\nHere is the graph:\n```json\n{}\n```",
            serde_json::to_string_pretty(&graph_json(5, json!("DONE"))).unwrap()
        );
        let mock = Arc::new(MockLlmClient::with_texts(&[text.as_str()]));

        let graph = compiler(mock).compile("g").await.unwrap();
        assert_eq!(graph.steps.len(), 5);
        assert_eq!(graph.steps[4].title, "Step 5");
    }

    #[tokio::test]
    async fn test_compile_is_deterministic_for_identical_completions() {
        let text = graph_json(6, json!("DONE")).to_string();
        let mock = Arc::new(MockLlmClient::with_texts(&[text.as_str(), text.as_str()]));
        let compiler = compiler(mock.clone());

        let first = compiler.compile("plan a trip").await.unwrap();
        let second = compiler.compile("plan a trip").await.unwrap();
        assert_eq!(first, second);
        assert_eq!(mock.call_count(), 2);
    }

    #[tokio::test]
    async fn test_compile_numeric_ids_and_types() {
        let text = r#"{"steps": [
            {"id": 1, "title": "Shop", "artifactType": "checklist", "instruction": "List"},
            {"id": 2, "title": "Compare", "artifactType": "comparison", "instruction": "Compare"},
            {"id": 3, "title": "Script", "artifactType": "code", "instruction": "Write"},
            {"id": 4, "title": "Config", "artifactType": "schema", "instruction": "Define"}
        ], "terminalState": "DONE"}"#;
        let mock = Arc::new(MockLlmClient::with_texts(&[text]));

        let graph = compiler(mock).compile("automate groceries").await.unwrap();
        assert_eq!(graph.steps[0].id, "1");
        let types: Vec<ArtifactType> = graph.steps.iter().map(|s| s.artifact_type.clone()).collect();
        assert_eq!(
            types,
            vec![ArtifactType::Checklist, ArtifactType::Comparison, ArtifactType::Code, ArtifactType::Schema]
        );
        assert_eq!(graph.goal, "automate groceries");
    }

    #[tokio::test]
    async fn test_compile_empty_completion() {
        let mock = Arc::new(MockLlmClient::with_texts(&["   "]));
        let err = compiler(mock).compile("g").await.unwrap_err();
        assert_eq!(err.to_string(), "Empty response from AI");
    }

    #[tokio::test]
    async fn test_compile_unparseable() {
        let mock = Arc::new(MockLlmClient::with_texts(&["Sorry, {I can't} do that"]));
        let err = compiler(mock).compile("g").await.unwrap_err();
        assert!(err.to_string().starts_with("Compiler returned invalid structure: "));
        assert!(matches!(err, EngineError::MalformedResponse { raw: Some(_), .. }));
    }
}
