//! Execution graph and step types
//!
//! A graph is built once by the compiler and never recompiled. Everything
//! that changes afterwards (artifacts, acknowledgments) is applied through
//! methods that return a new graph value, leaving the original untouched.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;
use tracing::debug;

use super::lenient;

/// Smallest number of steps a compiled graph may have
pub const MIN_STEPS: usize = 4;

/// Largest number of steps a compiled graph may have
pub const MAX_STEPS: usize = 7;

/// Format of the artifact a step produces
///
/// Names outside the five known formats are kept as `Other` so a graph is
/// never rejected over a type name; they display as raw code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(into = "String")]
pub enum ArtifactType {
    /// Rich prose markdown
    Text,
    /// Raw source code
    Code,
    /// Raw structured data or configuration
    Schema,
    /// Markdown task list
    Checklist,
    /// Side-by-side option table (JSON)
    Comparison,
    /// Anything else the model named, verbatim
    Other(String),
}

impl ArtifactType {
    pub const ALL: [ArtifactType; 5] = [
        ArtifactType::Text,
        ArtifactType::Code,
        ArtifactType::Schema,
        ArtifactType::Checklist,
        ArtifactType::Comparison,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            ArtifactType::Text => "text",
            ArtifactType::Code => "code",
            ArtifactType::Schema => "schema",
            ArtifactType::Checklist => "checklist",
            ArtifactType::Comparison => "comparison",
            ArtifactType::Other(name) => name,
        }
    }
}

impl Default for ArtifactType {
    fn default() -> Self {
        ArtifactType::Other(String::new())
    }
}

impl From<String> for ArtifactType {
    fn from(s: String) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => ArtifactType::Text,
            "code" => ArtifactType::Code,
            "schema" | "config" => ArtifactType::Schema,
            "checklist" => ArtifactType::Checklist,
            "comparison" => ArtifactType::Comparison,
            _ => ArtifactType::Other(s),
        }
    }
}

impl From<ArtifactType> for String {
    fn from(kind: ArtifactType) -> Self {
        match kind {
            ArtifactType::Other(name) => name,
            known => known.as_str().to_string(),
        }
    }
}

impl<'de> Deserialize<'de> for ArtifactType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(lenient::optional_string(deserializer)?.map(ArtifactType::from).unwrap_or_default())
    }
}

impl fmt::Display for ArtifactType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The constant tag every compiled graph carries
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TerminalState {
    #[default]
    #[serde(rename = "DONE")]
    Done,
}

impl TerminalState {
    pub const LITERAL: &'static str = "DONE";
}

/// How a user acknowledged a step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acknowledgment {
    Complete,
    Skip,
}

/// One step of an execution graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionStep {
    #[serde(default, deserialize_with = "lenient::string_or_number")]
    pub id: String,

    #[serde(default, deserialize_with = "lenient::string_or_number")]
    pub title: String,

    #[serde(default)]
    pub artifact_type: ArtifactType,

    #[serde(default, deserialize_with = "lenient::string_or_number")]
    pub instruction: String,

    /// Generated content, absent until generated
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact: Option<String>,

    #[serde(default, deserialize_with = "lenient::flag")]
    pub completed: bool,

    #[serde(default, deserialize_with = "lenient::flag", skip_serializing_if = "is_false")]
    pub skipped: bool,
}

impl ExecutionStep {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        artifact_type: ArtifactType,
        instruction: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            artifact_type,
            instruction: instruction.into(),
            artifact: None,
            completed: false,
            skipped: false,
        }
    }

    /// Completed or skipped
    pub fn is_acknowledged(&self) -> bool {
        self.completed || self.skipped
    }

    /// Apply an acknowledgment; completed and skipped never hold together
    pub fn acknowledge(&mut self, ack: Acknowledgment) {
        debug!(id = %self.id, ?ack, "ExecutionStep::acknowledge: called");
        match ack {
            Acknowledgment::Complete => {
                self.completed = true;
                self.skipped = false;
            }
            Acknowledgment::Skip => {
                self.skipped = true;
                self.completed = false;
            }
        }
    }

    /// Clear both acknowledgment flags
    pub fn reset_acknowledgment(&mut self) {
        debug!(id = %self.id, "ExecutionStep::reset_acknowledgment: called");
        self.completed = false;
        self.skipped = false;
    }

    /// Drop acknowledgment and generated state, as the compiler hands steps out
    pub fn pristine(mut self) -> Self {
        self.artifact = None;
        self.completed = false;
        self.skipped = false;
        self
    }
}

/// A step id that does not exist in the graph
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown step: {0}")]
pub struct UnknownStep(pub String);

/// Acknowledged versus total step counts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub acknowledged: usize,
    pub total: usize,
}

impl Progress {
    /// Whole-number percentage, 0 for an empty graph
    pub fn percent(&self) -> u8 {
        if self.total == 0 {
            return 0;
        }
        ((self.acknowledged * 100) / self.total) as u8
    }
}

/// The compiled, ordered plan for a goal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionGraph {
    pub goal: String,
    pub steps: Vec<ExecutionStep>,
    #[serde(default)]
    pub terminal_state: TerminalState,
}

impl ExecutionGraph {
    pub fn new(goal: impl Into<String>, steps: Vec<ExecutionStep>) -> Self {
        Self {
            goal: goal.into(),
            steps,
            terminal_state: TerminalState::Done,
        }
    }

    pub fn step(&self, id: &str) -> Option<&ExecutionStep> {
        self.steps.iter().find(|s| s.id == id)
    }

    /// Copy the graph with one step changed
    fn with_step<F>(&self, id: &str, update: F) -> Result<Self, UnknownStep>
    where
        F: FnOnce(&mut ExecutionStep),
    {
        let mut next = self.clone();
        let step = next
            .steps
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| UnknownStep(id.to_string()))?;
        update(step);
        Ok(next)
    }

    /// Store a generated artifact on a step
    pub fn attach_artifact(&self, id: &str, artifact: impl Into<String>) -> Result<Self, UnknownStep> {
        let artifact = artifact.into();
        debug!(%id, artifact_len = artifact.len(), "attach_artifact: called");
        self.with_step(id, |s| s.artifact = Some(artifact))
    }

    /// Remove a step's artifact so it can be generated again
    pub fn clear_artifact(&self, id: &str) -> Result<Self, UnknownStep> {
        debug!(%id, "clear_artifact: called");
        self.with_step(id, |s| s.artifact = None)
    }

    pub fn acknowledge(&self, id: &str, ack: Acknowledgment) -> Result<Self, UnknownStep> {
        self.with_step(id, |s| s.acknowledge(ack))
    }

    pub fn reset_acknowledgment(&self, id: &str) -> Result<Self, UnknownStep> {
        self.with_step(id, ExecutionStep::reset_acknowledgment)
    }

    pub fn progress(&self) -> Progress {
        Progress {
            acknowledged: self.steps.iter().filter(|s| s.is_acknowledged()).count(),
            total: self.steps.len(),
        }
    }

    /// Every step acknowledged, and there is at least one
    pub fn is_done(&self) -> bool {
        let progress = self.progress();
        progress.total > 0 && progress.acknowledged == progress.total
    }

    /// First step not yet acknowledged, in execution order
    pub fn next_pending(&self) -> Option<&ExecutionStep> {
        self.steps.iter().find(|s| !s.is_acknowledged())
    }
}

fn is_false(b: &bool) -> bool {
    !*b
}
