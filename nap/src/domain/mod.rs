//! Domain types shared by the engine, the HTTP surface and the orchestrator

mod graph;
mod lenient;
mod requirements;

pub use graph::{
    Acknowledgment, ArtifactType, ExecutionGraph, ExecutionStep, MAX_STEPS, MIN_STEPS, Progress, TerminalState,
    UnknownStep,
};
pub use requirements::{ClarificationField, FieldKind, RequirementsVerdict};
