//! Planning operations
//!
//! The three LLM-backed steps of the pipeline: requirements analysis,
//! graph compilation and artifact generation. Each issues exactly one
//! completion call per invocation and shares the prompt loader.

mod analyzer;
mod compiler;
mod generator;

pub use analyzer::RequirementsAnalyzer;
pub use compiler::{GraphCompiler, build_graph};
pub use generator::ArtifactGenerator;

use crate::error::EngineError;
use crate::extract::ExtractError;

/// A prompt that cannot be loaded or rendered is a configuration problem
fn prompt_error(err: eyre::Report) -> EngineError {
    EngineError::Configuration(format!("{:#}", err))
}

/// Map an extraction failure, optionally prefixing the parse message
fn extraction_error(err: ExtractError, prefix: &str) -> EngineError {
    match err {
        ExtractError::Empty => EngineError::malformed(ExtractError::Empty.to_string(), None),
        ExtractError::Parse { source, candidate } => {
            EngineError::malformed(format!("{}{}", prefix, source), Some(candidate))
        }
    }
}
