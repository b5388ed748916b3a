//! Prompt Template System
//!
//! Loads and renders the `.pmt` prompt templates used by the planning
//! components.
//!
//! Template loading chain:
//! 1. `{override_dir}/{name}.pmt` (user override, default `.notaprompt/prompts/`)
//! 2. Embedded copy compiled into the binary
//!
//! Templates use Handlebars syntax for variable substitution.

pub mod embedded;
mod loader;

pub use loader::{ArtifactRequestContext, PromptLoader};
