//! Not A Prompt - goal to execution graph engine
//!
//! A goal stated in plain language goes through three LLM-backed steps:
//!
//! 1. **Requirements analysis** decides whether closed-choice
//!    clarifications are needed ([`planning::RequirementsAnalyzer`]).
//! 2. **Graph compilation** decomposes the (enriched) goal into 4-7 ordered
//!    steps and validates the result ([`planning::GraphCompiler`]).
//! 3. **Artifact generation** produces the content of a single step
//!    ([`planning::ArtifactGenerator`]).
//!
//! [`engine::Engine`] bundles the three behind the credential gate and is
//! shared by the HTTP surface ([`server`]) and the terminal orchestrator
//! ([`session`], [`repl`]).

pub mod cli;
pub mod client;
pub mod config;
pub mod domain;
pub mod engine;
pub mod error;
pub mod extract;
pub mod llm;
pub mod planning;
pub mod prompts;
pub mod render;
pub mod repl;
pub mod server;
pub mod session;

pub use config::{Config, Credentials};
pub use domain::{ArtifactType, ExecutionGraph, ExecutionStep, RequirementsVerdict};
pub use engine::Engine;
pub use error::EngineError;
pub use session::{Backend, Orchestrator, SessionError};
