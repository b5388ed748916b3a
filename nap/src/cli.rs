//! CLI command definitions and subcommands

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::debug;

use crate::config::{Credentials, LlmConfig};

/// Not A Prompt - goal to execution graph engine
#[derive(Parser)]
#[command(
    name = "nap",
    about = "Turn a natural-language goal into an ordered execution graph with generated artifacts",
    version = env!("GIT_DESCRIBE"),
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(
        short = 'l',
        long = "log-level",
        global = true,
        help = "Log level (TRACE, DEBUG, INFO, WARN, ERROR)"
    )]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Serve the HTTP API
    Serve {
        /// Address to bind (overrides config)
        #[arg(short, long)]
        bind: Option<SocketAddr>,
    },

    /// Check whether a goal needs clarification
    Analyze {
        /// The goal, in plain language
        goal: String,

        /// Print the raw verdict as JSON
        #[arg(long)]
        json: bool,
    },

    /// Compile a goal into an execution graph
    Compile {
        /// The goal, in plain language
        goal: String,

        /// Print the graph as JSON
        #[arg(long)]
        json: bool,
    },

    /// Generate the artifact for one step
    Generate {
        /// Goal the step belongs to
        #[arg(short, long)]
        goal: String,

        /// JSON file holding the step
        #[arg(short = 'f', long = "step-file")]
        step_file: PathBuf,
    },

    /// Walk through a goal interactively
    Run {
        /// The goal, in plain language
        goal: String,

        /// Talk to a running `nap serve` instead of calling the provider directly
        #[arg(short, long, value_name = "URL")]
        server: Option<String>,

        /// Skip requirements analysis
        #[arg(long)]
        no_clarify: bool,
    },
}

/// Get the log file path
pub fn get_log_path() -> PathBuf {
    debug!("get_log_path: called");
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("notaprompt")
        .join("logs")
        .join("nap.log")
}

/// Help footer showing credential status and the log location
pub fn generate_after_help() -> String {
    debug!("generate_after_help: called");
    let config = LlmConfig::default();
    let credentials = Credentials::from_env(&config);

    let mut help = String::from("Credentials:\n");
    for (name, present) in [
        (&config.openrouter_api_key_env, credentials.openrouter_api_key.is_some()),
        (&config.groq_api_key_env, credentials.groq_api_key.is_some()),
    ] {
        let icon = if present { "\u{2705}" } else { "\u{274C}" };
        help.push_str(&format!("  {} {}\n", icon, name));
    }

    help.push('\n');
    help.push_str(&format!("Logs are written to: {}\n", get_log_path().display()));
    help
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_run_with_server() {
        let cli = Cli::try_parse_from(["nap", "run", "make butter chicken", "--server", "http://localhost:3000"]).unwrap();
        match cli.command {
            Command::Run {
                goal,
                server,
                no_clarify,
            } => {
                assert_eq!(goal, "make butter chicken");
                assert_eq!(server.as_deref(), Some("http://localhost:3000"));
                assert!(!no_clarify);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["nap", "compile", "goal", "--json", "-l", "DEBUG", "-c", "nap.yml"]).unwrap();
        assert_eq!(cli.log_level.as_deref(), Some("DEBUG"));
        assert_eq!(cli.config, Some(PathBuf::from("nap.yml")));
        assert!(matches!(cli.command, Command::Compile { json: true, .. }));
    }

    #[test]
    fn test_parse_serve_bind() {
        let cli = Cli::try_parse_from(["nap", "serve", "--bind", "0.0.0.0:8080"]).unwrap();
        match cli.command {
            Command::Serve { bind } => assert_eq!(bind, Some("0.0.0.0:8080".parse().unwrap())),
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_generate_requires_step_file() {
        assert!(Cli::try_parse_from(["nap", "generate", "--goal", "g"]).is_err());
    }

    #[test]
    fn test_log_path() {
        assert!(get_log_path().ends_with("notaprompt/logs/nap.log"));
    }
}
