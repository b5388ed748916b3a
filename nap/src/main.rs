//! Not A Prompt - goal to execution graph engine
//!
//! CLI entry point: serve the HTTP API, run single operations, or walk a
//! goal interactively.

use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use clap::{CommandFactory, FromArgMatches};
use colored::Colorize;
use eyre::{Context, Result};
use tracing::{debug, info};

use notaprompt::cli::{Cli, Command, generate_after_help, get_log_path};
use notaprompt::client::ApiClient;
use notaprompt::config::{Config, Credentials};
use notaprompt::domain::{ExecutionGraph, ExecutionStep, RequirementsVerdict};
use notaprompt::engine::Engine;
use notaprompt::render::render_artifact;
use notaprompt::repl::RunSession;
use notaprompt::server;
use notaprompt::session::{Backend, Orchestrator};

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    // Note: Can't log params here since logging isn't initialized yet
    let log_path = get_log_path();
    let log_dir = log_path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(log_dir).context("Failed to create log directory")?;

    // Determine log level with priority: CLI --log-level > config file > default (INFO)
    let level = match cli_log_level.or(config_log_level).map(str::to_uppercase).as_deref() {
        Some("TRACE") => tracing::Level::TRACE,
        Some("DEBUG") => tracing::Level::DEBUG,
        Some("INFO") | None => tracing::Level::INFO,
        Some("WARN") | Some("WARNING") => tracing::Level::WARN,
        Some("ERROR") => tracing::Level::ERROR,
        Some(other) => {
            eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", other);
            tracing::Level::INFO
        }
    };

    let log_file = fs::File::create(&log_path).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cmd = Cli::command().after_help(generate_after_help());
    let cli = Cli::from_arg_matches(&cmd.get_matches())?;

    // Load log level from config file early (before full config load)
    let config_log_level = Config::load_log_level(cli.config.as_ref());
    setup_logging(cli.log_level.as_deref(), config_log_level.as_deref()).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    let credentials = Credentials::from_env(&config.llm);
    info!(configured = credentials.is_configured(), "nap {} starting", env!("GIT_DESCRIBE"));

    debug!(command = ?cli.command, "main: dispatching command");
    match cli.command {
        Command::Serve { bind } => cmd_serve(&config, &credentials, bind).await,
        Command::Analyze { goal, json } => cmd_analyze(&config, &credentials, &goal, json).await,
        Command::Compile { goal, json } => cmd_compile(&config, &credentials, &goal, json).await,
        Command::Generate { goal, step_file } => cmd_generate(&config, &credentials, &goal, &step_file).await,
        Command::Run {
            goal,
            server,
            no_clarify,
        } => cmd_run(&config, &credentials, &goal, server, !no_clarify).await,
    }
}

fn build_engine(config: &Config, credentials: &Credentials) -> Result<Engine> {
    Engine::from_config(config, credentials).context("Failed to initialize engine")
}

async fn cmd_serve(config: &Config, credentials: &Credentials, bind: Option<SocketAddr>) -> Result<()> {
    debug!(?bind, "cmd_serve: called");
    let bind = match bind {
        Some(addr) => addr,
        None => config
            .server
            .bind
            .parse()
            .context(format!("Invalid bind address: {}", config.server.bind))?,
    };

    let engine = Arc::new(build_engine(config, credentials)?);
    if !engine.is_configured() {
        eprintln!(
            "{} no API key found in {} or {}; every request will fail",
            "warning:".yellow().bold(),
            config.llm.openrouter_api_key_env,
            config.llm.groq_api_key_env
        );
    }
    println!("Serving on http://{}", bind);
    server::serve(engine, bind).await
}

async fn cmd_analyze(config: &Config, credentials: &Credentials, goal: &str, json: bool) -> Result<()> {
    debug!(json, "cmd_analyze: called");
    let engine = build_engine(config, credentials)?;
    let verdict = engine.analyze(goal).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&verdict)?);
    } else {
        print_verdict(&verdict);
    }
    Ok(())
}

async fn cmd_compile(config: &Config, credentials: &Credentials, goal: &str, json: bool) -> Result<()> {
    debug!(json, "cmd_compile: called");
    let engine = build_engine(config, credentials)?;
    let graph = engine.compile(goal).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&graph)?);
    } else {
        print_graph(&graph);
    }
    Ok(())
}

async fn cmd_generate(config: &Config, credentials: &Credentials, goal: &str, step_file: &Path) -> Result<()> {
    debug!(?step_file, "cmd_generate: called");
    let content =
        fs::read_to_string(step_file).context(format!("Failed to read step file {}", step_file.display()))?;
    let step: ExecutionStep = serde_json::from_str(&content).context("Step file is not a valid step")?;

    let engine = build_engine(config, credentials)?;
    match engine.generate(goal, &step).await? {
        Some(artifact) => println!("{}", render_artifact(&artifact, &step.artifact_type).to_terminal()),
        None => eprintln!("{}", "The provider returned an empty artifact.".yellow()),
    }
    Ok(())
}

async fn cmd_run(
    config: &Config,
    credentials: &Credentials,
    goal: &str,
    server: Option<String>,
    clarify: bool,
) -> Result<()> {
    debug!(?server, clarify, "cmd_run: called");
    match server {
        Some(url) => {
            let client = ApiClient::new(url)?;
            let health = client.health().await?;
            info!(provider = ?health.provider, model = ?health.model, "Connected to server");
            run_session(client, goal, clarify).await
        }
        None => run_session(build_engine(config, credentials)?, goal, clarify).await,
    }
}

async fn run_session<B: Backend>(backend: B, goal: &str, clarify: bool) -> Result<()> {
    RunSession::new(Orchestrator::new(backend))?.run(goal, clarify).await
}

fn print_verdict(verdict: &RequirementsVerdict) {
    if !verdict.needs_more_info {
        println!("{}", "The goal is specific enough to compile.".green());
        return;
    }
    println!("{}", "More information needed".bold());
    if let Some(reason) = &verdict.reason {
        println!("{}", reason.dimmed());
    }
    for field in verdict.fields() {
        let required = if field.required { " (required)" } else { "" };
        println!("\n{}{}", field.display_label().bold(), required);
        for option in &field.options {
            println!("  - {}", option);
        }
    }
}

fn print_graph(graph: &ExecutionGraph) {
    println!("{}", graph.goal.bold());
    for step in &graph.steps {
        println!(
            "\n{} {} {}",
            format!("{}.", step.id).blue().bold(),
            step.title.bold(),
            format!("[{}]", step.artifact_type).dimmed()
        );
        println!("   {}", step.instruction);
    }
}
