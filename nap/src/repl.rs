//! Interactive terminal session for `nap run`
//!
//! Asks the clarification questions, compiles the goal, then walks the
//! steps one at a time: generate, show, and let the user complete, skip,
//! regenerate or reopen steps until every step is acknowledged.

use std::collections::HashMap;

use colored::Colorize;
use eyre::{Result, eyre};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing::{debug, info};

use crate::domain::{Acknowledgment, ClarificationField, ExecutionGraph, FieldKind, Progress};
use crate::render::render_artifact;
use crate::session::{Backend, Orchestrator, Preparation, enrich_goal};

/// What the user typed at the step prompt
#[derive(Debug, Clone, PartialEq, Eq)]
enum StepCommand {
    Complete,
    Skip,
    Regenerate,
    Reopen(String),
    List,
    Quit,
    Help,
}

impl StepCommand {
    fn parse(input: &str) -> Option<Self> {
        let mut parts = input.split_whitespace();
        let command = match parts.next()? {
            "c" | "complete" | "done" => StepCommand::Complete,
            "s" | "skip" => StepCommand::Skip,
            "r" | "regen" | "regenerate" => StepCommand::Regenerate,
            "o" | "reopen" | "undo" => StepCommand::Reopen(parts.next()?.to_string()),
            "l" | "list" => StepCommand::List,
            "q" | "quit" | "exit" => StepCommand::Quit,
            "h" | "help" | "?" => StepCommand::Help,
            _ => return None,
        };
        Some(command)
    }
}

/// Interpret an answer to a closed-choice question
///
/// Accepts a 1-based option number or the option text itself. Free-form
/// fields take the input as given.
fn parse_choice(field: &ClarificationField, input: &str) -> Option<String> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }
    if field.kind != FieldKind::Select || field.options.is_empty() {
        return Some(input.to_string());
    }
    if let Ok(n) = input.parse::<usize>() {
        return n.checked_sub(1).and_then(|i| field.options.get(i)).cloned();
    }
    field
        .options
        .iter()
        .find(|o| o.eq_ignore_ascii_case(input))
        .cloned()
}

fn progress_bar(progress: Progress) -> String {
    const WIDTH: usize = 20;
    let filled = if progress.total == 0 {
        0
    } else {
        progress.acknowledged * WIDTH / progress.total
    };
    format!(
        "[{}{}] {}/{} ({}%)",
        "#".repeat(filled),
        "-".repeat(WIDTH - filled),
        progress.acknowledged,
        progress.total,
        progress.percent()
    )
}

/// Interactive session state
pub struct RunSession<B> {
    orchestrator: Orchestrator<B>,
    rl: DefaultEditor,
}

impl<B: Backend> RunSession<B> {
    pub fn new(orchestrator: Orchestrator<B>) -> Result<Self> {
        let rl = DefaultEditor::new().map_err(|e| eyre!("Failed to initialize readline: {}", e))?;
        Ok(Self { orchestrator, rl })
    }

    /// Read one line; `None` on Ctrl+C or Ctrl+D
    fn ask(&mut self, prompt: &str) -> Result<Option<String>> {
        match self.rl.readline(prompt) {
            Ok(line) => {
                let _ = self.rl.add_history_entry(line.as_str());
                Ok(Some(line))
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => Ok(None),
            Err(err) => Err(eyre!("Readline error: {}", err)),
        }
    }

    /// Drive a goal to the done screen
    pub async fn run(mut self, goal: &str, clarify: bool) -> Result<()> {
        debug!(clarify, "RunSession::run: called");
        let goal = if clarify { self.clarify(goal).await? } else { goal.to_string() };
        let Some(goal) = goal_or_abort(goal) else {
            return Ok(());
        };

        println!("{}", "Compiling execution graph...".dimmed());
        let mut graph = self.orchestrator.compile(&goal).await?;
        print_graph(&graph);

        while let Some(step) = graph.next_pending() {
            let step_id = step.id.clone();
            graph = self.show_step(graph, &step_id).await?;

            let Some(next) = self.step_prompt(graph.clone(), &step_id).await? else {
                println!("{}", "Session ended.".dimmed());
                return Ok(());
            };
            graph = next;
            println!("{}\n", progress_bar(graph.progress()).cyan());
        }

        print_done(&graph);
        Ok(())
    }

    /// Ask the clarification questions, returning the (possibly enriched) goal
    async fn clarify(&mut self, goal: &str) -> Result<String> {
        println!("{}", "Analyzing requirements...".dimmed());
        let verdict = match self.orchestrator.prepare(goal).await {
            Preparation::Ready(goal) => return Ok(goal),
            Preparation::NeedsClarification(verdict) => verdict,
        };

        println!("\n{}", "A few details first".bold());
        if let Some(reason) = &verdict.reason {
            println!("{}\n", reason.dimmed());
        }

        let mut answers = HashMap::new();
        for field in verdict.fields() {
            if let Some(answer) = self.ask_field(field)? {
                answers.insert(field.id.clone(), answer);
            }
        }
        info!(answered = answers.len(), "Clarification collected");
        Ok(enrich_goal(goal, verdict.fields(), &answers))
    }

    fn ask_field(&mut self, field: &ClarificationField) -> Result<Option<String>> {
        let marker = if field.required { "*".red().to_string() } else { String::new() };
        println!("{}{}", field.display_label().bold(), marker);
        for (i, option) in field.options.iter().enumerate() {
            println!("  {} {}", format!("{}.", i + 1).dimmed(), option);
        }

        loop {
            let Some(input) = self.ask(&format!("{} ", ">".bright_green()))? else {
                return Ok(None);
            };
            match parse_choice(field, &input) {
                Some(answer) => return Ok(Some(answer)),
                None if input.trim().is_empty() && !field.required => return Ok(None),
                None => println!("{}", "Pick one of the listed options.".yellow()),
            }
        }
    }

    /// Generate (at most once) and print a step's artifact
    async fn show_step(&mut self, graph: ExecutionGraph, step_id: &str) -> Result<ExecutionGraph> {
        let Some(step) = graph.step(step_id) else {
            return Ok(graph);
        };
        println!("{} {}", format!("Step {}:", step.id).bold().blue(), step.title.bold());
        println!("{} {}\n", step.artifact_type.to_string().dimmed(), step.instruction.dimmed());

        let graph = if step.artifact.is_none() {
            println!("{}", "Generating artifact...".dimmed());
            match self.orchestrator.generate_step(&graph, step_id).await {
                Ok(next) => next,
                Err(e) => {
                    println!("{} {}", "Generation failed:".red(), e);
                    graph
                }
            }
        } else {
            graph
        };

        if let Some(step) = graph.step(step_id) {
            match &step.artifact {
                Some(artifact) => println!("{}", render_artifact(artifact, &step.artifact_type).to_terminal()),
                None => println!("{}", "No artifact available for this step.".yellow()),
            }
        }
        Ok(graph)
    }

    /// Prompt until the current step is acknowledged; `None` means quit
    async fn step_prompt(&mut self, mut graph: ExecutionGraph, step_id: &str) -> Result<Option<ExecutionGraph>> {
        loop {
            let Some(input) = self.ask(&format!("{} ", "[c]omplete [s]kip [r]egenerate [h]elp >".bright_green()))? else {
                return Ok(None);
            };
            let Some(command) = StepCommand::parse(&input) else {
                println!("{}", "Unknown command, type h for help.".yellow());
                continue;
            };

            match command {
                StepCommand::Complete => return Ok(Some(graph.acknowledge(step_id, Acknowledgment::Complete)?)),
                StepCommand::Skip => return Ok(Some(graph.acknowledge(step_id, Acknowledgment::Skip)?)),
                StepCommand::Regenerate => {
                    println!("{}", "Regenerating...".dimmed());
                    match self.orchestrator.regenerate_step(&graph, step_id).await {
                        Ok(next) => graph = self.show_step(next, step_id).await?,
                        Err(e) => println!("{} {}", "Generation failed:".red(), e),
                    }
                }
                StepCommand::Reopen(id) => match graph.reset_acknowledgment(&id) {
                    Ok(next) => {
                        graph = next;
                        println!("Step {} reopened.", id);
                    }
                    Err(e) => println!("{}", e.to_string().yellow()),
                },
                StepCommand::List => print_graph(&graph),
                StepCommand::Quit => return Ok(None),
                StepCommand::Help => print_help(),
            }
        }
    }
}

fn goal_or_abort(goal: String) -> Option<String> {
    if goal.trim().is_empty() {
        println!("{}", "Nothing to do: the goal is empty.".yellow());
        None
    } else {
        Some(goal)
    }
}

fn print_graph(graph: &ExecutionGraph) {
    println!("\n{}", graph.goal.bold());
    for step in &graph.steps {
        let mark = if step.completed {
            "✓".green().to_string()
        } else if step.skipped {
            "»".yellow().to_string()
        } else {
            " ".to_string()
        };
        println!("  [{}] {}. {} {}", mark, step.id, step.title, format!("({})", step.artifact_type).dimmed());
    }
    println!("{}\n", progress_bar(graph.progress()).cyan());
}

fn print_help() {
    println!("  c, complete       mark this step completed");
    println!("  s, skip           skip this step");
    println!("  r, regenerate     discard the artifact and generate it again");
    println!("  o, reopen <id>    clear the acknowledgment of a step");
    println!("  l, list           show all steps");
    println!("  q, quit           leave the session");
}

fn print_done(graph: &ExecutionGraph) {
    let completed = graph.steps.iter().filter(|s| s.completed).count();
    let skipped = graph.steps.iter().filter(|s| s.skipped).count();
    println!("{}", "Execution complete".bold().green());
    println!("{}", graph.goal);
    println!("  {} completed, {} skipped", completed.to_string().green(), skipped.to_string().yellow());
}
