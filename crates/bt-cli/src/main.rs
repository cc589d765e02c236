//! btree - behavior-tree scenario runner.
//!
//! - `btree run <scenario>` - build the tree from a YAML scenario and tick it to completion
//! - `btree check <scenario>` - validate schemas and instance lines without ticking
//! - `btree predicates <scenario>` - show predicates persisted by earlier runs

mod config;
mod domain;
mod sink;

use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use bt_runtime::{trace, FlowResults, NodeStatus, TraceLog};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::Scenario;
use crate::domain::Prepared;
use crate::sink::JsonlSink;

#[derive(Parser)]
#[command(name = "btree")]
#[command(about = "Behavior-tree scenario runner", version)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the tree and tick it until it finishes
    Run {
        /// Scenario file
        scenario: PathBuf,

        /// Override the scenario's tick limit
        #[arg(long)]
        max_ticks: Option<u64>,

        /// Print the node lifecycle trace after the run
        #[arg(long)]
        trace: bool,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Validate a scenario without ticking
    Check {
        /// Scenario file
        scenario: PathBuf,
    },

    /// Show predicates persisted by previous runs
    Predicates {
        /// Scenario file
        scenario: PathBuf,

        /// Number of entries to show
        #[arg(long, default_value = "20")]
        limit: usize,
    },
}

/// Outcome of a `run`, printed at the end.
#[derive(Debug, Serialize)]
struct RunReport {
    scenario: String,
    status: NodeStatus,
    ticks: u64,
    succeeded: usize,
    failed: usize,
    total: usize,
    predicates: usize,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    match cli.command {
        Commands::Run {
            scenario,
            max_ticks,
            trace,
            json,
        } => run_scenario(&scenario, max_ticks, trace, json),
        Commands::Check { scenario } => check_scenario(&scenario),
        Commands::Predicates { scenario, limit } => show_predicates(&scenario, limit),
    }
}

fn run_scenario(path: &Path, max_ticks: Option<u64>, show_trace: bool, json: bool) -> Result<()> {
    let scenario = Scenario::load(path)?;
    tracing::info!(scenario = %scenario.name, path = %path.display(), "Starting run");

    let Prepared { mut tree, .. } = domain::prepare(&scenario, show_trace)?;
    let limit = max_ticks.unwrap_or(scenario.max_ticks);
    let status = tree.run(scenario.tick_seconds, limit);

    if !status.is_finished() {
        tracing::warn!(ticks = tree.tick_count(), "Tick limit reached before the tree finished");
    }

    let FlowResults {
        succeeded,
        failed,
        total,
    } = tree.flow().results();
    let report = RunReport {
        scenario: scenario.name.clone(),
        status,
        ticks: tree.tick_count(),
        succeeded,
        failed,
        total,
        predicates: tree.blackboard().predicate_count(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Scenario:   {}", report.scenario);
        println!("Status:     {:?}", report.status);
        println!("Ticks:      {}", report.ticks);
        println!("Actions:    {} succeeded, {} failed, {} total", succeeded, failed, total);
        println!("Predicates: {}", report.predicates);
    }

    if show_trace {
        print_trace(&trace::take(tree.blackboard_mut()));
    }

    if !status.is_finished() {
        bail!("scenario '{}' did not finish within {} ticks", scenario.name, limit);
    }
    Ok(())
}

fn print_trace(log: &TraceLog) {
    println!();
    println!("Trace:");
    for event in &log.events {
        println!("  {:>5}  {:<14} {}", event.tick, event.tag, event.subject);
    }
}

fn check_scenario(path: &Path) -> Result<()> {
    let mut scenario = Scenario::load(path)?;
    // Validation must not append to the run's predicate log.
    scenario.persist_predicates = None;

    let prepared = domain::prepare(&scenario, false)?;
    let graph = prepared.tree.flow().graph();
    if graph.has_cycle() {
        bail!("scenario '{}' orders its actions in a cycle", scenario.name);
    }

    println!("Scenario '{}' is valid", scenario.name);
    println!("  Entity types:    {}", scenario.domain.entities.len());
    println!("  Predicate types: {}", scenario.domain.predicates.len());
    println!("  Action types:    {}", scenario.domain.actions.len());
    println!("  Entities:        {}", prepared.entities);
    println!("  Predicates:      {}", prepared.predicates);
    println!("  Actions:         {}", prepared.actions);
    println!("  Execution order:");
    for id in graph.execution_order() {
        if let Some(node) = graph.node(id) {
            println!("    {}", node.name());
        }
    }
    Ok(())
}

fn show_predicates(path: &Path, limit: usize) -> Result<()> {
    let scenario = Scenario::load(path)?;
    let Some(persist) = scenario.persist_predicates else {
        println!("Scenario '{}' does not persist predicates", scenario.name);
        return Ok(());
    };

    let entries = JsonlSink::new(persist).read_recent(limit);
    if entries.is_empty() {
        println!("No persisted predicates");
        return Ok(());
    }
    for entry in entries {
        let negation = if entry.record.negated { "not " } else { "" };
        println!(
            "{}  {}{}",
            entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
            negation,
            entry.record.signature
        );
    }
    Ok(())
}
