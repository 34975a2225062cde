//! CLI entry point for the bottle sort solver.
//!
//! Usage:
//!   bottle-sort solve <puzzle.json> [options]
//!   bottle-sort solve --stdin [options]
//!
//! Options:
//!   --max-expansions <n>   Stop after expanding n states
//!   --timeout <seconds>    Maximum search time
//!   --prune-dead-ends      Skip states with no legal pour
//!   --format <json|text>   Output format (default: json)
//!   -v, -vv, -vvv          Log to stderr (info, debug, trace); RUST_LOG overrides

use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

use bottle_sort::{
    solve_with_observer, BottleId, NoopObserver, PuzzleConfig, SearchObserver, SolverConfig,
    SolverResult, State, TracingObserver,
};

#[derive(Parser)]
#[command(name = "bottle-sort")]
#[command(about = "Shortest-path solver for liquid sorting puzzles")]
#[command(version)]
struct Cli {
    /// Increase log verbosity (repeatable)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Find a minimum-length pour sequence for a puzzle
    Solve {
        /// Path to puzzle JSON file (use --stdin to read from stdin)
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,

        /// Read puzzle from stdin instead of file
        #[arg(long)]
        stdin: bool,

        /// Stop after expanding this many states
        #[arg(long)]
        max_expansions: Option<usize>,

        /// Maximum search time in seconds
        #[arg(long)]
        timeout: Option<u64>,

        /// Skip expansion of states with no legal pour
        #[arg(long)]
        prune_dead_ends: bool,

        /// Output format
        #[arg(long, value_enum, default_value = "json")]
        format: OutputFormat,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Json,
    Text,
}

/// Output format for a solve result
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SolveOutput {
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    solved: bool,
    search_exhausted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    move_count: Option<usize>,
    moves: Vec<MoveOutput>,
    states_expanded: usize,
    states_generated: usize,
    time_elapsed_ms: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct MoveOutput {
    source: BottleRef,
    destination: BottleRef,
    /// Fingerprint of the state after the pour
    state: String,
}

#[derive(Debug, Serialize)]
struct BottleRef {
    slot: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    label: Option<String>,
}

impl BottleRef {
    fn new(state: &State, id: BottleId) -> Self {
        Self {
            slot: id.index(),
            label: state.label(id).map(str::to_string),
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::from(2)
        }
    }
}

fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

/// Returns whether the puzzle was solved.
fn run(cli: Cli) -> Result<bool> {
    match cli.command {
        Commands::Solve {
            file,
            stdin,
            max_expansions,
            timeout,
            prune_dead_ends,
            format,
        } => {
            // Read puzzle JSON
            let json_content = if stdin {
                let mut buffer = String::new();
                io::stdin()
                    .read_to_string(&mut buffer)
                    .context("failed to read puzzle from stdin")?;
                buffer
            } else if let Some(path) = file {
                fs::read_to_string(&path)
                    .with_context(|| format!("failed to read {}", path.display()))?
            } else {
                bail!("must provide either a file path or --stdin");
            };

            // Parse puzzle
            let puzzle: PuzzleConfig =
                serde_json::from_str(&json_content).context("failed to parse puzzle JSON")?;
            let initial = puzzle.build_state().context("invalid puzzle")?;
            tracing::info!(
                id = puzzle.id.as_deref().unwrap_or("-"),
                bottles = initial.slot_count(),
                colors = initial.palette().len(),
                "loaded puzzle"
            );

            // Build solver config
            let config = SolverConfig {
                max_expansions,
                timeout: timeout.map(Duration::from_secs),
                prune_dead_ends,
            };

            // Run solver
            let mut tracing_observer = TracingObserver;
            let mut noop_observer = NoopObserver;
            let observer: &mut dyn SearchObserver = if cli.verbose >= 2 {
                &mut tracing_observer
            } else {
                &mut noop_observer
            };
            let result = solve_with_observer(&initial, &config, observer)
                .context("search aborted")?;

            // Output result
            match format {
                OutputFormat::Json => {
                    let output = format_result(puzzle.id, &result);
                    println!("{}", serde_json::to_string_pretty(&output)?);
                }
                OutputFormat::Text => print_text(&result),
            }

            Ok(result.solved)
        }
    }
}

fn format_result(id: Option<String>, result: &SolverResult) -> SolveOutput {
    SolveOutput {
        id,
        solved: result.solved,
        search_exhausted: result.search_exhausted,
        move_count: result.move_count(),
        moves: result
            .transitions
            .iter()
            .filter_map(|t| {
                let pour = t.pour?;
                Some(MoveOutput {
                    source: BottleRef::new(&t.successor, pour.source),
                    destination: BottleRef::new(&t.successor, pour.destination),
                    state: t.successor.to_string(),
                })
            })
            .collect(),
        states_expanded: result.states_expanded,
        states_generated: result.states_generated,
        time_elapsed_ms: result.time_elapsed_ms,
    }
}

fn print_text(result: &SolverResult) {
    if !result.solved {
        if result.search_exhausted {
            println!("No solution found");
        } else {
            println!("Search stopped before finding a solution");
        }
        return;
    }

    println!("Winning transitions ({} moves):", result.transitions.len() - 1);
    for transition in &result.transitions {
        match (&transition.predecessor, transition.pour) {
            (Some(predecessor), Some(pour)) => println!(
                "\t{} -> {}  [{} into {}]",
                predecessor,
                transition.successor,
                describe(&transition.successor, pour.source),
                describe(&transition.successor, pour.destination),
            ),
            _ => println!("\tstart {}", transition.successor),
        }
    }
    println!(
        "Expanded {} states (generated {} total) in {} ms.",
        result.states_expanded, result.states_generated, result.time_elapsed_ms
    );
}

fn describe(state: &State, id: BottleId) -> String {
    match state.label(id) {
        Some(label) => label.to_string(),
        None => format!("#{id}"),
    }
}
