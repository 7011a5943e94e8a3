//! twinpane - copy, move and delete file trees from the terminal.
//!
//! Usage:
//!   twinpane copy <SOURCES>... --to <DIR>     Copy into a directory
//!   twinpane move <SOURCES>... --to <DIR>     Move into a directory
//!   twinpane delete <PATHS>...                Move to the recycle bin
//!   twinpane delete <PATHS>... --permanent    Delete for good
//!   twinpane --help                           Show help

mod console;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand, ValueEnum};
use color_eyre::eyre::{Context, Result};
use tracing_subscriber::EnvFilter;

use twinpane_core::EngineConfig;
use twinpane_ops::{ConflictDecision, DeleteMode, FileOperation, OperationExecutor, Outcome};

#[derive(Parser)]
#[command(
    name = "twinpane",
    version,
    about = "Copy, move and delete file trees with conflict prompts",
    long_about = "twinpane runs the transfer and deletion engines of a dual-pane file \
                  manager from the terminal.\n\n\
                  Conflicts and failures are asked about interactively unless \
                  --on-conflict says otherwise. Ctrl-C cancels the running operation."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[command(flatten)]
    options: Options,
}

#[derive(Subcommand)]
enum Command {
    /// Copy files and directories into a directory
    Copy {
        /// Files and directories to copy
        #[arg(required = true)]
        sources: Vec<PathBuf>,

        /// Destination directory (created if missing)
        #[arg(short, long = "to")]
        to: PathBuf,
    },

    /// Move files and directories into a directory
    Move {
        /// Files and directories to move
        #[arg(required = true)]
        sources: Vec<PathBuf>,

        /// Destination directory (created if missing)
        #[arg(short, long = "to")]
        to: PathBuf,
    },

    /// Delete files and directories
    Delete {
        /// Files and directories to delete
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Delete for good instead of using the recycle bin
        #[arg(long)]
        permanent: bool,
    },
}

#[derive(Args)]
struct Options {
    /// What to do when a destination already exists
    #[arg(long, value_enum, default_value = "ask", global = true)]
    on_conflict: ConflictPolicy,

    /// Copy buffer size in bytes
    #[arg(long, global = true)]
    chunk_size: Option<usize>,

    /// Measure the whole source tree before starting
    #[arg(long, global = true)]
    precompute_totals: bool,

    /// Delete replaced items outright instead of recycling them
    #[arg(long, global = true)]
    no_recycle: bool,

    /// Print the final report as JSON on stdout
    #[arg(long, global = true)]
    json: bool,

    /// Log every step to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum, Default)]
enum ConflictPolicy {
    /// Prompt for every conflict
    #[default]
    Ask,
    Skip,
    Overwrite,
    /// Overwrite only when the source is newer
    Newer,
    /// Keep both, giving the incoming item a free name
    Rename,
    Abort,
}

impl ConflictPolicy {
    fn decision(self) -> Option<ConflictDecision> {
        match self {
            Self::Ask => None,
            Self::Skip => Some(ConflictDecision::Skip),
            Self::Overwrite => Some(ConflictDecision::Overwrite),
            Self::Newer => Some(ConflictDecision::OverwriteIfNewer),
            // A cached rename always takes each conflict's own suggestion.
            Self::Rename => Some(ConflictDecision::Rename(String::new())),
            Self::Abort => Some(ConflictDecision::Abort),
        }
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    color_eyre::install()?;

    let cli = Cli::parse();
    init_tracing(cli.options.verbose);

    let mut executor = OperationExecutor::new(engine_config(&cli.options)?);
    if let Some(decision) = cli.options.on_conflict.decision() {
        executor = executor.with_resolution(decision);
    }

    let operation = match cli.command {
        Command::Copy { sources, to } => FileOperation::copy(absolute(sources)?, to),
        Command::Move { sources, to } => FileOperation::move_to(absolute(sources)?, to),
        Command::Delete { paths, permanent } => {
            let mode = if permanent {
                DeleteMode::Permanent
            } else {
                DeleteMode::RecycleBin
            };
            FileOperation::delete(absolute(paths)?, mode)
        }
    };

    let complete = console::drive(executor.execute(operation)).await;

    if cli.options.json {
        println!("{}", serde_json::to_string_pretty(&complete)?);
    } else {
        eprintln!("{}", complete.summary());
        for error in &complete.errors {
            eprintln!("  {error}");
        }
    }

    Ok(exit_code(complete.outcome))
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "twinpane=debug,twinpane_ops=debug,twinpane_core=debug"
    } else {
        "warn"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn engine_config(options: &Options) -> Result<EngineConfig> {
    let mut builder = EngineConfig::builder();
    builder
        .precompute_totals(options.precompute_totals)
        .recycle_replaced(!options.no_recycle);
    if let Some(chunk_size) = options.chunk_size {
        builder.chunk_size(chunk_size);
    }
    builder.build().context("Invalid engine configuration")
}

/// Resolve paths against the working directory without touching the
/// filesystem; missing sources are the engine's business.
fn absolute(paths: Vec<PathBuf>) -> Result<Vec<PathBuf>> {
    paths
        .into_iter()
        .map(|p| std::path::absolute(&p).with_context(|| format!("Invalid path {}", p.display())))
        .collect()
}

fn exit_code(outcome: Outcome) -> ExitCode {
    match outcome {
        Outcome::Completed => ExitCode::SUCCESS,
        Outcome::CompletedWithErrors => ExitCode::from(1),
        Outcome::Faulted => ExitCode::from(2),
        Outcome::Cancelled => ExitCode::from(130),
    }
}
