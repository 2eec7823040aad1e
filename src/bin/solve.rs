//! Minimal CLI front end driving [`eternity_solver::driver`].
//!
//! This is deliberately thin: argument parsing and exit-code mapping only.
//! Puzzle file parsing lives in [`eternity_solver::puzzle`], search in
//! [`eternity_solver::driver`]; this binary just wires the two together and
//! prints a one-line summary of the outcome.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;

use eternity_solver::driver::{self, DriverOptions, Outcome};
use eternity_solver::puzzle::parse_puzzle;
use eternity_solver::selector::PieceOrder;

/// Solve a rectangular edge-matching puzzle.
#[derive(Debug, Parser)]
#[command(name = "solve", about = "Solve a rectangular edge-matching puzzle")]
struct Args {
    /// Path to the puzzle file.
    puzzle: PathBuf,

    /// Increase logging verbosity (stackable: -v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress all logging except warnings and errors.
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Run the multi-worker driver instead of a single-threaded search.
    #[arg(long)]
    parallel: bool,

    /// Worker thread count (implies --parallel if greater than 1).
    #[arg(long)]
    threads: Option<usize>,

    /// Wall-clock time limit, in seconds.
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,

    /// Suppress record publication below this depth.
    #[arg(long, default_value_t = 0, value_name = "N")]
    min_depth: u32,

    /// Disable singleton forcing.
    #[arg(long)]
    no_singletons: bool,

    /// The order in which a cell's candidates are tried.
    #[arg(long, value_enum, default_value_t = CliPieceOrder::Ascending)]
    piece_order: CliPieceOrder,

    /// Directory to read/write checkpoints under. If omitted, checkpointing
    /// is disabled.
    #[arg(long, value_name = "DIR")]
    checkpoint_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
enum CliPieceOrder {
    Ascending,
    Descending,
}

impl From<CliPieceOrder> for PieceOrder {
    fn from(value: CliPieceOrder) -> Self {
        match value {
            CliPieceOrder::Ascending => PieceOrder::Ascending,
            CliPieceOrder::Descending => PieceOrder::Descending,
        }
    }
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(&args);

    let text = match std::fs::read_to_string(&args.puzzle) {
        Ok(text) => text,
        Err(e) => {
            log::error!("failed to read puzzle file {}: {e}", args.puzzle.display());
            return ExitCode::FAILURE;
        }
    };

    let puzzle = match parse_puzzle(&text) {
        Ok(puzzle) => puzzle,
        Err(e) => {
            log::error!("invalid puzzle: {e}");
            return ExitCode::FAILURE;
        }
    };

    let worker_count = args
        .threads
        .unwrap_or_else(|| if args.parallel { DriverOptions::default().worker_count } else { 1 });

    let options = DriverOptions {
        worker_count,
        wall_time_limit: args.timeout.map(Duration::from_secs),
        min_depth_to_record: args.min_depth,
        piece_order: args.piece_order.into(),
        use_singletons: !args.no_singletons,
        checkpoint_dir: args.checkpoint_dir,
        ..DriverOptions::default()
    };

    let outcome = driver::run(puzzle.tiles, puzzle.shape, puzzle.hints, options);

    match outcome {
        Outcome::Solved(_board) => {
            log::info!("solved");
            ExitCode::SUCCESS
        }
        Outcome::NoSolution => {
            log::error!("no solution found");
            ExitCode::FAILURE
        }
        Outcome::Timeout => {
            log::error!("timed out before finding a solution");
            ExitCode::FAILURE
        }
        Outcome::InvalidInput(reason) => {
            log::error!("invalid input: {reason}");
            ExitCode::FAILURE
        }
        Outcome::ResumeFailed(reason) => {
            log::error!("failed to resume from checkpoint: {reason}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(args: &Args) {
    let level = if args.quiet {
        log::LevelFilter::Warn
    } else {
        match args.verbose {
            0 => log::LevelFilter::Info,
            1 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        }
    };
    env_logger::Builder::new().filter_level(level).init();
}
