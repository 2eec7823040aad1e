//! Spawns a bounded pool of worker searches over one puzzle, coordinates
//! cancellation, and arranges periodic checkpoints.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::checkpoint::{digest, CheckpointData, CheckpointIo};
use crate::edge_index::EdgeIndex;
use crate::metrics::MetricsHandle;
use crate::model::{Board, BoardShape, Hint, TileSet};
use crate::search::{SearchOutcome, StatsCounters, Worker};
use crate::selector::PieceOrder;
use crate::shared_best::SharedBest;

/// Configuration for [`run`]. Mirrors spec.md §4.10's option set.
#[derive(Debug, Clone)]
pub struct DriverOptions {
    /// Number of worker threads. Defaults to `max(4, 3/4 of available cores)`.
    pub worker_count: usize,
    /// Abandon the search after this much wall-clock time.
    pub wall_time_limit: Option<Duration>,
    /// How often the checkpoint thread persists the current shared best.
    pub checkpoint_interval: Duration,
    /// Suppress noisy record publication below this depth.
    pub min_depth_to_record: u32,
    /// The order in which a cell's candidates are tried.
    pub piece_order: PieceOrder,
    /// Whether singleton forcing (§4.6) is enabled.
    pub use_singletons: bool,
    /// If set, checkpoints are written under this directory.
    pub checkpoint_dir: Option<PathBuf>,
    /// If set, bound to this run's [`SharedBest`] and per-worker
    /// [`StatsCounters`] for the duration of the call, so another thread can
    /// poll [`MetricsHandle::snapshot`] while `run` is still blocking.
    pub metrics: Option<Arc<MetricsHandle>>,
    /// Only consulted by [`run_many`]: the wall-clock budget a rotation
    /// worker gives one puzzle configuration before checkpointing it and
    /// returning it to the shared queue. Ignored by [`run`].
    pub config_rotation_interval: Option<Duration>,
}

impl Default for DriverOptions {
    fn default() -> Self {
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4);
        DriverOptions {
            worker_count: (cores * 3 / 4).max(4),
            wall_time_limit: None,
            checkpoint_interval: Duration::from_secs(60),
            min_depth_to_record: 0,
            piece_order: PieceOrder::FixedRandom,
            use_singletons: true,
            checkpoint_dir: None,
            metrics: None,
            config_rotation_interval: Some(Duration::from_secs(600)),
        }
    }
}

/// The outcome of a full driver run.
pub enum Outcome {
    /// A worker found a complete, valid solution.
    Solved(Board),
    /// The search space was exhausted with no solution.
    NoSolution,
    /// The wall-time limit elapsed before any worker finished.
    Timeout,
    /// The puzzle failed validation before search started.
    InvalidInput(String),
    /// Resuming from a checkpoint failed.
    ResumeFailed(String),
}

/// Run the search for a single puzzle with `options`, optionally resuming
/// from an existing checkpoint under `options.checkpoint_dir`.
pub fn run(tiles: TileSet, shape: BoardShape, hints: Vec<Hint>, options: DriverOptions) -> Outcome {
    if let Err(e) = tiles.validate_counts(shape.rows, shape.columns) {
        log::warn!("puzzle failed validation: {e}");
        return Outcome::InvalidInput(e.to_string());
    }

    let checkpoint_io = match options.checkpoint_dir.as_ref().map(CheckpointIo::new) {
        Some(Ok(io)) => Some(Arc::new(io)),
        Some(Err(e)) => return Outcome::InvalidInput(format!("checkpoint dir: {e}")),
        None => None,
    };

    let (base_board, pinned_count, resumed_compute_ms) =
        match resume_board(&tiles, &shape, &hints, checkpoint_io.as_deref()) {
            Ok(v) => v,
            Err(e) => return Outcome::ResumeFailed(e),
        };
    if resumed_compute_ms > 0 {
        log::info!("resumed from checkpoint, {resumed_compute_ms}ms of prior compute time");
    }

    let edge_index = EdgeIndex::build(&tiles, color_count(&tiles));
    let shared_best = Arc::new(SharedBest::default());
    let cancel = Arc::new(AtomicBool::new(false));
    let checkpoint_due = Arc::new(AtomicBool::new(false));
    let started = Instant::now();
    let worker_count = options.worker_count.max(1);
    log::info!("starting search with {worker_count} worker(s) on a {}x{} board", shape.rows, shape.columns);

    let worker_stats: Vec<Arc<StatsCounters>> =
        (0..worker_count).map(|_| Arc::new(StatsCounters::default())).collect();
    if let Some(handle) = &options.metrics {
        handle.bind(Arc::clone(&shared_best), worker_stats.clone());
    }

    let (timed_out, results) = std::thread::scope(|scope| {
        if let Some(limit) = options.wall_time_limit {
            let cancel = Arc::clone(&cancel);
            scope.spawn(move || {
                sleep_cancellable(limit, &cancel);
                cancel.store(true, Ordering::Relaxed);
            });
        }

        if let Some(interval) = Some(options.checkpoint_interval).filter(|_| checkpoint_io.is_some()) {
            let cancel = Arc::clone(&cancel);
            let checkpoint_due = Arc::clone(&checkpoint_due);
            scope.spawn(move || {
                while sleep_cancellable(interval, &cancel) {
                    checkpoint_due.store(true, Ordering::Relaxed);
                }
            });
        }

        let mut handles = Vec::with_capacity(worker_count);
        for worker_id in 0..worker_count {
            let tiles = &tiles;
            let edge_index = &edge_index;
            let board = base_board.clone();
            let cancel = Arc::clone(&cancel);
            let shared_best = Arc::clone(&shared_best);
            let checkpoint_due = Arc::clone(&checkpoint_due);
            let checkpoint_io = checkpoint_io.clone();
            let piece_order = options.piece_order;
            let use_singletons = options.use_singletons;
            let min_depth_to_record = options.min_depth_to_record;
            let stats = Arc::clone(&worker_stats[worker_id]);
            handles.push(scope.spawn(move || {
                let mut worker = Worker::new(
                    board,
                    tiles,
                    edge_index,
                    StdRng::seed_from_u64(worker_id as u64),
                    worker_id as u64,
                    cancel,
                    shared_best,
                    worker_id as u32,
                    piece_order,
                    use_singletons,
                    min_depth_to_record,
                    pinned_count,
                    checkpoint_due,
                    checkpoint_io,
                    resumed_compute_ms,
                    stats,
                );
                let outcome = worker.solve();
                (outcome, worker.board)
            }));
        }

        let mut results = Vec::with_capacity(worker_count);
        for handle in handles {
            if let Ok(result) = handle.join() {
                if result.0 == SearchOutcome::Found {
                    cancel.store(true, Ordering::Relaxed);
                }
                results.push(result);
            }
        }

        let timed_out = options
            .wall_time_limit
            .is_some_and(|limit| started.elapsed() >= limit);
        cancel.store(true, Ordering::Relaxed);
        (timed_out, results)
    });

    if let Some(io) = &checkpoint_io {
        let elapsed_ms = started.elapsed().as_millis() as u64 + resumed_compute_ms;
        if let Some(snapshot) = shared_best.get_snapshot() {
            let data = CheckpointData::from_board(&tiles, &snapshot.board.to_board(), 0, elapsed_ms);
            if let Err(e) = io.write(&io.current_path(), &data) {
                log::warn!("failed to write final checkpoint: {e}");
            }
        }
    }

    if let Some((_, board)) = results.iter().find(|(outcome, _)| *outcome == SearchOutcome::Found) {
        log::info!("search solved after {:?}", started.elapsed());
        return Outcome::Solved(board.clone());
    }
    if results.iter().any(|(outcome, _)| *outcome == SearchOutcome::Cancelled) && timed_out {
        log::info!("search timed out after {:?}", started.elapsed());
        return Outcome::Timeout;
    }
    log::info!("search space exhausted with no solution after {:?}", started.elapsed());
    Outcome::NoSolution
}

/// Sleep for up to `duration`, polling `cancel` in short quanta so a
/// concurrently-cancelled run doesn't keep this thread (and, transitively,
/// the enclosing `std::thread::scope` join) alive for the rest of the
/// timer's period. Returns `true` if the full duration elapsed without
/// `cancel` being observed set, `false` if it returned early because of one.
fn sleep_cancellable(duration: Duration, cancel: &AtomicBool) -> bool {
    const POLL_QUANTUM: Duration = Duration::from_millis(10);
    let deadline = Instant::now() + duration;
    loop {
        if cancel.load(Ordering::Relaxed) {
            return false;
        }
        let now = Instant::now();
        if now >= deadline {
            return true;
        }
        std::thread::sleep((deadline - now).min(POLL_QUANTUM));
    }
}

fn color_count(tiles: &TileSet) -> usize {
    tiles
        .indices()
        .flat_map(|i| tiles.tile(i).edges())
        .map(|c| c as usize)
        .max()
        .map(|m| m + 1)
        .unwrap_or(1)
}

fn resume_board(
    tiles: &TileSet,
    shape: &BoardShape,
    hints: &[Hint],
    checkpoint_io: Option<&CheckpointIo>,
) -> Result<(Board, u32, u64), String> {
    if let Some(io) = checkpoint_io {
        let path = io.current_path();
        if path.exists() {
            let data = io.read(&path).map_err(|e| e.to_string())?;
            if data.tile_set_digest != digest(tiles) {
                return Err(crate::error::SolverError::IncompatibleCheckpoint(
                    "checkpoint tileset digest does not match this puzzle".into(),
                )
                .to_string());
            }
            if data.rows != shape.rows || data.columns != shape.columns {
                return Err(crate::error::SolverError::IncompatibleCheckpoint(format!(
                    "checkpoint is {}x{} but this puzzle is {}x{}",
                    data.rows, data.columns, shape.rows, shape.columns
                ))
                .to_string());
            }
            let mut board = shape.new_board();
            for (pos, placement) in data.ordered_placements() {
                board.place(pos, placement);
            }
            // Resumed placements are not pinned: they can be backtracked
            // through like any ordinary placement, per spec.md §4.10.
            return Ok((board, 0, data.cumulative_compute_ms));
        }
    }

    let mut board = shape.new_board();
    for hint in hints {
        board.apply_hint(hint);
    }
    Ok((board, hints.len() as u32, 0))
}

/// One puzzle configuration to be solved as part of a [`run_many`] rotation.
pub struct PuzzleEntry {
    /// Stable identifier used for this puzzle's checkpoint subdirectory and
    /// to report which entry an [`Outcome`] belongs to.
    pub id: String,
    /// The puzzle's tile catalog.
    pub tiles: TileSet,
    /// The puzzle's board dimensions.
    pub shape: BoardShape,
    /// Fixed-piece hints for this puzzle.
    pub hints: Vec<Hint>,
}

/// One puzzle's outcome from a [`run_many`] rotation.
pub struct RotationResult {
    /// The [`PuzzleEntry::id`] this result belongs to.
    pub id: String,
    /// The outcome this puzzle reached (or last reached, for a puzzle that
    /// exhausted its overall wall-clock budget mid-rotation).
    pub outcome: Outcome,
}

/// Drive multiple puzzle configurations to completion with a shared pool of
/// `options.worker_count` rotation threads, per spec.md §4.10's "rotation
/// across puzzles" policy.
///
/// Each rotation thread repeatedly pulls the next config from a shared
/// queue — preferring configs never started, then the config with the
/// smallest cumulative compute time so far (fair-share) — and solves it
/// single-threaded for up to `options.config_rotation_interval`. If that
/// budget elapses without a terminal outcome, the attempt's checkpoint (if
/// `checkpoint_root` is set) is left on disk and the config returns to the
/// queue for another thread to pick up later; otherwise its result is
/// recorded and it is retired from the rotation.
///
/// `options.worker_count` here is the number of *rotation* threads, each
/// solving one puzzle at a time single-threaded — not, as in [`run`], the
/// number of workers fanned out over a single puzzle.
pub fn run_many(
    puzzles: Vec<PuzzleEntry>,
    options: DriverOptions,
    checkpoint_root: Option<&std::path::Path>,
) -> Vec<RotationResult> {
    let n = puzzles.len();
    if n == 0 {
        return Vec::new();
    }
    let rotation_interval = options
        .config_rotation_interval
        .unwrap_or(Duration::from_secs(600));
    let overall_deadline = options.wall_time_limit.map(|d| Instant::now() + d);
    let rotation_workers = options.worker_count.max(1).min(n);

    let queue: parking_lot::Mutex<std::collections::VecDeque<usize>> =
        parking_lot::Mutex::new((0..n).collect());
    let compute_ms: Vec<AtomicU64> = (0..n).map(|_| AtomicU64::new(0)).collect();
    let started: Vec<AtomicBool> = (0..n).map(|_| AtomicBool::new(false)).collect();
    let results: Vec<parking_lot::Mutex<Option<RotationResult>>> =
        (0..n).map(|_| parking_lot::Mutex::new(None)).collect();

    let pick_next = || -> Option<usize> {
        let mut q = queue.lock();
        if q.is_empty() {
            return None;
        }
        // Prefer a never-started config; otherwise the one with the least
        // cumulative compute time to date (fair-share).
        let best = q
            .iter()
            .enumerate()
            .min_by_key(|&(_, &idx)| {
                let never_started = !started[idx].load(Ordering::Relaxed);
                (std::cmp::Reverse(never_started), compute_ms[idx].load(Ordering::Relaxed))
            })
            .map(|(pos, _)| pos)?;
        q.remove(best)
    };

    std::thread::scope(|scope| {
        for _ in 0..rotation_workers {
            let puzzles = &puzzles;
            let pick_next = &pick_next;
            let queue = &queue;
            let compute_ms = &compute_ms;
            let started = &started;
            let results = &results;
            let options = options.clone();
            scope.spawn(move || loop {
                if overall_deadline.is_some_and(|d| Instant::now() >= d) {
                    return;
                }
                let Some(idx) = pick_next() else { return };
                started[idx].store(true, Ordering::Relaxed);
                let entry = &puzzles[idx];

                let remaining_overall = overall_deadline.map(|d| d.saturating_duration_since(Instant::now()));
                let attempt_limit = match remaining_overall {
                    Some(remaining) => rotation_interval.min(remaining),
                    None => rotation_interval,
                };

                let attempt_options = DriverOptions {
                    worker_count: 1,
                    wall_time_limit: Some(attempt_limit),
                    checkpoint_interval: options.checkpoint_interval,
                    min_depth_to_record: options.min_depth_to_record,
                    piece_order: options.piece_order,
                    use_singletons: options.use_singletons,
                    checkpoint_dir: checkpoint_root.map(|root| root.join(&entry.id)),
                    metrics: None,
                    config_rotation_interval: None,
                };

                let attempt_started = Instant::now();
                let outcome = run(
                    entry.tiles.clone(),
                    entry.shape,
                    entry.hints.clone(),
                    attempt_options,
                );
                compute_ms[idx].fetch_add(attempt_started.elapsed().as_millis() as u64, Ordering::Relaxed);

                let overall_deadline_passed =
                    overall_deadline.is_some_and(|d| Instant::now() >= d);
                match outcome {
                    Outcome::Timeout if !overall_deadline_passed => {
                        // Rotation budget elapsed, not the overall deadline:
                        // checkpoint is already on disk (if configured);
                        // return the config to the queue for another pass.
                        queue.lock().push_back(idx);
                    }
                    other => {
                        *results[idx].lock() = Some(RotationResult {
                            id: entry.id.clone(),
                            outcome: other,
                        });
                    }
                }
            });
        }
    });

    puzzles
        .iter()
        .enumerate()
        .map(|(idx, entry)| {
            results[idx].lock().take().unwrap_or(RotationResult {
                id: entry.id.clone(),
                outcome: Outcome::Timeout,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::BORDER;

    #[test]
    fn solves_a_trivial_one_by_one_puzzle() {
        let tiles = TileSet::new([(1, [BORDER, BORDER, BORDER, BORDER])]).unwrap();
        let shape = BoardShape::new(1, 1);
        let options = DriverOptions {
            worker_count: 1,
            ..DriverOptions::default()
        };
        let outcome = run(tiles, shape, Vec::new(), options);
        match outcome {
            Outcome::Solved(board) => {
                assert_eq!(board.get(crate::model::Pos::new(0, 0)).unwrap().tile, 0)
            }
            _ => panic!("expected the trivial 1x1 puzzle to solve"),
        }
    }

    #[test]
    fn reports_no_solution_for_an_unsolvable_puzzle() {
        let tiles = TileSet::new([
            (1, [BORDER, 3, BORDER, BORDER]),
            (2, [BORDER, BORDER, BORDER, 4]),
        ])
        .unwrap();
        let shape = BoardShape::new(1, 2);
        let options = DriverOptions {
            worker_count: 2,
            piece_order: PieceOrder::Ascending,
            ..DriverOptions::default()
        };
        let outcome = run(tiles, shape, Vec::new(), options);
        assert!(matches!(outcome, Outcome::NoSolution));
    }

    #[test]
    fn run_many_rotates_across_several_puzzles_and_solves_them_all() {
        let one_by_one = |id: &str| PuzzleEntry {
            id: id.to_string(),
            tiles: TileSet::new([(1, [BORDER, BORDER, BORDER, BORDER])]).unwrap(),
            shape: BoardShape::new(1, 1),
            hints: Vec::new(),
        };
        let puzzles = vec![one_by_one("a"), one_by_one("b"), one_by_one("c")];
        let options = DriverOptions {
            worker_count: 2,
            config_rotation_interval: Some(Duration::from_secs(5)),
            wall_time_limit: Some(Duration::from_secs(10)),
            ..DriverOptions::default()
        };
        let results = run_many(puzzles, options, None);
        assert_eq!(results.len(), 3);
        for result in &results {
            assert!(
                matches!(result.outcome, Outcome::Solved(_)),
                "puzzle {} did not solve",
                result.id
            );
        }
    }

    #[test]
    fn run_many_prefers_never_started_configs_over_previously_touched_ones() {
        let one_by_one = |id: &str| PuzzleEntry {
            id: id.to_string(),
            tiles: TileSet::new([(1, [BORDER, BORDER, BORDER, BORDER])]).unwrap(),
            shape: BoardShape::new(1, 1),
            hints: Vec::new(),
        };
        // A single rotation worker still drains every puzzle in the queue,
        // not just the first one it happens to pick up.
        let puzzles = vec![one_by_one("x"), one_by_one("y")];
        let options = DriverOptions {
            worker_count: 1,
            config_rotation_interval: Some(Duration::from_secs(5)),
            ..DriverOptions::default()
        };
        let results = run_many(puzzles, options, None);
        let ids: std::collections::HashSet<_> = results.iter().map(|r| r.id.clone()).collect();
        assert_eq!(ids, ["x".to_string(), "y".to_string()].into_iter().collect());
        assert!(results.iter().all(|r| matches!(r.outcome, Outcome::Solved(_))));
    }
}
