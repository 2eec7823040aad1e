//! The recursive backtracking search: propagate, force singletons, select a
//! cell, try its candidates in order, recurse, and roll back.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use rand::rngs::StdRng;

use crate::checkpoint::{CheckpointData, CheckpointIo};
use crate::domain::{unpack, DomainStore};
use crate::edge_index::EdgeIndex;
use crate::model::{Board, Placement, Pos, Rotation, TileSet};
use crate::propagate::{propagate, PropagateOutcome};
use crate::selector::{next_cell, order_candidates, restrict_to_canonical_rotation, PieceOrder};
use crate::shared_best::SharedBest;
use crate::singleton::{force_singletons, SingletonOutcome};

/// A single monotonically-increasing counter, safe to read from another
/// thread while a worker is still running.
#[derive(Debug, Default)]
pub struct Counter(AtomicU64);

impl Counter {
    /// Bump this counter by one.
    pub fn increment(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    /// The counter's current value.
    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// Per-worker monotonically increasing search statistics, readable from
/// another thread for `snapshot_metrics` without locking the worker itself.
#[derive(Debug)]
pub struct StatsCounters {
    /// Number of times `recurse` was entered.
    pub recursive_calls: Counter,
    /// Number of candidate placements attempted (including ones that fail
    /// immediately on recursion).
    pub placements_tried: Counter,
    /// Number of times a candidate was undone after its subtree exhausted.
    pub backtracks: Counter,
    /// Number of placements forced by singleton collapse rather than branching.
    pub singletons_placed: Counter,
    /// Number of times propagation or singleton-forcing found an empty domain.
    pub deadends_detected: Counter,
    /// Number of edge-compatibility fit checks performed (propagator support
    /// tests); a coarse measure of raw search work independent of placements.
    pub fit_checks: Counter,
    last_publish: Mutex<Instant>,
}

impl Default for StatsCounters {
    fn default() -> Self {
        StatsCounters {
            recursive_calls: Counter::default(),
            placements_tried: Counter::default(),
            backtracks: Counter::default(),
            singletons_placed: Counter::default(),
            deadends_detected: Counter::default(),
            fit_checks: Counter::default(),
            last_publish: Mutex::new(Instant::now()),
        }
    }
}

impl StatsCounters {
    /// The instant this worker last published a record to [`SharedBest`].
    pub fn last_publish(&self) -> Instant {
        *self.last_publish.lock()
    }

    fn mark_published(&self) {
        *self.last_publish.lock() = Instant::now();
    }
}

/// The result of a complete search attempt by one worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchOutcome {
    /// A complete, valid solution was found; the board holds it.
    Found,
    /// The entire search space was exhausted with no solution.
    Exhausted,
    /// The search was cancelled (timeout or a peer worker found a solution)
    /// before it could finish.
    Cancelled,
}

/// One worker's exclusively-owned search state: its board, domain store, and
/// statistics. Shared immutable state (the tileset, edge index) and the one
/// piece of cross-worker mutable state (`SharedBest`) are borrowed.
pub struct Worker<'a> {
    pub board: Board,
    pub store: DomainStore,
    tiles: &'a TileSet,
    edge_index: &'a EdgeIndex,
    pub stats: Arc<StatsCounters>,
    rng: StdRng,
    seed: u64,
    cancel: Arc<AtomicBool>,
    shared_best: Arc<SharedBest>,
    worker_id: u32,
    piece_order: PieceOrder,
    use_singletons: bool,
    min_depth_to_record: u32,
    pinned_count: u32,
    used_canonical_symmetry_break: bool,
    checkpoint_due: Arc<AtomicBool>,
    checkpoint_io: Option<Arc<CheckpointIo>>,
    search_started: Instant,
    resumed_compute_ms: u64,
    recursion_depth: usize,
}

impl<'a> Worker<'a> {
    /// Construct a worker from an (optionally hint- or resume-prefilled)
    /// board. `pinned_count` is the number of cells that are not counted
    /// toward "depth placed so far" (hints) — resumed checkpoint placements
    /// are not pinned, so pass `0` for those.
    ///
    /// `checkpoint_due` is polled at the root recursion frame, between
    /// candidate iterations, per spec §4.10: the driver's timer thread sets
    /// it, the worker clears it and writes a checkpoint at its next safe
    /// point. Pass `None` for `checkpoint_io` to disable mid-search
    /// checkpointing (e.g. in unit tests).
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        board: Board,
        tiles: &'a TileSet,
        edge_index: &'a EdgeIndex,
        rng: StdRng,
        seed: u64,
        cancel: Arc<AtomicBool>,
        shared_best: Arc<SharedBest>,
        worker_id: u32,
        piece_order: PieceOrder,
        use_singletons: bool,
        min_depth_to_record: u32,
        pinned_count: u32,
        checkpoint_due: Arc<AtomicBool>,
        checkpoint_io: Option<Arc<CheckpointIo>>,
        resumed_compute_ms: u64,
        stats: Arc<StatsCounters>,
    ) -> Self {
        let store = DomainStore::init(&board, tiles, edge_index);
        Worker {
            board,
            store,
            tiles,
            edge_index,
            stats,
            rng,
            seed,
            cancel,
            shared_best,
            worker_id,
            piece_order,
            use_singletons,
            min_depth_to_record,
            pinned_count,
            used_canonical_symmetry_break: false,
            checkpoint_due,
            checkpoint_io,
            search_started: Instant::now(),
            resumed_compute_ms,
            recursion_depth: 0,
        }
    }

    /// Run the search to completion (or until cancelled).
    pub fn solve(&mut self) -> SearchOutcome {
        log::debug!(
            "worker {} starting search on a {}x{} board",
            self.worker_id,
            self.board.rows,
            self.board.columns
        );
        // Seed propagation once from every cell, since a hint- or
        // resume-prefilled board may already impose constraints no empty
        // cell's domain has accounted for yet.
        self.store.push_frame();
        let seeds: Vec<Pos> = self.board.positions().collect();
        if propagate(&self.board, &mut self.store, self.tiles, seeds, &self.stats)
            == PropagateOutcome::DeadEnd
        {
            self.store.pop_frame();
            log::debug!("worker {} found the initial board inconsistent", self.worker_id);
            return SearchOutcome::Exhausted;
        }
        let outcome = self.recurse();
        self.store.pop_frame();
        match outcome {
            SearchOutcome::Found => log::info!("worker {} found a solution", self.worker_id),
            SearchOutcome::Cancelled => log::debug!("worker {} cancelled", self.worker_id),
            SearchOutcome::Exhausted => log::debug!("worker {} exhausted its search space", self.worker_id),
        }
        outcome
    }

    fn depth_placed_so_far(&self) -> u32 {
        let occupied = self
            .board
            .positions()
            .filter(|&p| !self.board.is_empty(p))
            .count() as u32;
        occupied.saturating_sub(self.pinned_count)
    }

    fn recurse(&mut self) -> SearchOutcome {
        self.stats.recursive_calls.increment();
        if self.cancel.load(Ordering::Relaxed) {
            return SearchOutcome::Cancelled;
        }

        self.store.push_frame();
        let mut forced: Vec<Pos> = Vec::new();
        let mut dead_end = false;

        loop {
            let seeds = self.board.positions();
            if propagate(&self.board, &mut self.store, self.tiles, seeds, &self.stats)
                == PropagateOutcome::DeadEnd
            {
                dead_end = true;
                break;
            }
            if !self.use_singletons {
                break;
            }
            let (outcome, placed) =
                force_singletons(&mut self.board, &mut self.store, self.tiles, &self.stats);
            forced.extend(placed);
            match outcome {
                SingletonOutcome::DeadEnd => {
                    dead_end = true;
                    break;
                }
                SingletonOutcome::Progressed => continue,
                SingletonOutcome::Stable => break,
            }
        }

        if dead_end {
            for pos in forced.into_iter().rev() {
                self.board.unplace(pos);
            }
            self.store.pop_frame();
            return SearchOutcome::Exhausted;
        }

        self.recursion_depth += 1;
        let result = self.branch();
        self.recursion_depth -= 1;

        if result != SearchOutcome::Found {
            for pos in forced.into_iter().rev() {
                self.board.unplace(pos);
            }
        }
        self.store.pop_frame();
        result
    }

    fn branch(&mut self) -> SearchOutcome {
        let Some(cell) = next_cell(&self.board, &self.store) else {
            return SearchOutcome::Found;
        };

        self.publish_record_if_new_depth();

        let mut candidates = order_candidates(&self.store, cell, self.piece_order, &mut self.rng);
        if !self.used_canonical_symmetry_break && self.is_geometric_corner(cell) {
            let all_corner_tiles = candidates
                .iter()
                .all(|&pair| self.tiles.kind(unpack(pair).0) == crate::model::TileKind::Corner);
            if all_corner_tiles && !candidates.is_empty() {
                let canonical = self.tiles.canonical_rotation(unpack(candidates[0]).0);
                candidates = restrict_to_canonical_rotation(candidates, canonical);
                self.used_canonical_symmetry_break = true;
            }
        }

        for pair in candidates {
            if self.cancel.load(Ordering::Relaxed) {
                return SearchOutcome::Cancelled;
            }
            if self.recursion_depth == 1 {
                self.maybe_write_checkpoint();
            }
            self.stats.placements_tried.increment();
            let (tile, rotation) = unpack(pair);

            self.store.push_frame();
            self.board.place(cell, Placement { tile, rotation });

            let result = self.recurse();

            match result {
                SearchOutcome::Found => return SearchOutcome::Found,
                SearchOutcome::Cancelled => return SearchOutcome::Cancelled,
                SearchOutcome::Exhausted => {
                    self.board.unplace(cell);
                    self.store.pop_frame();
                    self.stats.backtracks.increment();
                }
            }
        }

        SearchOutcome::Exhausted
    }

    /// True if `pos` sits at a literal geometric corner of the board.
    fn is_geometric_corner(&self, pos: Pos) -> bool {
        let shape = self.board.shape();
        (pos.row == 0 || pos.row == shape.rows - 1) && (pos.col == 0 || pos.col == shape.columns - 1)
    }

    fn publish_record_if_new_depth(&mut self) {
        let depth = self.depth_placed_so_far();
        if depth < self.min_depth_to_record {
            return;
        }
        let prev_max_depth = self.shared_best.max_depth();
        let tiles = self.tiles;
        let board = &self.board;
        let published = self.shared_best.try_publish(
            self.worker_id,
            depth,
            || board.calculate_score(tiles),
            || crate::model::BoardSnapshot::from(board),
        );
        if published {
            self.stats.mark_published();
            log::debug!("worker {} published a new record at depth {depth}", self.worker_id);
            if depth > prev_max_depth {
                self.write_best_checkpoint(depth);
            }
        }
    }

    /// Write an immutable `best_<depth>` checkpoint the first time `depth`
    /// is reached by any worker, per spec.md §4.11's two-file-role contract
    /// (`current` is the rolling latest; `best_<depth>` is never overwritten
    /// by a later, shallower record).
    fn write_best_checkpoint(&self, depth: u32) {
        let Some(io) = &self.checkpoint_io else {
            return;
        };
        let elapsed_ms = self.resumed_compute_ms + self.search_started.elapsed().as_millis() as u64;
        let data = CheckpointData::from_board(self.tiles, &self.board, self.seed, elapsed_ms);
        match io.write(&io.best_path(depth), &data) {
            Ok(()) => log::info!("worker {} wrote a best_{depth} checkpoint", self.worker_id),
            Err(e) => log::warn!("worker {} failed to write best_{depth} checkpoint: {e}", self.worker_id),
        }
    }

    /// Write a checkpoint if the driver's timer thread has flagged one due,
    /// per spec §4.10: checked only at the root frame, between candidate
    /// iterations, never mid-propagation. Clears the flag so only the first
    /// worker to observe it does the write.
    fn maybe_write_checkpoint(&self) {
        if !self.checkpoint_due.swap(false, Ordering::Relaxed) {
            return;
        }
        let Some(io) = &self.checkpoint_io else {
            return;
        };
        let elapsed_ms = self.resumed_compute_ms + self.search_started.elapsed().as_millis() as u64;
        let data = CheckpointData::from_board(self.tiles, &self.board, self.seed, elapsed_ms);
        match io.write(&io.current_path(), &data) {
            Ok(()) => log::info!(
                "worker {} wrote a checkpoint at depth {}",
                self.worker_id,
                self.depth_placed_so_far()
            ),
            Err(e) => log::warn!("worker {} failed to write checkpoint: {e}", self.worker_id),
        }
    }

    /// The board's current placement rotation for its very first placed
    /// corner, if applicable — exposed for checkpointing.
    pub fn rotation_of(&self, pos: Pos) -> Option<Rotation> {
        self.board.get(pos).map(|p| p.rotation)
    }
}
