//! Lock-free shared record of the deepest partial solution found by any
//! worker, plus the best edge-match score at that depth.

use std::sync::atomic::{AtomicU32, Ordering};

use parking_lot::RwLock;

use crate::model::BoardSnapshot;

/// A published record: the board state it was taken from, plus the worker
/// that found it.
#[derive(Debug, Clone)]
pub struct Snapshot {
    /// The board at the moment of publication.
    pub board: BoardSnapshot,
    /// The worker id that published this snapshot.
    pub owner: u32,
}

/// The only mutable state shared across worker threads. Its atomic fields
/// are the hot path; the `snapshot` lock is taken only when a worker
/// actually improves on the current record.
#[derive(Default)]
pub struct SharedBest {
    max_depth: AtomicU32,
    best_score: AtomicU32,
    owner: AtomicU32,
    snapshot: RwLock<Option<Snapshot>>,
}

impl SharedBest {
    /// Attempt to publish a `(depth, score)` record from `worker_id`.
    ///
    /// `compute_score`/`snapshot` are called only if this record is actually
    /// an improvement, since both are comparatively expensive (a full board
    /// walk and a clone). The snapshot write happens while still holding the
    /// `snapshot` write lock, strictly before the atomic stores that
    /// advertise the new `max_depth`/`best_score` — so any reader that
    /// observes a raised `max_depth` via the atomics has already been able
    /// to observe the matching snapshot under the read lock (per spec §5's
    /// "snapshot writes happen-before any subsequent atomic update that
    /// might advertise them").
    ///
    /// Returns `true` if this call's record became the new shared best.
    pub fn try_publish(
        &self,
        worker_id: u32,
        depth: u32,
        compute_score: impl FnOnce() -> (usize, usize),
        snapshot: impl FnOnce() -> BoardSnapshot,
    ) -> bool {
        // Lock-free pre-check: skip the write lock entirely for the common
        // case of a record that is clearly not an improvement.
        if depth < self.max_depth.load(Ordering::Acquire) {
            return false;
        }

        let mut guard = self.snapshot.write();
        let prev_depth = self.max_depth.load(Ordering::Acquire);
        if depth < prev_depth {
            return false;
        }
        let (matching, _total) = compute_score();
        let matching = matching as u32;
        if depth == prev_depth && matching <= self.best_score.load(Ordering::Acquire) {
            return false;
        }

        *guard = Some(Snapshot {
            board: snapshot(),
            owner: worker_id,
        });
        self.max_depth.store(depth, Ordering::Release);
        self.best_score.store(matching, Ordering::Release);
        self.owner.store(worker_id, Ordering::Release);
        true
    }

    /// The current deepest depth reached by any worker.
    pub fn max_depth(&self) -> u32 {
        self.max_depth.load(Ordering::Acquire)
    }

    /// The best score recorded at [`Self::max_depth`].
    pub fn best_score(&self) -> u32 {
        self.best_score.load(Ordering::Acquire)
    }

    /// The worker id that owns the current record, if any has been published.
    pub fn owner(&self) -> Option<u32> {
        (self.max_depth.load(Ordering::Acquire) > 0).then(|| self.owner.load(Ordering::Acquire))
    }

    /// Clone the current published snapshot, if any.
    pub fn get_snapshot(&self) -> Option<Snapshot> {
        self.snapshot.read().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::BoardShape;

    fn empty_snapshot() -> BoardSnapshot {
        BoardSnapshot::from(&BoardShape::new(1, 1).new_board())
    }

    #[test]
    fn deeper_record_always_wins() {
        let best = SharedBest::default();
        assert!(best.try_publish(1, 5, || (3, 4), empty_snapshot));
        assert_eq!(best.max_depth(), 5);
        assert!(!best.try_publish(2, 3, || (0, 0), empty_snapshot));
        assert_eq!(best.max_depth(), 5);
        assert!(best.try_publish(2, 8, || (4, 4), empty_snapshot));
        assert_eq!(best.max_depth(), 8);
        assert_eq!(best.owner(), Some(2));
    }

    #[test]
    fn equal_depth_better_score_wins() {
        let best = SharedBest::default();
        assert!(best.try_publish(1, 5, || (2, 4), empty_snapshot));
        assert!(best.try_publish(2, 5, || (3, 4), empty_snapshot));
        assert_eq!(best.best_score(), 3);
        assert_eq!(best.owner(), Some(2));
        assert!(!best.try_publish(3, 5, || (1, 4), empty_snapshot));
        assert_eq!(best.owner(), Some(2));
    }
}
