//! A read-only observability surface over a running (or finished) search.
//!
//! [`MetricsHandle`] is created by a caller before [`crate::driver::run`] and
//! threaded through [`crate::driver::DriverOptions::metrics`]; the driver
//! binds it to the run's [`SharedBest`] and per-worker
//! [`StatsCounters`][crate::search::StatsCounters] once they exist.
//! [`MetricsHandle::snapshot`] is then safe to call from any thread —
//! including one polling once a second for a dashboard — while the driver's
//! blocking `run` call is still in progress on another thread.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::search::StatsCounters;
use crate::shared_best::SharedBest;

/// A point-in-time copy of one worker's [`StatsCounters`].
#[derive(Debug, Clone, Copy, Default)]
pub struct WorkerMetrics {
    /// The worker's index within this run (`0..worker_count`).
    pub worker_id: u32,
    /// Number of times `recurse` was entered.
    pub recursive_calls: u64,
    /// Number of candidate placements attempted.
    pub placements_tried: u64,
    /// Number of candidates undone after their subtree exhausted.
    pub backtracks: u64,
    /// Number of placements forced by singleton collapse.
    pub singletons_placed: u64,
    /// Number of times propagation or singleton-forcing hit an empty domain.
    pub deadends_detected: u64,
    /// Number of propagator support checks performed.
    pub fit_checks: u64,
}

/// A full snapshot of search progress: every worker's counters plus the
/// current cross-worker best.
#[derive(Debug, Clone, Default)]
pub struct MetricsReport {
    /// Per-worker counter snapshots, in worker-id order.
    pub workers: Vec<WorkerMetrics>,
    /// The deepest depth any worker has reached so far.
    pub max_depth: u32,
    /// The best edge-match score recorded at `max_depth`.
    pub best_score: u32,
    /// The worker id that owns the current record, if any.
    pub owner: Option<u32>,
}

impl MetricsReport {
    /// Sum of `recursive_calls` across every worker.
    pub fn total_recursive_calls(&self) -> u64 {
        self.workers.iter().map(|w| w.recursive_calls).sum()
    }

    /// Sum of `backtracks` across every worker.
    pub fn total_backtracks(&self) -> u64 {
        self.workers.iter().map(|w| w.backtracks).sum()
    }
}

struct BoundMetrics {
    shared_best: Arc<SharedBest>,
    worker_stats: Vec<Arc<StatsCounters>>,
}

/// A thread-safe handle onto a driver run's live metrics. Create with
/// [`MetricsHandle::new`] before calling [`crate::driver::run`]; it reads as
/// "not yet bound" (an empty [`MetricsReport`]) until the driver binds it.
#[derive(Default)]
pub struct MetricsHandle {
    inner: RwLock<Option<BoundMetrics>>,
}

impl MetricsHandle {
    /// Construct an unbound metrics handle.
    pub fn new() -> Arc<Self> {
        Arc::new(MetricsHandle::default())
    }

    /// Bind this handle to a run's shared state. Called once by
    /// [`crate::driver::run`] before spawning workers.
    pub(crate) fn bind(&self, shared_best: Arc<SharedBest>, worker_stats: Vec<Arc<StatsCounters>>) {
        *self.inner.write() = Some(BoundMetrics {
            shared_best,
            worker_stats,
        });
    }

    /// A thread-safe, point-in-time snapshot of every bound worker's
    /// counters plus the current [`SharedBest`] state.
    ///
    /// Returns a default (empty) report if called before the driver has
    /// bound this handle.
    pub fn snapshot(&self) -> MetricsReport {
        let guard = self.inner.read();
        let Some(bound) = guard.as_ref() else {
            return MetricsReport::default();
        };
        let workers = bound
            .worker_stats
            .iter()
            .enumerate()
            .map(|(id, stats)| WorkerMetrics {
                worker_id: id as u32,
                recursive_calls: stats.recursive_calls.get(),
                placements_tried: stats.placements_tried.get(),
                backtracks: stats.backtracks.get(),
                singletons_placed: stats.singletons_placed.get(),
                deadends_detected: stats.deadends_detected.get(),
                fit_checks: stats.fit_checks.get(),
            })
            .collect();
        MetricsReport {
            workers,
            max_depth: bound.shared_best.max_depth(),
            best_score: bound.shared_best.best_score(),
            owner: bound.shared_best.owner(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unbound_handle_reports_an_empty_snapshot() {
        let handle = MetricsHandle::new();
        let report = handle.snapshot();
        assert!(report.workers.is_empty());
        assert_eq!(report.max_depth, 0);
    }

    #[test]
    fn bound_handle_aggregates_worker_counters() {
        let handle = MetricsHandle::new();
        let a = Arc::new(StatsCounters::default());
        let b = Arc::new(StatsCounters::default());
        a.recursive_calls.increment();
        a.recursive_calls.increment();
        b.recursive_calls.increment();
        handle.bind(Arc::new(SharedBest::default()), vec![Arc::clone(&a), Arc::clone(&b)]);

        let report = handle.snapshot();
        assert_eq!(report.workers.len(), 2);
        assert_eq!(report.total_recursive_calls(), 3);
    }
}
