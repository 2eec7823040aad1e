//! Error types surfaced to callers of this crate.
//!
//! Search-internal signals (`DeadEnd`, `Cancelled`) never reach this type —
//! they are recovered by backtracking or unwound through [`crate::search`]'s
//! ordinary return path. Only start-up and I/O failures are [`SolverError`]s.

use thiserror::Error;

/// Errors surfaced by puzzle loading, validation, and checkpoint handling.
#[derive(Debug, Error)]
pub enum SolverError {
    /// Malformed puzzle input: bad syntax, duplicate tile id, a tile with an
    /// invalid number of border edges, or a tile count mismatch with the
    /// board's cell count.
    #[error("bad input: {0}")]
    BadInput(String),

    /// The tileset's corner/edge tile counts are structurally incompatible
    /// with the requested board dimensions; detected before search starts.
    #[error("unsolvable by counts: {0}")]
    UnsolvableByCounts(String),

    /// A checkpoint's tileset digest or dimensions disagree with the puzzle
    /// being resumed.
    #[error("incompatible checkpoint: {0}")]
    IncompatibleCheckpoint(String),

    /// A checkpoint read or write failed at the OS level.
    #[error("checkpoint io error: {0}")]
    Io(#[from] std::io::Error),
}
