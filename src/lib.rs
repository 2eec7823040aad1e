//! A depth-first backtracking solver for rectangular edge-matching puzzles
//! of the Eternity-II family.
//!
//! The crate is organized bottom-up, following the component list from the
//! design this was built against: an immutable [`model`] (tiles, rotation
//! algebra, the board), a precomputed [`edge_index`], a per-cell [`domain`]
//! store with AC-3 [`propagate`]ion and [`singleton`] forcing, MRV cell
//! [`selector`]ion, the recursive [`search`] itself, a lock-free
//! [`shared_best`] record shared across worker threads, a [`driver`] that
//! coordinates a bounded worker pool, and [`checkpoint`] persistence for
//! resuming a long search across process restarts. [`puzzle`] parses the
//! on-disk puzzle text format and [`metrics`] exposes a read-only view of
//! search progress; [`error`] holds the error types surfaced to callers.

#![warn(missing_docs)]

pub mod checkpoint;
pub mod domain;
pub mod driver;
pub mod edge_index;
pub mod error;
pub mod metrics;
pub mod model;
pub mod propagate;
pub mod puzzle;
pub mod search;
pub mod selector;
pub mod shared_best;
pub mod singleton;
