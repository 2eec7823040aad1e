//! End-to-end scenarios exercising the public `puzzle`/`driver`/`checkpoint`
//! API together: a trivially solvable ring, a hinted variant, an unsolvable
//! mutation, a checkpoint round-trip, and a multi-worker run.

use std::sync::Arc;
use std::time::Duration;

use eternity_solver::checkpoint::{digest, CheckpointData, CheckpointIo};
use eternity_solver::driver::{self, DriverOptions, Outcome};
use eternity_solver::metrics::MetricsHandle;
use eternity_solver::model::{BoardShape, Hint, Pos, Rotation, TileSet, BORDER};
use eternity_solver::selector::PieceOrder;

/// Build a `rows x cols` tileset with a single, globally unique solution:
/// every internal edge gets its own color, so each tile fits exactly one
/// cell, in exactly one rotation (its own, since it is built unrotated).
/// Returns the tileset (external ids `1..=rows*cols`, row-major) and shape.
fn unique_tileset(rows: usize, cols: usize) -> (TileSet, BoardShape) {
    let h_id = |row: usize, col: usize| -> u8 { 1 + (row * (cols - 1) + col) as u8 };
    let horizontal_count = rows * (cols - 1);
    let v_id = |row: usize, col: usize| -> u8 { 1 + horizontal_count as u8 + (row * cols + col) as u8 };

    let mut tiles = Vec::with_capacity(rows * cols);
    let mut external_id = 1u32;
    for row in 0..rows {
        for col in 0..cols {
            let north = if row == 0 { BORDER } else { v_id(row - 1, col) };
            let south = if row == rows - 1 { BORDER } else { v_id(row, col) };
            let west = if col == 0 { BORDER } else { h_id(row, col - 1) };
            let east = if col == cols - 1 { BORDER } else { h_id(row, col) };
            tiles.push((external_id, [north, east, south, west]));
            external_id += 1;
        }
    }
    (TileSet::new(tiles).unwrap(), BoardShape::new(rows, cols))
}

#[test]
fn three_by_three_ring_solves_with_a_perfect_score() {
    let (tiles, shape) = unique_tileset(3, 3);
    let (corners, edges, interior) = tiles.count_kinds();
    assert_eq!(corners, 4);
    assert_eq!(edges, 2 * (3 - 2) + 2 * (3 - 2));
    assert_eq!(interior, 1);

    let options = DriverOptions {
        worker_count: 1,
        piece_order: PieceOrder::Ascending,
        ..DriverOptions::default()
    };
    let outcome = driver::run(tiles, shape, Vec::new(), options);
    match outcome {
        Outcome::Solved(board) => {
            let scoring_tiles = unique_tileset(3, 3).0;
            assert_eq!(board.calculate_score(&scoring_tiles), (12, 12));
        }
        _ => panic!("expected the 3x3 ring to solve"),
    }
}

#[test]
fn four_by_four_with_a_correct_hint_still_solves_and_keeps_it() {
    let (tiles, shape) = unique_tileset(4, 4);

    // The unique solution places external id `row * 4 + col + 1` at
    // `(row, col)`, rotation 0. Pin one interior cell to its true value and
    // confirm the solver both succeeds and leaves the hint untouched.
    let hinted_pos = Pos::new(1, 1);
    let hinted_external_id = 1 * 4 + 1 + 1;
    let hints = vec![Hint {
        at: hinted_pos,
        tile: tiles.index_of(hinted_external_id).unwrap(),
        rotation: Rotation::Rot0,
    }];

    let options = DriverOptions {
        worker_count: 1,
        piece_order: PieceOrder::Ascending,
        ..DriverOptions::default()
    };
    let outcome = driver::run(tiles, shape, hints, options);
    match outcome {
        Outcome::Solved(board) => {
            let placement = board.get(hinted_pos).expect("hinted cell must be filled");
            assert_eq!(placement.rotation, Rotation::Rot0);
            let scoring_tiles = unique_tileset(4, 4).0;
            assert_eq!(scoring_tiles.external_id(placement.tile), hinted_external_id);
        }
        _ => panic!("expected the hinted 4x4 puzzle to solve"),
    }
}

#[test]
fn corrupting_one_tile_makes_a_solvable_puzzle_unsolvable() {
    let (tiles, shape) = unique_tileset(4, 4);
    // Take the interior tile for cell (2, 2) and flip its east edge to a
    // color no neighbor expects: its one fitting location no longer fits.
    let mut rebuilt: Vec<(u32, [u8; 4])> = tiles
        .indices()
        .map(|ix| (tiles.external_id(ix), tiles.tile(ix).edges()))
        .collect();
    let broken_id = 2 * 4 + 2 + 1;
    let entry = rebuilt.iter_mut().find(|(id, _)| *id == broken_id).unwrap();
    entry.1[1] = 200; // east edge, a color used nowhere else in this tileset
    let broken_tiles = TileSet::new(rebuilt).unwrap();

    let options = DriverOptions {
        worker_count: 2,
        wall_time_limit: Some(Duration::from_secs(5)),
        piece_order: PieceOrder::Ascending,
        ..DriverOptions::default()
    };
    let outcome = driver::run(broken_tiles, shape, Vec::new(), options);
    assert!(matches!(outcome, Outcome::NoSolution | Outcome::Timeout));
}

#[test]
fn resuming_from_a_checkpoint_continues_to_a_solution() {
    let (tiles, shape) = unique_tileset(4, 4);
    let dir = tempfile::tempdir().unwrap();

    // Hand-author a checkpoint with the first row already placed correctly,
    // as if a prior run had gotten that far before being interrupted.
    let mut placements = Vec::new();
    let mut used = vec![false; tiles.len()];
    for col in 0..4 {
        let external_id = col as u32 + 1;
        let tile = tiles.index_of(external_id).unwrap();
        placements.push((Pos::new(0, col), tile, Rotation::Rot0, col as u32));
        used[tile as usize] = true;
    }
    let data = CheckpointData {
        tile_set_digest: digest(&tiles),
        rows: shape.rows,
        columns: shape.columns,
        placements,
        used,
        cumulative_compute_ms: 1234,
        seed: 0,
        timestamp: 0,
    };
    let io = CheckpointIo::new(dir.path()).unwrap();
    io.write(&io.current_path(), &data).unwrap();

    let options = DriverOptions {
        worker_count: 1,
        piece_order: PieceOrder::Ascending,
        checkpoint_dir: Some(dir.path().to_path_buf()),
        ..DriverOptions::default()
    };
    let outcome = driver::run(tiles, shape, Vec::new(), options);
    match outcome {
        Outcome::Solved(board) => {
            for col in 0..4 {
                assert!(board.get(Pos::new(0, col)).is_some());
            }
        }
        Outcome::NoSolution => panic!("expected resumed search to solve, got NoSolution"),
        Outcome::Timeout => panic!("expected resumed search to solve, got Timeout"),
        Outcome::InvalidInput(reason) => panic!("expected resumed search to solve, got InvalidInput: {reason}"),
        Outcome::ResumeFailed(reason) => panic!("expected resumed search to solve, got ResumeFailed: {reason}"),
    }
}

#[test]
fn parallel_workers_find_the_unique_solution() {
    let (tiles, shape) = unique_tileset(4, 4);
    let options = DriverOptions {
        worker_count: 8,
        piece_order: PieceOrder::FixedRandom,
        wall_time_limit: Some(Duration::from_secs(30)),
        ..DriverOptions::default()
    };
    let outcome = driver::run(tiles, shape, Vec::new(), options);
    assert!(matches!(outcome, Outcome::Solved(_)));
}

#[test]
fn metrics_handle_observes_a_finished_run() {
    let (tiles, shape) = unique_tileset(3, 3);
    let metrics = MetricsHandle::new();
    let options = DriverOptions {
        worker_count: 2,
        piece_order: PieceOrder::Ascending,
        metrics: Some(Arc::clone(&metrics)),
        ..DriverOptions::default()
    };
    let outcome = driver::run(tiles, shape, Vec::new(), options);
    assert!(matches!(outcome, Outcome::Solved(_)));

    let report = metrics.snapshot();
    assert_eq!(report.workers.len(), 2);
    assert!(report.total_recursive_calls() > 0);
}

#[test]
fn one_by_one_border_tile_solves_instantly() {
    let tiles = TileSet::new([(1, [BORDER, BORDER, BORDER, BORDER])]).unwrap();
    let shape = BoardShape::new(1, 1);
    let options = DriverOptions {
        worker_count: 1,
        ..DriverOptions::default()
    };
    let outcome = driver::run(tiles, shape, Vec::new(), options);
    assert!(matches!(outcome, Outcome::Solved(_)));
}
