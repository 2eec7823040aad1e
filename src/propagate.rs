//! AC-3 arc-consistency propagation over the cell adjacency graph.

use std::collections::VecDeque;

use crate::domain::{cell_index, unpack, DomainStore};
use crate::model::{Board, Pos, Side, TileSet, SIDES};
use crate::search::StatsCounters;

/// The outcome of a propagation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropagateOutcome {
    /// No cell's domain was driven empty; all remaining domains are arc
    /// consistent with respect to the queue that was processed.
    Consistent,
    /// Some cell's domain was driven to empty: the current partial board
    /// cannot be extended to a solution. Recovered by backtracking.
    DeadEnd,
}

/// Run AC-3 starting from `seeds` (the empty cells whose neighbor just
/// changed), pruning `store` in place.
///
/// For each dequeued cell `c`, every candidate `(t, r)` in `domain(c)` is
/// kept only if every neighbor `n` either agrees concretely (if occupied) or
/// still has some candidate in `domain(n)` compatible with `(t, r)` (if
/// empty). Removing a candidate re-enqueues `c`'s empty neighbors, since
/// their support may now have changed too.
pub fn propagate(
    board: &Board,
    store: &mut DomainStore,
    tiles: &TileSet,
    seeds: impl IntoIterator<Item = Pos>,
    stats: &StatsCounters,
) -> PropagateOutcome {
    let shape = board.shape();
    let mut queue: VecDeque<Pos> = VecDeque::new();
    let mut queued = vec![false; shape.cells()];

    for pos in seeds {
        if board.is_empty(pos) {
            let idx = cell_index(&shape, pos);
            if !queued[idx] {
                queued[idx] = true;
                queue.push_back(pos);
            }
        }
    }

    while let Some(cell) = queue.pop_front() {
        let idx = cell_index(&shape, cell);
        queued[idx] = false;

        let mut changed = false;
        let to_remove: Vec<_> = store
            .domain(cell)
            .iter()
            .filter(|&pair| !has_support(cell, pair, board, store, tiles, &shape, stats))
            .collect();

        for pair in to_remove {
            store.remove(idx, pair);
            changed = true;
        }

        if store.domain(cell).is_empty() {
            stats.deadends_detected.increment();
            return PropagateOutcome::DeadEnd;
        }

        if changed {
            for side in SIDES {
                if let Some(neighbor) = shape.neighbor(cell, side) {
                    if board.is_empty(neighbor) {
                        let nidx = cell_index(&shape, neighbor);
                        if !queued[nidx] {
                            queued[nidx] = true;
                            queue.push_back(neighbor);
                        }
                    }
                }
            }
        }
    }

    PropagateOutcome::Consistent
}

/// True if candidate `pair` at `cell` is supported by every neighbor: an
/// occupied neighbor must agree exactly; an empty neighbor must still offer
/// at least one candidate compatible with `pair`'s edge facing it.
fn has_support(
    cell: Pos,
    pair: u32,
    board: &Board,
    store: &DomainStore,
    tiles: &TileSet,
    shape: &crate::model::BoardShape,
    stats: &StatsCounters,
) -> bool {
    stats.fit_checks.increment();
    let (tile, rotation) = unpack(pair);
    let my_tile = tiles.tile(tile);

    for side in SIDES {
        let Some(neighbor) = shape.neighbor(cell, side) else {
            // Border side: must match the border color, already enforced by
            // the domain's construction (see `domain_for_cell`), but we
            // re-check here since AC-3 must be self-contained.
            if my_tile.edge_at(side, rotation) != crate::model::BORDER {
                return false;
            }
            continue;
        };

        let my_edge = my_tile.edge_at(side, rotation);

        if let Some(placement) = board.get(neighbor) {
            let their_edge = tiles
                .tile(placement.tile)
                .edge_at(side.opposite(), placement.rotation);
            if my_edge != their_edge {
                return false;
            }
        } else {
            let supported = store.domain(neighbor).iter().any(|npair| {
                let (ntile, nrot) = unpack(npair);
                tiles.tile(ntile).edge_at(side.opposite(), nrot) == my_edge
            });
            if !supported {
                return false;
            }
        }
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::pack;
    use crate::edge_index::EdgeIndex;
    use crate::model::{BoardShape, Placement, Rotation, BORDER};

    fn ring_tiles() -> TileSet {
        // 2x2 board: four corner tiles sharing color 7 pairwise.
        TileSet::new([
            (1, [BORDER, 7, 7, BORDER]),
            (2, [BORDER, BORDER, 7, 7]),
            (3, [7, 7, BORDER, BORDER]),
            (4, [7, BORDER, BORDER, 7]),
        ])
        .unwrap()
    }

    #[test]
    fn propagate_twice_is_idempotent() {
        let tiles = ring_tiles();
        let index = EdgeIndex::build(&tiles, 8);
        let shape = BoardShape::new(2, 2);
        let mut board = shape.new_board();
        board.place(
            Pos::new(0, 0),
            Placement {
                tile: 0,
                rotation: Rotation::Rot0,
            },
        );
        let mut store = DomainStore::init(&board, &tiles, &index);
        let stats = StatsCounters::default();

        store.push_frame();
        let r1 = propagate(&board, &mut store, &tiles, board.positions(), &stats);
        assert_eq!(r1, PropagateOutcome::Consistent);
        let sizes_after_first: Vec<_> = board
            .positions()
            .map(|p| store.domain_size(p))
            .collect();

        let r2 = propagate(&board, &mut store, &tiles, board.positions(), &stats);
        assert_eq!(r2, PropagateOutcome::Consistent);
        let sizes_after_second: Vec<_> = board
            .positions()
            .map(|p| store.domain_size(p))
            .collect();

        assert_eq!(sizes_after_first, sizes_after_second);
        store.pop_frame();
    }

    #[test]
    fn impossible_domain_is_a_dead_end() {
        let tiles = ring_tiles();
        let index = EdgeIndex::build(&tiles, 8);
        let shape = BoardShape::new(2, 2);
        let board = shape.new_board();
        let mut store = DomainStore::init(&board, &tiles, &index);
        // Manually force an empty domain to simulate an exhausted cell.
        store.push_frame();
        let pair = store.domain(Pos::new(0, 0)).iter().next().unwrap();
        let all: Vec<_> = store.domain(Pos::new(0, 0)).iter().collect();
        for p in all {
            store.remove(0, p);
        }
        let stats = StatsCounters::default();
        let result = propagate(&board, &mut store, &tiles, [Pos::new(0, 0)], &stats);
        assert_eq!(result, PropagateOutcome::DeadEnd);
        let _ = pack(0, Rotation::Rot0);
        let _ = pair;
        store.pop_frame();
    }
}
