//! Forces placements into cells whose domain has collapsed to one candidate.

use crate::domain::{unpack, DomainStore};
use crate::model::{Board, Placement, Pos, TileSet};
use crate::propagate::{propagate, PropagateOutcome};
use crate::search::StatsCounters;

/// The outcome of a singleton-forcing pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SingletonOutcome {
    /// At least one cell was forced and re-propagation stayed consistent.
    Progressed,
    /// A sweep found no singleton cells: a fixed point has been reached.
    Stable,
    /// Forcing a singleton (and re-propagating) drove some domain empty.
    DeadEnd,
}

/// Repeatedly scan `board` for empty cells whose domain has collapsed to a
/// single candidate, place that candidate, and re-propagate, until a fixed
/// point (no more singletons) or a dead end is reached.
///
/// Per spec, a sweep collects every current singleton cell *before* placing
/// any of them, because placing one can immediately collapse — or empty —
/// another cell's domain; the following re-propagate step is what catches
/// that, not the collection order.
///
/// Returns the final [`SingletonOutcome`] plus every position this call
/// placed, so the caller can undo them all on backtrack (the [`Board`] has
/// no frame mechanism of its own).
pub fn force_singletons(
    board: &mut Board,
    store: &mut DomainStore,
    tiles: &TileSet,
    stats: &StatsCounters,
) -> (SingletonOutcome, Vec<Pos>) {
    let mut placed = Vec::new();
    let mut any_progress = false;

    loop {
        let singles: Vec<Pos> = board
            .positions()
            .filter(|&pos| board.is_empty(pos) && store.domain(pos).is_singleton())
            .collect();

        if singles.is_empty() {
            break;
        }

        let mut placed_this_sweep = Vec::new();
        for pos in singles {
            if !board.is_empty(pos) {
                continue;
            }
            let Some(pair) = store.domain(pos).singleton() else {
                continue;
            };
            let (tile, rotation) = unpack(pair);
            board.place(pos, Placement { tile, rotation });
            stats.singletons_placed.increment();
            placed.push(pos);
            placed_this_sweep.push(pos);
        }

        if placed_this_sweep.is_empty() {
            break;
        }
        any_progress = true;

        let seeds: Vec<Pos> = placed_this_sweep
            .iter()
            .flat_map(|&pos| {
                let shape = board.shape();
                crate::model::SIDES
                    .into_iter()
                    .filter_map(move |side| shape.neighbor(pos, side))
            })
            .collect();

        if propagate(board, store, tiles, seeds, stats) == PropagateOutcome::DeadEnd {
            return (SingletonOutcome::DeadEnd, placed);
        }
    }

    if any_progress {
        (SingletonOutcome::Progressed, placed)
    } else {
        (SingletonOutcome::Stable, placed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edge_index::EdgeIndex;
    use crate::model::{BoardShape, Rotation, BORDER};

    #[test]
    fn forces_unique_fit_without_branching() {
        // 1x2 board: left tile is a fixed corner-ish border tile, right
        // cell's domain should collapse to exactly one remaining tile.
        let tiles = TileSet::new([
            (1, [BORDER, 9, BORDER, BORDER]),
            (2, [BORDER, BORDER, BORDER, 9]),
        ])
        .unwrap();
        let index = EdgeIndex::build(&tiles, 10);
        let shape = BoardShape::new(1, 2);
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
        let (outcome, placed) = force_singletons(&mut board, &mut store, &tiles, &stats);
        assert_eq!(outcome, SingletonOutcome::Progressed);
        assert_eq!(placed, vec![Pos::new(0, 1)]);
        assert!(board.is_valid_solution(&tiles));
        store.pop_frame();
        for pos in placed {
            board.unplace(pos);
        }
    }
}
