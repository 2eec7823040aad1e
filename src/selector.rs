//! Minimum-remaining-values cell selection and candidate ordering policy.

use rand::seq::SliceRandom;
use rand::rngs::StdRng;

use crate::domain::{DomainStore, Pair};
use crate::model::{Board, Pos, SIDES};

/// Pick the next empty cell to branch on: minimize domain size, tie-break by
/// maximizing the number of already-occupied neighbors (so search radiates
/// outward from placed tiles rather than leaping), tie-break by `(row, col)`.
///
/// Returns `None` when no empty cell remains (the board is complete).
pub fn next_cell(board: &Board, store: &DomainStore) -> Option<Pos> {
    board
        .positions()
        .filter(|&pos| board.is_empty(pos))
        .min_by_key(|&pos| {
            let domain_size = store.domain_size(pos);
            let degree = occupied_degree(board, pos);
            (domain_size, std::cmp::Reverse(degree), pos.row, pos.col)
        })
}

fn occupied_degree(board: &Board, pos: Pos) -> usize {
    let shape = board.shape();
    SIDES
        .iter()
        .filter(|&&side| {
            shape
                .neighbor(pos, side)
                .is_some_and(|n| !board.is_empty(n))
        })
        .count()
}

/// The policy for the order in which a cell's remaining candidates are
/// tried. Selected once at driver construction; a closed, tagged-variant set
/// rather than a plugin trait object, since the set of orderings is small
/// and fixed and dynamic dispatch would only cost an indirection per call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PieceOrder {
    /// Try candidates in ascending `(tile_index, rotation)` order.
    Ascending,
    /// Try candidates in descending `(tile_index, rotation)` order.
    Descending,
    /// Shuffle candidates deterministically from the worker's RNG seed.
    /// Used for seeded-restart diversification across parallel workers.
    FixedRandom,
}

/// Order `domain`'s candidates per `policy`.
pub fn order_candidates(domain: &DomainStore, pos: Pos, policy: PieceOrder, rng: &mut StdRng) -> Vec<Pair> {
    let mut candidates: Vec<Pair> = domain.domain(pos).iter().collect();
    match policy {
        PieceOrder::Ascending => candidates.sort_unstable(),
        PieceOrder::Descending => candidates.sort_unstable_by(|a, b| b.cmp(a)),
        PieceOrder::FixedRandom => {
            candidates.sort_unstable();
            candidates.shuffle(rng);
        }
    }
    candidates
}

/// Restrict `candidates` to only those using `tile`'s canonical rotation.
/// Applied to the very first corner placement of a worker's search, breaking
/// the four-fold rotational symmetry of the whole board.
pub fn restrict_to_canonical_rotation(
    candidates: Vec<Pair>,
    canonical: crate::model::Rotation,
) -> Vec<Pair> {
    candidates
        .into_iter()
        .filter(|&pair| crate::domain::unpack(pair).1 == canonical)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edge_index::EdgeIndex;
    use crate::model::{BoardShape, TileSet, BORDER};

    #[test]
    fn next_cell_prefers_smaller_domain() {
        let tiles = TileSet::new([
            (1, [BORDER, 7, 7, BORDER]),
            (2, [BORDER, BORDER, 7, 7]),
            (3, [7, 7, BORDER, BORDER]),
            (4, [7, BORDER, BORDER, 7]),
        ])
        .unwrap();
        let index = EdgeIndex::build(&tiles, 8);
        let shape = BoardShape::new(2, 2);
        let board = shape.new_board();
        let store = DomainStore::init(&board, &tiles, &index);

        // all cells empty: should pick some cell, not panic.
        assert!(next_cell(&board, &store).is_some());
    }
}
