//! Precomputed edge-compatibility indices: maps from required edge colors to
//! the `(tile, rotation)` pairs that can satisfy them.

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::domain::{pack, CellDomain};
use crate::model::{Side, TileSet, ROTATIONS, SIDES};

/// Precomputed, immutable edge-compatibility tables built once from a
/// [`TileSet`]. Shared read-only by every worker thread.
pub struct EdgeIndex {
    tile_count: usize,
    /// `by_side[side][color]`: every `(tile, rotation)` pair whose exposed
    /// edge on `side` is `color`.
    by_side: [Vec<CellDomain>; 4],
    /// Intersection cache for the common "border + one neighbor" constraint
    /// shape. Populated lazily, since the full cross product of color pairs
    /// is rarely fully visited by any one search.
    by_pair: RwLock<HashMap<(Side, u8, Side, u8), CellDomain>>,
}

impl EdgeIndex {
    /// Build the edge index from a tileset. `color_count` bounds the color
    /// range the tables need to cover (one past the largest color used).
    pub fn build(tiles: &TileSet, color_count: usize) -> Self {
        let mut by_side: [Vec<CellDomain>; 4] = [
            vec![CellDomain::empty(tiles.len()); color_count],
            vec![CellDomain::empty(tiles.len()); color_count],
            vec![CellDomain::empty(tiles.len()); color_count],
            vec![CellDomain::empty(tiles.len()); color_count],
        ];

        for tile in tiles.indices() {
            for rotation in ROTATIONS {
                let pair = pack(tile, rotation);
                for side in SIDES {
                    let color = tiles.tile(tile).edge_at(side, rotation);
                    by_side[side as usize][color as usize].insert(pair);
                }
            }
        }

        EdgeIndex {
            tile_count: tiles.len(),
            by_side,
            by_pair: RwLock::new(HashMap::new()),
        }
    }

    /// Every `(tile, rotation)` pair exposing `color` on `side`.
    pub fn by_side(&self, side: Side, color: u8) -> &CellDomain {
        &self.by_side[side as usize][color as usize]
    }

    /// The intersection of `by_side(side_a, color_a)` and
    /// `by_side(side_b, color_b)`, memoized across calls.
    pub fn by_pair(&self, side_a: Side, color_a: u8, side_b: Side, color_b: u8) -> CellDomain {
        let key = (side_a, color_a, side_b, color_b);
        if let Some(cached) = self.by_pair.read().get(&key) {
            return cached.clone();
        }
        let mut result = self.by_side(side_a, color_a).clone();
        result.and_with(self.by_side(side_b, color_b));
        self.by_pair.write().insert(key, result.clone());
        result
    }

    /// Compute the candidate set for a cell whose neighbors impose the
    /// required colors in `required` (indexed by [`Side`] as `usize`; `None`
    /// means that direction is unconstrained — an interior cell whose
    /// neighbor in that direction is still empty), restricted to tiles not
    /// already marked `used`.
    pub fn candidates(&self, required: [Option<u8>; 4], used: &[bool]) -> CellDomain {
        let mut result = self.available(used);
        for side in SIDES {
            if let Some(color) = required[side as usize] {
                result.and_with(self.by_side(side, color));
            }
        }
        result
    }

    /// Every `(tile, rotation)` pair for tiles not marked `used`.
    fn available(&self, used: &[bool]) -> CellDomain {
        let mut result = CellDomain::empty(self.tile_count);
        for (tile, &is_used) in used.iter().enumerate() {
            if is_used {
                continue;
            }
            for rotation in ROTATIONS {
                result.insert(pack(tile as u32, rotation));
            }
        }
        result
    }
}
