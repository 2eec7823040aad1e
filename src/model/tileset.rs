use std::collections::HashMap;

use crate::error::SolverError;

use super::{Tile, TileKind};

/// The index of a tile within a [`TileSet`]'s dense internal storage.
///
/// This is distinct from the tile's external `id` (as it appears in puzzle
/// files and hints): ids may be sparse or arbitrary, while `TileIndex` is
/// always a contiguous `0..len()` index, suitable for use as an array index
/// and for the `tile_id` half of a packed [`crate::domain::Pair`].
pub type TileIndex = u32;

/// An immutable tile catalog built once per puzzle.
///
/// Exposes O(1) lookup of a tile's rotated edges, and classifies every tile
/// into a [`TileKind`] up front so the selector and validation code never
/// recompute it.
#[derive(Debug, Clone)]
pub struct TileSet {
    tiles: Vec<Tile>,
    ids: Vec<u32>,
    id_to_index: HashMap<u32, TileIndex>,
    kinds: Vec<TileKind>,
    /// Precomputed `[tile][rotation]` edge tuples, in N, E, S, W order.
    rotated_edges: Vec<[[u8; 4]; 4]>,
    canonical_rotations: Vec<super::Rotation>,
}

impl TileSet {
    /// Build a tileset from an iterator of `(external_id, [north, east, south, west])`.
    ///
    /// Rejects duplicate external ids. Colors are unconstrained `u8`s — a
    /// negative color cannot be represented, so malformed-input negative
    /// colors must be rejected by the caller before reaching this
    /// constructor (see [`crate::puzzle::parse_puzzle`]).
    pub fn new(tiles: impl IntoIterator<Item = (u32, [u8; 4])>) -> Result<Self, SolverError> {
        let mut out_tiles = Vec::new();
        let mut ids = Vec::new();
        let mut id_to_index = HashMap::new();
        let mut kinds = Vec::new();
        let mut rotated_edges = Vec::new();
        let mut canonical_rotations = Vec::new();

        for (id, edges) in tiles {
            let index = out_tiles.len() as TileIndex;
            if id_to_index.insert(id, index).is_some() {
                return Err(SolverError::BadInput(format!("duplicate tile id {id}")));
            }
            let tile = Tile::new(edges[0], edges[1], edges[2], edges[3]);
            let kind = tile.kind();
            if let TileKind::Invalid(n) = kind {
                return Err(SolverError::BadInput(format!(
                    "tile {id} has {n} border edges, which cannot occur on a single 4-sided tile"
                )));
            }
            let mut rots = [[0u8; 4]; 4];
            for r in super::ROTATIONS {
                rots[r.quarters()] = tile.rotated_edges(r);
            }
            canonical_rotations.push(tile.canonical_rotation());
            rotated_edges.push(rots);
            out_tiles.push(tile);
            ids.push(id);
            kinds.push(kind);
        }

        Ok(TileSet {
            tiles: out_tiles,
            ids,
            id_to_index,
            kinds,
            rotated_edges,
            canonical_rotations,
        })
    }

    /// The number of tiles in this catalog.
    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    /// True if this tileset has no tiles.
    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// Look up the dense [`TileIndex`] for an external tile id.
    pub fn index_of(&self, external_id: u32) -> Option<TileIndex> {
        self.id_to_index.get(&external_id).copied()
    }

    /// The external id of a tile, given its dense index.
    pub fn external_id(&self, index: TileIndex) -> u32 {
        self.ids[index as usize]
    }

    /// The unrotated tile at `index`.
    pub fn tile(&self, index: TileIndex) -> Tile {
        self.tiles[index as usize]
    }

    /// The classification of the tile at `index`.
    pub fn kind(&self, index: TileIndex) -> TileKind {
        self.kinds[index as usize]
    }

    /// The canonical (lexicographically smallest) rotation of the tile at
    /// `index`, used for symmetry breaking on the first corner placement.
    pub fn canonical_rotation(&self, index: TileIndex) -> super::Rotation {
        self.canonical_rotations[index as usize]
    }

    /// The edges exposed by the tile at `index`, rotated by `rotation`, in
    /// O(1) via the precomputed rotation table.
    pub fn rotated_edges(&self, index: TileIndex, rotation: super::Rotation) -> [u8; 4] {
        self.rotated_edges[index as usize][rotation.quarters()]
    }

    /// Iterate over all dense tile indices.
    pub fn indices(&self) -> impl Iterator<Item = TileIndex> {
        0..self.tiles.len() as TileIndex
    }

    /// Count `(corners, edges, interior)` tiles in this catalog. Tiles of
    /// any other [`TileKind`] (strip-board roles, or the degenerate
    /// all-border tile) are not counted by this method — see
    /// [`Self::count_strip_kinds`] for those.
    pub fn count_kinds(&self) -> (usize, usize, usize) {
        let mut corners = 0;
        let mut edges = 0;
        let mut interior = 0;
        for k in &self.kinds {
            match k {
                TileKind::Corner => corners += 1,
                TileKind::Edge => edges += 1,
                TileKind::Interior => interior += 1,
                _ => {}
            }
        }
        (corners, edges, interior)
    }

    /// Count `(strip_ends, strip_middles, other)` tiles in this catalog, for
    /// validating a 1-row or 1-column strip board (see [`Self::validate_counts`]).
    pub fn count_strip_kinds(&self) -> (usize, usize, usize) {
        let mut ends = 0;
        let mut middles = 0;
        let mut other = 0;
        for k in &self.kinds {
            match k {
                TileKind::StripEnd => ends += 1,
                TileKind::StripMiddle => middles += 1,
                _ => other += 1,
            }
        }
        (ends, middles, other)
    }

    /// Validate that this tileset's tile-kind counts match what a `rows x
    /// columns` rectangular board requires, before search starts.
    ///
    /// Three shapes are distinguished, since [`Tile::kind`][super::Tile::kind]'s
    /// adjacent-vs-opposite border classification depends on it:
    /// - A 1x1 board needs its one tile to be [`TileKind::AllBorder`].
    /// - A 1-row or 1-column strip board (`rows == 1` xor `columns == 1`,
    ///   length `N >= 2`) needs exactly 2 [`TileKind::StripEnd`] tiles and
    ///   `N - 2` [`TileKind::StripMiddle`] tiles — every cell sits in both
    ///   the board's top and bottom (or left and right) border at once, so
    ///   its non-end cells carry an *opposite* pair of border edges rather
    ///   than an adjacent one.
    /// - Any other board (`rows, columns >= 2`) needs exactly 4
    ///   [`TileKind::Corner`] tiles and `2 * (rows - 2) + 2 * (columns - 2)`
    ///   [`TileKind::Edge`] tiles.
    pub fn validate_counts(&self, rows: usize, columns: usize) -> Result<(), SolverError> {
        if self.len() != rows * columns {
            return Err(SolverError::UnsolvableByCounts(format!(
                "tileset has {} tiles but board is {}x{} ({} cells)",
                self.len(),
                rows,
                columns,
                rows * columns
            )));
        }

        if rows == 1 && columns == 1 {
            if !matches!(self.kind(0), TileKind::AllBorder) {
                return Err(SolverError::UnsolvableByCounts(
                    "a 1x1 board's sole tile must have all four edges be the border color".into(),
                ));
            }
            return Ok(());
        }

        if rows == 1 || columns == 1 {
            let len = rows * columns;
            let (ends, middles, other) = self.count_strip_kinds();
            if ends != 2 {
                return Err(SolverError::UnsolvableByCounts(format!(
                    "expected exactly 2 strip-end tiles for a {rows}x{columns} strip board, found {ends}"
                )));
            }
            let expected_middles = len - 2;
            if middles != expected_middles {
                return Err(SolverError::UnsolvableByCounts(format!(
                    "expected {expected_middles} strip-middle tiles for a {rows}x{columns} strip board, found {middles}"
                )));
            }
            if other != 0 {
                return Err(SolverError::UnsolvableByCounts(format!(
                    "found {other} tile(s) that are neither a strip end nor a strip middle on a {rows}x{columns} strip board"
                )));
            }
            return Ok(());
        }

        let (corners, edges, _interior) = self.count_kinds();
        if corners != 4 {
            return Err(SolverError::UnsolvableByCounts(format!(
                "expected exactly 4 corner tiles, found {corners}"
            )));
        }
        let expected_edges = 2 * (rows - 2) + 2 * (columns - 2);
        if edges != expected_edges {
            return Err(SolverError::UnsolvableByCounts(format!(
                "expected {expected_edges} edge tiles for a {rows}x{columns} board, found {edges}"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::BORDER;

    #[test]
    fn degenerate_one_by_one_all_border_tile_is_accepted() {
        let tiles = TileSet::new([(1, [BORDER, BORDER, BORDER, BORDER])]).unwrap();
        assert_eq!(tiles.kind(0), TileKind::AllBorder);
        assert!(tiles.validate_counts(1, 1).is_ok());
    }

    #[test]
    fn one_by_one_rejects_a_tile_that_is_not_all_border() {
        let tiles = TileSet::new([(1, [BORDER, 5, BORDER, BORDER])]).unwrap();
        assert!(tiles.validate_counts(1, 1).is_err());
    }

    #[test]
    fn a_one_row_strip_board_validates_with_strip_end_and_middle_tiles() {
        // 1x4 strip: two ends (3 border edges each) and two middles (an
        // opposite N/S border pair each), chained by matching interior colors.
        let tiles = TileSet::new([
            (1, [BORDER, 11, BORDER, BORDER]),
            (2, [BORDER, 12, BORDER, 11]),
            (3, [BORDER, 13, BORDER, 12]),
            (4, [BORDER, BORDER, BORDER, 13]),
        ])
        .unwrap();
        assert_eq!(tiles.kind(0), TileKind::StripEnd);
        assert_eq!(tiles.kind(1), TileKind::StripMiddle);
        assert_eq!(tiles.kind(2), TileKind::StripMiddle);
        assert_eq!(tiles.kind(3), TileKind::StripEnd);
        assert!(tiles.validate_counts(1, 4).is_ok());
    }

    #[test]
    fn a_strip_board_rejects_the_wrong_end_count() {
        // All four tiles are middles: no strip ends at all.
        let tiles = TileSet::new([
            (1, [BORDER, 11, BORDER, 12]),
            (2, [BORDER, 12, BORDER, 13]),
            (3, [BORDER, 13, BORDER, 14]),
            (4, [BORDER, 14, BORDER, 11]),
        ])
        .unwrap();
        assert!(tiles.validate_counts(1, 4).is_err());
    }
}
