use super::{Rotation, Side, Tile, TileIndex, TileSet, BORDER};

/// A placement of a tile (by dense index) at a rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    /// The dense tile index placed here.
    pub tile: TileIndex,
    /// The rotation applied to the tile before placement.
    pub rotation: Rotation,
}

/// The (row, column) location of a cell within a [`Board`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Pos {
    /// Row, 0-indexed from the top.
    pub row: usize,
    /// Column, 0-indexed from the left.
    pub col: usize,
}

impl Pos {
    /// Construct a position.
    pub const fn new(row: usize, col: usize) -> Self {
        Pos { row, col }
    }
}

/// The dimensions of a board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoardShape {
    /// Row count.
    pub rows: usize,
    /// Column count.
    pub columns: usize,
}

impl BoardShape {
    /// Construct a board shape.
    pub const fn new(rows: usize, columns: usize) -> Self {
        BoardShape { rows, columns }
    }

    /// The total number of cells.
    pub const fn cells(&self) -> usize {
        self.rows * self.columns
    }

    /// True if `pos` lies on the outer perimeter of a board with this shape.
    pub const fn is_border(&self, pos: Pos) -> bool {
        pos.row == 0 || pos.col == 0 || pos.row == self.rows - 1 || pos.col == self.columns - 1
    }

    /// The neighboring position in `side`, if it lies on the board.
    pub fn neighbor(&self, pos: Pos, side: Side) -> Option<Pos> {
        match side {
            Side::North => pos.row.checked_sub(1).map(|row| Pos::new(row, pos.col)),
            Side::South => (pos.row + 1 < self.rows).then(|| Pos::new(pos.row + 1, pos.col)),
            Side::West => pos.col.checked_sub(1).map(|col| Pos::new(pos.row, col)),
            Side::East => (pos.col + 1 < self.columns).then(|| Pos::new(pos.row, pos.col + 1)),
        }
    }

    /// Build a fresh, empty board with this shape.
    pub fn new_board(&self) -> Board {
        Board::new(self.rows, self.columns)
    }
}

/// A hint: a position pinned to a specific tile and rotation before search
/// starts. Hint cells are never revisited by backtracking.
#[derive(Debug, Clone, Copy)]
pub struct Hint {
    /// The pinned position.
    pub at: Pos,
    /// The pinned tile (by dense index).
    pub tile: TileIndex,
    /// The pinned rotation.
    pub rotation: Rotation,
}

/// A (partially filled) board.
///
/// Each cell is empty, or contains a [`Placement`]. The `used` bitset tracks,
/// per dense tile index, whether that tile currently occupies some cell.
#[derive(Debug, Clone)]
pub struct Board {
    /// Number of rows in the board (its height).
    pub rows: usize,
    /// Number of columns in the board (its width).
    pub columns: usize,
    cells: Vec<Option<Placement>>,
    used: Vec<bool>,
}

impl Board {
    /// Create a new, empty board of the given shape, sized to hold up to
    /// `rows * columns` distinct tile ids.
    pub fn new(rows: usize, columns: usize) -> Board {
        Board {
            rows,
            columns,
            cells: vec![None; rows * columns],
            used: vec![false; rows * columns],
        }
    }

    /// This board's shape.
    pub fn shape(&self) -> BoardShape {
        BoardShape::new(self.rows, self.columns)
    }

    fn index(&self, pos: Pos) -> usize {
        debug_assert!(pos.row < self.rows);
        debug_assert!(pos.col < self.columns);
        pos.row * self.columns + pos.col
    }

    /// The placement at `pos`, if any.
    pub fn get(&self, pos: Pos) -> Option<Placement> {
        self.cells[self.index(pos)]
    }

    /// True if `pos` is empty.
    pub fn is_empty(&self, pos: Pos) -> bool {
        self.get(pos).is_none()
    }

    /// True if the tile at dense index `tile` is currently placed somewhere.
    pub fn is_used(&self, tile: TileIndex) -> bool {
        self.used[tile as usize]
    }

    /// Iterate over all positions on the board, in row-major order.
    pub fn positions(&self) -> impl Iterator<Item = Pos> + '_ {
        let columns = self.columns;
        (0..self.rows).flat_map(move |row| (0..columns).map(move |col| Pos::new(row, col)))
    }

    /// Place a tile at `pos`.
    ///
    /// `place` does not validate edge consistency with neighbors — that is
    /// the propagator's job. It only maintains the `used` bitset and the
    /// cell contents.
    ///
    /// # Panics
    /// Panics if `tile` is already used elsewhere on the board: a
    /// double-placement of a used tile is an implementation bug in the
    /// caller, never a reachable outcome of normal search.
    pub fn place(&mut self, pos: Pos, placement: Placement) {
        assert!(
            !self.used[placement.tile as usize],
            "tile {} placed twice (double-placement is a fatal caller bug)",
            placement.tile
        );
        let idx = self.index(pos);
        self.cells[idx] = Some(placement);
        self.used[placement.tile as usize] = true;
    }

    /// Remove the placement at `pos`, if any, freeing its tile for reuse.
    pub fn unplace(&mut self, pos: Pos) {
        let idx = self.index(pos);
        if let Some(placement) = self.cells[idx].take() {
            self.used[placement.tile as usize] = false;
        }
    }

    /// Apply a hint, pinning its tile and rotation at its position.
    pub fn apply_hint(&mut self, hint: &Hint) {
        self.place(
            hint.at,
            Placement {
                tile: hint.tile,
                rotation: hint.rotation,
            },
        );
    }

    /// The color exposed on `side` of the placement at `pos`, if occupied.
    pub fn exposed_edge(&self, pos: Pos, side: Side, tiles: &TileSet) -> Option<u8> {
        self.get(pos)
            .map(|p| tiles.tile(p.tile).edge_at(side, p.rotation))
    }

    /// Count matching vs. total internal (cell-to-occupied-neighbor) edges,
    /// as `(matching, total)`. A complete, correct solution has
    /// `matching == total` and `total` equal to the number of internal edges
    /// in the grid.
    pub fn calculate_score(&self, tiles: &TileSet) -> (usize, usize) {
        let shape = self.shape();
        let mut matching = 0;
        let mut total = 0;
        for pos in self.positions() {
            let Some(placement) = self.get(pos) else {
                continue;
            };
            let tile = tiles.tile(placement.tile);
            for side in [Side::East, Side::South] {
                let Some(neighbor_pos) = shape.neighbor(pos, side) else {
                    continue;
                };
                let Some(neighbor) = self.get(neighbor_pos) else {
                    continue;
                };
                total += 1;
                let mine = tile.edge_at(side, placement.rotation);
                let theirs = tiles
                    .tile(neighbor.tile)
                    .edge_at(side.opposite(), neighbor.rotation);
                if mine == theirs {
                    matching += 1;
                }
            }
        }
        (matching, total)
    }

    /// True if every border cell's outward-facing edges carry the border
    /// color, and the board has no empty cells.
    pub fn is_valid_solution(&self, tiles: &TileSet) -> bool {
        let shape = self.shape();
        for pos in self.positions() {
            let Some(placement) = self.get(pos) else {
                return false;
            };
            if shape.is_border(pos) {
                let tile = tiles.tile(placement.tile);
                for side in [Side::North, Side::East, Side::South, Side::West] {
                    if shape.neighbor(pos, side).is_none()
                        && tile.edge_at(side, placement.rotation) != BORDER
                    {
                        return false;
                    }
                }
            }
        }
        let (matching, total) = self.calculate_score(tiles);
        matching == total
    }
}

/// A snapshot of a board's occupied cells, independent of the live `Board`
/// it was copied from. Used by [`crate::shared_best::SharedBest`] and
/// [`crate::checkpoint`] so they do not have to hold a worker's live board.
#[derive(Debug, Clone)]
pub struct BoardSnapshot {
    /// Shape of the snapshotted board.
    pub shape: BoardShape,
    /// Placements in row-major order, `None` for empty cells.
    pub cells: Vec<Option<Placement>>,
}

impl From<&Board> for BoardSnapshot {
    fn from(board: &Board) -> Self {
        BoardSnapshot {
            shape: board.shape(),
            cells: board.cells.clone(),
        }
    }
}

impl BoardSnapshot {
    /// Materialize this snapshot into a live [`Board`].
    pub fn to_board(&self) -> Board {
        let mut board = self.shape.new_board();
        for (idx, cell) in self.cells.iter().enumerate() {
            if let Some(placement) = cell {
                let pos = Pos::new(idx / self.shape.columns, idx % self.shape.columns);
                board.place(pos, *placement);
            }
        }
        board
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TileSet;

    fn tiny_tileset() -> TileSet {
        // A trivial 1x1 puzzle: a single all-border tile.
        TileSet::new([(1, [BORDER, BORDER, BORDER, BORDER])]).unwrap()
    }

    #[test]
    fn place_then_unplace_restores_empty_board() {
        let shape = BoardShape::new(2, 2);
        let mut board = shape.new_board();
        let pos = Pos::new(0, 0);
        board.place(
            pos,
            Placement {
                tile: 0,
                rotation: Rotation::Rot0,
            },
        );
        assert!(board.is_used(0));
        board.unplace(pos);
        assert!(!board.is_used(0));
        assert!(board.is_empty(pos));
    }

    #[test]
    fn one_by_one_all_border_tile_is_a_valid_solution() {
        let tiles = tiny_tileset();
        let shape = BoardShape::new(1, 1);
        let mut board = shape.new_board();
        board.place(
            Pos::new(0, 0),
            Placement {
                tile: 0,
                rotation: Rotation::Rot0,
            },
        );
        assert!(board.is_valid_solution(&tiles));
        assert_eq!(board.calculate_score(&tiles), (0, 0));
    }

    #[test]
    #[should_panic(expected = "double-placement")]
    fn double_placement_of_a_used_tile_panics() {
        let shape = BoardShape::new(2, 1);
        let mut board = shape.new_board();
        let placement = Placement {
            tile: 0,
            rotation: Rotation::Rot0,
        };
        board.place(Pos::new(0, 0), placement);
        board.place(Pos::new(1, 0), placement);
    }
}
