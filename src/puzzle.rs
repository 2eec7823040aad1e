//! Parses the line-oriented puzzle text format into a [`TileSet`],
//! [`BoardShape`], and any fixed-piece [`Hint`]s.

use crate::error::SolverError;
use crate::model::{BoardShape, Hint, Pos, Rotation, TileSet};

/// A fully parsed puzzle: its tile catalog, board dimensions, and any hints.
#[derive(Debug)]
pub struct Puzzle {
    /// The tile catalog.
    pub tiles: TileSet,
    /// The board's dimensions.
    pub shape: BoardShape,
    /// Fixed-piece hints, applied before search starts.
    pub hints: Vec<Hint>,
}

/// Parse the puzzle text format:
///
/// ```text
/// # comments start with '#' and may appear anywhere
/// R C
/// id north east south west
/// ...one line per tile...
/// row col tile_id rotation   # optional fixed-piece block
/// ```
///
/// `border` color is `0`. Tile ids in the fixed-piece block refer to the
/// external ids given in the tile lines, not dense indices.
pub fn parse_puzzle(text: &str) -> Result<Puzzle, SolverError> {
    let bad = |msg: String| SolverError::BadInput(msg);

    let mut lines = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'));

    let header = lines
        .next()
        .ok_or_else(|| bad("empty puzzle: missing dimensions header".into()))?;
    let mut header_fields = header.split_whitespace();
    let rows: usize = header_fields
        .next()
        .ok_or_else(|| bad("dimensions header missing row count".into()))?
        .parse()
        .map_err(|_| bad("dimensions header row count is not a number".into()))?;
    let columns: usize = header_fields
        .next()
        .ok_or_else(|| bad("dimensions header missing column count".into()))?
        .parse()
        .map_err(|_| bad("dimensions header column count is not a number".into()))?;
    if rows == 0 || columns == 0 {
        return Err(bad("board dimensions must be positive".into()));
    }

    let tile_count = rows * columns;
    let mut raw_tiles = Vec::with_capacity(tile_count);
    for _ in 0..tile_count {
        let line = lines
            .next()
            .ok_or_else(|| bad(format!("expected {tile_count} tile lines, ran out early")))?;
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() != 5 {
            return Err(bad(format!(
                "tile line must have 5 fields (id n e s w), found {}: {line:?}",
                fields.len()
            )));
        }
        let id: u32 = fields[0]
            .parse()
            .map_err(|_| bad(format!("tile id is not a number: {line:?}")))?;
        let mut edges = [0u8; 4];
        for (i, field) in fields[1..5].iter().enumerate() {
            edges[i] = field
                .parse()
                .map_err(|_| bad(format!("tile edge color is not a non-negative byte: {line:?}")))?;
        }
        raw_tiles.push((id, edges));
    }

    let tiles = TileSet::new(raw_tiles)?;
    tiles.validate_counts(rows, columns)?;

    let mut hints = Vec::new();
    for line in lines {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() != 4 {
            return Err(bad(format!(
                "fixed-piece line must have 4 fields (row col tile_id rotation), found {}: {line:?}",
                fields.len()
            )));
        }
        let row: usize = fields[0]
            .parse()
            .map_err(|_| bad(format!("fixed-piece row is not a number: {line:?}")))?;
        let col: usize = fields[1]
            .parse()
            .map_err(|_| bad(format!("fixed-piece col is not a number: {line:?}")))?;
        let external_id: u32 = fields[2]
            .parse()
            .map_err(|_| bad(format!("fixed-piece tile id is not a number: {line:?}")))?;
        let rotation: u8 = fields[3]
            .parse()
            .map_err(|_| bad(format!("fixed-piece rotation is not a number: {line:?}")))?;
        if rotation > 3 {
            return Err(bad(format!("fixed-piece rotation must be in 0..4: {line:?}")));
        }
        if row >= rows || col >= columns {
            return Err(bad(format!(
                "fixed-piece position ({row}, {col}) is outside the {rows}x{columns} board"
            )));
        }
        let tile = tiles
            .index_of(external_id)
            .ok_or_else(|| bad(format!("fixed-piece refers to unknown tile id {external_id}")))?;
        hints.push(Hint {
            at: Pos::new(row, col),
            tile,
            rotation: Rotation::from_quarters(rotation),
        });
    }

    Ok(Puzzle {
        tiles,
        shape: BoardShape::new(rows, columns),
        hints,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_trivial_one_by_one_puzzle() {
        let text = "# a single all-border tile\n1 1\n1 0 0 0 0\n";
        let puzzle = parse_puzzle(text).unwrap();
        assert_eq!(puzzle.shape, BoardShape::new(1, 1));
        assert_eq!(puzzle.tiles.len(), 1);
        assert!(puzzle.hints.is_empty());
    }

    #[test]
    fn parses_fixed_piece_hints() {
        let text = "2 1\n1 0 5 5 0\n2 5 0 0 5\n0 0 1 0\n";
        let puzzle = parse_puzzle(text).unwrap();
        assert_eq!(puzzle.hints.len(), 1);
        assert_eq!(puzzle.hints[0].at, Pos::new(0, 0));
        assert_eq!(puzzle.hints[0].rotation, Rotation::Rot0);
    }

    #[test]
    fn rejects_wrong_tile_count() {
        let text = "2 2\n1 0 0 0 0\n";
        assert!(parse_puzzle(text).is_err());
    }

    #[test]
    fn rejects_malformed_color() {
        let text = "1 1\n1 0 0 0 -1\n";
        assert!(parse_puzzle(text).is_err());
    }
}
