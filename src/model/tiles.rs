use super::{Rotation, Side, ROTATIONS};

/// An edge color. Color `0` is the distinguished border color that must face
/// outward on every perimeter cell.
pub type Color = u8;

/// The border color. Every outward-facing edge of a perimeter cell must carry
/// this color, and no interior edge may.
pub const BORDER: Color = 0;

/// An immutable tile: four colored edges in an unrotated reference frame.
///
/// Edges are stored north, east, south, west (clockwise from the top), and
/// can be accessed directly via [`Side`] indexing through [`Tile::edge_at`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Tile {
    edges: [Color; 4],
}

impl Tile {
    /// Make a new tile from its four edges, given in N, E, S, W order.
    pub const fn new(north: Color, east: Color, south: Color, west: Color) -> Tile {
        Tile {
            edges: [north, east, south, west],
        }
    }

    /// The tile's edge colors in their unrotated N, E, S, W order.
    pub const fn edges(&self) -> [Color; 4] {
        self.edges
    }

    /// The color exposed on `side` when the tile is placed at `rotation`.
    ///
    /// A tile at rotation `r` exposes, on side `d`, the color that in its
    /// unrotated frame sat on side `(d - r + 4) mod 4`.
    pub fn edge_at(&self, side: Side, rotation: Rotation) -> Color {
        let d = side as usize;
        let r = rotation.quarters();
        self.edges[(d + 4 - r) % 4]
    }

    /// All four exposed edges at the given rotation, in N, E, S, W order.
    pub fn rotated_edges(&self, rotation: Rotation) -> [Color; 4] {
        let mut out = [0; 4];
        for side in [Side::North, Side::East, Side::South, Side::West] {
            out[side as usize] = self.edge_at(side, rotation);
        }
        out
    }

    /// The sides whose edge is the border color.
    fn border_sides(&self) -> [bool; 4] {
        let mut out = [false; 4];
        for side in [Side::North, Side::East, Side::South, Side::West] {
            out[side as usize] = self.edges[side as usize] == BORDER;
        }
        out
    }

    /// Classify this tile by the number and arrangement of its border edges.
    ///
    /// A plain count isn't enough: two border edges can sit on *adjacent*
    /// sides (a true corner, fitting a 2D board corner cell) or on
    /// *opposite* sides (N/S or E/W) — the latter only ever fits a middle
    /// cell of a 1-row or 1-column "strip" board, where both of a cell's
    /// row-neighbors (or both of its column-neighbors) are simultaneously
    /// off the board. A strip board's two end cells additionally carry a
    /// third border edge on the outward-facing short side, and a 1x1 board's
    /// sole cell carries all four.
    pub fn kind(&self) -> TileKind {
        let sides = self.border_sides();
        match sides.iter().filter(|&&b| b).count() {
            0 => TileKind::Interior,
            1 => TileKind::Edge,
            2 => {
                if sides[Side::North as usize] == sides[Side::South as usize] {
                    // N and S agree (both border): an opposite pair.
                    TileKind::StripMiddle
                } else {
                    TileKind::Corner
                }
            }
            3 => TileKind::StripEnd,
            4 => TileKind::AllBorder,
            n => TileKind::Invalid(n),
        }
    }

    /// Test if this tile is a corner piece (two adjacent border edges).
    pub fn is_corner(&self) -> bool {
        matches!(self.kind(), TileKind::Corner)
    }

    /// Test if this tile is an edge piece (exactly one border edge).
    pub fn is_edge(&self) -> bool {
        matches!(self.kind(), TileKind::Edge)
    }

    /// Test if this tile belongs on the outside border of some board shape:
    /// a corner, a non-corner perimeter edge, a strip-board middle or end
    /// cell, or the sole all-border tile of a 1x1 board.
    pub fn is_border_tile(&self) -> bool {
        !matches!(self.kind(), TileKind::Interior)
    }

    /// The smallest rotation producing the lexicographically smallest
    /// rotated-edge tuple, used to break rotational symmetry when placing
    /// the first corner tile.
    pub fn canonical_rotation(&self) -> Rotation {
        ROTATIONS
            .into_iter()
            .min_by_key(|&r| self.rotated_edges(r))
            .expect("ROTATIONS is non-empty")
    }
}

/// The classification of a tile by the number and arrangement of its border
/// edges. See [`Tile::kind`] for how each variant arises.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileKind {
    /// Two adjacent border edges: belongs in a corner cell of a board with
    /// at least 2 rows and 2 columns.
    Corner,
    /// One border edge: belongs on a non-corner perimeter cell.
    Edge,
    /// No border edges: belongs in an interior cell.
    Interior,
    /// Two *opposite* border edges (N+S or E+W): belongs in a middle cell of
    /// a 1-row or 1-column strip board.
    StripMiddle,
    /// Three border edges: belongs at one of the two end cells of a strip
    /// board at least two cells long.
    StripEnd,
    /// All four edges are the border color: the sole tile of a degenerate
    /// 1x1 board.
    AllBorder,
    /// An invalid tile whose border-edge count cannot occur on any of the
    /// four sides of a single tile; never produced by well-formed input.
    Invalid(usize),
}
