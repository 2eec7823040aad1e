use std::mem::transmute;

/// The four sides of a tile.
///
/// Sides are identified by their compass cardinalities. North/south point
/// up/down in rows, east/west point left/right in columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum Side {
    /// The North, top side.
    North = 0,
    /// The East, right side.
    East,
    /// The South, bottom side.
    South,
    /// The West, left side.
    West,
}

impl Side {
    /// Flip the direction of the side: north <-> south, east <-> west.
    pub const fn opposite(self) -> Self {
        let s = (self as usize + 2) % 4;
        unsafe { transmute(s) }
    }
}

/// All [Side] values, in order.
pub const SIDES: [Side; 4] = [Side::North, Side::East, Side::South, Side::West];

/// The rotation applied to a tile before it is placed on the board.
///
/// `Rot90` means the tile has been turned 90 degrees clockwise: the edge that
/// used to face west now faces north. This matches the convention that a
/// tile at rotation `r` exposes edge `edges[(d - r + 4) mod 4]` on side `d`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum Rotation {
    /// No rotation.
    Rot0 = 0,
    /// Rotated 90 degrees clockwise.
    Rot90,
    /// Rotated 180 degrees.
    Rot180,
    /// Rotated 270 degrees clockwise (90 counter-clockwise).
    Rot270,
}

impl Rotation {
    /// Build a rotation from its quarter-turn count.
    ///
    /// # Panics
    /// Panics if `quarters` is not in `0..4`.
    pub const fn from_quarters(quarters: u8) -> Self {
        match quarters {
            0 => Rotation::Rot0,
            1 => Rotation::Rot90,
            2 => Rotation::Rot180,
            3 => Rotation::Rot270,
            _ => panic!("rotation quarters must be in 0..4"),
        }
    }

    /// The number of clockwise quarter turns this rotation represents.
    pub const fn quarters(self) -> usize {
        self as usize
    }
}

impl std::ops::Add for Rotation {
    type Output = Rotation;
    fn add(self, rhs: Self) -> Self::Output {
        let lhs = self as usize;
        let rhs = rhs as usize;
        let sum = (lhs + rhs) % 4;

        unsafe { transmute(sum) }
    }
}

/// All [Rotation] values, in order.
pub const ROTATIONS: [Rotation; 4] = [
    Rotation::Rot0,
    Rotation::Rot90,
    Rotation::Rot180,
    Rotation::Rot270,
];
