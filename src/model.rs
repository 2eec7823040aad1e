//! Representation of a generic rectangular edge-matching puzzle.
//!
//! This includes tiles, the rotation algebra, the tile catalog, the board,
//! and hints. Everything here is generic over board dimensions and color
//! count, so a single binary can drive any Eternity-II-family puzzle.

mod rotation;
pub use rotation::*;

mod tiles;
pub use tiles::*;

mod tileset;
pub use tileset::*;

mod board;
pub use board::*;
