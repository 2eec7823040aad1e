//! Per-cell candidate domains and the diff-frame machinery that lets the
//! backtracking search roll back a mutation in `O(|diff|)`.

use crate::edge_index::EdgeIndex;
use crate::model::{Board, BoardShape, Pos, Rotation, Side, TileSet, ROTATIONS};

/// A packed `(tile_index, rotation)` candidate.
///
/// Bit layout: `tile_index << 2 | rotation` — this keeps [`CellDomain`] a
/// dense bitset of `4 * T` bits and makes an [`EdgeIndex`] lookup a single
/// word-parallel AND.
pub type Pair = u32;

/// Pack a `(tile_index, rotation)` into a [`Pair`].
pub const fn pack(tile_index: u32, rotation: Rotation) -> Pair {
    (tile_index << 2) | rotation.quarters() as u32
}

/// Unpack a [`Pair`] into its tile index and rotation.
pub fn unpack(pair: Pair) -> (u32, Rotation) {
    (pair >> 2, Rotation::from_quarters((pair & 0b11) as u8))
}

const WORD_BITS: u32 = u64::BITS;

/// A dense bitset of `(tile_index, rotation)` candidates still compatible
/// with a single cell's occupied neighbors and border constraints.
#[derive(Debug, Clone, Default)]
pub struct CellDomain {
    words: Vec<u64>,
    len: usize,
}

impl CellDomain {
    /// An empty domain sized to hold pairs for up to `tile_count` tiles.
    pub fn empty(tile_count: usize) -> Self {
        let bits = tile_count * 4;
        let words = (bits as u32).div_ceil(WORD_BITS) as usize;
        CellDomain {
            words: vec![0; words.max(1)],
            len: 0,
        }
    }

    fn word_bit(pair: Pair) -> (usize, u32) {
        ((pair / WORD_BITS) as usize, pair % WORD_BITS)
    }

    /// True if `pair` is present in this domain.
    pub fn contains(&self, pair: Pair) -> bool {
        let (w, b) = Self::word_bit(pair);
        self.words.get(w).is_some_and(|word| word & (1 << b) != 0)
    }

    /// Insert `pair`. Returns `true` if it was newly inserted.
    pub fn insert(&mut self, pair: Pair) -> bool {
        let (w, b) = Self::word_bit(pair);
        if w >= self.words.len() {
            self.words.resize(w + 1, 0);
        }
        let mask = 1u64 << b;
        let was_absent = self.words[w] & mask == 0;
        self.words[w] |= mask;
        if was_absent {
            self.len += 1;
        }
        was_absent
    }

    /// Remove `pair`. Idempotent: returns `true` only if it was present.
    pub fn remove(&mut self, pair: Pair) -> bool {
        let (w, b) = Self::word_bit(pair);
        let Some(word) = self.words.get_mut(w) else {
            return false;
        };
        let mask = 1u64 << b;
        let was_present = *word & mask != 0;
        *word &= !mask;
        if was_present {
            self.len -= 1;
        }
        was_present
    }

    /// The number of candidates still in this domain.
    pub fn len(&self) -> usize {
        self.len
    }

    /// True if this domain has no candidates left.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// True if this domain has exactly one candidate.
    pub fn is_singleton(&self) -> bool {
        self.len == 1
    }

    /// The sole candidate, if this domain is a singleton.
    pub fn singleton(&self) -> Option<Pair> {
        (self.len == 1).then(|| self.iter().next().expect("len == 1"))
    }

    /// Iterate over the candidates in this domain, in ascending `Pair` order.
    pub fn iter(&self) -> impl Iterator<Item = Pair> + '_ {
        self.words.iter().enumerate().flat_map(|(w, &word)| {
            (0..WORD_BITS)
                .filter(move |&b| word & (1 << b) != 0)
                .map(move |b| w as u32 * WORD_BITS + b)
        })
    }

    /// Intersect this domain with `other` in place (word-parallel AND).
    pub fn and_with(&mut self, other: &CellDomain) {
        let n = self.words.len().min(other.words.len());
        for w in 0..n {
            self.words[w] &= other.words[w];
        }
        for w in self.words.iter_mut().skip(n) {
            *w = 0;
        }
        self.len = self.words.iter().map(|w| w.count_ones() as usize).sum();
    }
}

enum FrameEntry {
    /// `pair` was removed from `cell`'s domain; re-insert it on rollback.
    Removed(usize, Pair),
    /// `cell`'s whole domain was replaced (e.g. by singleton forcing); the
    /// prior domain is restored verbatim on rollback.
    Replaced(usize, CellDomain),
}

/// A mutation frame: the set of domain changes made since the matching
/// `push_frame`, sufficient to roll them all back in `O(|diff|)`.
#[derive(Default)]
struct Frame {
    entries: Vec<FrameEntry>,
}

/// Per-cell candidate domains, with stacked diff frames for `O(|diff|)`
/// rollback of any mutation.
pub struct DomainStore {
    shape: BoardShape,
    domains: Vec<CellDomain>,
    frames: Vec<Frame>,
}

impl DomainStore {
    /// Compute the initial domain store for `board`, given its (possibly
    /// hint-prefilled) occupied cells.
    pub fn init(board: &Board, tiles: &TileSet, edge_index: &EdgeIndex) -> Self {
        let shape = board.shape();
        let mut domains = vec![CellDomain::empty(tiles.len()); shape.cells()];

        let mut used = vec![false; tiles.len()];
        for tile in tiles.indices() {
            used[tile as usize] = board.is_used(tile);
        }

        for pos in board.positions() {
            if !board.is_empty(pos) {
                continue;
            }
            let idx = cell_index(&shape, pos);
            domains[idx] = domain_for_cell(pos, board, tiles, edge_index, &used);
        }

        DomainStore {
            shape,
            domains,
            frames: Vec::new(),
        }
    }

    /// Open a new mutation frame. Must be matched by a later [`Self::pop_frame`].
    pub fn push_frame(&mut self) {
        self.frames.push(Frame::default());
    }

    /// Close the most recent mutation frame, rolling back every change
    /// recorded in it. The store is bit-identical to its state before the
    /// matching `push_frame`.
    pub fn pop_frame(&mut self) {
        let frame = self.frames.pop().expect("pop_frame without push_frame");
        for entry in frame.entries.into_iter().rev() {
            match entry {
                FrameEntry::Removed(cell, pair) => {
                    self.domains[cell].insert(pair);
                }
                FrameEntry::Replaced(cell, old) => {
                    self.domains[cell] = old;
                }
            }
        }
    }

    fn current_frame(&mut self) -> &mut Frame {
        self.frames.last_mut().expect("no open frame")
    }

    /// Remove `pair` from `cell`'s domain, recording the removal in the
    /// current frame. Idempotent.
    pub fn remove(&mut self, cell: usize, pair: Pair) -> bool {
        if self.domains[cell].remove(pair) {
            self.current_frame()
                .entries
                .push(FrameEntry::Removed(cell, pair));
            true
        } else {
            false
        }
    }

    /// Replace `cell`'s domain with the singleton `{pair}`, recording the
    /// prior domain in the current frame.
    pub fn set_singleton(&mut self, cell: usize, pair: Pair) {
        let old = std::mem::replace(&mut self.domains[cell], CellDomain::default());
        self.current_frame()
            .entries
            .push(FrameEntry::Replaced(cell, old));
        let mut singleton = CellDomain::empty(1);
        singleton.insert(pair);
        self.domains[cell] = singleton;
    }

    /// The domain of the cell at `pos`.
    pub fn domain(&self, pos: Pos) -> &CellDomain {
        &self.domains[cell_index(&self.shape, pos)]
    }

    /// The domain size of the cell at `pos`.
    pub fn domain_size(&self, pos: Pos) -> usize {
        self.domain(pos).len()
    }

    /// The shape of the board this store was built for.
    pub fn shape(&self) -> BoardShape {
        self.shape
    }
}

/// Convert a [`Pos`] into this store's dense cell index.
pub fn cell_index(shape: &BoardShape, pos: Pos) -> usize {
    pos.row * shape.columns + pos.col
}

/// Convert a dense cell index back into a [`Pos`].
pub fn pos_of_index(shape: &BoardShape, index: usize) -> Pos {
    Pos::new(index / shape.columns, index % shape.columns)
}

/// Compute the domain for a single empty cell from scratch: every
/// `(tile, rotation)` pair consistent with the cell's occupied neighbors,
/// its border constraints, and the global `used` set.
pub fn domain_for_cell(
    pos: Pos,
    board: &Board,
    tiles: &TileSet,
    edge_index: &EdgeIndex,
    used: &[bool],
) -> CellDomain {
    let shape = board.shape();
    let mut required: [Option<u8>; 4] = [None; 4];
    for side in [Side::North, Side::East, Side::South, Side::West] {
        match shape.neighbor(pos, side) {
            None => required[side as usize] = Some(crate::model::BORDER),
            Some(neighbor) => {
                if let Some(color) = board.exposed_edge(neighbor, side.opposite(), tiles) {
                    required[side as usize] = Some(color);
                }
            }
        }
    }
    edge_index.candidates(required, used)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pair_pack_unpack_round_trips() {
        for tile in 0..300u32 {
            for r in ROTATIONS {
                let packed = pack(tile, r);
                assert_eq!(unpack(packed), (tile, r));
            }
        }
    }

    #[test]
    fn cell_domain_insert_remove_roundtrip() {
        let mut d = CellDomain::empty(4);
        assert!(d.is_empty());
        assert!(d.insert(pack(2, Rotation::Rot90)));
        assert!(!d.insert(pack(2, Rotation::Rot90)));
        assert_eq!(d.len(), 1);
        assert!(d.contains(pack(2, Rotation::Rot90)));
        assert!(d.remove(pack(2, Rotation::Rot90)));
        assert!(!d.remove(pack(2, Rotation::Rot90)));
        assert!(d.is_empty());
    }

    #[test]
    fn push_pop_frame_is_identity() {
        let mut store = DomainStore {
            shape: BoardShape::new(1, 2),
            domains: vec![CellDomain::empty(4), CellDomain::empty(4)],
            frames: Vec::new(),
        };
        store.domains[0].insert(pack(0, Rotation::Rot0));
        store.domains[0].insert(pack(1, Rotation::Rot0));
        let before = store.domains[0].len();

        store.push_frame();
        store.remove(0, pack(0, Rotation::Rot0));
        store.set_singleton(1, pack(3, Rotation::Rot180));
        assert_ne!(store.domains[0].len(), before);
        store.pop_frame();

        assert_eq!(store.domains[0].len(), before);
        assert!(store.domains[0].contains(pack(0, Rotation::Rot0)));
        assert!(store.domains[1].is_empty());
    }
}
