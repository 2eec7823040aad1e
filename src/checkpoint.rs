//! Textual, line-oriented checkpoint encoding: enough to resume a worker's
//! board and used-set exactly, verified against the tileset it was taken
//! from via a digest.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::SolverError;
use crate::model::{Board, Placement, Pos, Rotation, TileIndex, TileSet};

/// A fully decoded checkpoint: enough to rebuild a board and resume search.
#[derive(Debug, Clone)]
pub struct CheckpointData {
    /// Digest of the tileset this checkpoint was taken against.
    pub tile_set_digest: u64,
    /// Board row count.
    pub rows: usize,
    /// Board column count.
    pub columns: usize,
    /// Placements in the order they were made, `(pos, tile, rotation, order_ix)`.
    pub placements: Vec<(Pos, TileIndex, Rotation, u32)>,
    /// The tile-used bitset, indexed by dense tile index.
    pub used: Vec<bool>,
    /// Cumulative compute time spent on this puzzle across all checkpoints.
    pub cumulative_compute_ms: u64,
    /// The worker's RNG seed at the time of the checkpoint.
    pub seed: u64,
    /// Unix timestamp (seconds) the checkpoint was written.
    pub timestamp: u64,
}

impl CheckpointData {
    /// Reconstruct the ordered list of placements as `(pos, placement)`
    /// pairs, suitable for replaying onto a fresh board.
    pub fn ordered_placements(&self) -> Vec<(Pos, Placement)> {
        let mut by_order = self.placements.clone();
        by_order.sort_by_key(|&(_, _, _, ix)| ix);
        by_order
            .into_iter()
            .map(|(pos, tile, rotation, _)| (pos, Placement { tile, rotation }))
            .collect()
    }
}

impl CheckpointData {
    /// Build a checkpoint from a live board, in the order its cells were
    /// filled (row-major, since `Board` does not itself track placement
    /// order — row-major is a stable, deterministic substitute that still
    /// round-trips a faithful board + used-set on resume).
    pub fn from_board(
        tiles: &TileSet,
        board: &Board,
        seed: u64,
        cumulative_compute_ms: u64,
    ) -> CheckpointData {
        let mut placements = Vec::new();
        let mut used = vec![false; tiles.len()];
        for pos in board.positions() {
            if let Some(placement) = board.get(pos) {
                placements.push((pos, placement.tile, placement.rotation, placements.len() as u32));
                used[placement.tile as usize] = true;
            }
        }
        CheckpointData {
            tile_set_digest: digest(tiles),
            rows: board.rows,
            columns: board.columns,
            placements,
            used,
            cumulative_compute_ms,
            seed,
            timestamp: std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or(0),
        }
    }
}

/// Compute a digest of a tileset's external ids and edge colors, stable
/// across runs for the same logical tileset regardless of in-memory layout.
pub fn digest(tiles: &TileSet) -> u64 {
    let mut hasher = DefaultHasher::new();
    for index in tiles.indices() {
        tiles.external_id(index).hash(&mut hasher);
        tiles.tile(index).edges().hash(&mut hasher);
    }
    hasher.finish()
}

/// Reads and writes the textual checkpoint format. Each puzzle gets its own
/// directory; within it, `current` is the rolling latest checkpoint and
/// `best_<depth>` is an immutable snapshot taken the first time that depth
/// was reached.
pub struct CheckpointIo {
    dir: PathBuf,
}

impl CheckpointIo {
    /// A checkpoint I/O handle rooted at `dir`, which is created if absent.
    pub fn new(dir: impl Into<PathBuf>) -> std::io::Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(CheckpointIo { dir })
    }

    /// Path of the rolling `current` checkpoint file.
    pub fn current_path(&self) -> PathBuf {
        self.dir.join("current.ckpt")
    }

    /// Path of the immutable `best_<depth>` checkpoint file.
    pub fn best_path(&self, depth: u32) -> PathBuf {
        self.dir.join(format!("best_{depth}.ckpt"))
    }

    /// Write `data` to `path`, replacing any existing content.
    pub fn write(&self, path: &Path, data: &CheckpointData) -> std::io::Result<()> {
        let mut out = String::new();
        out.push_str("# eternity-solver checkpoint\n");
        out.push_str(&format!("digest {:x}\n", data.tile_set_digest));
        out.push_str(&format!("rows {}\n", data.rows));
        out.push_str(&format!("columns {}\n", data.columns));
        out.push_str(&format!("seed {}\n", data.seed));
        out.push_str(&format!("compute_ms {}\n", data.cumulative_compute_ms));
        out.push_str(&format!("timestamp {}\n", data.timestamp));
        for &(pos, tile, rotation, order_ix) in &data.placements {
            out.push_str(&format!(
                "placement {} {} {} {} {}\n",
                pos.row,
                pos.col,
                tile,
                rotation.quarters(),
                order_ix
            ));
        }
        let used_bits: String = data
            .used
            .iter()
            .map(|&b| if b { '1' } else { '0' })
            .collect();
        out.push_str(&format!("used {used_bits}\n"));

        let tmp = path.with_extension("ckpt.tmp");
        {
            let mut file = std::fs::File::create(&tmp)?;
            file.write_all(out.as_bytes())?;
            file.sync_all()?;
        }
        std::fs::rename(&tmp, path)
    }

    /// Read and parse a checkpoint from `path`.
    pub fn read(&self, path: &Path) -> Result<CheckpointData, SolverError> {
        let text = std::fs::read_to_string(path)?;
        parse(&text)
    }
}

fn parse(text: &str) -> Result<CheckpointData, SolverError> {
    let bad = |msg: &str| SolverError::BadInput(format!("malformed checkpoint: {msg}"));

    let mut tile_set_digest = None;
    let mut rows = None;
    let mut columns = None;
    let mut seed = None;
    let mut cumulative_compute_ms = None;
    let mut timestamp = None;
    let mut placements = Vec::new();
    let mut used = Vec::new();

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut fields = line.split_whitespace();
        let tag = fields.next().ok_or_else(|| bad("empty line"))?;
        match tag {
            "digest" => {
                let raw = fields.next().ok_or_else(|| bad("digest missing value"))?;
                tile_set_digest = Some(
                    u64::from_str_radix(raw, 16).map_err(|_| bad("digest not valid hex"))?,
                );
            }
            "rows" => rows = Some(parse_field(&mut fields, "rows")?),
            "columns" => columns = Some(parse_field(&mut fields, "columns")?),
            "seed" => seed = Some(parse_field(&mut fields, "seed")?),
            "compute_ms" => cumulative_compute_ms = Some(parse_field(&mut fields, "compute_ms")?),
            "timestamp" => timestamp = Some(parse_field(&mut fields, "timestamp")?),
            "placement" => {
                let row = parse_field(&mut fields, "placement row")?;
                let col = parse_field(&mut fields, "placement col")?;
                let tile: TileIndex = parse_field(&mut fields, "placement tile")?;
                let rotation: u8 = parse_field(&mut fields, "placement rotation")?;
                let order_ix = parse_field(&mut fields, "placement order")?;
                if rotation > 3 {
                    return Err(bad("placement rotation out of range"));
                }
                placements.push((
                    Pos::new(row, col),
                    tile,
                    Rotation::from_quarters(rotation),
                    order_ix,
                ));
            }
            "used" => {
                let raw = fields.next().ok_or_else(|| bad("used missing value"))?;
                used = raw
                    .chars()
                    .map(|c| match c {
                        '0' => Ok(false),
                        '1' => Ok(true),
                        _ => Err(bad("used bitset has non-binary character")),
                    })
                    .collect::<Result<_, _>>()?;
            }
            other => return Err(bad(&format!("unknown tag {other}"))),
        }
    }

    Ok(CheckpointData {
        tile_set_digest: tile_set_digest.ok_or_else(|| bad("missing digest"))?,
        rows: rows.ok_or_else(|| bad("missing rows"))?,
        columns: columns.ok_or_else(|| bad("missing columns"))?,
        placements,
        used,
        cumulative_compute_ms: cumulative_compute_ms.unwrap_or(0),
        seed: seed.ok_or_else(|| bad("missing seed"))?,
        timestamp: timestamp.unwrap_or(0),
    })
}

fn parse_field<T: std::str::FromStr>(
    fields: &mut std::str::SplitWhitespace,
    what: &str,
) -> Result<T, SolverError> {
    fields
        .next()
        .ok_or_else(|| SolverError::BadInput(format!("malformed checkpoint: {what} missing value")))?
        .parse()
        .map_err(|_| SolverError::BadInput(format!("malformed checkpoint: {what} not a number")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_text() {
        let data = CheckpointData {
            tile_set_digest: 0xdead_beef,
            rows: 2,
            columns: 2,
            placements: vec![
                (Pos::new(0, 0), 3, Rotation::Rot90, 0),
                (Pos::new(0, 1), 1, Rotation::Rot0, 1),
            ],
            used: vec![true, false, true, false],
            cumulative_compute_ms: 4200,
            seed: 7,
            timestamp: 1_700_000_000,
        };

        let dir = tempfile::tempdir().unwrap();
        let io = CheckpointIo::new(dir.path()).unwrap();
        let path = io.current_path();
        io.write(&path, &data).unwrap();
        let read_back = io.read(&path).unwrap();

        assert_eq!(read_back.tile_set_digest, data.tile_set_digest);
        assert_eq!(read_back.rows, data.rows);
        assert_eq!(read_back.columns, data.columns);
        assert_eq!(read_back.used, data.used);
        assert_eq!(read_back.seed, data.seed);
        assert_eq!(read_back.cumulative_compute_ms, data.cumulative_compute_ms);
        assert_eq!(read_back.ordered_placements().len(), 2);
    }

    #[test]
    fn digest_is_stable_for_the_same_logical_tileset() {
        use crate::model::BORDER;
        let a = TileSet::new([(1, [BORDER, 2, BORDER, BORDER])]).unwrap();
        let b = TileSet::new([(1, [BORDER, 2, BORDER, BORDER])]).unwrap();
        assert_eq!(digest(&a), digest(&b));
    }
}
