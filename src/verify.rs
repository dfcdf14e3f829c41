//! Post-write verification by multiset comparison.
//!
//! Each static object is reduced to a [`StaticKey`] (tile, global position,
//! elevation, hue). The expected multiset is built from the source region as
//! the engine intended to write it; the actual multiset comes from the
//! destination as re-read from storage. Differences in either direction are
//! reported, never raised.

use std::collections::BTreeMap;
use std::fmt;

use rustc_hash::FxHashMap;
use serde::Serialize;

use crate::geometry::{Point, Rect, BLOCK_SIZE};
use crate::layout::BlockGrid;
use crate::placement::PlacementContext;
use crate::remap::{remap_terrain, TileReplacementMap};
use crate::tile::{StaticBlocks, StaticEntry, TerrainGrid};

/// A static object in global tile coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct StaticKey {
    pub tile_id: u16,
    pub x: u32,
    pub y: u32,
    pub z: i8,
    pub hue: u16,
}

impl fmt::Display for StaticKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "tile 0x{:04X} at ({}, {}, {}) hue {}",
            self.tile_id, self.x, self.y, self.z, self.hue
        )
    }
}

pub type Multiset = FxHashMap<StaticKey, usize>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Discrepancy {
    pub key: StaticKey,
    pub count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VerificationReport {
    /// Entries the source region should have produced.
    pub expected: usize,
    /// Entries found in the destination region.
    pub found: usize,
    /// Keys the source has more of than the destination.
    pub missing: Vec<Discrepancy>,
    /// Keys the destination has more of than the source.
    pub extra: Vec<Discrepancy>,
    /// Terrain cells whose destination tile differs from the source tile.
    pub terrain_mismatches: usize,
}

impl VerificationReport {
    pub fn missing_count(&self) -> usize {
        self.missing.iter().map(|d| d.count).sum()
    }

    pub fn extra_count(&self) -> usize {
        self.extra.iter().map(|d| d.count).sum()
    }

    pub fn is_clean(&self) -> bool {
        self.missing.is_empty() && self.extra.is_empty() && self.terrain_mismatches == 0
    }
}

/// Every entry of `blocks` standing inside `rect`, keyed by global position.
pub fn collect_region(blocks: &StaticBlocks, grid: &BlockGrid, rect: Rect) -> Multiset {
    let mut set = Multiset::default();
    if rect.is_empty() {
        return set;
    }
    for by in rect.block_rows() {
        for bx in rect.block_columns() {
            let Some(block) = grid.index(bx as i64, by as i64).and_then(|i| blocks.get(i)) else {
                continue;
            };
            for entry in block {
                let x = bx * BLOCK_SIZE + entry.x as u32;
                let y = by * BLOCK_SIZE + entry.y as u32;
                if !rect.contains(x, y) {
                    continue;
                }
                let key = StaticKey {
                    tile_id: entry.tile_id,
                    x,
                    y,
                    z: entry.z,
                    hue: entry.hue,
                };
                *set.entry(key).or_insert(0) += 1;
            }
        }
    }
    set
}

/// The source region as it should look in the destination: translated,
/// remapped and with elevation adjusted like the placement strategies do.
pub fn expected_region(ctx: &PlacementContext<'_>, source: &StaticBlocks) -> Multiset {
    let mut set = Multiset::default();
    for (key, count) in collect_region(source, &ctx.source_grid, ctx.source_rect) {
        let Some((dx, dy)) = ctx.dest_of(key.x, key.y) else {
            continue;
        };
        let local = StaticEntry::new(
            key.tile_id,
            (key.x % BLOCK_SIZE) as u8,
            (key.y % BLOCK_SIZE) as u8,
            key.z,
            key.hue,
        );
        let placed = ctx.place(&local, key.x, key.y, dx, dy);
        let translated = StaticKey {
            tile_id: placed.tile_id,
            x: dx,
            y: dy,
            z: placed.z,
            hue: placed.hue,
        };
        *set.entry(translated).or_insert(0) += count;
    }
    set
}

/// Compare two multisets. Discrepancies are sorted by key.
pub fn compare(expected: &Multiset, actual: &Multiset) -> VerificationReport {
    let mut missing = BTreeMap::new();
    let mut extra = BTreeMap::new();

    for (key, &want) in expected {
        let have = actual.get(key).copied().unwrap_or(0);
        if want > have {
            missing.insert(*key, want - have);
        }
    }
    for (key, &have) in actual {
        let want = expected.get(key).copied().unwrap_or(0);
        if have > want {
            extra.insert(*key, have - want);
        }
    }

    VerificationReport {
        expected: expected.values().sum(),
        found: actual.values().sum(),
        missing: missing
            .into_iter()
            .map(|(key, count)| Discrepancy { key, count })
            .collect(),
        extra: extra
            .into_iter()
            .map(|(key, count)| Discrepancy { key, count })
            .collect(),
        terrain_mismatches: 0,
    }
}

/// Count destination cells that do not hold the (remapped) source tile.
pub fn terrain_mismatches(
    rect: Rect,
    origin: Point,
    source: &TerrainGrid,
    dest: &TerrainGrid,
    remap: Option<&TileReplacementMap>,
) -> usize {
    let mut mismatches = 0;
    for sy in rect.y..rect.bottom() {
        for sx in rect.x..rect.right() {
            let want = source.get(sx, sy).map(|t| remap_terrain(t, remap));
            let dest_x = origin.x.checked_add(sx - rect.x);
            let dest_y = origin.y.checked_add(sy - rect.y);
            let have = match (dest_x, dest_y) {
                (Some(dx), Some(dy)) => dest.get(dx, dy),
                _ => None,
            };
            if want != have {
                mismatches += 1;
            }
        }
    }
    mismatches
}
