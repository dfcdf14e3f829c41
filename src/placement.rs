//! Copy algorithms that move static objects (and terrain) between worlds.
//!
//! Three strategies place statics:
//!
//! - [`PlacementMode::CellMatch`] walks every tile of the source rectangle and
//!   copies the objects standing on it. Simple, O(area × block entries).
//! - [`PlacementMode::EntryTranslate`] walks the source blocks once and
//!   translates each object in the rectangle directly. Produces the same
//!   result as `CellMatch` without the per-cell scan.
//! - [`PlacementMode::BlockReplaceAligned`] moves whole blocks by a constant
//!   block offset. Needs a block-aligned rectangle and origin.
//!
//! Terrain uses [`copy_terrain`], the same 1:1 cell mapping without blocks.
//!
//! Destinations that fall outside the destination block grid are skipped and
//! counted in [`PlacementStats::skipped`]; they never fail the copy.

use serde::{Deserialize, Serialize};

use crate::elevation::{adjust_z, ElevationMode, TerrainPair};
use crate::error::Result;
use crate::geometry::{Point, Rect, BLOCK_SIZE};
use crate::layout::BlockGrid;
use crate::progress::ProgressTicker;
use crate::remap::{remap_static, remap_terrain, TileReplacementMap};
use crate::tile::{StaticBlocks, StaticEntry, TerrainGrid};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlacementMode {
    #[default]
    CellMatch,
    EntryTranslate,
    BlockReplaceAligned,
}

/// Everything a strategy needs besides the two block arrays.
#[derive(Debug, Clone, Copy)]
pub struct PlacementContext<'a> {
    pub source_rect: Rect,
    pub dest_origin: Point,
    pub source_grid: BlockGrid,
    pub dest_grid: BlockGrid,
    pub remap: Option<&'a TileReplacementMap>,
    pub elevation: ElevationMode,
    pub terrain: Option<TerrainPair<'a>>,
    pub overwrite: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PlacementStats {
    /// Entries appended to the destination.
    pub written: usize,
    /// Destination entries removed by overwriting.
    pub removed: usize,
    /// Cells (CellMatch), entries (EntryTranslate) or blocks (BlockReplaceAligned)
    /// whose destination lies outside the destination grid.
    pub skipped: usize,
}

impl<'a> PlacementContext<'a> {
    pub fn new(
        source_rect: Rect,
        dest_origin: Point,
        source_grid: BlockGrid,
        dest_grid: BlockGrid,
    ) -> Self {
        PlacementContext {
            source_rect,
            dest_origin,
            source_grid,
            dest_grid,
            remap: None,
            elevation: ElevationMode::Keep,
            terrain: None,
            overwrite: true,
        }
    }

    pub fn dest_rect(&self) -> Rect {
        self.source_rect.translate_to(self.dest_origin)
    }

    /// Destination tile for source tile `(sx, sy)` inside the source rectangle.
    /// `None` when it lies past the end of the coordinate range.
    pub fn dest_of(&self, sx: u32, sy: u32) -> Option<(u32, u32)> {
        translate(self.source_rect, self.dest_origin, sx, sy)
    }

    /// The entry as it will be written at destination tile `(dx, dy)`.
    pub fn place(&self, entry: &StaticEntry, sx: u32, sy: u32, dx: u32, dy: u32) -> StaticEntry {
        let mut placed = remap_static(*entry, self.remap).at_global(dx, dy);
        placed.z = adjust_z(entry, sx, sy, dx, dy, self.elevation, self.terrain);
        placed
    }

    /// Progress units `place_statics` reports for `mode`.
    pub fn units(&self, mode: PlacementMode) -> u64 {
        match mode {
            PlacementMode::CellMatch => self.source_rect.height as u64,
            PlacementMode::EntryTranslate | PlacementMode::BlockReplaceAligned => {
                self.source_rect.block_count()
            }
        }
    }

    fn source_block<'b>(
        &self,
        source: &'b StaticBlocks,
        block_x: u32,
        block_y: u32,
    ) -> &'b [StaticEntry] {
        self.source_grid
            .index(block_x as i64, block_y as i64)
            .and_then(|i| source.get(i))
            .map(|b| b.as_slice())
            .unwrap_or(&[])
    }
}

// ─── Statics ────────────────────────────────────────────────────────────────

/// Copy the statics of `ctx.source_rect` from `source` into `dest` using `mode`.
pub fn place_statics(
    mode: PlacementMode,
    ctx: &PlacementContext<'_>,
    source: &StaticBlocks,
    dest: &mut StaticBlocks,
    ticker: &mut ProgressTicker<'_>,
) -> Result<PlacementStats> {
    if ctx.source_rect.is_empty() {
        return Ok(PlacementStats::default());
    }
    match mode {
        PlacementMode::CellMatch => cell_match(ctx, source, dest, ticker),
        PlacementMode::EntryTranslate => entry_translate(ctx, source, dest, ticker),
        PlacementMode::BlockReplaceAligned => block_replace(ctx, source, dest, ticker),
    }
}

fn local(x: u32) -> u8 {
    (x % BLOCK_SIZE) as u8
}

fn translate(rect: Rect, origin: Point, sx: u32, sy: u32) -> Option<(u32, u32)> {
    Some((
        origin.x.checked_add(sx - rect.x)?,
        origin.y.checked_add(sy - rect.y)?,
    ))
}

fn cell_match(
    ctx: &PlacementContext<'_>,
    source: &StaticBlocks,
    dest: &mut StaticBlocks,
    ticker: &mut ProgressTicker<'_>,
) -> Result<PlacementStats> {
    let rect = ctx.source_rect;
    let mut stats = PlacementStats::default();

    for sy in rect.y..rect.bottom() {
        ticker.checkpoint()?;
        for sx in rect.x..rect.right() {
            let Some((dx, dy)) = ctx.dest_of(sx, sy) else {
                stats.skipped += 1;
                continue;
            };
            let slot = ctx.dest_grid.index_of_tile(dx, dy);
            let Some(block) = slot.and_then(|i| dest.get_mut(i)) else {
                stats.skipped += 1;
                continue;
            };

            if ctx.overwrite {
                let before = block.len();
                block.retain(|e| !e.is_at_local(local(dx), local(dy)));
                stats.removed += before - block.len();
            }

            let source_entries = ctx.source_block(source, sx / BLOCK_SIZE, sy / BLOCK_SIZE);
            for entry in source_entries.iter().filter(|e| e.is_at_local(local(sx), local(sy))) {
                block.push(ctx.place(entry, sx, sy, dx, dy));
                stats.written += 1;
            }
        }
        ticker.advance();
    }
    Ok(stats)
}

/// Remove every destination entry standing inside `rect`.
fn clear_rect(dest: &mut StaticBlocks, grid: &BlockGrid, rect: Rect) -> usize {
    let mut removed = 0;
    for by in rect.block_rows() {
        for bx in rect.block_columns() {
            let Some(block) = grid.index(bx as i64, by as i64).and_then(|i| dest.get_mut(i)) else {
                continue;
            };
            let before = block.len();
            block.retain(|e| {
                !rect.contains(bx * BLOCK_SIZE + e.x as u32, by * BLOCK_SIZE + e.y as u32)
            });
            removed += before - block.len();
        }
    }
    removed
}

fn entry_translate(
    ctx: &PlacementContext<'_>,
    source: &StaticBlocks,
    dest: &mut StaticBlocks,
    ticker: &mut ProgressTicker<'_>,
) -> Result<PlacementStats> {
    let rect = ctx.source_rect;
    let mut stats = PlacementStats::default();

    if ctx.overwrite {
        ticker.checkpoint()?;
        stats.removed = clear_rect(dest, &ctx.dest_grid, ctx.dest_rect());
    }

    for by in rect.block_rows() {
        for bx in rect.block_columns() {
            ticker.checkpoint()?;
            for entry in ctx.source_block(source, bx, by) {
                let sx = bx * BLOCK_SIZE + entry.x as u32;
                let sy = by * BLOCK_SIZE + entry.y as u32;
                if !rect.contains(sx, sy) {
                    continue;
                }
                let Some((dx, dy)) = ctx.dest_of(sx, sy) else {
                    stats.skipped += 1;
                    continue;
                };
                let slot = ctx.dest_grid.index_of_tile(dx, dy);
                match slot.and_then(|i| dest.get_mut(i)) {
                    Some(block) => {
                        block.push(ctx.place(entry, sx, sy, dx, dy));
                        stats.written += 1;
                    }
                    None => stats.skipped += 1,
                }
            }
            ticker.advance();
        }
    }
    Ok(stats)
}

/// Whole-block relocation. Callers snap the region to blocks first; an
/// unaligned region is handled at block granularity.
fn block_replace(
    ctx: &PlacementContext<'_>,
    source: &StaticBlocks,
    dest: &mut StaticBlocks,
    ticker: &mut ProgressTicker<'_>,
) -> Result<PlacementStats> {
    let rect = ctx.source_rect;
    let offset_x = (ctx.dest_origin.x / BLOCK_SIZE) as i64 - (rect.x / BLOCK_SIZE) as i64;
    let offset_y = (ctx.dest_origin.y / BLOCK_SIZE) as i64 - (rect.y / BLOCK_SIZE) as i64;
    let mut stats = PlacementStats::default();

    for by in rect.block_rows() {
        for bx in rect.block_columns() {
            ticker.checkpoint()?;
            let dest_bx = bx as i64 + offset_x;
            let dest_by = by as i64 + offset_y;
            let slot = ctx.dest_grid.index(dest_bx, dest_by);
            let Some(block) = slot.and_then(|i| dest.get_mut(i)) else {
                stats.skipped += 1;
                ticker.advance();
                continue;
            };

            let placed: Vec<StaticEntry> = ctx
                .source_block(source, bx, by)
                .iter()
                .map(|entry| {
                    let sx = bx * BLOCK_SIZE + entry.x as u32;
                    let sy = by * BLOCK_SIZE + entry.y as u32;
                    let dx = dest_bx as u32 * BLOCK_SIZE + entry.x as u32;
                    let dy = dest_by as u32 * BLOCK_SIZE + entry.y as u32;
                    ctx.place(entry, sx, sy, dx, dy)
                })
                .collect();

            stats.written += placed.len();
            if ctx.overwrite {
                stats.removed += block.len();
                *block = placed;
            } else {
                block.extend(placed);
            }
            ticker.advance();
        }
    }
    Ok(stats)
}

// ─── Terrain ────────────────────────────────────────────────────────────────

/// Copy the terrain of `rect` from `source` to `dest` at `origin`.
/// Returns the number of cells written.
pub fn copy_terrain(
    rect: Rect,
    origin: Point,
    source: &TerrainGrid,
    dest: &mut TerrainGrid,
    remap: Option<&TileReplacementMap>,
    ticker: &mut ProgressTicker<'_>,
) -> Result<usize> {
    let mut copied = 0;
    for sy in rect.y..rect.bottom() {
        ticker.checkpoint()?;
        for sx in rect.x..rect.right() {
            let Some((dx, dy)) = translate(rect, origin, sx, sy) else {
                continue;
            };
            let Some(tile) = source.get(sx, sy) else {
                continue;
            };
            if dest.set(dx, dy, remap_terrain(tile, remap)) {
                copied += 1;
            }
        }
        ticker.advance();
    }
    Ok(copied)
}
