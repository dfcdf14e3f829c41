//! Legacy patch overlay.
//!
//! An overlay supersedes individual blocks of a world's terrain or statics.
//! Patches are keyed by the column-major block id `block_x * block_height + block_y`
//! of the world they patch, whatever layout that world's block array uses.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::geometry::BLOCK_SIZE;
use crate::layout::{block_index, BlockGrid, Layout};
use crate::tile::{LandTile, StaticBlocks, StaticEntry, TerrainGrid};

/// Number of terrain cells in one block.
pub const BLOCK_TILES: usize = (BLOCK_SIZE * BLOCK_SIZE) as usize;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Overlay {
    map_patches: FxHashMap<u32, Vec<LandTile>>,
    static_patches: FxHashMap<u32, Vec<StaticEntry>>,
}

impl Overlay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a terrain patch. `tiles` is row-major within the block.
    pub fn insert_map_block(&mut self, block_id: u32, tiles: [LandTile; BLOCK_TILES]) {
        self.map_patches.insert(block_id, tiles.to_vec());
    }

    /// Register a terrain patch from a slice; ignored unless it holds exactly one block.
    pub(crate) fn insert_map_slice(&mut self, block_id: u32, tiles: &[LandTile]) -> bool {
        if tiles.len() != BLOCK_TILES {
            return false;
        }
        self.map_patches.insert(block_id, tiles.to_vec());
        true
    }

    pub fn insert_static_block(&mut self, block_id: u32, entries: Vec<StaticEntry>) {
        self.static_patches.insert(block_id, entries);
    }

    pub fn map_patch_count(&self) -> usize {
        self.map_patches.len()
    }

    pub fn statics_patch_count(&self) -> usize {
        self.static_patches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map_patches.is_empty() && self.static_patches.is_empty()
    }

    pub fn try_get_map_block(&self, block_id: i64) -> Option<&[LandTile]> {
        let id = u32::try_from(block_id).ok()?;
        self.map_patches.get(&id).map(|tiles| tiles.as_slice())
    }

    pub fn try_get_static_block(&self, block_id: i64) -> Option<&[StaticEntry]> {
        let id = u32::try_from(block_id).ok()?;
        self.static_patches.get(&id).map(|entries| entries.as_slice())
    }

    pub(crate) fn map_patches(&self) -> impl Iterator<Item = (u32, &[LandTile])> {
        self.map_patches.iter().map(|(&id, t)| (id, t.as_slice()))
    }

    pub(crate) fn static_patches(&self) -> impl Iterator<Item = (u32, &[StaticEntry])> {
        self.static_patches.iter().map(|(&id, e)| (id, e.as_slice()))
    }

    /// Replace every patched block of `blocks`. Returns the number of blocks replaced.
    pub fn apply_to_statics(&self, blocks: &mut StaticBlocks, grid: &BlockGrid) -> usize {
        let column_major = BlockGrid::new(grid.block_width, grid.block_height, Layout::ColumnMajor);
        let mut patched = 0;
        for (&id, entries) in &self.static_patches {
            let Some((bx, by)) = column_major.coords(id as usize) else {
                continue;
            };
            let Some(slot) = grid.index(bx as i64, by as i64) else {
                continue;
            };
            if let Some(block) = blocks.get_mut(slot) {
                *block = entries.clone();
                patched += 1;
            }
        }
        patched
    }
}

/// Patch one strip of terrain, `BLOCK_SIZE` tile rows tall, taken from a
/// row-major grid. Returns the number of blocks replaced.
pub fn patch_terrain_row(
    overlay: &Overlay,
    block_row_index: u32,
    row: &mut [LandTile],
    block_height: u32,
) -> usize {
    if overlay.map_patch_count() == 0 {
        return 0;
    }
    let width = row.len() / BLOCK_SIZE as usize;
    let block_width = width / BLOCK_SIZE as usize;
    let mut patched = 0;

    for bx in 0..block_width {
        let id = block_index(
            bx as i64,
            block_row_index as i64,
            block_width as i64,
            block_height as i64,
            Layout::ColumnMajor,
        );
        let Some(tiles) = overlay.try_get_map_block(id) else {
            continue;
        };
        for ly in 0..BLOCK_SIZE as usize {
            let src = &tiles[ly * BLOCK_SIZE as usize..(ly + 1) * BLOCK_SIZE as usize];
            let start = ly * width + bx * BLOCK_SIZE as usize;
            row[start..start + BLOCK_SIZE as usize].copy_from_slice(src);
        }
        patched += 1;
    }
    patched
}

/// Apply every map patch to a whole terrain grid. Returns the number of blocks replaced.
pub fn patch_terrain(overlay: &Overlay, terrain: &mut TerrainGrid) -> usize {
    if overlay.map_patch_count() == 0 || terrain.width() == 0 {
        return 0;
    }
    let strip = terrain.width() as usize * BLOCK_SIZE as usize;
    let block_height = terrain.height() / BLOCK_SIZE;
    terrain
        .tiles_mut()
        .chunks_exact_mut(strip)
        .enumerate()
        .map(|(by, row)| patch_terrain_row(overlay, by as u32, row, block_height))
        .sum()
}

/// Replace patched blocks of a static block array. Returns the number of blocks replaced.
pub fn patch_static_blocks(
    overlay: &Overlay,
    blocks: &mut StaticBlocks,
    grid: &BlockGrid,
) -> usize {
    if overlay.statics_patch_count() == 0 {
        return 0;
    }
    overlay.apply_to_statics(blocks, grid)
}
