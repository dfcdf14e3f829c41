use serde::{Deserialize, Serialize};

use crate::geometry::BLOCK_SIZE;

/// One terrain cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct LandTile {
    pub tile_id: u16,
    pub z: i8,
}

/// One static object. `x` and `y` are local to the block that holds it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct StaticEntry {
    pub tile_id: u16,
    pub x: u8,
    pub y: u8,
    pub z: i8,
    pub hue: u16,
}

/// One entry list per block slot, in the owning world's block layout.
pub type StaticBlocks = Vec<Vec<StaticEntry>>;

impl LandTile {
    pub fn new(tile_id: u16, z: i8) -> Self {
        LandTile { tile_id, z }
    }
}

impl StaticEntry {
    pub fn new(tile_id: u16, x: u8, y: u8, z: i8, hue: u16) -> Self {
        StaticEntry {
            tile_id,
            x,
            y,
            z,
            hue,
        }
    }

    /// Same object moved to the block-local cell that holds global tile `(x, y)`.
    pub fn at_global(mut self, x: u32, y: u32) -> Self {
        self.x = (x % BLOCK_SIZE) as u8;
        self.y = (y % BLOCK_SIZE) as u8;
        self
    }

    pub fn is_at_local(&self, x: u8, y: u8) -> bool {
        self.x == x && self.y == y
    }
}

/// Row-major terrain of a whole world.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerrainGrid {
    width: u32,
    height: u32,
    tiles: Vec<LandTile>,
}

impl TerrainGrid {
    pub fn new(width: u32, height: u32) -> Self {
        TerrainGrid {
            width,
            height,
            tiles: vec![LandTile::default(); width as usize * height as usize],
        }
    }

    /// Wrap a flat row-major tile array. Returns `None` when its length is not `width * height`.
    pub fn from_tiles(width: u32, height: u32, tiles: Vec<LandTile>) -> Option<Self> {
        if tiles.len() != width as usize * height as usize {
            return None;
        }
        Some(TerrainGrid {
            width,
            height,
            tiles,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn tiles(&self) -> &[LandTile] {
        &self.tiles
    }

    pub fn tiles_mut(&mut self) -> &mut [LandTile] {
        &mut self.tiles
    }

    pub fn into_tiles(self) -> Vec<LandTile> {
        self.tiles
    }

    fn index(&self, x: u32, y: u32) -> Option<usize> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(y as usize * self.width as usize + x as usize)
    }

    pub fn get(&self, x: u32, y: u32) -> Option<LandTile> {
        self.index(x, y).map(|i| self.tiles[i])
    }

    pub fn set(&mut self, x: u32, y: u32, tile: LandTile) -> bool {
        match self.index(x, y) {
            Some(i) => {
                self.tiles[i] = tile;
                true
            }
            None => false,
        }
    }
}
