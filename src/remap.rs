use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::tile::{LandTile, StaticEntry};

/// Source to destination tile id substitutions, one table per layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TileReplacementMap {
    #[serde(default)]
    pub terrain: FxHashMap<u16, u16>,
    #[serde(default)]
    pub statics: FxHashMap<u16, u16>,
}

impl TileReplacementMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `{"terrain": {"3": 5}, "statics": {"4096": 4097}}`. Either table may be omitted.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    pub fn with_terrain(mut self, from: u16, to: u16) -> Self {
        self.terrain.insert(from, to);
        self
    }

    pub fn with_static(mut self, from: u16, to: u16) -> Self {
        self.statics.insert(from, to);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.terrain.is_empty() && self.statics.is_empty()
    }
}

pub fn remap_terrain(tile: LandTile, map: Option<&TileReplacementMap>) -> LandTile {
    match map.and_then(|m| m.terrain.get(&tile.tile_id)) {
        Some(&tile_id) => LandTile { tile_id, ..tile },
        None => tile,
    }
}

pub fn remap_static(entry: StaticEntry, map: Option<&TileReplacementMap>) -> StaticEntry {
    match map.and_then(|m| m.statics.get(&entry.tile_id)) {
        Some(&tile_id) => StaticEntry { tile_id, ..entry },
        None => entry,
    }
}
