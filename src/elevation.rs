use serde::{Deserialize, Serialize};

use crate::tile::{StaticEntry, TerrainGrid};

/// How the z of a copied static object is computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElevationMode {
    #[default]
    Keep,
    /// Shift by the terrain height difference between source and destination cell.
    OffsetByTerrain,
    Fixed(i8),
}

impl ElevationMode {
    pub fn needs_terrain(&self) -> bool {
        matches!(self, ElevationMode::OffsetByTerrain)
    }
}

/// Source and destination terrain, both fully loaded.
#[derive(Debug, Clone, Copy)]
pub struct TerrainPair<'a> {
    pub source: &'a TerrainGrid,
    pub destination: &'a TerrainGrid,
}

/// Elevation for `entry` moved from global tile `(src_x, src_y)` to `(dest_x, dest_y)`.
///
/// `OffsetByTerrain` without terrain, or with a cell outside either grid,
/// keeps the entry's z.
pub fn adjust_z(
    entry: &StaticEntry,
    src_x: u32,
    src_y: u32,
    dest_x: u32,
    dest_y: u32,
    mode: ElevationMode,
    terrain: Option<TerrainPair<'_>>,
) -> i8 {
    match mode {
        ElevationMode::Keep => entry.z,
        ElevationMode::Fixed(z) => z,
        ElevationMode::OffsetByTerrain => {
            let Some(pair) = terrain else {
                return entry.z;
            };
            let (Some(src), Some(dest)) = (
                pair.source.get(src_x, src_y),
                pair.destination.get(dest_x, dest_y),
            ) else {
                return entry.z;
            };
            let z = entry.z as i32 + (dest.z as i32 - src.z as i32);
            z.clamp(i8::MIN as i32, i8::MAX as i32) as i8
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tile::LandTile;

    fn grids(src_z: i8, dest_z: i8) -> (TerrainGrid, TerrainGrid) {
        let mut src = TerrainGrid::new(8, 8);
        let mut dest = TerrainGrid::new(16, 16);
        src.set(1, 2, LandTile::new(3, src_z));
        dest.set(9, 10, LandTile::new(3, dest_z));
        (src, dest)
    }

    #[test]
    fn test_fixed_and_keep_ignore_inputs() {
        let (src, dest) = grids(10, -40);
        let pair = TerrainPair {
            source: &src,
            destination: &dest,
        };
        for z in [-128i8, -1, 0, 17, 127] {
            let entry = StaticEntry::new(1, 1, 2, z, 0);
            assert_eq!(adjust_z(&entry, 1, 2, 9, 10, ElevationMode::Fixed(5), Some(pair)), 5);
            assert_eq!(adjust_z(&entry, 1, 2, 9, 10, ElevationMode::Fixed(5), None), 5);
            assert_eq!(adjust_z(&entry, 1, 2, 9, 10, ElevationMode::Keep, Some(pair)), z);
        }
    }

    #[test]
    fn test_offset_by_terrain() {
        let (src, dest) = grids(10, 25);
        let pair = TerrainPair {
            source: &src,
            destination: &dest,
        };
        let entry = StaticEntry::new(1, 1, 2, 12, 0);
        assert_eq!(
            adjust_z(&entry, 1, 2, 9, 10, ElevationMode::OffsetByTerrain, Some(pair)),
            27
        );
    }

    #[test]
    fn test_offset_by_terrain_clamps() {
        let (src, dest) = grids(-100, 100);
        let pair = TerrainPair {
            source: &src,
            destination: &dest,
        };
        let entry = StaticEntry::new(1, 1, 2, 90, 0);
        assert_eq!(
            adjust_z(&entry, 1, 2, 9, 10, ElevationMode::OffsetByTerrain, Some(pair)),
            i8::MAX
        );

        let (src, dest) = grids(100, -100);
        let pair = TerrainPair {
            source: &src,
            destination: &dest,
        };
        let entry = StaticEntry::new(1, 1, 2, -90, 0);
        assert_eq!(
            adjust_z(&entry, 1, 2, 9, 10, ElevationMode::OffsetByTerrain, Some(pair)),
            i8::MIN
        );
    }

    #[test]
    fn test_offset_without_terrain_keeps_z() {
        let entry = StaticEntry::new(1, 1, 2, 33, 0);
        assert_eq!(
            adjust_z(&entry, 1, 2, 9, 10, ElevationMode::OffsetByTerrain, None),
            33
        );
    }

    #[test]
    fn test_mode_from_json() {
        let mode: ElevationMode = serde_json::from_str(r#"{"fixed": -3}"#).unwrap();
        assert_eq!(mode, ElevationMode::Fixed(-3));
        let mode: ElevationMode = serde_json::from_str(r#""offset_by_terrain""#).unwrap();
        assert!(mode.needs_terrain());
    }
}
