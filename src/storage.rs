//! Storage layer consumed by the transplant engine.
//!
//! Implementors supply raw byte access; the provided methods decode and
//! encode world files through [`crate::formats`]. [`FileStorage`] works on
//! the filesystem, [`MemoryStorage`] keeps files in a path-keyed map.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::{Result, TransplantError};
use crate::formats::{mul, patch};
use crate::layout::{BlockGrid, Layout};
use crate::overlay::Overlay;
use crate::tile::{StaticBlocks, TerrainGrid};

pub trait WorldStorage {
    fn read_bytes(&self, path: &Path) -> io::Result<Vec<u8>>;
    fn write_bytes(&mut self, path: &Path, data: &[u8]) -> io::Result<()>;
    fn exists(&self, path: &Path) -> bool;

    fn file_len(&self, path: &Path) -> io::Result<u64> {
        self.read_bytes(path).map(|data| data.len() as u64)
    }

    fn read_land_tiles(&self, path: &Path, width: u32, height: u32) -> Result<TerrainGrid> {
        let data = self
            .read_bytes(path)
            .map_err(|e| TransplantError::read(path, e))?;
        let tiles =
            mul::decode_land(&data, width, height).map_err(|e| TransplantError::read(path, e))?;
        TerrainGrid::from_tiles(width, height, tiles).ok_or_else(|| {
            TransplantError::read(
                path,
                io::Error::new(io::ErrorKind::InvalidData, "decoded tile count mismatch"),
            )
        })
    }

    fn write_land_tiles(&mut self, path: &Path, terrain: &TerrainGrid) -> Result<()> {
        let data = mul::encode_land(terrain.tiles(), terrain.width(), terrain.height())
            .map_err(|e| TransplantError::write(path, e))?;
        self.write_bytes(path, &data)
            .map_err(|e| TransplantError::write(path, e))
    }

    /// One entry list per block of a `width` x `height` world, in file order.
    fn read_statics(
        &self,
        index_path: &Path,
        data_path: &Path,
        width: u32,
        height: u32,
    ) -> Result<StaticBlocks> {
        let block_count = BlockGrid::for_world(width, height, Layout::default()).block_count();
        let index = self
            .read_bytes(index_path)
            .map_err(|e| TransplantError::read(index_path, e))?;
        let data = self
            .read_bytes(data_path)
            .map_err(|e| TransplantError::read(data_path, e))?;
        mul::decode_statics(&index, &data, block_count)
            .map_err(|e| TransplantError::read(index_path, e))
    }

    fn write_statics(
        &mut self,
        index_path: &Path,
        data_path: &Path,
        width: u32,
        height: u32,
        blocks: &StaticBlocks,
    ) -> Result<()> {
        let block_count = BlockGrid::for_world(width, height, Layout::default()).block_count();
        if blocks.len() != block_count {
            return Err(TransplantError::write(
                index_path,
                io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!(
                        "{} blocks given for a {}x{} world ({} expected)",
                        blocks.len(),
                        width,
                        height,
                        block_count
                    ),
                ),
            ));
        }
        let (index, data) =
            mul::encode_statics(blocks).map_err(|e| TransplantError::write(data_path, e))?;
        self.write_bytes(data_path, &data)
            .map_err(|e| TransplantError::write(data_path, e))?;
        self.write_bytes(index_path, &index)
            .map_err(|e| TransplantError::write(index_path, e))
    }

    fn write_empty_statics(
        &mut self,
        index_path: &Path,
        data_path: &Path,
        width: u32,
        height: u32,
    ) -> Result<()> {
        let block_count = BlockGrid::for_world(width, height, Layout::default()).block_count();
        let (index, data) = mul::empty_statics(block_count);
        self.write_bytes(data_path, &data)
            .map_err(|e| TransplantError::write(data_path, e))?;
        self.write_bytes(index_path, &index)
            .map_err(|e| TransplantError::write(index_path, e))
    }

    fn load_overlay(
        &self,
        path: &Path,
        block_count: usize,
        map_file_id: Option<u32>,
        statics_file_id: Option<u32>,
    ) -> Result<Overlay> {
        if !self.exists(path) {
            return Err(TransplantError::OverlayLoad {
                path: path.to_path_buf(),
                reason: "patch file does not exist".to_string(),
            });
        }
        let data = self
            .read_bytes(path)
            .map_err(|e| TransplantError::OverlayLoad {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        let records = patch::decode_patches(&data).map_err(|e| TransplantError::OverlayLoad {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Ok(patch::overlay_from_records(
            records,
            block_count,
            map_file_id,
            statics_file_id,
        ))
    }

    fn resolve_map_size(&self, path: &Path) -> Result<(u32, u32)> {
        let len = self
            .file_len(path)
            .map_err(|e| TransplantError::SizeUnresolved {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        mul::world_size_from_map_len(len).map_err(|reason| TransplantError::SizeUnresolved {
            path: path.to_path_buf(),
            reason,
        })
    }
}

/// Files on the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileStorage;

impl WorldStorage for FileStorage {
    fn read_bytes(&self, path: &Path) -> io::Result<Vec<u8>> {
        fs::read(path)
    }

    fn write_bytes(&mut self, path: &Path, data: &[u8]) -> io::Result<()> {
        fs::write(path, data)
    }

    fn exists(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn file_len(&self, path: &Path) -> io::Result<u64> {
        fs::metadata(path).map(|m| m.len())
    }
}

/// Files held in memory, keyed by path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryStorage {
    files: HashMap<PathBuf, Vec<u8>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<PathBuf>, data: Vec<u8>) {
        self.files.insert(path.into(), data);
    }

    pub fn get(&self, path: impl AsRef<Path>) -> Option<&[u8]> {
        self.files.get(path.as_ref()).map(|d| d.as_slice())
    }

    pub fn remove(&mut self, path: impl AsRef<Path>) -> Option<Vec<u8>> {
        self.files.remove(path.as_ref())
    }

    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.files.keys().map(|p| p.as_path())
    }
}

impl WorldStorage for MemoryStorage {
    fn read_bytes(&self, path: &Path) -> io::Result<Vec<u8>> {
        self.files.get(path).cloned().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("{} not found", path.display()),
            )
        })
    }

    fn write_bytes(&mut self, path: &Path, data: &[u8]) -> io::Result<()> {
        self.files.insert(path.to_path_buf(), data.to_vec());
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        self.files.contains_key(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::patch::{encode_overlay, DEFAULT_MAP_FILE_ID, DEFAULT_STATICS_FILE_ID};
    use crate::overlay::BLOCK_TILES;
    use crate::tile::{LandTile, StaticEntry};
    use tempfile::tempdir;

    #[test]
    fn test_memory_storage_land_roundtrip() {
        let mut storage = MemoryStorage::new();
        let mut terrain = TerrainGrid::new(16, 8);
        terrain.set(9, 7, LandTile::new(44, 12));
        storage.write_land_tiles(Path::new("map0.mul"), &terrain).unwrap();

        assert!(storage.resolve_map_size(Path::new("map0.mul")).is_err());
        let loaded = storage.read_land_tiles(Path::new("map0.mul"), 16, 8).unwrap();
        assert_eq!(loaded, terrain);
        assert_eq!(storage.get("map0.mul").map(|d| d.len()), Some(2 * 196));
    }

    #[test]
    fn test_missing_file_is_read_error() {
        let storage = MemoryStorage::new();
        match storage.read_land_tiles(Path::new("nope.mul"), 8, 8) {
            Err(TransplantError::StorageRead { path, source }) => {
                assert_eq!(path, PathBuf::from("nope.mul"));
                assert_eq!(source.kind(), io::ErrorKind::NotFound);
            }
            other => panic!("expected read error, got {:?}", other),
        }
    }

    #[test]
    fn test_write_statics_checks_block_count() {
        let mut storage = MemoryStorage::new();
        let blocks: StaticBlocks = vec![Vec::new(); 3];
        let result = storage.write_statics(Path::new("idx"), Path::new("dat"), 16, 16, &blocks);
        assert!(matches!(result, Err(TransplantError::StorageWrite { .. })));
        assert!(!storage.exists(Path::new("idx")));
        assert_eq!(storage.paths().count(), 0);
    }

    #[test]
    fn test_empty_statics_written_as_two_files() {
        let mut storage = MemoryStorage::new();
        storage
            .write_empty_statics(Path::new("staidx0.mul"), Path::new("statics0.mul"), 16, 16)
            .unwrap();

        let mut paths: Vec<&Path> = storage.paths().collect();
        paths.sort();
        assert_eq!(paths, vec![Path::new("staidx0.mul"), Path::new("statics0.mul")]);
        assert_eq!(storage.get("statics0.mul"), Some(&[][..]));
        assert!(storage.get("map0.mul").is_none());
    }

    #[test]
    fn test_missing_overlay_names_file() {
        let storage = MemoryStorage::new();
        let err = storage
            .load_overlay(Path::new("verdata.mul"), 4, Some(0), None)
            .unwrap_err();
        assert!(err.to_string().contains("verdata.mul"));
        assert!(matches!(err, TransplantError::OverlayLoad { .. }));
    }

    #[test]
    fn test_file_storage_roundtrip() {
        let dir = tempdir().unwrap();
        let map = dir.path().join("map0.mul");
        let idx = dir.path().join("staidx0.mul");
        let dat = dir.path().join("statics0.mul");
        let mut storage = FileStorage;

        storage.write_land_tiles(&map, &TerrainGrid::new(16, 16)).unwrap();
        assert_eq!(storage.resolve_map_size(&map).unwrap(), (16, 16));

        storage.write_empty_statics(&idx, &dat, 16, 16).unwrap();
        let blocks = storage.read_statics(&idx, &dat, 16, 16).unwrap();
        assert_eq!(blocks.len(), 4);
        assert!(blocks.iter().all(|b| b.is_empty()));

        let mut blocks = blocks;
        blocks[3].push(StaticEntry::new(7, 1, 1, 0, 0));
        storage.write_statics(&idx, &dat, 16, 16, &blocks).unwrap();
        assert_eq!(storage.read_statics(&idx, &dat, 16, 16).unwrap(), blocks);
    }

    #[test]
    fn test_file_storage_overlay() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("patch.tpov");
        let mut overlay = Overlay::new();
        overlay.insert_map_block(1, [LandTile::new(3, 3); BLOCK_TILES]);
        overlay.insert_static_block(2, vec![StaticEntry::new(1, 0, 0, 0, 0)]);
        fs::write(
            &path,
            encode_overlay(&overlay, DEFAULT_MAP_FILE_ID, DEFAULT_STATICS_FILE_ID).unwrap(),
        )
        .unwrap();

        let loaded = FileStorage
            .load_overlay(&path, 4, Some(DEFAULT_MAP_FILE_ID), Some(DEFAULT_STATICS_FILE_ID))
            .unwrap();
        assert_eq!(loaded, overlay);
    }
}
