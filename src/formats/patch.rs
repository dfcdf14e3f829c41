//! Overlay container.
//!
//! A decoded patch set stored as `TPOV` magic, a little-endian `u32` version
//! and a bincode payload of [`PatchRecord`]s. Each record targets one block
//! of one world file, identified by `file_id`.

use serde::{Deserialize, Serialize};
use std::io;

use crate::overlay::Overlay;
use crate::tile::{LandTile, StaticEntry};

const MAGIC: &[u8; 4] = b"TPOV";
const VERSION: u32 = 1;

/// File id of the first map file in a patch set.
pub const DEFAULT_MAP_FILE_ID: u32 = 0;
/// File id of the first statics file in a patch set.
pub const DEFAULT_STATICS_FILE_ID: u32 = 32;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PatchPayload {
    /// 64 row-major tiles.
    Map(Vec<LandTile>),
    Statics(Vec<StaticEntry>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatchRecord {
    pub file_id: u32,
    /// Column-major block id within the patched world.
    pub block_id: u32,
    pub payload: PatchPayload,
}

fn invalid(message: impl Into<String>) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, message.into())
}

pub fn encode_patches(records: &[PatchRecord]) -> io::Result<Vec<u8>> {
    let payload = bincode::serialize(records).map_err(|e| invalid(e.to_string()))?;
    let mut buf = Vec::with_capacity(8 + payload.len());
    buf.extend_from_slice(MAGIC);
    buf.extend_from_slice(&VERSION.to_le_bytes());
    buf.extend_from_slice(&payload);
    Ok(buf)
}

pub fn decode_patches(data: &[u8]) -> io::Result<Vec<PatchRecord>> {
    if data.len() < 8 {
        return Err(invalid("patch data too short"));
    }
    if &data[0..4] != MAGIC {
        return Err(invalid("invalid patch magic bytes"));
    }
    let version = u32::from_le_bytes([data[4], data[5], data[6], data[7]]);
    if version != VERSION {
        return Err(invalid(format!("unsupported patch version: {}", version)));
    }
    bincode::deserialize(&data[8..]).map_err(|e| invalid(e.to_string()))
}

/// Build an overlay from the records addressed to the given files.
///
/// Records for other files, block ids `>= block_count` and map payloads that
/// are not exactly one block are dropped.
pub fn overlay_from_records(
    records: Vec<PatchRecord>,
    block_count: usize,
    map_file_id: Option<u32>,
    statics_file_id: Option<u32>,
) -> Overlay {
    let mut overlay = Overlay::new();
    for record in records {
        if record.block_id as usize >= block_count {
            continue;
        }
        match record.payload {
            PatchPayload::Map(tiles) if Some(record.file_id) == map_file_id => {
                if !overlay.insert_map_slice(record.block_id, &tiles) {
                    log::debug!(
                        "Dropping map patch for block {}: {} tiles",
                        record.block_id,
                        tiles.len()
                    );
                }
            }
            PatchPayload::Statics(entries) if Some(record.file_id) == statics_file_id => {
                overlay.insert_static_block(record.block_id, entries);
            }
            _ => {}
        }
    }
    overlay
}

/// Serialize an overlay, tagging its patches with the given file ids.
pub fn encode_overlay(
    overlay: &Overlay,
    map_file_id: u32,
    statics_file_id: u32,
) -> io::Result<Vec<u8>> {
    let mut records: Vec<PatchRecord> = overlay
        .map_patches()
        .map(|(block_id, tiles)| PatchRecord {
            file_id: map_file_id,
            block_id,
            payload: PatchPayload::Map(tiles.to_vec()),
        })
        .chain(overlay.static_patches().map(|(block_id, entries)| PatchRecord {
            file_id: statics_file_id,
            block_id,
            payload: PatchPayload::Statics(entries.to_vec()),
        }))
        .collect();
    // Sort by file then block for deterministic output
    records.sort_by_key(|r| (r.file_id, r.block_id));
    encode_patches(&records)
}
