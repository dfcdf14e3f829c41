//! Legacy world file codec.
//!
//! Map file: blocks in column-major order (`block_x * block_height + block_y`),
//! each a 4-byte header followed by 64 cells, row-major within the block:
//!
//! ```text
//! | header(4) | tile_id(u16 LE) z(i8) | ... 64 cells ... |   = 196 bytes
//! ```
//!
//! Statics are split over two files. The index holds one 12-byte record per
//! block slot (`offset i32, length i32, extra i32`, little endian) and the
//! data file holds 7-byte entries (`tile_id u16, x u8, y u8, z i8, hue u16`).
//! A negative offset or non-positive length marks an empty block. The block
//! slots follow the order of the block array they were written from.

use std::io;

use crate::geometry::BLOCK_SIZE;
use crate::tile::{LandTile, StaticBlocks, StaticEntry};

pub const MAP_BLOCK_HEADER_BYTES: usize = 4;
pub const MAP_CELL_BYTES: usize = 3;
pub const MAP_BLOCK_BYTES: usize = MAP_BLOCK_HEADER_BYTES + 64 * MAP_CELL_BYTES;
pub const INDEX_RECORD_BYTES: usize = 12;
pub const STATIC_ENTRY_BYTES: usize = 7;

/// World sizes shipped with the legacy client. 2560x2048 and 1280x4096 share a
/// block count; the first match wins.
pub const KNOWN_WORLD_SIZES: &[(u32, u32)] = &[
    (7168, 4096),
    (6144, 4096),
    (2560, 2048),
    (2304, 1600),
    (1448, 1448),
    (1280, 4096),
];

fn invalid(message: String) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, message)
}

fn block_dims(width: u32, height: u32) -> io::Result<(usize, usize)> {
    if width == 0 || height == 0 || width % BLOCK_SIZE != 0 || height % BLOCK_SIZE != 0 {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("world size {}x{} is not a whole number of blocks", width, height),
        ));
    }
    Ok(((width / BLOCK_SIZE) as usize, (height / BLOCK_SIZE) as usize))
}

// ─── Map ────────────────────────────────────────────────────────────────────

/// Decode a map file into a row-major tile array of `width * height` cells.
/// Trailing blocks beyond the world are ignored.
pub fn decode_land(data: &[u8], width: u32, height: u32) -> io::Result<Vec<LandTile>> {
    let (block_width, block_height) = block_dims(width, height)?;
    let needed = block_width * block_height * MAP_BLOCK_BYTES;
    if data.len() < needed {
        return Err(invalid(format!(
            "map data holds {} bytes, a {}x{} world needs {}",
            data.len(),
            width,
            height,
            needed
        )));
    }

    let width = width as usize;
    let block = BLOCK_SIZE as usize;
    let mut tiles = vec![LandTile::default(); width * height as usize];

    for bx in 0..block_width {
        for by in 0..block_height {
            let start = (bx * block_height + by) * MAP_BLOCK_BYTES + MAP_BLOCK_HEADER_BYTES;
            for ly in 0..block {
                for lx in 0..block {
                    let cell = start + (ly * block + lx) * MAP_CELL_BYTES;
                    let tile = LandTile {
                        tile_id: u16::from_le_bytes([data[cell], data[cell + 1]]),
                        z: data[cell + 2] as i8,
                    };
                    tiles[(by * block + ly) * width + bx * block + lx] = tile;
                }
            }
        }
    }
    Ok(tiles)
}

/// Encode a row-major tile array as a map file.
pub fn encode_land(tiles: &[LandTile], width: u32, height: u32) -> io::Result<Vec<u8>> {
    let (block_width, block_height) = block_dims(width, height)?;
    if tiles.len() != width as usize * height as usize {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!(
                "{} tiles given for a {}x{} world",
                tiles.len(),
                width,
                height
            ),
        ));
    }

    let width = width as usize;
    let block = BLOCK_SIZE as usize;
    let mut out = Vec::with_capacity(block_width * block_height * MAP_BLOCK_BYTES);

    for bx in 0..block_width {
        for by in 0..block_height {
            out.extend_from_slice(&[0u8; MAP_BLOCK_HEADER_BYTES]);
            for ly in 0..block {
                for lx in 0..block {
                    let tile = tiles[(by * block + ly) * width + bx * block + lx];
                    out.extend_from_slice(&tile.tile_id.to_le_bytes());
                    out.push(tile.z as u8);
                }
            }
        }
    }
    Ok(out)
}

/// Infer the world size of a map file from its length.
///
/// Known client sizes are tried first, then a square world.
pub fn world_size_from_map_len(len: u64) -> Result<(u32, u32), String> {
    if len == 0 || len % MAP_BLOCK_BYTES as u64 != 0 {
        return Err(format!(
            "file length {} is not a whole number of {}-byte blocks",
            len, MAP_BLOCK_BYTES
        ));
    }
    let blocks = len / MAP_BLOCK_BYTES as u64;
    let block = BLOCK_SIZE as u64;

    for &(width, height) in KNOWN_WORLD_SIZES {
        if (width as u64 / block) * (height as u64 / block) == blocks {
            return Ok((width, height));
        }
    }

    let side = (blocks as f64).sqrt().round() as u64;
    if side * side == blocks {
        let tiles = u32::try_from(side * block)
            .map_err(|_| format!("{} blocks is too large", blocks))?;
        return Ok((tiles, tiles));
    }
    Err(format!("{} blocks match no known world size", blocks))
}

// ─── Statics ────────────────────────────────────────────────────────────────

/// Decode the first `block_count` slots of a statics index/data pair.
pub fn decode_statics(index: &[u8], data: &[u8], block_count: usize) -> io::Result<StaticBlocks> {
    if index.len() < block_count * INDEX_RECORD_BYTES {
        return Err(invalid(format!(
            "statics index holds {} blocks, expected {}",
            index.len() / INDEX_RECORD_BYTES,
            block_count
        )));
    }

    let mut blocks = Vec::with_capacity(block_count);
    for i in 0..block_count {
        let record = &index[i * INDEX_RECORD_BYTES..(i + 1) * INDEX_RECORD_BYTES];
        let offset = i32::from_le_bytes([record[0], record[1], record[2], record[3]]);
        let length = i32::from_le_bytes([record[4], record[5], record[6], record[7]]);

        if offset < 0 || length <= 0 {
            blocks.push(Vec::new());
            continue;
        }

        let start = offset as usize;
        let count = length as usize / STATIC_ENTRY_BYTES;
        let end = start + count * STATIC_ENTRY_BYTES;
        if end > data.len() {
            return Err(invalid(format!(
                "statics block {} points past the end of the data file ({} > {})",
                i,
                end,
                data.len()
            )));
        }

        let entries = data[start..end]
            .chunks_exact(STATIC_ENTRY_BYTES)
            .map(|raw| StaticEntry {
                tile_id: u16::from_le_bytes([raw[0], raw[1]]),
                x: raw[2],
                y: raw[3],
                z: raw[4] as i8,
                hue: u16::from_le_bytes([raw[5], raw[6]]),
            })
            .collect();
        blocks.push(entries);
    }
    Ok(blocks)
}

/// Encode a block array as `(index, data)`.
pub fn encode_statics(blocks: &StaticBlocks) -> io::Result<(Vec<u8>, Vec<u8>)> {
    let mut index = Vec::with_capacity(blocks.len() * INDEX_RECORD_BYTES);
    let mut data = Vec::new();

    for (i, block) in blocks.iter().enumerate() {
        if block.is_empty() {
            index.extend_from_slice(&(-1i32).to_le_bytes());
            index.extend_from_slice(&0i32.to_le_bytes());
            index.extend_from_slice(&0i32.to_le_bytes());
            continue;
        }

        let too_large = || invalid(format!("statics block {} does not fit a 32-bit offset", i));
        let offset = i32::try_from(data.len()).map_err(|_| too_large())?;
        let length = i32::try_from(block.len() * STATIC_ENTRY_BYTES).map_err(|_| too_large())?;

        for entry in block {
            data.extend_from_slice(&entry.tile_id.to_le_bytes());
            data.push(entry.x);
            data.push(entry.y);
            data.push(entry.z as u8);
            data.extend_from_slice(&entry.hue.to_le_bytes());
        }

        index.extend_from_slice(&offset.to_le_bytes());
        index.extend_from_slice(&length.to_le_bytes());
        index.extend_from_slice(&0i32.to_le_bytes());
    }
    Ok((index, data))
}

/// An index with `block_count` empty slots and an empty data file.
pub fn empty_statics(block_count: usize) -> (Vec<u8>, Vec<u8>) {
    let mut index = Vec::with_capacity(block_count * INDEX_RECORD_BYTES);
    for _ in 0..block_count {
        index.extend_from_slice(&(-1i32).to_le_bytes());
        index.extend_from_slice(&0i32.to_le_bytes());
        index.extend_from_slice(&0i32.to_le_bytes());
    }
    (index, Vec::new())
}
