//! Global tile ID decoding.
//!
//! The top three bits of a Tiled GID are the horizontal (bit 31), vertical
//! (bit 30) and diagonal (bit 29) flip flags; the low 29 bits are the tile
//! index across all tilesets.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Read, Write};

use crate::error::Result;

pub const FLIP_H: u8 = 1 << 0;
pub const FLIP_V: u8 = 1 << 1;
pub const ROT_90_CW: u8 = 1 << 2;
pub const ROT_180_CW: u8 = FLIP_H | FLIP_V;
pub const ROT_270_CW: u8 = ROT_90_CW | FLIP_H | FLIP_V;

pub const GID_FLAG_MASK: u32 = 0xE000_0000;
pub const GID_INDEX_MASK: u32 = 0x1FFF_FFFF;

/// Tile index written for cells that show nothing.
pub const EMPTY_TILE_INDEX: i32 = -1;

/// Bytes per encoded cell: tileset byte, flags byte, i32 index.
pub const ENCODED_TILE_SIZE: usize = 6;

// Indexed by (H << 2 | V << 1 | D). 0b001 and 0b111 are not produced by the
// editor's rotate/flip tools; they map to the transforms the editor renders.
const FLAG_TABLE: [u8; 8] = [
    0,                  // 000
    ROT_90_CW | FLIP_H, // 001
    FLIP_V,             // 010
    ROT_270_CW,         // 011
    FLIP_H,             // 100
    ROT_90_CW,          // 101
    ROT_180_CW,         // 110
    ROT_90_CW | FLIP_V, // 111
];

pub fn flags_from_gid(gid: u32) -> u8 {
    FLAG_TABLE[((gid & GID_FLAG_MASK) >> 29) as usize]
}

/// One decoded map cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileCell {
    pub tileset: u8,
    pub flags: u8,
    pub index: i32,
}

impl TileCell {
    pub const EMPTY: TileCell = TileCell {
        tileset: 0,
        flags: 0,
        index: EMPTY_TILE_INDEX,
    };

    pub fn is_empty(&self) -> bool {
        self.index == EMPTY_TILE_INDEX
    }

    pub fn write_to<W: Write + ?Sized>(&self, w: &mut W) -> Result<()> {
        w.write_u8(self.tileset)?;
        w.write_u8(self.flags)?;
        w.write_i32::<LittleEndian>(self.index)?;
        Ok(())
    }

    pub fn read_from<R: Read + ?Sized>(r: &mut R) -> Result<Self> {
        Ok(TileCell {
            tileset: r.read_u8()?,
            flags: r.read_u8()?,
            index: r.read_i32::<LittleEndian>()?,
        })
    }
}

/// The GIDs one tileset claims: `first_gid` up to `first_gid + tile_count`.
///
/// `tile_count` is `None` when the tileset does not declare one; the range
/// then only ends where the next tileset begins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GidRange {
    pub first_gid: u32,
    pub tile_count: Option<u32>,
}

/// Resolves `gid` against the map's tilesets (document order).
///
/// The list is searched from the end, so the last tileset whose first GID is
/// not above the raw index wins. GID 0, an index below every first GID, or an
/// index past the end of its tileset yields [`TileCell::EMPTY`].
pub fn decode_gid(gid: u32, tilesets: &[GidRange]) -> TileCell {
    let raw = gid & GID_INDEX_MASK;
    if raw == 0 {
        return TileCell::EMPTY;
    }
    let Some((tileset, range)) = tilesets
        .iter()
        .enumerate()
        .rev()
        .find(|&(_, r)| r.first_gid <= raw)
    else {
        return TileCell::EMPTY;
    };
    let local = raw - range.first_gid;
    if range.tile_count.is_some_and(|n| local >= n) || tileset > u8::MAX as usize {
        return TileCell::EMPTY;
    }
    TileCell {
        tileset: tileset as u8,
        flags: flags_from_gid(gid),
        index: local as i32,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_codes_follow_tiled_bits() {
        assert_eq!(flags_from_gid(0x4000_0001), FLIP_V);
        assert_eq!(flags_from_gid(0xA000_0001), ROT_90_CW);
        assert_eq!(flags_from_gid(0x8000_0001), FLIP_H);
        assert_eq!(flags_from_gid(0xC000_0001), ROT_180_CW);
        assert_eq!(flags_from_gid(0x6000_0001), ROT_270_CW);
        assert_eq!(flags_from_gid(0x0000_0001), 0);
    }

    fn ranges(spans: &[(u32, Option<u32>)]) -> Vec<GidRange> {
        spans
            .iter()
            .map(|&(first_gid, tile_count)| GidRange { first_gid, tile_count })
            .collect()
    }

    #[test]
    fn last_matching_tileset_wins() {
        let c = decode_gid(12, &ranges(&[(1, None), (10, None), (10, None)]));
        assert_eq!(c.tileset, 2);
        assert_eq!(c.index, 2);
    }

    #[test]
    fn index_past_tile_count_is_empty() {
        let sets = ranges(&[(1, Some(4)), (20, None)]);
        assert_eq!(decode_gid(4, &sets), TileCell { tileset: 0, flags: 0, index: 3 });
        assert_eq!(decode_gid(5, &sets), TileCell::EMPTY);
        assert_eq!(decode_gid(0x8000_0000 | 19, &sets), TileCell::EMPTY);
        // no declared count: open-ended
        assert_eq!(decode_gid(500, &sets).index, 480);
    }
}
