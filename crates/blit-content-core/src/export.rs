use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::io::{Read, Write};
use tracing::warn;

use crate::binary::{ReadExt, SPRITE_LOOKUP_MAGIC, SPRITE_LOOKUP_VERSION, WriteExt};
use crate::error::{ContentError, Result};
use crate::hash::name_hash;
use crate::model::{LookupEntry, UnpackedSprite};

impl LookupEntry {
    pub fn from_sprite(sprite: &UnpackedSprite) -> Self {
        let (x, y) = sprite.placement.unwrap_or((0, 0));
        let t = sprite.trim;
        let (trimmed_size, trim_offset) = if sprite.empty {
            ((0, 0), (0, 0))
        } else {
            let from_bottom = sprite.height - (t.y + t.h);
            ((t.w as u16, t.h as u16), (t.x as u16, from_bottom as u16))
        };
        LookupEntry {
            hash: name_hash(&sprite.name),
            original_size: (sprite.width as u16, sprite.height as u16),
            position: (x as u16, y as u16),
            trimmed_size,
            trim_offset,
        }
    }
}

/// Builds lookup records in discovery order. A sprite whose name hash is
/// already taken is dropped with a warning; returns the records and the
/// number dropped.
pub fn build_lookup(sprites: &[UnpackedSprite]) -> (Vec<LookupEntry>, usize) {
    let mut ordered: Vec<&UnpackedSprite> = sprites.iter().collect();
    ordered.sort_by_key(|s| s.seq);

    let mut seen: HashMap<i32, &str> = HashMap::with_capacity(ordered.len());
    let mut entries = Vec::with_capacity(ordered.len());
    let mut duplicates = 0;
    for sprite in ordered {
        let entry = LookupEntry::from_sprite(sprite);
        if let Some(first) = seen.get(&entry.hash) {
            warn!(
                sprite = %sprite.name,
                first = %first,
                hash = entry.hash,
                "duplicate sprite name hash, dropping sprite"
            );
            duplicates += 1;
            continue;
        }
        seen.insert(entry.hash, &sprite.name);
        entries.push(entry);
    }
    (entries, duplicates)
}

/// Writes the binary lookup table: magic, version, count, then one record per sprite.
pub fn write_lookup<W: Write>(w: &mut W, entries: &[LookupEntry]) -> Result<()> {
    w.write_u32::<LittleEndian>(SPRITE_LOOKUP_MAGIC)?;
    w.write_u16::<LittleEndian>(SPRITE_LOOKUP_VERSION)?;
    w.write_count(entries.len())?;
    for e in entries {
        w.write_i32_le(e.hash)?;
        for (a, b) in [e.original_size, e.position, e.trimmed_size, e.trim_offset] {
            w.write_u16::<LittleEndian>(a)?;
            w.write_u16::<LittleEndian>(b)?;
        }
    }
    Ok(())
}

fn read_pair<R: Read>(r: &mut R) -> Result<(u16, u16)> {
    Ok((r.read_u16::<LittleEndian>()?, r.read_u16::<LittleEndian>()?))
}

pub fn read_lookup<R: Read>(r: &mut R) -> Result<Vec<LookupEntry>> {
    let magic = r.read_u32::<LittleEndian>()?;
    if magic != SPRITE_LOOKUP_MAGIC {
        return Err(ContentError::Corrupt(format!("bad sprite lookup magic {magic:#010x}")));
    }
    let version = r.read_u16::<LittleEndian>()?;
    if version != SPRITE_LOOKUP_VERSION {
        return Err(ContentError::Corrupt(format!("unsupported sprite lookup version {version}")));
    }
    let count = r.read_count()?;
    let mut entries = Vec::with_capacity(count);
    for _ in 0..count {
        let hash = r.read_i32_le()?;
        entries.push(LookupEntry {
            hash,
            original_size: read_pair(r)?,
            position: read_pair(r)?,
            trimmed_size: read_pair(r)?,
            trim_offset: read_pair(r)?,
        });
    }
    Ok(entries)
}

/// Renders a lookup table as `{ sprites: [...], count }` for inspection.
pub fn lookup_to_json(entries: &[LookupEntry]) -> Value {
    let sprites: Vec<Value> = entries
        .iter()
        .map(|e| {
            json!({
                "hash": e.hash,
                "sourceSize": {"w": e.original_size.0, "h": e.original_size.1},
                "frame": {
                    "x": e.position.0,
                    "y": e.position.1,
                    "w": e.trimmed_size.0,
                    "h": e.trimmed_size.1,
                },
                "trimOffset": {"x": e.trim_offset.0, "y": e.trim_offset.1},
            })
        })
        .collect();
    json!({ "count": entries.len(), "sprites": sprites })
}
