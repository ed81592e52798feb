//! Readers for the compiled map folder, mirroring [`super::compiler`].

use byteorder::{LittleEndian, ReadBytesExt};
use flate2::read::ZlibDecoder;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::io::{Cursor, Read};
use std::path::Path;

use crate::binary::{Color32, MAP_MAGIC, MAP_VERSION, ReadExt};
use crate::error::{ContentError, Result};
use crate::properties::{PropertySet, read_properties};

use super::compiler::{
    ChunkIndexEntry, MAP_TYPE_TAG, SECTION_END, SECTION_OBJECTS, SECTION_TILES, layer_file_stem,
    unpack_offset,
};
use super::gid::{ENCODED_TILE_SIZE, TileCell};
use super::model::{GroupSettings, MapObject, ObjectShape};

pub fn decompress(bytes: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(bytes.len() * 4);
    ZlibDecoder::new(bytes).read_to_end(&mut out)?;
    Ok(out)
}

pub fn decode_tile_stream(bytes: &[u8]) -> Result<Vec<TileCell>> {
    if bytes.len() % ENCODED_TILE_SIZE != 0 {
        return Err(ContentError::Corrupt(format!(
            "tile stream of {} bytes is not a whole number of cells",
            bytes.len()
        )));
    }
    let mut r = Cursor::new(bytes);
    (0..bytes.len() / ENCODED_TILE_SIZE)
        .map(|_| TileCell::read_from(&mut r))
        .collect()
}

/// Reads a finite layer's `layer_<hash>.bytes`.
pub fn read_layer_blob(path: &Path) -> Result<Vec<TileCell>> {
    let read = || -> Result<Vec<TileCell>> { decode_tile_stream(&decompress(&fs::read(path)?)?) };
    read().map_err(|e| e.in_file(path))
}

pub fn read_chunk_index(path: &Path) -> Result<Vec<ChunkIndexEntry>> {
    let read = || -> Result<Vec<ChunkIndexEntry>> {
        let bytes = fs::read(path)?;
        let mut r = Cursor::new(bytes.as_slice());
        let count = r.read_count()?;
        let mut entries = Vec::with_capacity(count);
        for _ in 0..count {
            let (x, y) = unpack_offset(r.read_u64::<LittleEndian>()?);
            entries.push(ChunkIndexEntry {
                x,
                y,
                segment: r.read_count()? as u32,
                byte_offset: r.read_count()? as u32,
                length: r.read_count()? as u32,
            });
        }
        Ok(entries)
    };
    read().map_err(|e| e.in_file(path))
}

/// Loads one chunk of layer `layer_name` from the map folder `dir`.
pub fn read_chunk(dir: &Path, layer_name: &str, entry: &ChunkIndexEntry) -> Result<Vec<TileCell>> {
    let path = dir.join(format!("{}_seg{}.bytes", layer_file_stem(layer_name), entry.segment));
    let segment = fs::read(&path).map_err(|e| ContentError::from(e).in_file(&path))?;
    let start = entry.byte_offset as usize;
    let end = start + entry.length as usize;
    let blob = segment.get(start..end).ok_or_else(|| {
        ContentError::Corrupt(format!("chunk {start}..{end} is outside segment")).in_file(&path)
    })?;
    decode_tile_stream(&decompress(blob)?)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TileSection {
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub settings: GroupSettings,
    pub properties: Option<PropertySet>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObjectSection {
    pub name: String,
    pub color: Color32,
    pub settings: GroupSettings,
    pub properties: Option<PropertySet>,
    pub objects: Vec<MapObject>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Section {
    Tiles(TileSection),
    Objects(ObjectSection),
}

/// Contents of `map.bytes`. Opacity comes back quantized to 1/255.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapInfo {
    pub width: u32,
    pub height: u32,
    pub background: Color32,
    pub infinite: bool,
    pub chunk_width: u32,
    pub chunk_height: u32,
    pub properties: Option<PropertySet>,
    pub tile_properties: BTreeMap<usize, BTreeMap<u32, PropertySet>>,
    pub sections: Vec<Section>,
}

fn read_dim<R: Read>(r: &mut R) -> Result<u32> {
    Ok(r.read_count()? as u32)
}

fn read_shape(v: u8) -> Result<ObjectShape> {
    Ok(match v {
        0 => ObjectShape::Rectangle,
        1 => ObjectShape::Point,
        2 => ObjectShape::Ellipse,
        3 => ObjectShape::Polygon,
        4 => ObjectShape::Polyline,
        other => return Err(ContentError::Corrupt(format!("unknown object shape {other}"))),
    })
}

fn opacity_from_byte(byte: u8) -> f32 {
    byte as f32 / 255.0
}

pub fn read_map_info<R: Read>(r: &mut R) -> Result<MapInfo> {
    let magic = r.read_u32::<LittleEndian>()?;
    if magic != MAP_MAGIC {
        return Err(ContentError::Corrupt(format!("bad map magic {magic:#010x}")));
    }
    let version = r.read_u16::<LittleEndian>()?;
    if version != MAP_VERSION {
        return Err(ContentError::Corrupt(format!("unsupported map version {version}")));
    }
    let tag = r.read_u8()?;
    if tag != MAP_TYPE_TAG {
        return Err(ContentError::Corrupt(format!("unexpected type tag {tag}")));
    }
    let mut info = MapInfo {
        width: read_dim(r)?,
        height: read_dim(r)?,
        background: r.read_color()?,
        infinite: r.read_bool()?,
        chunk_width: read_dim(r)?,
        chunk_height: read_dim(r)?,
        properties: read_properties(r)?,
        tile_properties: BTreeMap::new(),
        sections: Vec::new(),
    };

    loop {
        let tileset = r.read_i32_le()?;
        if tileset < 0 {
            break;
        }
        let mut tiles = BTreeMap::new();
        loop {
            let id = r.read_i32_le()?;
            if id < 0 {
                break;
            }
            tiles.insert(id as u32, PropertySet::read_from(r)?);
        }
        info.tile_properties.insert(tileset as usize, tiles);
    }

    loop {
        match r.read_u8()? {
            SECTION_END => break,
            SECTION_TILES => {
                let name = r.read_string()?;
                let (width, height) = (read_dim(r)?, read_dim(r)?);
                let offset = (r.read_f32_le()?, r.read_f32_le()?);
                let visible = r.read_bool()?;
                let opacity = opacity_from_byte(r.read_u8()?);
                info.sections.push(Section::Tiles(TileSection {
                    name,
                    width,
                    height,
                    settings: GroupSettings {
                        offset,
                        opacity,
                        visible,
                    },
                    properties: read_properties(r)?,
                }));
            }
            SECTION_OBJECTS => {
                let name = r.read_string()?;
                let color = r.read_color()?;
                let visible = r.read_bool()?;
                let opacity = opacity_from_byte(r.read_u8()?);
                let offset = (r.read_f32_le()?, r.read_f32_le()?);
                let properties = read_properties(r)?;
                let count = r.read_count()?;
                let mut objects = Vec::with_capacity(count);
                for _ in 0..count {
                    let name = r.read_string()?;
                    let kind = r.read_string()?;
                    let (x, y, width, height, rotation) = (
                        r.read_f32_le()?,
                        r.read_f32_le()?,
                        r.read_f32_le()?,
                        r.read_f32_le()?,
                        r.read_f32_le()?,
                    );
                    let visible = r.read_bool()?;
                    let shape = read_shape(r.read_u8()?)?;
                    let n = r.read_count()?;
                    let points = (0..n)
                        .map(|_| Ok((r.read_f32_le()?, r.read_f32_le()?)))
                        .collect::<Result<Vec<_>>>()?;
                    objects.push(MapObject {
                        id: 0,
                        name,
                        kind,
                        x,
                        y,
                        width,
                        height,
                        rotation,
                        visible,
                        shape,
                        points,
                        properties: read_properties(r)?,
                    });
                }
                info.sections.push(Section::Objects(ObjectSection {
                    name,
                    color,
                    settings: GroupSettings {
                        offset,
                        opacity,
                        visible,
                    },
                    properties,
                    objects,
                }));
            }
            other => return Err(ContentError::Corrupt(format!("unknown section tag {other}"))),
        }
    }
    Ok(info)
}

/// Reads `<dir>/map.bytes`.
pub fn read_map_info_file(path: &Path) -> Result<MapInfo> {
    let read = || -> Result<MapInfo> { read_map_info(&mut Cursor::new(fs::read(path)?)) };
    read().map_err(|e| e.in_file(path))
}
