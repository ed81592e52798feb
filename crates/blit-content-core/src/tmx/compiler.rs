//! Writes a parsed [`Map`] as the runtime's binary map folder.
//!
//! Layout of `<out>/`:
//! - `map.bytes`: header, tileset properties, then one section per tile
//!   layer or object group in depth-first order
//! - `layer_<hash>.bytes`: zlib tile stream of a finite layer
//! - `layer_<hash>_seg<N>.bytes`, `layer_<hash>_index.bytes`: compressed
//!   chunks of an infinite layer and their index

use byteorder::{LittleEndian, WriteBytesExt};
use flate2::Compression;
use flate2::write::ZlibEncoder;
use serde::Serialize;
use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument};

use crate::binary::{MAP_MAGIC, MAP_VERSION, WriteExt};
use crate::config::MapCompileConfig;
use crate::error::{ContentError, Result};
use crate::hash::name_hash;
use crate::properties::write_properties;

use super::gid::{ENCODED_TILE_SIZE, GidRange, decode_gid};
use super::model::{Chunk, GroupSettings, LayerNode, Map, ObjectGroup, TileData, TileLayer};
use super::parser::parse_map_file;

pub const MAP_INFO_FILE: &str = "map.bytes";
pub const MAP_TYPE_TAG: u8 = 1;

pub const SECTION_END: u8 = 0;
pub const SECTION_TILES: u8 = 1;
pub const SECTION_OBJECTS: u8 = 2;

/// Extensions removed from the output folder before a compile.
const GENERATED_EXTENSIONS: &[&str] = &["bytes", "meta"];

/// File stem shared by every file of one tile layer.
pub fn layer_file_stem(layer_name: &str) -> String {
    format!("layer_{:08x}", name_hash(layer_name) as u32)
}

/// Chunk position relative to the map origin, packed as `x << 32 | y`.
pub fn pack_offset(x: i32, y: i32) -> u64 {
    ((x as u32 as u64) << 32) | (y as u32 as u64)
}

pub fn unpack_offset(v: u64) -> (i32, i32) {
    ((v >> 32) as u32 as i32, v as u32 as i32)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChunkIndexEntry {
    pub x: i32,
    pub y: i32,
    pub segment: u32,
    pub byte_offset: u32,
    pub length: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MapCompileReport {
    pub layers: usize,
    pub object_groups: usize,
    pub chunks: usize,
    pub segments: usize,
    pub files: Vec<PathBuf>,
}

/// Resolves GIDs and writes six bytes per cell.
pub fn encode_tile_stream(gids: &[u32], tilesets: &[GidRange]) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(gids.len() * ENCODED_TILE_SIZE);
    for &gid in gids {
        decode_gid(gid, tilesets).write_to(&mut out)?;
    }
    Ok(out)
}

pub fn compress(bytes: &[u8], level: u32) -> Result<Vec<u8>> {
    let mut enc = ZlibEncoder::new(Vec::with_capacity(bytes.len() / 2), Compression::new(level));
    enc.write_all(bytes)?;
    Ok(enc.finish()?)
}

pub fn write_chunk_index<W: Write>(w: &mut W, entries: &[ChunkIndexEntry]) -> Result<()> {
    w.write_count(entries.len())?;
    for e in entries {
        w.write_u64::<LittleEndian>(pack_offset(e.x, e.y))?;
        w.write_count(e.segment as usize)?;
        w.write_count(e.byte_offset as usize)?;
        w.write_count(e.length as usize)?;
    }
    Ok(())
}

/// Layer names are looked up by hash at runtime (and name tile layer files),
/// so tile layers and object groups must hash uniquely across the whole tree.
fn check_layer_names(map: &Map) -> Result<()> {
    fn walk<'a>(nodes: &'a [LayerNode], seen: &mut HashMap<i32, &'a str>) -> Result<()> {
        for node in nodes {
            let name = match node {
                LayerNode::Tiles(l) => &l.name,
                LayerNode::Objects(g) => &g.name,
                LayerNode::Group(g) => {
                    walk(&g.children, seen)?;
                    continue;
                }
            };
            if let Some(first) = seen.insert(name_hash(name), name) {
                debug!(first, second = %name, "layer name hash collision");
                return Err(ContentError::DuplicateLayerName(name.clone()));
            }
        }
        Ok(())
    }
    walk(&map.layers, &mut HashMap::new())
}

/// Deletes previously generated files from `dir`, creating it if needed.
pub fn clean_output_dir(dir: &Path) -> Result<usize> {
    fs::create_dir_all(dir)?;
    let mut removed = 0;
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let generated = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| GENERATED_EXTENSIONS.contains(&e));
        if generated && path.is_file() {
            fs::remove_file(&path)?;
            removed += 1;
        }
    }
    if removed > 0 {
        debug!(dir = %dir.display(), removed, "cleared previous output");
    }
    Ok(removed)
}

struct MapWriter<'a> {
    map: &'a Map,
    out_dir: &'a Path,
    cfg: &'a MapCompileConfig,
    gid_ranges: Vec<GidRange>,
    info: Vec<u8>,
    report: MapCompileReport,
}

impl<'a> MapWriter<'a> {
    fn write_header(&mut self) -> Result<()> {
        let map = self.map;
        let w = &mut self.info;
        w.write_u32::<LittleEndian>(MAP_MAGIC)?;
        w.write_u16::<LittleEndian>(MAP_VERSION)?;
        w.write_u8(MAP_TYPE_TAG)?;
        w.write_count(map.width as usize)?;
        w.write_count(map.height as usize)?;
        w.write_color(map.background)?;
        w.write_bool(map.infinite)?;
        w.write_count(map.chunk_width as usize)?;
        w.write_count(map.chunk_height as usize)?;
        write_properties(w, map.properties.as_ref())?;

        for (tileset, tiles) in &map.tile_properties {
            w.write_count(*tileset)?;
            for (id, props) in tiles {
                w.write_count(*id as usize)?;
                props.write_to(w)?;
            }
            w.write_i32_le(-1)?;
        }
        w.write_i32_le(-1)?;
        Ok(())
    }

    fn write_nodes(&mut self, nodes: &'a [LayerNode], parent: GroupSettings) -> Result<()> {
        for node in nodes {
            match node {
                LayerNode::Group(g) => self.write_nodes(&g.children, parent.combine(&g.settings))?,
                LayerNode::Tiles(l) => self.write_tile_layer(l, parent.combine(&l.settings))?,
                LayerNode::Objects(o) => self.write_object_group(o, parent.combine(&o.settings))?,
            }
        }
        Ok(())
    }

    fn write_tile_layer(&mut self, layer: &TileLayer, settings: GroupSettings) -> Result<()> {
        let (width, height) = if self.map.infinite {
            (self.map.width, self.map.height)
        } else {
            (layer.width, layer.height)
        };
        let w = &mut self.info;
        w.write_u8(SECTION_TILES)?;
        w.write_string(&layer.name)?;
        w.write_count(width as usize)?;
        w.write_count(height as usize)?;
        w.write_f32_le(settings.offset.0)?;
        w.write_f32_le(settings.offset.1)?;
        w.write_bool(settings.visible)?;
        w.write_u8(settings.opacity_byte())?;
        write_properties(w, layer.properties.as_ref())?;

        let stem = layer_file_stem(&layer.name);
        match &layer.data {
            TileData::Finite(gids) => {
                let blob = compress(&encode_tile_stream(gids, &self.gid_ranges)?, self.cfg.compression_level)?;
                self.emit(format!("{stem}.bytes"), &blob)?;
            }
            TileData::Chunked(chunks) => self.write_chunks(&stem, chunks)?,
        }
        self.report.layers += 1;
        Ok(())
    }

    fn write_chunks(&mut self, stem: &str, chunks: &[Chunk]) -> Result<()> {
        let (ox, oy) = self.map.origin;
        let mut index = Vec::with_capacity(chunks.len());
        let mut segment = Vec::new();
        let mut seg_no = 0u32;
        for c in chunks {
            let blob = compress(&encode_tile_stream(&c.gids, &self.gid_ranges)?, self.cfg.compression_level)?;
            index.push(ChunkIndexEntry {
                x: c.x - ox,
                y: c.y - oy,
                segment: seg_no,
                byte_offset: segment.len() as u32,
                length: blob.len() as u32,
            });
            segment.extend_from_slice(&blob);
            if segment.len() >= self.cfg.max_segment_size {
                self.emit(format!("{stem}_seg{seg_no}.bytes"), &segment)?;
                self.report.segments += 1;
                segment.clear();
                seg_no += 1;
            }
        }
        if !segment.is_empty() {
            self.emit(format!("{stem}_seg{seg_no}.bytes"), &segment)?;
            self.report.segments += 1;
        }
        let mut buf = Vec::with_capacity(4 + index.len() * 20);
        write_chunk_index(&mut buf, &index)?;
        self.emit(format!("{stem}_index.bytes"), &buf)?;
        self.report.chunks += chunks.len();
        Ok(())
    }

    fn write_object_group(&mut self, group: &ObjectGroup, settings: GroupSettings) -> Result<()> {
        let w = &mut self.info;
        w.write_u8(SECTION_OBJECTS)?;
        w.write_string(&group.name)?;
        w.write_color(group.color)?;
        w.write_bool(settings.visible)?;
        w.write_u8(settings.opacity_byte())?;
        w.write_f32_le(settings.offset.0)?;
        w.write_f32_le(settings.offset.1)?;
        write_properties(w, group.properties.as_ref())?;
        w.write_count(group.objects.len())?;
        for obj in &group.objects {
            w.write_string(&obj.name)?;
            w.write_string(&obj.kind)?;
            for v in [obj.x, obj.y, obj.width, obj.height, obj.rotation] {
                w.write_f32_le(v)?;
            }
            w.write_bool(obj.visible)?;
            w.write_u8(obj.shape as u8)?;
            w.write_count(obj.points.len())?;
            for &(px, py) in &obj.points {
                w.write_f32_le(px)?;
                w.write_f32_le(py)?;
            }
            write_properties(w, obj.properties.as_ref())?;
        }
        self.report.object_groups += 1;
        Ok(())
    }

    fn emit(&mut self, file_name: String, bytes: &[u8]) -> Result<()> {
        let path = self.out_dir.join(file_name);
        fs::write(&path, bytes).map_err(|e| ContentError::from(e).in_file(&path))?;
        self.report.files.push(path);
        Ok(())
    }
}

/// Writes `map` into `out_dir` (which must already be clean).
pub fn compile_map(map: &Map, out_dir: &Path, cfg: &MapCompileConfig) -> Result<MapCompileReport> {
    cfg.validate()?;
    check_layer_names(map)?;
    fs::create_dir_all(out_dir)?;
    let mut writer = MapWriter {
        map,
        out_dir,
        cfg,
        gid_ranges: map.gid_ranges(),
        info: Vec::new(),
        report: MapCompileReport::default(),
    };
    writer.write_header()?;
    writer.write_nodes(&map.layers, GroupSettings::default())?;
    writer.info.write_u8(SECTION_END)?;
    let info = std::mem::take(&mut writer.info);
    writer.emit(MAP_INFO_FILE.to_string(), &info)?;
    Ok(writer.report)
}

/// Parses `tmx` and compiles it into `out_dir`, replacing earlier output.
#[instrument(skip_all, fields(map = %tmx.display()))]
pub fn compile_map_file(tmx: &Path, out_dir: &Path, cfg: &MapCompileConfig) -> Result<MapCompileReport> {
    cfg.validate()?;
    clean_output_dir(out_dir)?;
    let map = parse_map_file(tmx)?;
    let report = compile_map(&map, out_dir, cfg).map_err(|e| e.in_file(tmx))?;
    info!(
        layers = report.layers,
        object_groups = report.object_groups,
        chunks = report.chunks,
        segments = report.segments,
        dependencies = map.dependencies.len(),
        "map compiled"
    );
    Ok(report)
}
