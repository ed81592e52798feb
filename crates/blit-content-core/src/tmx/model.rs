//! In-memory form of a parsed Tiled map.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::binary::Color32;
use crate::properties::PropertySet;

use super::gid::GidRange;

/// Tiled's default object group color (`#a0a0a4`).
pub const DEFAULT_OBJECT_COLOR: Color32 = [160, 160, 164, 255];

/// Chunk size assumed when an infinite map declares none.
pub const DEFAULT_CHUNK_SIZE: u32 = 16;

/// Offset, opacity and visibility that accumulate down the group tree.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GroupSettings {
    pub offset: (f32, f32),
    pub opacity: f32,
    pub visible: bool,
}

impl Default for GroupSettings {
    fn default() -> Self {
        Self {
            offset: (0.0, 0.0),
            opacity: 1.0,
            visible: true,
        }
    }
}

impl GroupSettings {
    /// Offsets add, opacities multiply, visibility is the AND of both.
    pub fn combine(&self, child: &GroupSettings) -> GroupSettings {
        GroupSettings {
            offset: (self.offset.0 + child.offset.0, self.offset.1 + child.offset.1),
            opacity: self.opacity * child.opacity,
            visible: self.visible && child.visible,
        }
    }

    /// Opacity quantized to a byte.
    pub fn opacity_byte(&self) -> u8 {
        (self.opacity.clamp(0.0, 1.0) * 255.0).round() as u8
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TilesetRef {
    pub first_gid: u32,
    pub name: String,
    /// External `.tsx` file, if not embedded.
    pub source: Option<PathBuf>,
    /// `tilecount`, when the tileset declares it.
    pub tile_count: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// Tile coordinates as written in the map (may be negative).
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
    pub gids: Vec<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TileData {
    Finite(Vec<u32>),
    Chunked(Vec<Chunk>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileLayer {
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub settings: GroupSettings,
    pub properties: Option<PropertySet>,
    pub data: TileData,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum ObjectShape {
    #[default]
    Rectangle = 0,
    Point = 1,
    Ellipse = 2,
    Polygon = 3,
    Polyline = 4,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapObject {
    pub id: u32,
    pub name: String,
    /// Tiled `type` (or `class` in newer files).
    pub kind: String,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub rotation: f32,
    pub visible: bool,
    pub shape: ObjectShape,
    /// Polygon/polyline vertices relative to `(x, y)`.
    pub points: Vec<(f32, f32)>,
    pub properties: Option<PropertySet>,
}

impl Default for MapObject {
    fn default() -> Self {
        Self {
            id: 0,
            name: String::new(),
            kind: String::new(),
            x: 0.0,
            y: 0.0,
            width: 0.0,
            height: 0.0,
            rotation: 0.0,
            visible: true,
            shape: ObjectShape::Rectangle,
            points: Vec::new(),
            properties: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectGroup {
    pub name: String,
    pub color: Color32,
    pub settings: GroupSettings,
    pub properties: Option<PropertySet>,
    pub objects: Vec<MapObject>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupLayer {
    pub name: String,
    pub settings: GroupSettings,
    pub children: Vec<LayerNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LayerNode {
    Tiles(TileLayer),
    Objects(ObjectGroup),
    Group(GroupLayer),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Map {
    /// Size in tiles; for infinite maps, the bounding box of all chunks.
    pub width: u32,
    pub height: u32,
    pub tile_width: u32,
    pub tile_height: u32,
    pub background: Color32,
    pub infinite: bool,
    pub chunk_width: u32,
    pub chunk_height: u32,
    /// Top-left tile of the chunk bounding box; `(0, 0)` for finite maps.
    pub origin: (i32, i32),
    pub properties: Option<PropertySet>,
    pub tilesets: Vec<TilesetRef>,
    /// Tileset index -> tile id -> properties.
    pub tile_properties: BTreeMap<usize, BTreeMap<u32, PropertySet>>,
    pub layers: Vec<LayerNode>,
    /// External files read while parsing (tilesets and templates).
    pub dependencies: Vec<PathBuf>,
}

impl Map {
    pub fn first_gids(&self) -> Vec<u32> {
        self.tilesets.iter().map(|t| t.first_gid).collect()
    }

    pub fn gid_ranges(&self) -> Vec<GidRange> {
        self.tilesets
            .iter()
            .map(|t| GidRange {
                first_gid: t.first_gid,
                tile_count: t.tile_count,
            })
            .collect()
    }

    /// Depth-first iterator over tile layers.
    pub fn tile_layers(&self) -> Vec<&TileLayer> {
        fn walk<'a>(nodes: &'a [LayerNode], out: &mut Vec<&'a TileLayer>) {
            for n in nodes {
                match n {
                    LayerNode::Tiles(l) => out.push(l),
                    LayerNode::Group(g) => walk(&g.children, out),
                    LayerNode::Objects(_) => {}
                }
            }
        }
        let mut out = Vec::new();
        walk(&self.layers, &mut out);
        out
    }
}
