//! Tiled XML reader: `.tmx` maps plus the `.tsx` tilesets and `.tx`
//! templates they reference.

use roxmltree::{Document, Node};
use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, instrument, warn};

use crate::binary::parse_color;
use crate::error::{ContentError, Result};
use crate::properties::{PropertySet, PropertyValue};

use super::data::{DataFormat, decode_tiles};
use super::model::{
    Chunk, DEFAULT_CHUNK_SIZE, DEFAULT_OBJECT_COLOR, GroupLayer, GroupSettings, LayerNode, Map,
    MapObject, ObjectGroup, ObjectShape, TileData, TileLayer, TilesetRef,
};

fn element_name<'a>(node: Node<'a, '_>) -> &'a str {
    node.tag_name().name()
}

fn req_attr<'a>(node: Node<'a, '_>, name: &str) -> Result<&'a str> {
    node.attribute(name)
        .ok_or_else(|| ContentError::missing(element_name(node), name))
}

fn parse_opt<T: FromStr>(node: Node<'_, '_>, name: &str) -> Result<Option<T>> {
    node.attribute(name)
        .map(|v| {
            v.trim()
                .parse()
                .map_err(|_| ContentError::invalid(element_name(node), name, v))
        })
        .transpose()
}

fn req_parse<T: FromStr>(node: Node<'_, '_>, name: &str) -> Result<T> {
    parse_opt(node, name)?.ok_or_else(|| ContentError::missing(element_name(node), name))
}

fn child<'a, 'i>(node: Node<'a, 'i>, tag: &str) -> Option<Node<'a, 'i>> {
    node.children().find(|n| n.has_tag_name(tag))
}

fn register_dependency(deps: &mut Vec<PathBuf>, path: &Path) {
    if deps.iter().any(|d| d == path) {
        warn!(path = %path.display(), "dependency registered twice");
        return;
    }
    deps.push(path.to_path_buf());
}

/// Reads `<properties>` children. `file` values become strings and `object`
/// references become integers; other types are skipped.
pub fn parse_properties(node: Node<'_, '_>) -> Result<PropertySet> {
    let mut props = PropertySet::new();
    for p in node.children().filter(|n| n.has_tag_name("property")) {
        let name = req_attr(p, "name")?;
        let kind = p.attribute("type").unwrap_or("string");
        let raw = p.attribute("value").or_else(|| p.text()).unwrap_or("");
        let bad = || ContentError::invalid("property", name, raw);
        let value = match kind {
            "string" | "file" => PropertyValue::String(raw.to_string()),
            "bool" => match raw {
                "true" => PropertyValue::Bool(true),
                "false" => PropertyValue::Bool(false),
                _ => return Err(bad()),
            },
            "int" | "object" => PropertyValue::Int(raw.trim().parse().map_err(|_| bad())?),
            "float" => PropertyValue::Float(raw.trim().parse().map_err(|_| bad())?),
            "color" if raw.is_empty() => PropertyValue::Color([0, 0, 0, 0]),
            "color" => PropertyValue::Color(parse_color(raw).ok_or_else(bad)?),
            other => {
                warn!(property = name, kind = other, "skipping property of unsupported type");
                continue;
            }
        };
        props.insert(name, value);
    }
    Ok(props)
}

fn parse_settings(node: Node<'_, '_>) -> Result<GroupSettings> {
    Ok(GroupSettings {
        offset: (
            parse_opt(node, "offsetx")?.unwrap_or(0.0),
            parse_opt(node, "offsety")?.unwrap_or(0.0),
        ),
        opacity: parse_opt(node, "opacity")?.unwrap_or(1.0),
        visible: parse_opt::<u8>(node, "visible")?.is_none_or(|v| v != 0),
    })
}

fn parse_points(node: Node<'_, '_>) -> Result<Vec<(f32, f32)>> {
    let text = req_attr(node, "points")?;
    text.split_whitespace()
        .map(|pair| {
            let bad = || ContentError::invalid(element_name(node), "points", pair);
            let (x, y) = pair.split_once(',').ok_or_else(bad)?;
            Ok((
                x.trim().parse().map_err(|_| bad())?,
                y.trim().parse().map_err(|_| bad())?,
            ))
        })
        .collect()
}

/// Builds an object from `node`, starting from `base` (a template) when
/// given. Attributes and properties present on `node` override the base.
fn apply_object(node: Node<'_, '_>, base: Option<MapObject>) -> Result<MapObject> {
    let mut obj = base.unwrap_or_default();
    if let Some(v) = parse_opt(node, "id")? {
        obj.id = v;
    }
    if let Some(v) = node.attribute("name") {
        obj.name = v.to_string();
    }
    if let Some(v) = node.attribute("type").or_else(|| node.attribute("class")) {
        obj.kind = v.to_string();
    }
    if let Some(v) = parse_opt(node, "x")? {
        obj.x = v;
    }
    if let Some(v) = parse_opt(node, "y")? {
        obj.y = v;
    }
    if let Some(v) = parse_opt(node, "width")? {
        obj.width = v;
    }
    if let Some(v) = parse_opt(node, "height")? {
        obj.height = v;
    }
    if let Some(v) = parse_opt(node, "rotation")? {
        obj.rotation = v;
    }
    if let Some(v) = parse_opt::<u8>(node, "visible")? {
        obj.visible = v != 0;
    }

    let mut own_props = None;
    for c in node.children().filter(Node::is_element) {
        match element_name(c) {
            "properties" => own_props = Some(parse_properties(c)?),
            "ellipse" => {
                obj.shape = ObjectShape::Ellipse;
                obj.points.clear();
            }
            "point" => {
                obj.shape = ObjectShape::Point;
                obj.points.clear();
            }
            "polygon" => {
                obj.shape = ObjectShape::Polygon;
                obj.points = parse_points(c)?;
            }
            "polyline" => {
                obj.shape = ObjectShape::Polyline;
                obj.points = parse_points(c)?;
            }
            "text" => {
                obj.shape = ObjectShape::Rectangle;
                obj.points.clear();
            }
            _ => {}
        }
    }
    obj.properties = match (obj.properties.take(), own_props) {
        (Some(inherited), Some(own)) => Some(inherited.merged_with(&own)),
        (inherited, own) => own.or(inherited),
    };
    Ok(obj)
}

#[derive(Debug, Clone)]
struct ExternalTileset {
    name: String,
    tile_count: Option<u32>,
    tiles: BTreeMap<u32, PropertySet>,
}

fn parse_tile_properties(tileset: Node<'_, '_>) -> Result<BTreeMap<u32, PropertySet>> {
    let mut tiles = BTreeMap::new();
    for tile in tileset.children().filter(|n| n.has_tag_name("tile")) {
        let id: u32 = req_parse(tile, "id")?;
        if let Some(p) = child(tile, "properties") {
            let props = parse_properties(p)?;
            if !props.is_empty() {
                tiles.insert(id, props);
            }
        }
    }
    Ok(tiles)
}

fn read_tileset(path: &Path) -> Result<ExternalTileset> {
    let text = fs::read_to_string(path).map_err(|_| ContentError::MissingDependency {
        path: path.to_path_buf(),
    })?;
    let parse = || -> Result<ExternalTileset> {
        let doc = Document::parse(&text)?;
        let root = doc.root_element();
        if !root.has_tag_name("tileset") {
            return Err(ContentError::InvalidInput(format!(
                "expected <tileset>, found <{}>",
                element_name(root)
            )));
        }
        Ok(ExternalTileset {
            name: root.attribute("name").unwrap_or_default().to_string(),
            tile_count: parse_opt(root, "tilecount")?,
            tiles: parse_tile_properties(root)?,
        })
    };
    parse().map_err(|e| e.in_file(path))
}

fn read_template(path: &Path) -> Result<MapObject> {
    let text = fs::read_to_string(path).map_err(|_| ContentError::MissingDependency {
        path: path.to_path_buf(),
    })?;
    let parse = || -> Result<MapObject> {
        let doc = Document::parse(&text)?;
        let root = doc.root_element();
        if !root.has_tag_name("template") {
            return Err(ContentError::InvalidInput(format!(
                "expected <template>, found <{}>",
                element_name(root)
            )));
        }
        let object = child(root, "object")
            .ok_or_else(|| ContentError::InvalidInput("template has no <object>".into()))?;
        apply_object(object, None)
    };
    parse().map_err(|e| e.in_file(path))
}

/// Parser state: caches of external files, shared by every map it parses.
#[derive(Debug, Default)]
pub struct TmxParser {
    tilesets: HashMap<PathBuf, ExternalTileset>,
    templates: HashMap<PathBuf, MapObject>,
    dependencies: Vec<PathBuf>,
}

impl TmxParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a map file; relative tileset and template paths resolve
    /// against its directory.
    #[instrument(skip_all, fields(map = %path.display()))]
    pub fn parse_file(&mut self, path: &Path) -> Result<Map> {
        let text = fs::read_to_string(path).map_err(|e| ContentError::from(e).in_file(path))?;
        let base = path.parent().unwrap_or_else(|| Path::new(""));
        self.parse_str(&text, base).map_err(|e| e.in_file(path))
    }

    pub fn parse_str(&mut self, text: &str, base_dir: &Path) -> Result<Map> {
        self.dependencies.clear();
        let doc = Document::parse(text)?;
        let root = doc.root_element();
        if !root.has_tag_name("map") {
            return Err(ContentError::InvalidInput(format!(
                "expected <map>, found <{}>",
                element_name(root)
            )));
        }
        let orientation = req_attr(root, "orientation")?;
        if orientation != "orthogonal" {
            return Err(ContentError::UnsupportedOrientation(orientation.to_string()));
        }
        let infinite = parse_opt::<u8>(root, "infinite")?.unwrap_or(0) != 0;
        let background = match root.attribute("backgroundcolor") {
            Some(v) => parse_color(v).ok_or_else(|| ContentError::invalid("map", "backgroundcolor", v))?,
            None => [0, 0, 0, 0],
        };

        let mut map = Map {
            width: parse_opt(root, "width")?.unwrap_or(0),
            height: parse_opt(root, "height")?.unwrap_or(0),
            tile_width: req_parse(root, "tilewidth")?,
            tile_height: req_parse(root, "tileheight")?,
            background,
            infinite,
            chunk_width: DEFAULT_CHUNK_SIZE,
            chunk_height: DEFAULT_CHUNK_SIZE,
            origin: (0, 0),
            properties: None,
            tilesets: Vec::new(),
            tile_properties: BTreeMap::new(),
            layers: Vec::new(),
            dependencies: Vec::new(),
        };

        for node in root.children().filter(Node::is_element) {
            match element_name(node) {
                "properties" => map.properties = Some(parse_properties(node)?),
                "tileset" => self.parse_tileset(node, base_dir, &mut map)?,
                "editorsettings" => {
                    if let Some(c) = child(node, "chunksize") {
                        map.chunk_width = parse_opt(c, "width")?.unwrap_or(DEFAULT_CHUNK_SIZE);
                        map.chunk_height = parse_opt(c, "height")?.unwrap_or(DEFAULT_CHUNK_SIZE);
                    }
                }
                _ => {
                    if let Some(layer) = self.parse_layer_node(node, base_dir, infinite)? {
                        map.layers.push(layer);
                    }
                }
            }
        }

        if infinite {
            fit_chunk_bounds(&mut map)?;
        }
        map.dependencies = std::mem::take(&mut self.dependencies);
        debug!(
            width = map.width,
            height = map.height,
            tilesets = map.tilesets.len(),
            layers = map.layers.len(),
            "map parsed"
        );
        Ok(map)
    }

    fn parse_tileset(&mut self, node: Node<'_, '_>, base_dir: &Path, map: &mut Map) -> Result<()> {
        let first_gid: u32 = req_parse(node, "firstgid")?;
        let index = map.tilesets.len();
        if index > u8::MAX as usize {
            return Err(ContentError::InvalidInput("a map may use at most 256 tilesets".into()));
        }
        let (name, source, tile_count, tiles) = match node.attribute("source") {
            Some(src) => {
                let path = base_dir.join(src);
                register_dependency(&mut self.dependencies, &path);
                let ts = match self.tilesets.entry(path.clone()) {
                    Entry::Occupied(e) => e.into_mut(),
                    Entry::Vacant(v) => v.insert(read_tileset(&path)?),
                };
                (ts.name.clone(), Some(path), ts.tile_count, ts.tiles.clone())
            }
            None => (
                node.attribute("name").unwrap_or_default().to_string(),
                None,
                parse_opt(node, "tilecount")?,
                parse_tile_properties(node)?,
            ),
        };
        if !tiles.is_empty() {
            map.tile_properties.insert(index, tiles);
        }
        map.tilesets.push(TilesetRef {
            first_gid,
            name,
            source,
            tile_count,
        });
        Ok(())
    }

    /// Templates are shared by many objects, so repeat uses are not
    /// duplicate registrations.
    fn template(&mut self, path: &Path) -> Result<MapObject> {
        let obj = match self.templates.entry(path.to_path_buf()) {
            Entry::Occupied(e) => e.get().clone(),
            Entry::Vacant(v) => v.insert(read_template(path)?).clone(),
        };
        if !self.dependencies.iter().any(|d| d == path) {
            self.dependencies.push(path.to_path_buf());
        }
        Ok(obj)
    }

    fn parse_layer_node(&mut self, node: Node<'_, '_>, base_dir: &Path, infinite: bool) -> Result<Option<LayerNode>> {
        let layer = match element_name(node) {
            "layer" => LayerNode::Tiles(parse_tile_layer(node, infinite)?),
            "objectgroup" => LayerNode::Objects(self.parse_object_group(node, base_dir)?),
            "group" => {
                let mut children = Vec::new();
                for c in node.children().filter(Node::is_element) {
                    if let Some(l) = self.parse_layer_node(c, base_dir, infinite)? {
                        children.push(l);
                    }
                }
                LayerNode::Group(GroupLayer {
                    name: node.attribute("name").unwrap_or_default().to_string(),
                    settings: parse_settings(node)?,
                    children,
                })
            }
            "imagelayer" => {
                debug!(name = node.attribute("name"), "skipping image layer");
                return Ok(None);
            }
            _ => return Ok(None),
        };
        Ok(Some(layer))
    }

    fn parse_object_group(&mut self, node: Node<'_, '_>, base_dir: &Path) -> Result<ObjectGroup> {
        let color = match node.attribute("color") {
            Some(v) => parse_color(v).ok_or_else(|| ContentError::invalid("objectgroup", "color", v))?,
            None => DEFAULT_OBJECT_COLOR,
        };
        let mut group = ObjectGroup {
            name: node.attribute("name").unwrap_or_default().to_string(),
            color,
            settings: parse_settings(node)?,
            properties: None,
            objects: Vec::new(),
        };
        for c in node.children().filter(Node::is_element) {
            match element_name(c) {
                "properties" => group.properties = Some(parse_properties(c)?),
                "object" => {
                    let base = match c.attribute("template") {
                        Some(t) => Some(self.template(&base_dir.join(t))?),
                        None => None,
                    };
                    group.objects.push(apply_object(c, base)?);
                }
                _ => {}
            }
        }
        Ok(group)
    }
}

fn parse_tile_layer(node: Node<'_, '_>, infinite: bool) -> Result<TileLayer> {
    let name = node.attribute("name").unwrap_or_default().to_string();
    let width: u32 = req_parse(node, "width")?;
    let height: u32 = req_parse(node, "height")?;
    let properties = child(node, "properties").map(parse_properties).transpose()?;
    let data = child(node, "data")
        .ok_or_else(|| ContentError::InvalidInput(format!("layer '{name}' has no <data>")))?;
    let format = DataFormat::from_node(data)?;

    let data = if infinite {
        let mut chunks = Vec::new();
        for c in data.children().filter(|n| n.has_tag_name("chunk")) {
            let (cw, ch): (u32, u32) = (req_parse(c, "width")?, req_parse(c, "height")?);
            chunks.push(Chunk {
                x: req_parse(c, "x")?,
                y: req_parse(c, "y")?,
                width: cw,
                height: ch,
                gids: decode_tiles(c, format, cw as usize * ch as usize, &name)?,
            });
        }
        TileData::Chunked(chunks)
    } else {
        TileData::Finite(decode_tiles(data, format, width as usize * height as usize, &name)?)
    };

    Ok(TileLayer {
        name,
        width,
        height,
        settings: parse_settings(node)?,
        properties,
        data,
    })
}

/// Sets an infinite map's size and origin to the bounding box of every
/// chunk, and its chunk size to the (uniform) chunk extent.
fn fit_chunk_bounds(map: &mut Map) -> Result<()> {
    let mut size: Option<(u32, u32)> = None;
    let mut bounds: Option<(i32, i32, i32, i32)> = None;
    for layer in map.tile_layers() {
        let TileData::Chunked(chunks) = &layer.data else {
            continue;
        };
        for c in chunks {
            match size {
                None => size = Some((c.width, c.height)),
                Some(s) if s != (c.width, c.height) => {
                    return Err(ContentError::invalid(
                        "chunk",
                        "width",
                        &format!("{}x{} (expected {}x{})", c.width, c.height, s.0, s.1),
                    ));
                }
                Some(_) => {}
            }
            let (x1, y1) = (c.x + c.width as i32, c.y + c.height as i32);
            bounds = Some(match bounds {
                None => (c.x, c.y, x1, y1),
                Some((ax, ay, bx, by)) => (ax.min(c.x), ay.min(c.y), bx.max(x1), by.max(y1)),
            });
        }
    }
    if let Some((w, h)) = size {
        map.chunk_width = w;
        map.chunk_height = h;
    }
    match bounds {
        Some((x0, y0, x1, y1)) => {
            map.origin = (x0, y0);
            map.width = (x1 - x0) as u32;
            map.height = (y1 - y0) as u32;
        }
        None => {
            map.origin = (0, 0);
            map.width = 0;
            map.height = 0;
        }
    }
    Ok(())
}

/// Parses one map file with a fresh parser.
pub fn parse_map_file(path: &Path) -> Result<Map> {
    TmxParser::new().parse_file(path)
}

/// Parses map XML held in memory.
pub fn parse_map_str(text: &str, base_dir: &Path) -> Result<Map> {
    TmxParser::new().parse_str(text, base_dir)
}
