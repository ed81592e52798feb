//! Tiled map support: parsing `.tmx`/`.tsx`/`.tx` and compiling maps into
//! the runtime's chunked binary form.

pub mod compiler;
pub mod data;
pub mod gid;
pub mod model;
pub mod parser;
pub mod reader;

pub use compiler::{
    ChunkIndexEntry, MAP_INFO_FILE, MapCompileReport, compile_map, compile_map_file, layer_file_stem,
};
pub use gid::{FLIP_H, FLIP_V, GidRange, ROT_90_CW, TileCell, decode_gid};
pub use model::{GroupSettings, LayerNode, Map, MapObject, ObjectShape, TileData};
pub use parser::{TmxParser, parse_map_file, parse_map_str};
pub use reader::{
    MapInfo, Section, decode_tile_stream, read_chunk, read_chunk_index, read_layer_blob, read_map_info_file,
};
