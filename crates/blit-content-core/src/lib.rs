//! Offline content compiler for RetroBlit games.
//!
//! - Sprite packs: folders of images are trimmed, packed with a scanline gap
//!   packer and written as one sheet plus a binary lookup table
//! - Tiled maps: `.tmx` files (with `.tsx`/`.tx` dependencies) compile into a
//!   folder of compressed, chunked binary layers
//! - Work is split across a worker pool (rayon, behind the `parallel` feature)
//!
//! Quick example:
//! ```ignore
//! use blit_content_core::prelude::*;
//! # fn main() -> anyhow::Result<()> {
//! let cfg = SpritePackConfig::from_descriptor_file("sprites/pack.sp".as_ref())?;
//! if let Some(out) = compile_sprite_pack(&cfg)? {
//!     out.write("build".as_ref(), "sprites")?;
//!     println!("{}", out.stats.summary());
//! }
//! let report = compile_map_file("maps/level1.tmx".as_ref(), "build/level1".as_ref(), &MapCompileConfig::default())?;
//! println!("layers: {}", report.layers);
//! # Ok(()) }
//! ```

pub mod binary;
pub mod compositing;
pub mod config;
pub mod error;
pub mod export;
pub mod hash;
pub mod model;
pub mod packer;
pub mod pipeline;
pub mod pool;
pub mod properties;
pub mod tmx;
pub mod trim;

pub use config::*;
pub use error::*;
pub use export::*;
pub use hash::{fnv1a, name_hash};
pub use model::*;
pub use packer::*;
pub use pipeline::*;
pub use pool::WorkerPool;
pub use properties::{PropertyKind, PropertySet, PropertyValue};

/// Convenience prelude for common types and functions.
/// Importing `blit_content_core::prelude::*` brings the primary APIs into scope.
pub mod prelude {
    pub use crate::config::{
        MapCompileConfig, MapCompileConfigBuilder, SpritePackConfig, SpritePackConfigBuilder,
    };
    pub use crate::error::{ContentError, Result};
    pub use crate::export::{lookup_to_json, read_lookup};
    pub use crate::model::{LookupEntry, PackStats, Rect, UnpackedSprite};
    pub use crate::properties::{PropertySet, PropertyValue};
    pub use crate::tmx::{MapCompileReport, compile_map_file, parse_map_file};
    pub use crate::{InputImage, SpritePackOutput, compile_sprite_pack, pack_images};
}
