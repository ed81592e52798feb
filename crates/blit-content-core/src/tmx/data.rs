//! Decoding of `<data>` and `<chunk>` tile payloads.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use flate2::read::{GzDecoder, ZlibDecoder};
use roxmltree::Node;
use std::io::Read;

use crate::error::{ContentError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Xml,
    Csv,
    Base64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    None,
    Zlib,
    Gzip,
}

/// Encoding and compression declared on a `<data>` element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataFormat {
    pub encoding: Encoding,
    pub compression: Compression,
}

impl DataFormat {
    pub fn from_node(data: Node<'_, '_>) -> Result<Self> {
        let encoding = match data.attribute("encoding") {
            None => Encoding::Xml,
            Some("csv") => Encoding::Csv,
            Some("base64") => Encoding::Base64,
            Some(other) => return Err(ContentError::UnsupportedEncoding(other.to_string())),
        };
        let compression = match data.attribute("compression") {
            None | Some("") => Compression::None,
            Some("zlib") => Compression::Zlib,
            Some("gzip") => Compression::Gzip,
            Some(other) => return Err(ContentError::UnsupportedCompression(other.to_string())),
        };
        if encoding != Encoding::Base64 && compression != Compression::None {
            return Err(ContentError::UnsupportedCompression(format!(
                "{compression:?} without base64 encoding"
            )));
        }
        Ok(Self {
            encoding,
            compression,
        })
    }
}

/// Decodes the GIDs held directly by `node` (a `<data>` or `<chunk>`) and
/// checks there are exactly `expected` of them.
pub fn decode_tiles(node: Node<'_, '_>, format: DataFormat, expected: usize, layer: &str) -> Result<Vec<u32>> {
    let gids = match format.encoding {
        Encoding::Xml => node
            .children()
            .filter(|n| n.has_tag_name("tile"))
            .map(|t| match t.attribute("gid") {
                Some(v) => v.trim().parse().map_err(|_| ContentError::invalid("tile", "gid", v)),
                None => Ok(0),
            })
            .collect::<Result<Vec<u32>>>()?,
        Encoding::Csv => decode_csv(node.text().unwrap_or(""))?,
        Encoding::Base64 => decode_base64(node.text().unwrap_or(""), format.compression)?,
    };
    if gids.len() != expected {
        return Err(ContentError::TileCountMismatch {
            layer: layer.to_string(),
            expected,
            actual: gids.len(),
        });
    }
    Ok(gids)
}

pub fn decode_csv(text: &str) -> Result<Vec<u32>> {
    text.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(|t| t.parse().map_err(|_| ContentError::invalid("data", "csv", t)))
        .collect()
}

pub fn decode_base64(text: &str, compression: Compression) -> Result<Vec<u32>> {
    let packed: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    let raw = STANDARD.decode(packed)?;
    let bytes = match compression {
        Compression::None => raw,
        Compression::Zlib => {
            let mut out = Vec::new();
            ZlibDecoder::new(raw.as_slice()).read_to_end(&mut out)?;
            out
        }
        Compression::Gzip => {
            let mut out = Vec::new();
            GzDecoder::new(raw.as_slice()).read_to_end(&mut out)?;
            out
        }
    };
    if bytes.len() % 4 != 0 {
        return Err(ContentError::Corrupt(format!(
            "layer data is {} bytes, not a multiple of 4",
            bytes.len()
        )));
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect())
}
