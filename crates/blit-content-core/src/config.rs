use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{ContentError, Result};

pub const MIN_OUTPUT_DIM: u32 = 64;
pub const MAX_OUTPUT_DIM: u32 = 8192;

/// Recognized descriptor keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DescriptorKey {
    SourceFolder,
    OutputWidth,
    OutputHeight,
    Trim,
}

impl FromStr for DescriptorKey {
    type Err = ();
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "SOURCE_FOLDER" => Ok(Self::SourceFolder),
            "OUTPUT_WIDTH" => Ok(Self::OutputWidth),
            "OUTPUT_HEIGHT" => Ok(Self::OutputHeight),
            "TRIM" => Ok(Self::Trim),
            _ => Err(()),
        }
    }
}

/// Sprite pack settings, usually read from a descriptor file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SpritePackConfig {
    /// Folders scanned recursively for images, in order.
    pub source_folders: Vec<PathBuf>,
    /// Sheet width in pixels.
    pub output_width: u32,
    /// Sheet height in pixels.
    pub output_height: u32,
    /// Trim fully transparent margins before packing.
    pub trim: bool,
    /// Worker threads; `None` uses the logical processor count.
    #[serde(default)]
    pub workers: Option<usize>,
}

impl Default for SpritePackConfig {
    fn default() -> Self {
        Self {
            source_folders: Vec::new(),
            output_width: 2048,
            output_height: 2048,
            trim: false,
            workers: None,
        }
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}

impl SpritePackConfig {
    /// Reads and validates a descriptor file. Source folders resolve against
    /// the descriptor's own directory.
    pub fn from_descriptor_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| ContentError::from(e).in_file(path))?;
        let base = path.parent().unwrap_or_else(|| Path::new(""));
        Self::parse_descriptor(&text, base).map_err(|e| e.in_file(path))
    }

    /// Parses `KEY=VALUE` lines; `//` starts a comment.
    pub fn parse_descriptor(text: &str, base_dir: &Path) -> Result<Self> {
        let mut cfg = SpritePackConfig::default();
        for (idx, raw) in text.lines().enumerate() {
            let line_no = idx + 1;
            let err = |message: String| ContentError::Descriptor {
                line: line_no,
                message,
            };
            let line = match raw.find("//") {
                Some(pos) => &raw[..pos],
                None => raw,
            }
            .trim();
            if line.is_empty() {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                return Err(err(format!("expected KEY=VALUE, found '{line}'")));
            };
            let (key, value) = (key.trim(), value.trim());
            let key: DescriptorKey = key
                .parse()
                .map_err(|_| err(format!("unknown key '{key}'")))?;
            if value.is_empty() {
                return Err(err("missing value".into()));
            }
            match key {
                DescriptorKey::SourceFolder => cfg.source_folders.push(base_dir.join(value)),
                DescriptorKey::OutputWidth => {
                    cfg.output_width = value
                        .parse()
                        .map_err(|_| err(format!("invalid OUTPUT_WIDTH '{value}'")))?;
                }
                DescriptorKey::OutputHeight => {
                    cfg.output_height = value
                        .parse()
                        .map_err(|_| err(format!("invalid OUTPUT_HEIGHT '{value}'")))?;
                }
                DescriptorKey::Trim => {
                    cfg.trim = parse_bool(value).ok_or_else(|| err(format!("invalid TRIM '{value}'")))?;
                }
            }
        }
        cfg.validate()?;
        Ok(cfg)
    }

    /// Validates the configuration parameters.
    pub fn validate(&self) -> Result<()> {
        let in_range = |v: u32| (MIN_OUTPUT_DIM..=MAX_OUTPUT_DIM).contains(&v);
        if !in_range(self.output_width) || !in_range(self.output_height) {
            return Err(ContentError::InvalidDimensions {
                width: self.output_width,
                height: self.output_height,
                min: MIN_OUTPUT_DIM,
                max: MAX_OUTPUT_DIM,
            });
        }
        if self.workers == Some(0) {
            return Err(ContentError::InvalidInput("workers must be at least 1".into()));
        }
        Ok(())
    }

    /// Create a fluent builder for `SpritePackConfig`.
    pub fn builder() -> SpritePackConfigBuilder {
        SpritePackConfigBuilder::new()
    }
}

/// Builder for `SpritePackConfig` for ergonomic construction.
#[derive(Debug, Default, Clone)]
pub struct SpritePackConfigBuilder {
    cfg: SpritePackConfig,
}

impl SpritePackConfigBuilder {
    pub fn new() -> Self {
        Self {
            cfg: SpritePackConfig::default(),
        }
    }
    pub fn source_folder(mut self, p: impl Into<PathBuf>) -> Self {
        self.cfg.source_folders.push(p.into());
        self
    }
    pub fn with_output_dimensions(mut self, w: u32, h: u32) -> Self {
        self.cfg.output_width = w;
        self.cfg.output_height = h;
        self
    }
    pub fn trim(mut self, v: bool) -> Self {
        self.cfg.trim = v;
        self
    }
    pub fn workers(mut self, v: Option<usize>) -> Self {
        self.cfg.workers = v;
        self
    }
    pub fn build(self) -> SpritePackConfig {
        self.cfg
    }
}

/// Settings for compiling Tiled maps.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MapCompileConfig {
    /// A segment file is closed once it reaches this many bytes.
    pub max_segment_size: usize,
    /// zlib level, 0..=9.
    pub compression_level: u32,
}

impl Default for MapCompileConfig {
    fn default() -> Self {
        Self {
            max_segment_size: 64 * 1024,
            compression_level: 6,
        }
    }
}

impl MapCompileConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_segment_size == 0 {
            return Err(ContentError::InvalidInput("max_segment_size must be positive".into()));
        }
        if self.compression_level > 9 {
            return Err(ContentError::InvalidInput(format!(
                "compression_level {} is outside 0..=9",
                self.compression_level
            )));
        }
        Ok(())
    }

    pub fn builder() -> MapCompileConfigBuilder {
        MapCompileConfigBuilder::default()
    }
}

#[derive(Debug, Default, Clone)]
pub struct MapCompileConfigBuilder {
    cfg: MapCompileConfig,
}

impl MapCompileConfigBuilder {
    pub fn max_segment_size(mut self, v: usize) -> Self {
        self.cfg.max_segment_size = v;
        self
    }
    pub fn compression_level(mut self, v: u32) -> Self {
        self.cfg.compression_level = v;
        self
    }
    pub fn build(self) -> MapCompileConfig {
        self.cfg
    }
}
