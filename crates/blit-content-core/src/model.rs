use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Axis-aligned rectangle (pixels). `x,y` is top-left; `w,h` are sizes.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

impl Rect {
    pub fn new(x: u32, y: u32, w: u32, h: u32) -> Self {
        Self { x, y, w, h }
    }
    /// Exclusive right edge (`x + w`).
    pub fn right(&self) -> u32 {
        self.x + self.w
    }
    /// Exclusive bottom edge (`y + h`).
    pub fn bottom(&self) -> u32 {
        self.y + self.h
    }
    pub fn area(&self) -> u64 {
        self.w as u64 * self.h as u64
    }
    pub fn is_empty(&self) -> bool {
        self.w == 0 || self.h == 0
    }
    /// Returns true if `r` is fully inside `self`.
    pub fn contains(&self, r: &Rect) -> bool {
        r.x >= self.x && r.y >= self.y && r.right() <= self.right() && r.bottom() <= self.bottom()
    }
    pub fn intersects(&self, r: &Rect) -> bool {
        !(self.x >= r.right() || r.x >= self.right() || self.y >= r.bottom() || r.y >= self.bottom())
    }
}

/// A source sprite as it moves through the read, trim, pack and draw phases.
#[derive(Debug, Clone, Default)]
pub struct UnpackedSprite {
    /// Discovery order; breaks area ties so packing is deterministic.
    pub seq: usize,
    /// Relative path without extension, `/`-separated.
    pub name: String,
    pub path: PathBuf,
    /// Encoded file bytes; released once decoded.
    pub bytes: Vec<u8>,
    /// RGBA8 pixels, `width * height * 4` bytes.
    pub pixels: Vec<u8>,
    pub width: u32,
    pub height: u32,
    /// Trimmed sub-rectangle within the original image.
    pub trim: Rect,
    pub area: u64,
    pub empty: bool,
    /// Top-left in the sheet; `None` until packed.
    pub placement: Option<(u32, u32)>,
}

impl UnpackedSprite {
    pub fn new(seq: usize, name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            seq,
            name: name.into(),
            path: path.into(),
            ..Default::default()
        }
    }

    /// Builds a sprite directly from decoded RGBA pixels, untrimmed.
    pub fn from_rgba(seq: usize, name: impl Into<String>, width: u32, height: u32, pixels: Vec<u8>) -> Self {
        let mut sprite = Self::new(seq, name, PathBuf::new());
        sprite.set_pixels(width, height, pixels);
        sprite
    }

    pub(crate) fn set_pixels(&mut self, width: u32, height: u32, pixels: Vec<u8>) {
        self.width = width;
        self.height = height;
        self.pixels = pixels;
        self.set_trim(Rect::new(0, 0, width, height));
    }

    pub(crate) fn set_trim(&mut self, trim: Rect) {
        self.trim = trim;
        self.area = trim.area();
        self.empty = trim.is_empty();
    }

    /// Rectangle occupied in the sheet, if placed.
    pub fn frame(&self) -> Option<Rect> {
        self.placement
            .map(|(x, y)| Rect::new(x, y, self.trim.w, self.trim.h))
    }
}

/// One record of the sprite lookup table.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct LookupEntry {
    pub hash: i32,
    pub original_size: (u16, u16),
    pub position: (u16, u16),
    pub trimmed_size: (u16, u16),
    /// Offset of the trimmed rect inside the original, y measured from the bottom edge.
    pub trim_offset: (u16, u16),
}

/// Statistics about one atlas build.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct PackStats {
    /// Source sprites discovered.
    pub sprites: usize,
    /// Sprites placed in the sheet.
    pub placed: usize,
    /// Fully transparent sprites (never placed).
    pub empty: usize,
    /// Sprites dropped because their name hash was already taken.
    pub duplicates: usize,
    pub sheet_width: u32,
    pub sheet_height: u32,
    /// Sum of placed trimmed areas.
    pub used_area: u64,
    /// used_area / sheet area (0.0 to 1.0).
    pub occupancy: f64,
}

impl PackStats {
    /// Returns a human-readable summary of the statistics.
    pub fn summary(&self) -> String {
        format!(
            "Sprites: {}, Placed: {}, Empty: {}, Duplicates: {}, Sheet: {}x{}, Occupancy: {:.2}%",
            self.sprites,
            self.placed,
            self.empty,
            self.duplicates,
            self.sheet_width,
            self.sheet_height,
            self.occupancy * 100.0,
        )
    }

    pub fn wasted_area(&self) -> u64 {
        (self.sheet_width as u64 * self.sheet_height as u64).saturating_sub(self.used_area)
    }
}
