use image::{DynamicImage, ImageFormat, RgbaImage};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument, warn};
use walkdir::WalkDir;

use crate::compositing::draw_band;
use crate::config::SpritePackConfig;
use crate::error::{ContentError, Result};
use crate::export::{build_lookup, write_lookup};
use crate::model::{LookupEntry, PackStats, Rect, UnpackedSprite};
use crate::packer::pack_sprites;
use crate::pool::WorkerPool;
use crate::trim::compute_trim_rect;

/// File extensions picked up from source folders (compared case-insensitively).
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "tga", "gif"];

/// In-memory image to pack (key + decoded image).
pub struct InputImage {
    pub key: String,
    pub image: DynamicImage,
}

/// Packed sheet, its lookup table and the sprites in discovery order.
#[derive(Debug)]
pub struct SpritePackOutput {
    pub rgba: RgbaImage,
    pub sprites: Vec<UnpackedSprite>,
    pub entries: Vec<LookupEntry>,
    pub stats: PackStats,
}

/// Paths produced by [`SpritePackOutput::write`].
#[derive(Debug, Clone)]
pub struct WrittenAtlas {
    pub image: PathBuf,
    pub lookup: PathBuf,
}

impl SpritePackOutput {
    /// Writes `<name>.png` and `<name>.sprites.bytes` into `out_dir`.
    pub fn write(&self, out_dir: &Path, name: &str) -> Result<WrittenAtlas> {
        fs::create_dir_all(out_dir)?;
        let image = out_dir.join(format!("{name}.png"));
        self.rgba
            .save_with_format(&image, ImageFormat::Png)
            .map_err(|e| ContentError::from(e).in_file(&image))?;
        let lookup = out_dir.join(format!("{name}.sprites.bytes"));
        let mut f = BufWriter::new(File::create(&lookup)?);
        write_lookup(&mut f, &self.entries)?;
        f.flush()?;
        info!(?image, ?lookup, sprites = self.entries.len(), "atlas written");
        Ok(WrittenAtlas { image, lookup })
    }
}

fn is_image(p: &Path) -> bool {
    p.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .is_some_and(|e| IMAGE_EXTENSIONS.contains(&e.as_str()))
}

/// Relative path under `root` without extension, `/`-separated.
pub fn sprite_name(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path).with_extension("");
    rel.to_string_lossy().replace('\\', "/")
}

/// Recursively lists image files under each folder, in folder order and then
/// file-name order.
pub fn discover_sprites(folders: &[PathBuf]) -> Result<Vec<UnpackedSprite>> {
    let mut sprites = Vec::new();
    for folder in folders {
        if !folder.is_dir() {
            return Err(ContentError::InvalidInput(format!(
                "source folder {} does not exist",
                folder.display()
            )));
        }
        for entry in WalkDir::new(folder).sort_by_file_name() {
            let entry = entry.map_err(|e| ContentError::Io(e.into()))?;
            let p = entry.path();
            if entry.file_type().is_file() && is_image(p) {
                let seq = sprites.len();
                sprites.push(UnpackedSprite::new(seq, sprite_name(folder, p), p));
            }
        }
    }
    Ok(sprites)
}

#[instrument(skip_all)]
/// Builds a sprite pack from the folders in `cfg`.
///
/// Returns `Ok(None)` when the folders hold no images; nothing is written in
/// that case.
pub fn compile_sprite_pack(cfg: &SpritePackConfig) -> Result<Option<SpritePackOutput>> {
    cfg.validate()?;
    let sprites = discover_sprites(&cfg.source_folders)?;
    if sprites.is_empty() {
        warn!(folders = ?cfg.source_folders, "no sprites found, nothing to pack");
        return Ok(None);
    }
    pack_sprite_list(sprites, cfg).map(Some)
}

/// Packs already-decoded images; keys become the sprite names.
pub fn pack_images(inputs: Vec<InputImage>, cfg: &SpritePackConfig) -> Result<SpritePackOutput> {
    cfg.validate()?;
    if inputs.is_empty() {
        return Err(ContentError::InvalidInput("nothing to pack".into()));
    }
    let sprites = inputs
        .into_iter()
        .enumerate()
        .map(|(seq, inp)| {
            let rgba = inp.image.to_rgba8();
            let (w, h) = rgba.dimensions();
            UnpackedSprite::from_rgba(seq, inp.key, w, h, rgba.into_raw())
        })
        .collect();
    pack_sprite_list(sprites, cfg)
}

/// File-backed sprites whose pixels have not been loaded yet.
fn needs_decode(s: &UnpackedSprite) -> bool {
    s.pixels.is_empty() && !s.path.as_os_str().is_empty()
}

/// Runs read, decode, trim, pack and draw over `sprites`.
///
/// Sprites that already carry pixels skip the read and decode phases.
pub fn pack_sprite_list(mut sprites: Vec<UnpackedSprite>, cfg: &SpritePackConfig) -> Result<SpritePackOutput> {
    let pool = cfg.workers.map(WorkerPool::new).unwrap_or_else(WorkerPool::detect);
    let (sheet_w, sheet_h) = (cfg.output_width, cfg.output_height);
    debug!(sprites = sprites.len(), workers = pool.workers(), "packing");

    // read
    pool.for_each_range(&mut sprites, |_, part| {
        for s in part.iter_mut().filter(|s| needs_decode(s)) {
            s.bytes = fs::read(&s.path).map_err(|e| ContentError::from(e).in_file(&s.path))?;
        }
        Ok(())
    })?;

    // decode, on this thread; an empty file is a decode error, not an empty sprite
    for s in sprites.iter_mut().filter(|s| needs_decode(s)) {
        let img = image::load_from_memory(&s.bytes)
            .map_err(|e| ContentError::from(e).in_file(&s.path))?
            .to_rgba8();
        let (w, h) = img.dimensions();
        s.set_pixels(w, h, img.into_raw());
        s.bytes = Vec::new();
    }

    if let Some(s) = sprites.iter().find(|s| s.width > sheet_w || s.height > sheet_h) {
        return Err(ContentError::SpriteTooLarge {
            name: s.name.clone(),
            width: s.width,
            height: s.height,
            max_width: sheet_w,
            max_height: sheet_h,
        });
    }

    // trim; transparent sprites are flagged empty whether or not trimming is on
    let trim = cfg.trim;
    pool.for_each_range(&mut sprites, |_, part| {
        for s in part.iter_mut() {
            let full = Rect::new(0, 0, s.width, s.height);
            match compute_trim_rect(&s.pixels, s.width, full, 0) {
                Some(r) if trim => s.set_trim(r),
                Some(_) => s.set_trim(full),
                None => s.set_trim(Rect::default()),
            }
        }
        Ok(())
    })?;

    let non_empty = sprites.iter().filter(|s| !s.empty).count();
    let placed = pack_sprites(&mut sprites, sheet_w, sheet_h)?;
    if placed < non_empty {
        let percent = placed as f64 * 100.0 / non_empty as f64;
        return Err(ContentError::OutOfSpace {
            placed,
            total: non_empty,
            percent,
        });
    }

    // draw
    let mut canvas = vec![0u8; sheet_w as usize * sheet_h as usize * 4];
    pool.for_each_row_band(&mut canvas, sheet_w as usize * 4, |first_row, band| {
        draw_band(&sprites, band, sheet_w, first_row as u32);
        Ok(())
    })?;
    let rgba = RgbaImage::from_raw(sheet_w, sheet_h, canvas)
        .ok_or_else(|| ContentError::InvalidInput("canvas size mismatch".into()))?;

    sprites.sort_by_key(|s| s.seq);
    let (entries, duplicates) = build_lookup(&sprites);
    let used_area: u64 = sprites.iter().filter_map(|s| s.frame()).map(|r| r.area()).sum();
    let stats = PackStats {
        sprites: sprites.len(),
        placed,
        empty: sprites.len() - non_empty,
        duplicates,
        sheet_width: sheet_w,
        sheet_height: sheet_h,
        used_area,
        occupancy: used_area as f64 / (sheet_w as f64 * sheet_h as f64),
    };
    info!(
        sprites = stats.sprites,
        placed,
        duplicates,
        occupancy = format!("{:.2}%", stats.occupancy * 100.0),
        "sprite pack built"
    );
    Ok(SpritePackOutput {
        rgba,
        sprites,
        entries,
        stats,
    })
}
