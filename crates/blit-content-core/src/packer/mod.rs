use crate::error::Result;
use crate::model::{Rect, UnpackedSprite};

pub mod scanline;

pub use scanline::ScanlinePacker;

/// A packer places rectangles into a fixed-size sheet.
///
/// Implementations must ensure no overlaps and keep every placement inside the sheet.
/// `pack` returns `None` if the rectangle cannot be placed.
pub trait Packer {
    fn can_pack(&self, rect: &Rect) -> bool;
    fn pack(&mut self, rect: &Rect) -> Option<Rect>;
}

/// Orders sprites by trimmed area, largest first; ties keep discovery order.
pub fn sort_for_packing(sprites: &mut [UnpackedSprite]) {
    sprites.sort_by(|a, b| b.area.cmp(&a.area).then_with(|| a.seq.cmp(&b.seq)));
}

/// Sorts `sprites` and places every non-empty one into a `width` x `height` sheet.
///
/// Stops at the first sprite that does not fit and returns how many were placed
/// up to that point; the caller compares it with the non-empty count.
pub fn pack_sprites(sprites: &mut [UnpackedSprite], width: u32, height: u32) -> Result<usize> {
    sort_for_packing(sprites);
    let mut packer = ScanlinePacker::new(width, height)?;
    let mut placed = 0;
    for sprite in sprites.iter_mut() {
        sprite.placement = None;
        if sprite.empty {
            continue;
        }
        let want = Rect::new(0, 0, sprite.trim.w, sprite.trim.h);
        if !packer.can_pack(&want) {
            return Ok(placed);
        }
        match packer.pack(&want) {
            Some(r) => {
                sprite.placement = Some((r.x, r.y));
                placed += 1;
            }
            None => return Ok(placed),
        }
    }
    Ok(placed)
}
