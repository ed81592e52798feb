use crate::model::{Rect, UnpackedSprite};

/// Copy the rows of `src_rect` (within an RGBA8 image `src_w` pixels wide) that
/// fall inside a horizontal band of the canvas.
///
/// - `band` holds canvas rows `band_y..band_y + band.len() / (canvas_w * 4)`
/// - `(dx, dy)`: canvas top-left of the copied rectangle
pub fn blit_rows(
    src: &[u8],
    src_w: u32,
    src_rect: Rect,
    band: &mut [u8],
    canvas_w: u32,
    band_y: u32,
    dx: u32,
    dy: u32,
) {
    let canvas_stride = canvas_w as usize * 4;
    let src_stride = src_w as usize * 4;
    let band_rows = (band.len() / canvas_stride) as u32;
    let first = dy.max(band_y);
    let last = (dy + src_rect.h).min(band_y + band_rows);
    if first >= last || dx >= canvas_w {
        return;
    }
    let copy_w = src_rect.w.min(canvas_w - dx) as usize * 4;
    for y in first..last {
        let sy = (src_rect.y + (y - dy)) as usize;
        let s = sy * src_stride + src_rect.x as usize * 4;
        let d = (y - band_y) as usize * canvas_stride + dx as usize * 4;
        band[d..d + copy_w].copy_from_slice(&src[s..s + copy_w]);
    }
}

/// Draws every placed sprite's trimmed pixels that overlap the band.
pub fn draw_band(sprites: &[UnpackedSprite], band: &mut [u8], canvas_w: u32, band_y: u32) {
    for sprite in sprites {
        if let Some((x, y)) = sprite.placement {
            blit_rows(
                &sprite.pixels,
                sprite.width,
                sprite.trim,
                band,
                canvas_w,
                band_y,
                x,
                y,
            );
        }
    }
}
