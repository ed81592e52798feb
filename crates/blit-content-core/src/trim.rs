use crate::model::Rect;

/// Computes the tight bounding box of pixels with alpha above `threshold`
/// inside `within` of an RGBA8 buffer `width` pixels wide.
///
/// Returns `None` when every pixel in `within` is at or below the threshold.
pub fn compute_trim_rect(pixels: &[u8], width: u32, within: Rect, threshold: u8) -> Option<Rect> {
    let stride = width as usize * 4;
    let alpha = |x: u32, y: u32| pixels[y as usize * stride + x as usize * 4 + 3];
    let row_opaque = |y: u32, x1: u32, x2: u32| (x1..x2).any(|x| alpha(x, y) > threshold);
    let col_opaque = |x: u32, y1: u32, y2: u32| (y1..y2).any(|y| alpha(x, y) > threshold);

    if within.is_empty() {
        return None;
    }
    let (mut x1, mut y1) = (within.x, within.y);
    let (mut x2, mut y2) = (within.right(), within.bottom());
    // top
    while y1 < y2 && !row_opaque(y1, x1, x2) {
        y1 += 1;
    }
    if y1 >= y2 {
        return None;
    }
    // bottom
    while y2 > y1 && !row_opaque(y2 - 1, x1, x2) {
        y2 -= 1;
    }
    // left
    while x1 < x2 && !col_opaque(x1, y1, y2) {
        x1 += 1;
    }
    // right
    while x2 > x1 && !col_opaque(x2 - 1, y1, y2) {
        x2 -= 1;
    }
    Some(Rect::new(x1, y1, x2 - x1, y2 - y1))
}
