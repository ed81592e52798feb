use super::Packer;
use crate::error::{ContentError, Result};
use crate::model::Rect;

const OCCUPIED: u16 = 0x8000;
const RUN_MASK: u16 = 0x7fff;

/// Widest sheet the 15-bit run lengths can describe.
pub const MAX_SHEET_WIDTH: u32 = RUN_MASK as u32;

#[inline]
fn occupied(cell: u16) -> bool {
    cell & OCCUPIED != 0
}

#[inline]
fn run(cell: u16) -> u32 {
    (cell & RUN_MASK) as u32
}

/// First-fit packer over a per-cell run-length occupancy map.
///
/// Each cell holds a 16-bit code: the top bit flags the cell as occupied, the
/// low 15 bits count the cells left in the same-state run of that row,
/// including the cell itself. Scans jump over whole runs instead of stepping
/// one cell at a time.
pub struct ScanlinePacker {
    width: u32,
    height: u32,
    cells: Vec<u16>,
}

impl ScanlinePacker {
    pub fn new(width: u32, height: u32) -> Result<Self> {
        if width == 0 || height == 0 || width > MAX_SHEET_WIDTH {
            return Err(ContentError::InvalidInput(format!(
                "sheet {width}x{height} cannot be packed (width must be 1..={MAX_SHEET_WIDTH})"
            )));
        }
        let mut packer = Self {
            width,
            height,
            cells: vec![0; width as usize * height as usize],
        };
        packer.reset();
        Ok(packer)
    }

    /// Seeds every row as a single empty run spanning the full width.
    pub fn reset(&mut self) {
        let w = self.width as usize;
        for row in self.cells.chunks_exact_mut(w) {
            for (x, cell) in row.iter_mut().enumerate().rev() {
                *cell = (w - x) as u16;
            }
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Occupied flag and run length of one cell.
    pub fn run_at(&self, x: u32, y: u32) -> (bool, u32) {
        let c = self.cell(x, y);
        (occupied(c), run(c))
    }

    #[inline]
    fn cell(&self, x: u32, y: u32) -> u16 {
        self.cells[y as usize * self.width as usize + x as usize]
    }

    /// Checks the rows below `y` for an empty run of at least `w` at column `x`.
    /// On failure returns how far the caller may advance `x`.
    fn fits_below(&self, x: u32, y: u32, w: u32, h: u32) -> std::result::Result<(), u32> {
        for row in (y + 1)..(y + h) {
            let c = self.cell(x, row);
            if occupied(c) || run(c) < w {
                return Err(run(c).max(1));
            }
        }
        Ok(())
    }

    fn find(&self, w: u32, h: u32) -> Option<(u32, u32)> {
        if w == 0 || h == 0 || w > self.width || h > self.height {
            return None;
        }
        for y in 0..=(self.height - h) {
            let mut x = 0;
            while x + w <= self.width {
                let c = self.cell(x, y);
                let len = run(c).max(1);
                if occupied(c) || len < w {
                    x += len;
                    continue;
                }
                match self.fits_below(x, y, w, h) {
                    Ok(()) => return Some((x, y)),
                    Err(skip) => x += skip,
                }
            }
        }
        None
    }

    fn mark(&mut self, x: u32, y: u32, w: u32, h: u32) {
        let width = self.width as usize;
        let (x, w) = (x as usize, w as usize);
        for row in y..(y + h) {
            let line = &mut self.cells[row as usize * width..(row as usize + 1) * width];
            let right = x + w;
            // Right-to-left fill, continuing an occupied run that starts just past the rect.
            let mut counter = match line.get(right) {
                Some(&c) if occupied(c) => run(c),
                _ => 0,
            };
            for cell in line[x..right].iter_mut().rev() {
                counter += 1;
                *cell = OCCUPIED | counter as u16;
            }
            // Cells to the left either join the occupied run or see their empty run end at `x`.
            let mut cx = x;
            if cx > 0 && occupied(line[cx - 1]) {
                while cx > 0 && occupied(line[cx - 1]) {
                    cx -= 1;
                    counter += 1;
                    line[cx] = OCCUPIED | counter as u16;
                }
            } else {
                let mut empty = 0u16;
                while cx > 0 && !occupied(line[cx - 1]) {
                    cx -= 1;
                    empty += 1;
                    line[cx] = empty;
                }
            }
        }
    }
}

impl Packer for ScanlinePacker {
    fn can_pack(&self, rect: &Rect) -> bool {
        rect.w > 0 && rect.h > 0 && rect.w <= self.width && rect.h <= self.height
    }

    fn pack(&mut self, rect: &Rect) -> Option<Rect> {
        let (x, y) = self.find(rect.w, rect.h)?;
        self.mark(x, y, rect.w, rect.h);
        Some(Rect::new(x, y, rect.w, rect.h))
    }
}
