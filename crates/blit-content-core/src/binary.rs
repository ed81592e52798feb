//! Little-endian primitives shared by every binary format this crate writes.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Read, Write};

use crate::error::{ContentError, Result};

/// Magic of the sprite lookup file ("RBSP").
pub const SPRITE_LOOKUP_MAGIC: u32 = u32::from_le_bytes(*b"RBSP");
pub const SPRITE_LOOKUP_VERSION: u16 = 1;

/// Magic of the compiled map info file ("RBMP").
pub const MAP_MAGIC: u32 = u32::from_le_bytes(*b"RBMP");
pub const MAP_VERSION: u16 = 1;

/// RGBA color, 8 bits per channel.
pub type Color32 = [u8; 4];

pub trait WriteExt: Write {
    fn write_bool(&mut self, v: bool) -> Result<()> {
        self.write_u8(v as u8)?;
        Ok(())
    }

    /// Writes a 7-bit variable-length byte count followed by UTF-8 bytes.
    fn write_string(&mut self, s: &str) -> Result<()> {
        let mut len = s.len() as u32;
        while len >= 0x80 {
            self.write_u8((len as u8) | 0x80)?;
            len >>= 7;
        }
        self.write_u8(len as u8)?;
        self.write_all(s.as_bytes())?;
        Ok(())
    }

    fn write_color(&mut self, c: Color32) -> Result<()> {
        self.write_all(&c)?;
        Ok(())
    }

    fn write_i32_le(&mut self, v: i32) -> Result<()> {
        self.write_i32::<LittleEndian>(v)?;
        Ok(())
    }

    fn write_f32_le(&mut self, v: f32) -> Result<()> {
        self.write_f32::<LittleEndian>(v)?;
        Ok(())
    }

    /// Counts are stored as `i32`; anything larger is a caller bug in practice.
    fn write_count(&mut self, n: usize) -> Result<()> {
        let n = i32::try_from(n)
            .map_err(|_| ContentError::InvalidInput(format!("count {n} exceeds i32")))?;
        self.write_i32_le(n)
    }
}

impl<W: Write + ?Sized> WriteExt for W {}

pub trait ReadExt: Read {
    fn read_bool(&mut self) -> Result<bool> {
        Ok(self.read_u8()? != 0)
    }

    fn read_string(&mut self) -> Result<String> {
        let mut len: u32 = 0;
        let mut shift = 0;
        loop {
            if shift > 28 {
                return Err(ContentError::Corrupt("string length prefix too long".into()));
            }
            let b = self.read_u8()?;
            len |= ((b & 0x7f) as u32) << shift;
            if b & 0x80 == 0 {
                break;
            }
            shift += 7;
        }
        let mut buf = vec![0u8; len as usize];
        self.read_exact(&mut buf)?;
        String::from_utf8(buf).map_err(|e| ContentError::Corrupt(format!("string is not UTF-8: {e}")))
    }

    fn read_color(&mut self) -> Result<Color32> {
        let mut c = [0u8; 4];
        self.read_exact(&mut c)?;
        Ok(c)
    }

    fn read_i32_le(&mut self) -> Result<i32> {
        Ok(self.read_i32::<LittleEndian>()?)
    }

    fn read_f32_le(&mut self) -> Result<f32> {
        Ok(self.read_f32::<LittleEndian>()?)
    }

    fn read_count(&mut self) -> Result<usize> {
        let n = self.read_i32_le()?;
        usize::try_from(n).map_err(|_| ContentError::Corrupt(format!("negative count {n}")))
    }
}

impl<R: Read + ?Sized> ReadExt for R {}

/// Parses `#RRGGBB` or `#AARRGGBB` (leading `#` optional).
pub fn parse_color(s: &str) -> Option<Color32> {
    let hex = s.trim().trim_start_matches('#');
    let byte = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
    match hex.len() {
        6 => Some([byte(0)?, byte(2)?, byte(4)?, 255]),
        8 => Some([byte(2)?, byte(4)?, byte(6)?, byte(0)?]),
        _ => None,
    }
}
