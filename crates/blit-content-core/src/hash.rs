//! Stable, platform-independent name hashing shared by the sprite lookup table
//! and the layer blob file names.

const FNV_OFFSET: u32 = 0x811c_9dc5;
const FNV_PRIME: u32 = 0x0100_0193;

/// 32-bit FNV-1a over the bytes of `s`.
pub fn fnv1a(s: &str) -> u32 {
    let mut h = FNV_OFFSET;
    for b in s.bytes() {
        h ^= b as u32;
        h = h.wrapping_mul(FNV_PRIME);
    }
    h
}

/// Case-insensitive hash of a name. Path separators are normalized to `/`.
pub fn name_hash(name: &str) -> i32 {
    let norm = name.replace('\\', "/").to_lowercase();
    fnv1a(&norm) as i32
}
