//! Little-endian byte conversion for container fields.
//!
//! Every multi-byte integer and float in a ZISRAW container is stored
//! least-significant byte first. Segment structures are decoded one field at
//! a time from byte slices with these helpers.

/// Read a little-endian `i32` from the first 4 bytes of the slice.
#[inline]
pub fn read_i32_le(buf: &[u8]) -> i32 {
    i32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]])
}

/// Read a little-endian `i64` from the first 8 bytes of the slice.
#[inline]
pub fn read_i64_le(buf: &[u8]) -> i64 {
    i64::from_le_bytes([
        buf[0], buf[1], buf[2], buf[3], buf[4], buf[5], buf[6], buf[7],
    ])
}

/// Read a little-endian `f32` (IEEE 754) from the first 4 bytes of the slice.
#[inline]
pub fn read_f32_le(buf: &[u8]) -> f32 {
    f32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]])
}

/// Write an `i32` in little-endian format into the first 4 bytes of the slice.
#[inline]
pub fn write_i32_le(buf: &mut [u8], val: i32) {
    buf[..4].copy_from_slice(&val.to_le_bytes());
}

/// Write an `i64` in little-endian format into the first 8 bytes of the slice.
#[inline]
pub fn write_i64_le(buf: &mut [u8], val: i64) {
    buf[..8].copy_from_slice(&val.to_le_bytes());
}

/// Write an `f32` in little-endian format into the first 4 bytes of the slice.
#[inline]
pub fn write_f32_le(buf: &mut [u8], val: f32) {
    buf[..4].copy_from_slice(&val.to_le_bytes());
}

/// Returns the bytes of a fixed-size, NUL-padded ASCII field up to the first NUL.
pub fn trim_nul(field: &[u8]) -> &[u8] {
    match field.iter().position(|&b| b == 0) {
        Some(end) => &field[..end],
        None => field,
    }
}
