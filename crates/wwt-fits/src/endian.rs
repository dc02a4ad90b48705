//! Big-endian sample reads and writes for FITS data units.
//!
//! FITS stores all binary data most-significant byte first. The decoder reads
//! one sample at a time from an arbitrary offset, so these helpers take a slice
//! that starts at the sample and must hold at least its byte width.

/// Read a `u8` from the first byte of the slice.
#[inline]
pub fn read_u8(buf: &[u8]) -> u8 {
    buf[0]
}

/// Read a big-endian `i16` from the first 2 bytes of the slice.
#[inline]
pub fn read_i16_be(buf: &[u8]) -> i16 {
    i16::from_be_bytes([buf[0], buf[1]])
}

/// Read a big-endian `i32` from the first 4 bytes of the slice.
#[inline]
pub fn read_i32_be(buf: &[u8]) -> i32 {
    i32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]])
}

/// Read a big-endian `f32` (IEEE 754) from the first 4 bytes of the slice.
#[inline]
pub fn read_f32_be(buf: &[u8]) -> f32 {
    f32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]])
}

/// Read a big-endian `f64` (IEEE 754) from the first 8 bytes of the slice.
#[inline]
pub fn read_f64_be(buf: &[u8]) -> f64 {
    f64::from_be_bytes([
        buf[0], buf[1], buf[2], buf[3], buf[4], buf[5], buf[6], buf[7],
    ])
}

/// Append an `i16` in big-endian order.
#[inline]
pub fn push_i16_be(out: &mut alloc::vec::Vec<u8>, val: i16) {
    out.extend_from_slice(&val.to_be_bytes());
}

/// Append an `i32` in big-endian order.
#[inline]
pub fn push_i32_be(out: &mut alloc::vec::Vec<u8>, val: i32) {
    out.extend_from_slice(&val.to_be_bytes());
}

/// Append an `f32` in big-endian order.
#[inline]
pub fn push_f32_be(out: &mut alloc::vec::Vec<u8>, val: f32) {
    out.extend_from_slice(&val.to_be_bytes());
}

/// Append an `f64` in big-endian order.
#[inline]
pub fn push_f64_be(out: &mut alloc::vec::Vec<u8>, val: f64) {
    out.extend_from_slice(&val.to_be_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec::Vec;

    #[test]
    fn read_i16_negative() {
        assert_eq!(read_i16_be(&[0xFF, 0xFE]), -2);
        assert_eq!(read_i16_be(&[0x80, 0x00]), i16::MIN);
    }

    #[test]
    fn read_i32_known_pattern() {
        assert_eq!(read_i32_be(&[0x01, 0x02, 0x03, 0x04]), 0x0102_0304);
    }

    #[test]
    fn read_f32_one() {
        assert_eq!(read_f32_be(&[0x3F, 0x80, 0x00, 0x00]), 1.0);
    }

    #[test]
    fn read_f64_negative_two() {
        assert_eq!(read_f64_be(&[0xC0, 0, 0, 0, 0, 0, 0, 0]), -2.0);
    }

    #[test]
    fn read_ignores_trailing_bytes() {
        assert_eq!(read_i16_be(&[0x00, 0x05, 0xFF, 0xFF]), 5);
    }

    #[test]
    fn push_then_read_back() {
        let mut out = Vec::new();
        push_i16_be(&mut out, -300);
        push_i32_be(&mut out, 70_000);
        push_f32_be(&mut out, 2.5);
        push_f64_be(&mut out, -0.125);
        assert_eq!(read_i16_be(&out[0..]), -300);
        assert_eq!(read_i32_be(&out[2..]), 70_000);
        assert_eq!(read_f32_be(&out[6..]), 2.5);
        assert_eq!(read_f64_be(&out[10..]), -0.125);
    }
}
