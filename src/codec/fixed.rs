//! Fixed-point sensor encodings shared with the wider telemetry code.
//!
//! Short input decodes as 0.0.

/// Signed 7.8 fixed point, big-endian.
pub fn sp78(bytes: &[u8]) -> f64 {
    match bytes {
        [hi, lo, ..] => f64::from(i16::from_be_bytes([*hi, *lo])) / 256.0,
        _            => 0.0,
    }
}

/// Unsigned 14.2 fixed point, big-endian.
pub fn fpe2(bytes: &[u8]) -> f64 {
    match bytes {
        [hi, lo, ..] => f64::from(u16::from_be_bytes([*hi, *lo])) / 4.0,
        _            => 0.0,
    }
}

/// Signed 16.16 fixed point, little-endian.
pub fn ioft(bytes: &[u8]) -> f64 {
    match bytes {
        [a, b, c, d, ..] => f64::from(i32::from_le_bytes([*a, *b, *c, *d])) / 65536.0,
        _                => 0.0,
    }
}
