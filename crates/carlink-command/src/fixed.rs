//! Scaled fixed-point numbers.
//!
//! A real value travels as `round(value * scale)` in a big-endian `i32`. The
//! scale is fixed per field and is part of the wire contract:
//! [`SCALE_POSITION`] for metric positions, [`SCALE_DEFAULT`] for angles,
//! rates and most configuration, [`SCALE_QUATERNION`] for unit quaternions
//! and [`SCALE_DUTY`] for motor duty/current.

use bytes::{Buf, BufMut};

/// Positions in meters (0.1 mm resolution).
pub const SCALE_POSITION: f64 = 1e4;
/// Motor duty cycle or current.
pub const SCALE_DUTY: f64 = 1e4;
/// Default scale.
pub const SCALE_DEFAULT: f64 = 1e6;
/// Quaternion components.
pub const SCALE_QUATERNION: f64 = 1e8;

/// Encode `value` with `scale`. Out-of-range values saturate; NaN encodes as 0.
pub fn encode_scaled(value: f64, scale: f64) -> [u8; 4] {
    to_fixed(value, scale).to_be_bytes()
}

/// Decode a value written by [`encode_scaled`] with the same scale.
pub fn decode_scaled(bytes: [u8; 4], scale: f64) -> f64 {
    f64::from(i32::from_be_bytes(bytes)) / scale
}

/// Append a scaled value.
pub fn put_scaled<B: BufMut>(dst: &mut B, value: f64, scale: f64) {
    dst.put_i32(to_fixed(value, scale));
}

/// Read a scaled value, or `None` when fewer than four bytes remain.
pub fn get_scaled<B: Buf>(src: &mut B, scale: f64) -> Option<f64> {
    if src.remaining() < 4 {
        return None;
    }
    Some(f64::from(src.get_i32()) / scale)
}

fn to_fixed(value: f64, scale: f64) -> i32 {
    (value * scale).round() as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_within_resolution() {
        for x in [
            0.0, -0.0, 1.0, -1.0, 3.141592, -2.718281, 1234.5678, -0.000001, 2000.0,
        ] {
            let back = decode_scaled(encode_scaled(x, SCALE_DEFAULT), SCALE_DEFAULT);
            assert!((back - x).abs() < 1e-6, "{x} came back as {back}");
        }
    }

    #[test]
    fn rounds_to_nearest() {
        assert_eq!(encode_scaled(0.00004, SCALE_POSITION), [0, 0, 0, 0]);
        assert_eq!(encode_scaled(0.00006, SCALE_POSITION), [0, 0, 0, 1]);
        assert_eq!(encode_scaled(-0.00006, SCALE_POSITION), [0xFF, 0xFF, 0xFF, 0xFF]);
    }

    #[test]
    fn big_endian_layout() {
        assert_eq!(encode_scaled(1.0, SCALE_DEFAULT), 1_000_000i32.to_be_bytes());
        assert_eq!(encode_scaled(-12.5, SCALE_POSITION), (-125_000i32).to_be_bytes());
    }

    #[test]
    fn saturates_and_maps_nan_to_zero() {
        assert_eq!(encode_scaled(1e12, SCALE_DEFAULT), i32::MAX.to_be_bytes());
        assert_eq!(encode_scaled(-1e12, SCALE_DEFAULT), i32::MIN.to_be_bytes());
        assert_eq!(encode_scaled(f64::NAN, SCALE_DEFAULT), [0; 4]);
    }

    #[test]
    fn quaternion_scale_keeps_eight_decimals() {
        let q = 0.70710678;
        assert_eq!(
            decode_scaled(encode_scaled(q, SCALE_QUATERNION), SCALE_QUATERNION),
            q
        );
    }

    #[test]
    fn buffer_helpers() {
        let mut buf = Vec::new();
        put_scaled(&mut buf, 12.3456, SCALE_POSITION);
        put_scaled(&mut buf, -0.5, SCALE_DEFAULT);

        let mut src = buf.as_slice();
        assert_eq!(get_scaled(&mut src, SCALE_POSITION), Some(12.3456));
        assert_eq!(get_scaled(&mut src, SCALE_DEFAULT), Some(-0.5));
        assert_eq!(get_scaled(&mut src, SCALE_DEFAULT), None);
    }

    #[test]
    fn short_buffer_is_not_consumed() {
        let mut src: &[u8] = &[0, 0, 1];
        assert_eq!(get_scaled(&mut src, SCALE_DEFAULT), None);
        assert_eq!(src.len(), 3);
    }
}
