use bytes::{BufMut, BytesMut};

use crate::crc::crc16;
use crate::error::{FrameError, Result};

/// Start marker for frames with a 1-byte length.
pub const START_SHORT: u8 = 0x02;

/// Start marker for frames with a 2-byte big-endian length.
pub const START_LONG: u8 = 0x03;

/// End marker closing every frame.
pub const END_MARKER: u8 = 0x03;

/// Payloads shorter than this use the short form.
pub const SHORT_FORM_LIMIT: usize = 256;

/// Receive buffer size of the vehicle firmware and the default parser limit.
pub const MAX_PAYLOAD_LEN: usize = 4096;

/// Bytes added around a payload of `payload_len` bytes.
pub fn frame_overhead(payload_len: usize) -> usize {
    if payload_len < SHORT_FORM_LIMIT {
        5
    } else {
        6
    }
}

/// Encode a payload into the wire format.
///
/// Wire format:
/// ```text
/// ┌────────┬──────────────────┬─────────────┬────────────┬──────┐
/// │ Start  │ Length           │ Payload     │ CRC16      │ End  │
/// │ 0x02   │ 1B               │ (Length B)  │ (2B BE)    │ 0x03 │
/// │ 0x03   │ 2B BE            │             │            │      │
/// └────────┴──────────────────┴─────────────┴────────────┴──────┘
/// ```
pub fn encode_frame(payload: &[u8], dst: &mut BytesMut) -> Result<()> {
    if payload.is_empty() {
        return Err(FrameError::EmptyPayload);
    }
    if payload.len() > usize::from(u16::MAX) {
        return Err(FrameError::PayloadTooLarge {
            size: payload.len(),
            max: usize::from(u16::MAX),
        });
    }

    dst.reserve(frame_overhead(payload.len()) + payload.len());
    if payload.len() < SHORT_FORM_LIMIT {
        dst.put_u8(START_SHORT);
        dst.put_u8(payload.len() as u8);
    } else {
        dst.put_u8(START_LONG);
        dst.put_u16(payload.len() as u16);
    }
    dst.put_slice(payload);
    dst.put_u16(crc16(payload));
    dst.put_u8(END_MARKER);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_form_layout() {
        let mut buf = BytesMut::new();
        encode_frame(&[0x01, 0x0C], &mut buf).unwrap();

        let crc = crc16(&[0x01, 0x0C]).to_be_bytes();
        assert_eq!(
            buf.as_ref(),
            &[START_SHORT, 2, 0x01, 0x0C, crc[0], crc[1], END_MARKER]
        );
    }

    #[test]
    fn long_form_from_256_bytes() {
        let payload = vec![0x5A; 256];
        let mut buf = BytesMut::new();
        encode_frame(&payload, &mut buf).unwrap();

        assert_eq!(buf[0], START_LONG);
        assert_eq!(&buf[1..3], &[0x01, 0x00]);
        assert_eq!(buf.len(), payload.len() + frame_overhead(payload.len()));
        assert_eq!(buf[buf.len() - 1], END_MARKER);
    }

    #[test]
    fn largest_short_form() {
        let payload = vec![0xA5; 255];
        let mut buf = BytesMut::new();
        encode_frame(&payload, &mut buf).unwrap();

        assert_eq!(&buf[..2], &[START_SHORT, 255]);
        assert_eq!(buf.len(), 255 + 5);
    }

    #[test]
    fn rejects_empty_and_oversized() {
        let mut buf = BytesMut::new();
        assert!(matches!(
            encode_frame(&[], &mut buf),
            Err(FrameError::EmptyPayload)
        ));
        assert!(matches!(
            encode_frame(&vec![0; 70_000], &mut buf),
            Err(FrameError::PayloadTooLarge { .. })
        ));
        assert!(buf.is_empty());
    }

    #[test]
    fn appends_after_existing_bytes() {
        let mut buf = BytesMut::new();
        encode_frame(b"one", &mut buf).unwrap();
        encode_frame(b"two", &mut buf).unwrap();
        assert_eq!(buf.len(), 2 * (3 + 5));
    }
}
