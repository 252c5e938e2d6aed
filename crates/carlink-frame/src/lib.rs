//! CRC16-protected packet framing for the carlink vehicle link.
//!
//! Every payload on a byte stream is framed with:
//! - a start marker selecting the length width (`0x02` short, `0x03` long)
//! - a 1-byte or 2-byte big-endian payload length
//! - a big-endian CRC16 over the payload
//! - an end marker (`0x03`)
//!
//! The [`FrameParser`] recovers payloads from an arbitrary byte stream one
//! byte at a time and never blocks on malformed input.

pub mod codec;
pub mod crc;
pub mod error;
pub mod parser;

#[cfg(feature = "async")]
pub mod tokio_codec;

pub use codec::{
    encode_frame, frame_overhead, END_MARKER, MAX_PAYLOAD_LEN, SHORT_FORM_LIMIT, START_LONG,
    START_SHORT,
};
pub use crc::{crc16, crc16_update};
pub use error::{FrameError, Result};
pub use parser::{FrameParser, ParserConfig, ParserState, ParserStats, DEFAULT_RX_TIMEOUT_TICKS};

#[cfg(feature = "async")]
pub use tokio_codec::PacketCodec;
