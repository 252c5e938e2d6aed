use std::collections::VecDeque;

use bytes::{Buf, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::codec::encode_frame;
use crate::error::FrameError;
use crate::parser::{FrameParser, ParserConfig};

/// `tokio_util` codec over the carlink frame format.
///
/// Decoding drives a [`FrameParser`], so resynchronization and CRC checks
/// behave exactly as on the blocking path. Inactivity timeouts are left to
/// the owner: call [`parser_mut`](Self::parser_mut)`().tick()` from an
/// interval.
#[derive(Debug, Default)]
pub struct PacketCodec {
    parser: FrameParser,
    ready: VecDeque<Bytes>,
}

impl PacketCodec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ParserConfig) -> Self {
        Self {
            parser: FrameParser::with_config(config),
            ready: VecDeque::new(),
        }
    }

    pub fn parser(&self) -> &FrameParser {
        &self.parser
    }

    pub fn parser_mut(&mut self) -> &mut FrameParser {
        &mut self.parser
    }
}

impl Decoder for PacketCodec {
    type Item = Bytes;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(payload) = self.ready.pop_front() {
            return Ok(Some(payload));
        }

        let ready = &mut self.ready;
        self.parser.feed(src, |payload| ready.push_back(payload));
        let consumed = src.len();
        src.advance(consumed);

        Ok(self.ready.pop_front())
    }
}

impl Encoder<Bytes> for PacketCodec {
    type Error = FrameError;

    fn encode(&mut self, item: Bytes, dst: &mut BytesMut) -> Result<(), Self::Error> {
        encode_frame(&item, dst)
    }
}

impl<'a> Encoder<&'a [u8]> for PacketCodec {
    type Error = FrameError;

    fn encode(&mut self, item: &'a [u8], dst: &mut BytesMut) -> Result<(), Self::Error> {
        encode_frame(item, dst)
    }
}
