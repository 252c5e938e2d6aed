use bytes::{BufMut, Bytes, BytesMut};
use tracing::{debug, trace};

use crate::codec::{END_MARKER, MAX_PAYLOAD_LEN, START_LONG, START_SHORT};
use crate::crc::crc16;

/// Ticks a partial frame may stay idle before it is dropped
/// (500 ms at the nominal 10 ms tick).
pub const DEFAULT_RX_TIMEOUT_TICKS: u32 = 50;

/// Receive state of the frame parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParserState {
    /// Scanning for a start marker.
    Idle,
    /// Long form: waiting for the high length byte.
    AwaitLengthHigh,
    /// Waiting for the (low) length byte.
    AwaitLengthLow,
    /// Collecting payload bytes.
    AccumulatingPayload,
    AwaitCrcHigh,
    AwaitCrcLow,
    /// Waiting for the end marker.
    AwaitEnd,
}

/// Configuration for the frame parser.
#[derive(Debug, Clone)]
pub struct ParserConfig {
    /// Largest accepted payload. Default: 4096 bytes.
    pub max_payload_len: usize,
    /// Inactivity budget in ticks. Default: 50.
    pub rx_timeout_ticks: u32,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            max_payload_len: MAX_PAYLOAD_LEN,
            rx_timeout_ticks: DEFAULT_RX_TIMEOUT_TICKS,
        }
    }
}

/// Parser statistics for monitoring and diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParserStats {
    /// Frames that passed the CRC check and were handed out.
    pub frames: u64,
    /// Complete frames dropped because of a CRC mismatch.
    pub crc_errors: u64,
    /// Frames dropped for a bad length or a bad end marker.
    pub framing_errors: u64,
    /// Partial frames dropped by the inactivity timeout.
    pub timeouts: u64,
}

/// Byte-at-a-time frame recovery.
///
/// Bytes may arrive in any chunking; the result is the same whether a stream
/// is fed one byte at a time or all at once. Malformed input always returns
/// the parser to [`ParserState::Idle`], and a partial frame is discarded once
/// [`tick`](Self::tick) has been called `rx_timeout_ticks` times without new
/// bytes.
#[derive(Debug)]
pub struct FrameParser {
    config: ParserConfig,
    state: ParserState,
    payload_len: usize,
    crc: u16,
    buf: BytesMut,
    timer: u32,
    stats: ParserStats,
}

impl Default for FrameParser {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameParser {
    /// Create a parser with default configuration.
    pub fn new() -> Self {
        Self::with_config(ParserConfig::default())
    }

    /// Create a parser with explicit configuration.
    pub fn with_config(config: ParserConfig) -> Self {
        Self {
            buf: BytesMut::with_capacity(config.max_payload_len.min(MAX_PAYLOAD_LEN)),
            config,
            state: ParserState::Idle,
            payload_len: 0,
            crc: 0,
            timer: 0,
            stats: ParserStats::default(),
        }
    }

    /// Advance the state machine by one byte.
    ///
    /// Returns the payload when this byte completes a valid frame.
    pub fn push_byte(&mut self, byte: u8) -> Option<Bytes> {
        match self.state {
            ParserState::Idle => {
                let next = match byte {
                    START_SHORT => ParserState::AwaitLengthLow,
                    START_LONG => ParserState::AwaitLengthHigh,
                    _ => return None,
                };
                self.payload_len = 0;
                self.buf.clear();
                self.enter(next);
            }
            ParserState::AwaitLengthHigh => {
                self.payload_len = usize::from(byte) << 8;
                self.enter(ParserState::AwaitLengthLow);
            }
            ParserState::AwaitLengthLow => {
                self.payload_len |= usize::from(byte);
                if self.payload_len == 0 || self.payload_len > self.config.max_payload_len {
                    debug!(len = self.payload_len, "rejecting frame length");
                    self.stats.framing_errors += 1;
                    self.reset();
                } else {
                    self.buf.reserve(self.payload_len);
                    self.enter(ParserState::AccumulatingPayload);
                }
            }
            ParserState::AccumulatingPayload => {
                self.buf.put_u8(byte);
                if self.buf.len() == self.payload_len {
                    self.enter(ParserState::AwaitCrcHigh);
                } else {
                    self.arm();
                }
            }
            ParserState::AwaitCrcHigh => {
                self.crc = u16::from(byte) << 8;
                self.enter(ParserState::AwaitCrcLow);
            }
            ParserState::AwaitCrcLow => {
                self.crc |= u16::from(byte);
                self.enter(ParserState::AwaitEnd);
            }
            ParserState::AwaitEnd => {
                self.state = ParserState::Idle;
                if byte != END_MARKER {
                    debug!(byte, "bad end marker, dropping frame");
                    self.stats.framing_errors += 1;
                    return None;
                }
                let computed = crc16(&self.buf);
                if computed != self.crc {
                    debug!(
                        expected = self.crc,
                        computed,
                        len = self.payload_len,
                        "crc mismatch, dropping frame"
                    );
                    self.stats.crc_errors += 1;
                    return None;
                }
                self.stats.frames += 1;
                trace!(len = self.payload_len, "frame received");
                return Some(self.buf.split().freeze());
            }
        }
        None
    }

    /// Feed a chunk of bytes, handing every completed payload to `on_frame`.
    pub fn feed(&mut self, data: &[u8], mut on_frame: impl FnMut(Bytes)) {
        for &byte in data {
            if let Some(payload) = self.push_byte(byte) {
                on_frame(payload);
            }
        }
    }

    /// Feed a chunk of bytes and collect the completed payloads.
    pub fn feed_collect(&mut self, data: &[u8]) -> Vec<Bytes> {
        let mut frames = Vec::new();
        self.feed(data, |payload| frames.push(payload));
        frames
    }

    /// Advance the inactivity timer by one tick.
    ///
    /// Returns `true` when a partial frame was discarded.
    pub fn tick(&mut self) -> bool {
        if self.state == ParserState::Idle {
            return false;
        }
        self.timer = self.timer.saturating_sub(1);
        if self.timer > 0 {
            return false;
        }
        debug!(
            state = ?self.state,
            buffered = self.buf.len(),
            "rx timeout, dropping partial frame"
        );
        self.stats.timeouts += 1;
        self.reset();
        true
    }

    /// Drop any partial frame and return to [`ParserState::Idle`].
    pub fn reset(&mut self) {
        self.state = ParserState::Idle;
        self.payload_len = 0;
        self.timer = 0;
        self.buf.clear();
    }

    /// Current receive state.
    pub fn state(&self) -> ParserState {
        self.state
    }

    /// Counters since construction.
    pub fn stats(&self) -> ParserStats {
        self.stats
    }

    /// Current parser configuration.
    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    fn enter(&mut self, state: ParserState) {
        self.state = state;
        self.arm();
    }

    fn arm(&mut self) {
        self.timer = self.config.rx_timeout_ticks;
    }
}

#[cfg(test)]
mod tests {
    use bytes::BytesMut;

    use super::*;
    use crate::codec::encode_frame;

    fn frame(payload: &[u8]) -> Vec<u8> {
        let mut buf = BytesMut::new();
        encode_frame(payload, &mut buf).unwrap();
        buf.to_vec()
    }

    #[test]
    fn parses_single_frame() {
        let mut parser = FrameParser::new();
        let frames = parser.feed_collect(&frame(b"\x01\x0chello"));

        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].as_ref(), b"\x01\x0chello");
        assert_eq!(parser.state(), ParserState::Idle);
        assert_eq!(parser.stats().frames, 1);
    }

    #[test]
    fn roundtrip_across_length_forms() {
        for len in [1usize, 2, 255, 256, 257, 1000, MAX_PAYLOAD_LEN] {
            let payload: Vec<u8> = (0..len).map(|i| (i * 7 + 3) as u8).collect();
            let mut parser = FrameParser::new();
            let frames = parser.feed_collect(&frame(&payload));
            assert_eq!(frames.len(), 1, "payload of {len} bytes");
            assert_eq!(frames[0].as_ref(), payload.as_slice());
        }
    }

    #[test]
    fn byte_by_byte_matches_one_shot() {
        let mut wire = frame(b"first");
        wire.extend(frame(&[0x11; 300]));
        wire.extend(frame(b"third"));

        let mut bulk = FrameParser::new();
        let all_at_once = bulk.feed_collect(&wire);

        let mut single = FrameParser::new();
        let mut one_by_one = Vec::new();
        for byte in &wire {
            one_by_one.extend(single.feed_collect(std::slice::from_ref(byte)));
        }

        assert_eq!(all_at_once.len(), 3);
        assert_eq!(all_at_once, one_by_one);
    }

    #[test]
    fn corrupted_crc_is_discarded() {
        let good = frame(b"\x01\x09");
        let crc_at = good.len() - 3;
        for offset in [crc_at, crc_at + 1] {
            let mut bad = good.clone();
            bad[offset] ^= 0x40;
            let mut parser = FrameParser::new();
            assert!(parser.feed_collect(&bad).is_empty());
            assert_eq!(parser.stats().crc_errors, 1);
            assert_eq!(parser.state(), ParserState::Idle);
        }
    }

    #[test]
    fn corrupted_payload_is_discarded() {
        let mut bad = frame(b"\x01\x0cpayload");
        bad[4] ^= 0x01;
        let mut parser = FrameParser::new();
        assert!(parser.feed_collect(&bad).is_empty());
    }

    #[test]
    fn garbage_before_frame_is_skipped() {
        let mut wire = vec![0x00, 0xFF, 0x55, 0x17, 0x42];
        wire.extend(frame(b"\x01\x0c"));

        let mut parser = FrameParser::new();
        let frames = parser.feed_collect(&wire);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].as_ref(), b"\x01\x0c");
    }

    #[test]
    fn stray_start_marker_is_rejected_and_resyncs() {
        // Line noise that opens a one-byte short frame, then fails either the
        // CRC or the end marker.
        let cases: [(&[u8], ParserStats); 2] = [
            (
                &[START_SHORT, 0x01, 0xAA, 0x12, 0x34, END_MARKER],
                ParserStats {
                    crc_errors: 1,
                    frames: 1,
                    ..ParserStats::default()
                },
            ),
            (
                &[START_SHORT, 0x01, 0xAA, 0x14, 0xA0, 0x7E],
                ParserStats {
                    framing_errors: 1,
                    frames: 1,
                    ..ParserStats::default()
                },
            ),
        ];
        for (noise, stats) in cases {
            let mut wire = noise.to_vec();
            wire.extend(frame(b"\x01\x0c"));

            let mut parser = FrameParser::new();
            let frames = parser.feed_collect(&wire);
            assert_eq!(frames.len(), 1, "after {noise:02x?}");
            assert_eq!(frames[0].as_ref(), b"\x01\x0c");
            assert_eq!(parser.stats(), stats, "after {noise:02x?}");
        }
    }

    #[test]
    fn stray_marker_before_frame_recovers_after_timeout() {
        for stray in [START_SHORT, START_LONG] {
            let mut wire = vec![stray];
            wire.extend(frame(b"\x01\x0c"));

            // The stray marker misaligns the parser, which swallows the frame.
            let mut parser = FrameParser::new();
            assert!(parser.feed_collect(&wire).is_empty());
            assert_ne!(parser.state(), ParserState::Idle);

            while !parser.tick() {}
            assert_eq!(parser.state(), ParserState::Idle);
            assert_eq!(parser.stats().timeouts, 1);

            let frames = parser.feed_collect(&frame(b"\x01\x09"));
            assert_eq!(frames.len(), 1, "after stray {stray:#04x}");
            assert_eq!(frames[0].as_ref(), b"\x01\x09");
        }
    }

    #[test]
    fn zero_length_resets_and_resyncs() {
        let mut wire = vec![START_SHORT, 0x00];
        wire.extend(frame(b"ok"));

        let mut parser = FrameParser::new();
        let frames = parser.feed_collect(&wire);
        assert_eq!(frames.len(), 1);
        assert_eq!(parser.stats().framing_errors, 1);
    }

    #[test]
    fn oversized_length_is_rejected() {
        let mut parser = FrameParser::with_config(ParserConfig {
            max_payload_len: 8,
            ..ParserConfig::default()
        });
        assert!(parser.feed_collect(&frame(&[1; 9])).is_empty());
        assert_eq!(parser.stats().framing_errors, 1);

        let frames = parser.feed_collect(&frame(&[1; 8]));
        assert_eq!(frames.len(), 1);
    }

    #[test]
    fn bad_end_marker_is_rejected() {
        let mut wire = frame(b"abc");
        let last = wire.len() - 1;
        wire[last] = 0x7E;

        let mut parser = FrameParser::new();
        assert!(parser.feed_collect(&wire).is_empty());
        assert_eq!(parser.stats().framing_errors, 1);
        assert_eq!(parser.state(), ParserState::Idle);
    }

    #[test]
    fn inactivity_timeout_drops_partial_frame() {
        let wire = frame(b"\x01\x0clate");
        let mut parser = FrameParser::new();
        parser.feed_collect(&wire[..4]);
        assert_eq!(parser.state(), ParserState::AccumulatingPayload);

        for _ in 0..DEFAULT_RX_TIMEOUT_TICKS - 1 {
            assert!(!parser.tick());
        }
        assert!(parser.tick());
        assert_eq!(parser.state(), ParserState::Idle);
        assert_eq!(parser.stats().timeouts, 1);

        let frames = parser.feed_collect(&frame(b"\x01\x0cfresh"));
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].as_ref(), b"\x01\x0cfresh");
    }

    #[test]
    fn bytes_rearm_the_timer() {
        let wire = frame(b"slow frame");
        let mut parser = FrameParser::new();
        let mut frames = Vec::new();
        for byte in &wire {
            for _ in 0..DEFAULT_RX_TIMEOUT_TICKS - 1 {
                parser.tick();
            }
            frames.extend(parser.feed_collect(std::slice::from_ref(byte)));
        }
        assert_eq!(frames.len(), 1);
        assert_eq!(parser.stats().timeouts, 0);
    }

    #[test]
    fn tick_while_idle_is_noop() {
        let mut parser = FrameParser::new();
        assert!(!parser.tick());
        assert_eq!(parser.stats(), ParserStats::default());
    }
}
