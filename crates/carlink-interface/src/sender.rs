use std::fmt;
use std::net::SocketAddr;

use bytes::BytesMut;
use carlink_frame::{encode_frame, FrameError, MAX_PAYLOAD_LEN};
use carlink_transport::{ByteSink, TransportError, UdpEndpoint};
use tracing::{debug, info, trace};

use crate::error::Result;

/// How outbound payloads leave the interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkMode {
    /// Payloads are framed and handed to the byte sink.
    Framed,
    /// Payloads are sent unframed, one datagram each, to this address.
    Direct(SocketAddr),
}

/// Routes encoded payloads to the active transport.
///
/// Direct mode is active exactly while a UDP endpoint is attached; otherwise
/// payloads are framed for the byte sink.
pub struct TransportSender {
    sink: Option<Box<dyn ByteSink>>,
    udp: Option<UdpEndpoint>,
    max_payload_len: usize,
    buf: BytesMut,
}

impl Default for TransportSender {
    fn default() -> Self {
        Self::new(MAX_PAYLOAD_LEN)
    }
}

impl TransportSender {
    pub fn new(max_payload_len: usize) -> Self {
        Self {
            sink: None,
            udp: None,
            max_payload_len,
            buf: BytesMut::with_capacity(max_payload_len + 6),
        }
    }

    /// Register the sink receiving framed bytes, replacing any previous one.
    pub fn set_sink(&mut self, sink: Box<dyn ByteSink>) {
        self.sink = Some(sink);
    }

    pub fn clear_sink(&mut self) -> Option<Box<dyn ByteSink>> {
        self.sink.take()
    }

    /// Switch to direct mode through `endpoint`, replacing any previous one.
    pub fn attach_udp(&mut self, endpoint: UdpEndpoint) {
        info!(remote = %endpoint.remote_addr(), "direct mode enabled");
        self.udp = Some(endpoint);
    }

    /// Return to framed mode, handing back the sending endpoint.
    ///
    /// The socket closes once the returned endpoint and every clone of it
    /// are dropped.
    pub fn detach_udp(&mut self) -> Option<UdpEndpoint> {
        let endpoint = self.udp.take()?;
        info!(remote = %endpoint.remote_addr(), "direct mode disabled");
        Some(endpoint)
    }

    pub fn is_udp_connected(&self) -> bool {
        self.udp.is_some()
    }

    pub fn mode(&self) -> LinkMode {
        match &self.udp {
            Some(endpoint) => LinkMode::Direct(endpoint.remote_addr()),
            None => LinkMode::Framed,
        }
    }

    /// Send one encoded payload through the active transport.
    pub fn send_payload(&mut self, payload: &[u8]) -> Result<()> {
        if payload.len() > self.max_payload_len {
            return Err(FrameError::PayloadTooLarge {
                size: payload.len(),
                max: self.max_payload_len,
            }
            .into());
        }

        if let Some(endpoint) = &self.udp {
            endpoint.send_datagram(payload)?;
            return Ok(());
        }

        let sink = self.sink.as_mut().ok_or(TransportError::NoSink)?;
        self.buf.clear();
        encode_frame(payload, &mut self.buf)?;
        trace!(payload = payload.len(), wire = self.buf.len(), "sending frame");
        sink.send_bytes(&self.buf).inspect_err(|err| {
            debug!(error = %err, "byte sink rejected frame");
        })?;
        Ok(())
    }
}

impl fmt::Debug for TransportSender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportSender")
            .field("mode", &self.mode())
            .field("has_sink", &self.sink.is_some())
            .field("max_payload_len", &self.max_payload_len)
            .finish()
    }
}
