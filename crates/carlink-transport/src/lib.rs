//! Transport plumbing for the carlink vehicle link.
//!
//! Two ways of getting bytes to a vehicle controller:
//! - a byte stream (serial port, serial-to-TCP bridge) fed through a [`ByteSink`]
//! - a UDP datagram endpoint ([`UdpEndpoint`]) for direct, unframed delivery
//!
//! This is the lowest layer of carlink. Physical drivers stay outside; the
//! layers above only ever see "bytes to send" and "bytes arrived".

pub mod error;
pub mod traits;
pub mod udp;

pub use error::{Result, TransportError};
pub use traits::{ByteSink, FnSink, StreamSink};
pub use udp::UdpEndpoint;
