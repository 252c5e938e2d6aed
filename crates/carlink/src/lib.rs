//! Ground-station link for RC cars and multirotors.
//!
//! carlink turns a serial-like byte stream or a UDP datagram path into
//! integrity-checked, typed command messages, and offers acknowledged
//! delivery with bounded retries on top.
//!
//! # Crate Structure
//!
//! - [`transport`]: byte sinks and the direct-mode UDP endpoint
//! - [`frame`]: CRC16 framing and the resynchronizing frame parser
//! - [`command`]: command ids, scaled fixed-point fields, message codec
//! - [`interface`]: the packet interface, events and the ack/retry engine

/// Re-export transport types.
pub mod transport {
    pub use carlink_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use carlink_frame::*;
}

/// Re-export command types.
pub mod command {
    pub use carlink_command::*;
}

/// Re-export packet interface types.
pub mod interface {
    pub use carlink_interface::*;
}
