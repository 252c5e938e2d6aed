//! Typed command messages for the carlink vehicle link.
//!
//! A payload is `[target/source id][command id][fields...]`. Numeric fields
//! are scaled fixed-point values: `round(value * scale)` stored as a
//! big-endian `i32`, with a scale chosen per field (see [`fixed`]).
//!
//! [`encode_packet`] and [`decode_packet`] convert between [`Packet`] and
//! payload bytes. Unknown command ids decode to `Ok(None)` so that newer
//! firmware does not break older ground stations.

pub mod codec;
pub mod error;
pub mod fixed;
pub mod id;
pub mod types;

pub use codec::{decode_packet, encode_packet, encode_packet_into, Command, Direction, Packet};
pub use error::{CommandError, Result};
pub use fixed::{decode_scaled, encode_scaled};
pub use id::CommandId;
pub use types::{FaultCode, MainConfig, RcMode, RoutePoint, StateReport};
