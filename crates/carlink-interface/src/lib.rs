//! Packet interface for the carlink vehicle link.
//!
//! This is the "just works" layer. Feed it bytes or datagrams from the
//! vehicle, subscribe to typed [`Event`]s, and send commands either
//! fire-and-forget or with acknowledgment and bounded retries.

pub mod ack;
pub mod error;
pub mod events;
pub mod interface;
mod receiver;
pub mod sender;
pub mod ticker;

pub use ack::{AckEngine, AckOutcome, AckPolicy};
pub use error::{InterfaceError, Result};
pub use events::{Event, EventHub};
pub use interface::PacketInterface;
pub use sender::{LinkMode, TransportSender};
pub use ticker::{Ticker, TICK_INTERVAL};

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Lock a mutex, recovering the guard if another thread panicked with it held.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
