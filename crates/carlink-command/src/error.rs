use crate::id::CommandId;

/// Errors that can occur while decoding a command payload.
///
/// Unknown command ids are not errors; see [`crate::decode_packet`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    /// The payload is missing the id byte or the command byte.
    #[error("payload too short ({len} bytes, need at least 2)")]
    TooShort { len: usize },

    /// A field ran past the end of the payload.
    #[error("{command} payload truncated (need {needed} more bytes, {available} left)")]
    Truncated {
        command: CommandId,
        needed: usize,
        available: usize,
    },

    /// An enumerated field carries a value this codec does not know.
    #[error("{command}: invalid {field} value {value}")]
    InvalidValue {
        command: CommandId,
        field: &'static str,
        value: u8,
    },
}

pub type Result<T> = std::result::Result<T, CommandError>;
