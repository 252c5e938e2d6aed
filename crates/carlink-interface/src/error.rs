use std::time::Duration;

use carlink_command::CommandId;

/// Errors that can occur in packet interface operations.
#[derive(Debug, thiserror::Error)]
pub enum InterfaceError {
    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] carlink_transport::TransportError),

    /// Frame-level error.
    #[error("frame error: {0}")]
    Frame(#[from] carlink_frame::FrameError),

    /// Payload could not be decoded.
    #[error("command error: {0}")]
    Command(#[from] carlink_command::CommandError),

    /// Another acknowledged request is still outstanding.
    #[error("busy: still waiting for acknowledgment of {0}")]
    Busy(CommandId),

    /// No acknowledgment arrived within the retry budget.
    #[error("{command} not acknowledged after {attempts} attempts ({timeout:?} each)")]
    AckTimeout {
        command: CommandId,
        attempts: u32,
        timeout: Duration,
    },

    /// The outstanding request was abandoned before it resolved.
    #[error("request for {0} abandoned")]
    Abandoned(CommandId),

    /// The command is never acknowledged by the vehicle.
    #[error("{0} is not an acknowledged command")]
    NotAcknowledged(CommandId),
}

pub type Result<T> = std::result::Result<T, InterfaceError>;
