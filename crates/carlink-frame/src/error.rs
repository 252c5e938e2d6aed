/// Errors that can occur during frame encoding.
///
/// Inbound framing problems are not errors: the parser discards the frame
/// and resynchronizes.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The payload exceeds the configured maximum size.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// Empty payloads cannot be framed (a zero length is rejected on receive).
    #[error("empty payload")]
    EmptyPayload,

    /// An I/O error occurred while reading or writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, FrameError>;
