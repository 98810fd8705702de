use std::time::Duration;

/// Errors that can occur in device operations.
#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] aelos_transport::TransportError),

    /// Frame-level error.
    #[error("frame error: {0}")]
    Frame(#[from] aelos_frame::FrameError),

    /// Fewer response bytes than the opcode dictates arrived in time.
    #[error(
        "response timed out after {timeout:?} ({} of {expected} bytes received)",
        .received.len()
    )]
    Timeout {
        expected: usize,
        received: Vec<u8>,
        timeout: Duration,
    },

    /// A caller-supplied value failed a strict check.
    #[error("malformed input: {0}")]
    MalformedInput(String),

    /// A command named an action outside the dispatch table.
    #[error("unknown action: {0}")]
    UnknownAction(String),
}

pub type Result<T> = std::result::Result<T, DeviceError>;
