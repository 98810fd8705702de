use crate::opcode::Opcode;

/// Errors that can occur during frame encoding/decoding.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The payload does not fit the one-byte length field.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// A sensor name cannot be carried as a NUL-terminated ASCII string.
    #[error("invalid sensor name {0:?} (must be ASCII without NUL)")]
    InvalidName(String),

    /// A response does not have the length its opcode dictates.
    #[error("{opcode} response has {actual} bytes, expected {expected}")]
    UnexpectedLength {
        opcode: Opcode,
        expected: usize,
        actual: usize,
    },
}

pub type Result<T> = std::result::Result<T, FrameError>;
