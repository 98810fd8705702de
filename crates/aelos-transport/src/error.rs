/// Errors that can occur in serial transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Failed to open the specified endpoint.
    #[error("failed to open {endpoint}: {source}")]
    Open {
        endpoint: String,
        source: serialport::Error,
    },

    /// The serial driver reported an error (enumeration, buffer control, settings).
    #[error("serial port error: {0}")]
    Serial(#[from] serialport::Error),

    /// An I/O error occurred on the byte stream.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// No candidate endpoint matched the identity and accepted an open probe.
    #[error("no openable endpoint matches {identity} ({matched} matching candidates)")]
    DiscoveryFailed { identity: String, matched: usize },
}

pub type Result<T> = std::result::Result<T, TransportError>;
