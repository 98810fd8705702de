use std::fmt;
use std::io;

use aelos_device::DeviceError;
use aelos_frame::FrameError;
use aelos_transport::TransportError;

// Exit code constants aligned with sysexits/timeout(1) conventions.
pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const HEALTH_CHECK_FAILED: i32 = 30;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        io::ErrorKind::NotFound | io::ErrorKind::BrokenPipe => TRANSPORT_ERROR,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    match err {
        TransportError::Io(source) => io_error(context, source),
        other => CliError::new(TRANSPORT_ERROR, format!("{context}: {other}")),
    }
}

pub fn frame_error(context: &str, err: FrameError) -> CliError {
    match err {
        FrameError::PayloadTooLarge { .. } | FrameError::InvalidName(_) => {
            CliError::new(USAGE, format!("{context}: {err}"))
        }
        FrameError::UnexpectedLength { .. } => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
    }
}

pub fn device_error(context: &str, err: DeviceError) -> CliError {
    match err {
        DeviceError::Transport(err) => transport_error(context, err),
        DeviceError::Frame(err) => frame_error(context, err),
        DeviceError::Timeout { .. } => CliError::new(TIMEOUT, format!("{context}: {err}")),
        DeviceError::MalformedInput(_) | DeviceError::UnknownAction(_) => {
            CliError::new(USAGE, format!("{context}: {err}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn discovery_failure_is_transport_error() {
        let err = DeviceError::Transport(TransportError::DiscoveryFailed {
            identity: "1A86:7523".to_string(),
            matched: 0,
        });
        assert_eq!(device_error("open failed", err).code, TRANSPORT_ERROR);
    }

    #[test]
    fn timeout_maps_to_124() {
        let err = DeviceError::Timeout {
            expected: 24,
            received: vec![1, 2],
            timeout: Duration::from_secs(3),
        };
        let cli = device_error("get_servos failed", err);
        assert_eq!(cli.code, TIMEOUT);
        assert!(cli.message.contains("2 of 24 bytes"));
    }

    #[test]
    fn malformed_input_is_usage() {
        let err = DeviceError::MalformedInput("channel is not a number".to_string());
        assert_eq!(device_error("parse failed", err).code, USAGE);
    }

    #[test]
    fn permission_denied_io_maps_to_50() {
        let err = io::Error::from(io::ErrorKind::PermissionDenied);
        assert_eq!(io_error("open", err).code, PERMISSION_DENIED);
    }
}
