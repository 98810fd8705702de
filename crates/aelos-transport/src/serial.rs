use std::io::{Read, Write};
use std::time::Duration;

use serialport::{ClearBuffer, SerialPort};
use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::traits::ByteStream;

/// Serial transport to the radio dongle.
///
/// Wraps an opened `serialport` handle. The handle is exclusively owned; it is
/// closed when the stream is dropped.
pub struct SerialStream {
    port: Box<dyn SerialPort>,
    endpoint: String,
}

impl SerialStream {
    /// Baud rate the dongle's USB-serial bridge is configured for.
    pub const DEFAULT_BAUD: u32 = 9600;
    /// Timeout used for the short-lived discovery probe.
    pub const PROBE_TIMEOUT: Duration = Duration::from_millis(100);

    /// Open `endpoint` at `baud`, bounding each read by `timeout`.
    pub fn open(endpoint: &str, baud: u32, timeout: Duration) -> Result<Self> {
        let port = serialport::new(endpoint, baud)
            .timeout(timeout)
            .open()
            .map_err(|source| TransportError::Open {
                endpoint: endpoint.to_string(),
                source,
            })?;
        info!(endpoint, baud, ?timeout, "serial endpoint opened");
        Ok(Self {
            port,
            endpoint: endpoint.to_string(),
        })
    }

    /// Open and immediately close `endpoint` to confirm it accepts `baud`.
    pub fn probe(endpoint: &str, baud: u32) -> Result<()> {
        let stream = Self::open(endpoint, baud, Self::PROBE_TIMEOUT)?;
        debug!(endpoint, "probe succeeded, closing");
        drop(stream);
        Ok(())
    }

    /// Name of the endpoint this stream was opened on.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl Read for SerialStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.port.read(buf)
    }
}

impl Write for SerialStream {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.port.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.port.flush()
    }
}

impl ByteStream for SerialStream {
    fn discard_input(&mut self) -> Result<()> {
        self.port.clear(ClearBuffer::Input).map_err(Into::into)
    }

    fn set_read_timeout(&mut self, timeout: Duration) -> Result<()> {
        self.port.set_timeout(timeout).map_err(Into::into)
    }
}

impl Drop for SerialStream {
    fn drop(&mut self) {
        debug!(endpoint = %self.endpoint, "serial endpoint closed");
    }
}

impl std::fmt::Debug for SerialStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialStream")
            .field("endpoint", &self.endpoint)
            .finish()
    }
}
