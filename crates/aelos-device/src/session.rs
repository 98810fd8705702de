use std::io::{ErrorKind, Read, Write};
use std::time::{Duration, Instant};

use aelos_frame::CommandFrame;
use aelos_transport::{ByteStream, SerialStream, TransportError};
use bytes::{Bytes, BytesMut};
use tracing::info;

use crate::error::{DeviceError, Result};
use crate::observer::{TracingObserver, TransactionObserver};

/// Default bound on the wait for a complete response.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3);

const READ_CHUNK_SIZE: usize = 64;

/// Configuration for a device session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Serial baud rate. Default: 9600.
    pub baud: u32,
    /// Bound on the wait for a complete response. Default: 3 s.
    pub timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            baud: SerialStream::DEFAULT_BAUD,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Exclusive owner of the link to the dongle.
///
/// Runs one transaction at a time: `&mut self` keeps a second request from
/// starting while one is in flight. A transaction cannot be cancelled once
/// its frame is written. If it times out, the leftover bytes are dropped by
/// the discard step of the next transaction.
pub struct Session<S: ByteStream> {
    stream: S,
    config: SessionConfig,
    observer: Box<dyn TransactionObserver>,
}

impl<S: ByteStream> Session<S> {
    /// Create a session that logs through `tracing`.
    pub fn new(stream: S, config: SessionConfig) -> Self {
        Self::with_observer(stream, config, Box::new(TracingObserver))
    }

    /// Create a session reporting to an explicit observer.
    pub fn with_observer(
        stream: S,
        config: SessionConfig,
        observer: Box<dyn TransactionObserver>,
    ) -> Self {
        Self {
            stream,
            config,
            observer,
        }
    }

    /// Run one transaction and return the raw response.
    ///
    /// 1. discard unread input,
    /// 2. write the whole frame,
    /// 3. read exactly `frame.response_len()` bytes within the configured bound.
    ///
    /// Frames with no response return an empty buffer after step 2. A short
    /// read fails with [`DeviceError::Timeout`] carrying the bytes that did
    /// arrive; nothing is retried.
    pub fn transact(&mut self, frame: &CommandFrame) -> Result<Bytes> {
        let opcode = frame.opcode();

        self.stream.discard_input()?;
        self.observer.on_discard(opcode);

        self.write_frame(frame)?;
        self.observer.on_send(frame);

        let expected = frame.response_len();
        if expected == 0 {
            return Ok(Bytes::new());
        }

        let received = self.read_bounded(expected)?;
        if received.len() < expected {
            self.observer.on_timeout(opcode, expected, &received);
            return Err(DeviceError::Timeout {
                expected,
                received: received.to_vec(),
                timeout: self.config.timeout,
            });
        }

        self.observer.on_response(opcode, &received);
        Ok(received.freeze())
    }

    fn write_frame(&mut self, frame: &CommandFrame) -> Result<()> {
        self.stream
            .write_all(frame.as_bytes())
            .map_err(TransportError::Io)?;
        self.stream.flush().map_err(TransportError::Io)?;
        Ok(())
    }

    // Stops at `n` bytes so nothing past this response is consumed.
    // A bound too large to add to the clock means no deadline; each read is
    // still limited by the stream's own timeout.
    fn read_bounded(&mut self, n: usize) -> Result<BytesMut> {
        let deadline = Instant::now().checked_add(self.config.timeout);
        let mut buf = BytesMut::with_capacity(n);
        let mut chunk = [0u8; READ_CHUNK_SIZE];

        while buf.len() < n {
            let remaining = match deadline {
                Some(deadline) => deadline.saturating_duration_since(Instant::now()),
                None => self.config.timeout,
            };
            if remaining.is_zero() {
                break;
            }
            self.stream.set_read_timeout(remaining)?;

            let want = (n - buf.len()).min(READ_CHUNK_SIZE);
            match self.stream.read(&mut chunk[..want]) {
                Ok(0) => break,
                Ok(read) => buf.extend_from_slice(&chunk[..read]),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if matches!(err.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock) => {
                    break
                }
                Err(err) => return Err(TransportError::Io(err).into()),
            }
        }

        Ok(buf)
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &S {
        &self.stream
    }
}

impl Session<SerialStream> {
    /// Open `endpoint` with the baud and timeout from `config`.
    pub fn open(endpoint: &str, config: SessionConfig) -> Result<Self> {
        let stream = SerialStream::open(endpoint, config.baud, config.timeout)?;
        info!(endpoint, "session opened");
        Ok(Self::new(stream, config))
    }
}

impl<S: ByteStream> Drop for Session<S> {
    fn drop(&mut self) {
        self.observer.flush();
    }
}

impl<S: ByteStream> std::fmt::Debug for Session<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
