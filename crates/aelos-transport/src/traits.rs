use std::io::{Read, Write};
use std::time::Duration;

use crate::error::Result;

/// A bidirectional byte stream the dongle protocol runs over.
///
/// `read` must never block indefinitely: once the configured read timeout
/// elapses it returns either `Ok(0)` or an error of kind `TimedOut`.
pub trait ByteStream: Read + Write {
    /// Drop every byte received but not yet read.
    fn discard_input(&mut self) -> Result<()>;

    /// Bound how long a single `read` call may block.
    fn set_read_timeout(&mut self, timeout: Duration) -> Result<()>;
}

impl<T: ByteStream + ?Sized> ByteStream for Box<T> {
    fn discard_input(&mut self) -> Result<()> {
        (**self).discard_input()
    }

    fn set_read_timeout(&mut self, timeout: Duration) -> Result<()> {
        (**self).set_read_timeout(timeout)
    }
}
