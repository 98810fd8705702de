//! In-memory stand-in for the dongle.

use std::collections::{HashMap, VecDeque};
use std::io::{ErrorKind, Read, Write};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use aelos_frame::{CommandFrame, Opcode};
use aelos_transport::ByteStream;

use crate::observer::TransactionObserver;

/// Answers each written frame with the reply scripted for its first byte.
///
/// Reads drain the pending input; an empty input reads as a timeout.
#[derive(Debug, Default)]
pub struct ScriptedStream {
    replies: HashMap<u8, Vec<u8>>,
    pending: VecDeque<u8>,
    pub writes: Vec<Vec<u8>>,
    pub discards: usize,
    pub read_timeouts: Vec<Duration>,
}

impl ScriptedStream {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reply with `bytes` whenever a frame starting with `opcode` is written.
    pub fn reply(mut self, opcode: u8, bytes: impl Into<Vec<u8>>) -> Self {
        self.replies.insert(opcode, bytes.into());
        self
    }

    /// Leave `bytes` unread in the input buffer.
    pub fn stale(mut self, bytes: &[u8]) -> Self {
        self.pending.extend(bytes);
        self
    }
}

impl Read for ScriptedStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        if self.pending.is_empty() {
            return Err(std::io::Error::from(ErrorKind::TimedOut));
        }
        let n = buf.len().min(self.pending.len());
        for slot in buf.iter_mut().take(n) {
            *slot = self.pending.pop_front().unwrap_or_default();
        }
        Ok(n)
    }
}

impl Write for ScriptedStream {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.writes.push(buf.to_vec());
        if let Some(reply) = buf.first().and_then(|op| self.replies.get(op)) {
            self.pending.extend(reply.iter().copied());
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl ByteStream for ScriptedStream {
    fn discard_input(&mut self) -> aelos_transport::Result<()> {
        self.discards += 1;
        self.pending.clear();
        Ok(())
    }

    fn set_read_timeout(&mut self, timeout: Duration) -> aelos_transport::Result<()> {
        self.read_timeouts.push(timeout);
        Ok(())
    }
}

/// Build a response of `len` bytes ending in `last`.
pub fn response(len: usize, last: u8) -> Vec<u8> {
    let mut bytes = vec![0u8; len];
    if let Some(slot) = bytes.last_mut() {
        *slot = last;
    }
    bytes
}

/// Observer events, recorded in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Discard(Opcode),
    Send(Vec<u8>),
    Response(Vec<u8>),
    Timeout(usize, Vec<u8>),
    Flush,
}

/// Observer that appends every event to a shared log.
#[derive(Debug, Clone, Default)]
pub struct RecordingObserver {
    pub events: Arc<Mutex<Vec<Event>>>,
}

impl RecordingObserver {
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    fn push(&self, event: Event) {
        self.events.lock().unwrap().push(event);
    }
}

impl TransactionObserver for RecordingObserver {
    fn on_discard(&mut self, opcode: Opcode) {
        self.push(Event::Discard(opcode));
    }

    fn on_send(&mut self, frame: &CommandFrame) {
        self.push(Event::Send(frame.as_bytes().to_vec()));
    }

    fn on_response(&mut self, _opcode: Opcode, response: &[u8]) {
        self.push(Event::Response(response.to_vec()));
    }

    fn on_timeout(&mut self, _opcode: Opcode, expected: usize, received: &[u8]) {
        self.push(Event::Timeout(expected, received.to_vec()));
    }

    fn flush(&mut self) {
        self.push(Event::Flush);
    }
}
