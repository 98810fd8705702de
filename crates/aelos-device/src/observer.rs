use aelos_frame::{CommandFrame, Opcode};
use tracing::{debug, trace, warn};

/// Receives every step of every transaction a [`Session`](crate::Session) runs.
///
/// Passed to the session at construction; `flush` is called once when the
/// session is dropped.
pub trait TransactionObserver: Send {
    /// Stale input was discarded ahead of a transaction.
    fn on_discard(&mut self, _opcode: Opcode) {}

    /// A frame was written.
    fn on_send(&mut self, frame: &CommandFrame);

    /// The full response arrived.
    fn on_response(&mut self, opcode: Opcode, response: &[u8]);

    /// The bounded wait elapsed before the full response arrived.
    fn on_timeout(&mut self, opcode: Opcode, expected: usize, received: &[u8]);

    /// The session is closing.
    fn flush(&mut self) {}
}

/// Default observer: structured `tracing` events.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl TransactionObserver for TracingObserver {
    fn on_discard(&mut self, opcode: Opcode) {
        trace!(%opcode, "discarded stale input");
    }

    fn on_send(&mut self, frame: &CommandFrame) {
        debug!(
            opcode = %frame.opcode(),
            size = frame.wire_size(),
            bytes = ?frame.as_bytes(),
            "frame sent"
        );
    }

    fn on_response(&mut self, opcode: Opcode, response: &[u8]) {
        debug!(%opcode, size = response.len(), bytes = ?response, "response received");
    }

    fn on_timeout(&mut self, opcode: Opcode, expected: usize, received: &[u8]) {
        warn!(
            %opcode,
            expected,
            received = received.len(),
            "response timed out"
        );
    }

    fn flush(&mut self) {
        debug!("session closed");
    }
}
