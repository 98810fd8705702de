//! Interpreting hub responses.
//!
//! Responses carry no length or type information of their own; the caller
//! passes the opcode that was sent and the decoder checks the length against
//! [`Opcode::response_len`].

use std::fmt;

use crate::error::{FrameError, Result};
use crate::opcode::Opcode;

/// Status byte the hub uses to report success in acknowledged commands.
pub const STATUS_SUCCESS: u8 = 0x01;

/// Outcome token of commands answered with a status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ack {
    Ok,
    Failed,
}

impl Ack {
    pub fn is_ok(self) -> bool {
        matches!(self, Ack::Ok)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Ack::Ok => "OK",
            Ack::Failed => "FAILED",
        }
    }
}

impl fmt::Display for Ack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Check that `response` has exactly the length `opcode` dictates.
pub fn expect_len(opcode: Opcode, response: &[u8]) -> Result<()> {
    let expected = opcode.response_len();
    if response.len() != expected {
        return Err(FrameError::UnexpectedLength {
            opcode,
            expected,
            actual: response.len(),
        });
    }
    Ok(())
}

/// The result byte of a response: its last byte.
pub fn last_byte(opcode: Opcode, response: &[u8]) -> Result<u8> {
    expect_len(opcode, response)?;
    response
        .last()
        .copied()
        .ok_or(FrameError::UnexpectedLength {
            opcode,
            expected: opcode.response_len(),
            actual: 0,
        })
}

/// `Ack::Ok` iff the last byte equals [`STATUS_SUCCESS`].
///
/// A mismatching status is an outcome, not an error.
pub fn ack_from_status(opcode: Opcode, response: &[u8]) -> Result<Ack> {
    let status = last_byte(opcode, response)?;
    Ok(if status == STATUS_SUCCESS {
        Ack::Ok
    } else {
        Ack::Failed
    })
}
