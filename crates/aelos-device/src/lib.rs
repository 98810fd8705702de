//! Request/response transactions and typed operations for the Aelos robot.
//!
//! This is the "just works" layer. Open the dongle, then call one method per
//! protocol operation; each call runs exactly one discard-write-read
//! transaction (two for a channel change) and returns a typed result.

pub mod command;
pub mod dongle;
pub mod error;
pub mod observer;
pub mod session;

#[cfg(test)]
pub(crate) mod testing;

pub use command::{
    parse_channel, Action, HostCommand, HostMessage, HostReply, Reply, ReplyPayload,
    EXTENSION_TOPIC,
};
pub use dongle::Dongle;
pub use error::{DeviceError, Result};
pub use observer::{TracingObserver, TransactionObserver};
pub use session::{Session, SessionConfig, DEFAULT_TIMEOUT};
