//! Serial byte-stream transport for the Aelos radio dongle.
//!
//! This is the lowest layer of the workspace. It provides:
//! - the [`ByteStream`] seam the transaction engine runs over
//! - [`SerialStream`], the `serialport`-backed implementation
//! - endpoint discovery against the dongle's USB vendor:product identity
//!
//! Everything above this crate talks to a `ByteStream`, never to a port
//! handle directly, so tests can substitute an in-memory stream.

pub mod discovery;
pub mod error;
pub mod serial;
pub mod traits;

pub use discovery::{
    available_candidates, discover, select_endpoint, Candidate, DiscoveryConfig, DEFAULT_IDENTITY,
};
pub use error::{Result, TransportError};
pub use serial::SerialStream;
pub use traits::ByteStream;
