//! Host controller for the Aelos humanoid robot.
//!
//! The robot is reached through a USB radio dongle that presents as a serial
//! port. Every operation is one blocking request/response transaction over
//! that port.
//!
//! # Crate Structure
//!
//! - [`transport`]: Serial byte stream and dongle discovery
//! - [`frame`]: Command frame encoding and response decoding
//! - [`device`]: Transaction engine, typed operations, host command dispatch

/// Re-export transport types.
pub mod transport {
    pub use aelos_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use aelos_frame::*;
}

/// Re-export device types.
pub mod device {
    pub use aelos_device::*;
}
