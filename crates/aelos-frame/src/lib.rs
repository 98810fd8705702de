//! Fixed-layout command frames for the Aelos servo/sensor hub.
//!
//! Every command except the channel sync preamble is framed as:
//! - 1 opcode byte
//! - 7 header bytes, of which byte 5 holds the payload length
//! - the operation-specific payload
//!
//! Responses are not self-describing: their length is fixed by the opcode
//! that was sent, and the interesting value is usually the last byte.

pub mod codec;
pub mod error;
pub mod opcode;
pub mod response;

pub use codec::{
    encode_connect, encode_frame, encode_get_servos, encode_lock_servo, encode_read_named_sensor,
    encode_read_sensor, encode_read_servo, encode_set_channel, encode_set_rigidity,
    encode_set_servo, encode_set_servos_16, encode_set_servos_19, encode_sync, mask_byte,
    CommandFrame, DEFAULT_SPEED, HEADER_SIZE, LENGTH_INDEX, MAX_PAYLOAD, RIGIDITY_COUNT,
    SENSOR_INPUT, SERVOS_16, SERVOS_19, SYNC_FRAME,
};
pub use error::{FrameError, Result};
pub use opcode::Opcode;
pub use response::{ack_from_status, expect_len, last_byte, Ack, STATUS_SUCCESS};
