use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{FrameError, Result};
use crate::opcode::Opcode;

/// Frame header: opcode (1) + reserved (4) + length (1) + reserved (2) = 8 bytes.
pub const HEADER_SIZE: usize = 8;

/// Index of the payload length byte inside the header.
pub const LENGTH_INDEX: usize = 5;

/// Largest payload the one-byte length field can describe.
pub const MAX_PAYLOAD: usize = u8::MAX as usize;

/// Channel sync preamble. Sent bare, without a header.
pub const SYNC_FRAME: [u8; 5] = [0xCC; 5];

/// Sensor name the hub exposes for its magnetic input ports.
pub const SENSOR_INPUT: &str = "SensorInput";

/// Servo count of the short batch command.
pub const SERVOS_16: usize = 16;

/// Servo count of the full-body batch command.
pub const SERVOS_19: usize = 19;

/// Number of rigidity values in a rigidity command.
pub const RIGIDITY_COUNT: usize = 16;

/// Default batch movement speed.
pub const DEFAULT_SPEED: u8 = 30;

/// Sensor argument block: one argument follows.
const SENSOR_ARG_COUNT: u8 = 0x01;
/// Sensor argument block: type tag for a signed 16-bit integer.
const SENSOR_ARG_I16: u8 = 0x02;
/// Sensor argument block: bytes after the length field (tag + value).
const SENSOR_ARG_LEN: u8 = 3;

/// Truncate any integer to the low byte, the way the hub expects.
pub fn mask_byte(value: i64) -> u8 {
    (value & 0xFF) as u8
}

/// An encoded outbound frame, tagged with the opcode it carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandFrame {
    opcode: Opcode,
    bytes: Bytes,
}

impl CommandFrame {
    /// Opcode this frame carries.
    pub fn opcode(&self) -> Opcode {
        self.opcode
    }

    /// The exact bytes to put on the wire.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Number of response bytes to read after sending this frame.
    pub fn response_len(&self) -> usize {
        self.opcode.response_len()
    }

    /// The total wire size of this frame.
    pub fn wire_size(&self) -> usize {
        self.bytes.len()
    }

    /// Value of the header length byte, or `None` for the headerless sync preamble.
    pub fn length_field(&self) -> Option<u8> {
        match self.opcode {
            Opcode::Sync => None,
            _ => self.bytes.get(LENGTH_INDEX).copied(),
        }
    }
}

/// Encode an opcode and payload into a headed frame.
///
/// Wire format:
/// ```text
/// ┌────────┬──────────────┬────────┬────────────┬─────────────────┐
/// │ Opcode │ Reserved     │ Length │ Reserved   │ Payload          │
/// │ (1B)   │ 00 00 00 00  │ (1B)   │ 00 00      │ (Length bytes)   │
/// └────────┴──────────────┴────────┴────────────┴─────────────────┘
/// ```
///
/// The length byte is written after the payload is assembled, from the
/// number of bytes that follow the header.
pub fn encode_frame(opcode: Opcode, payload: &[u8]) -> Result<CommandFrame> {
    if payload.len() > MAX_PAYLOAD {
        return Err(FrameError::PayloadTooLarge {
            size: payload.len(),
            max: MAX_PAYLOAD,
        });
    }

    Ok(encode_fixed(opcode, payload))
}

// Callers guarantee `payload.len() <= MAX_PAYLOAD`.
fn encode_fixed(opcode: Opcode, payload: &[u8]) -> CommandFrame {
    let mut dst = BytesMut::with_capacity(HEADER_SIZE + payload.len());
    dst.put_u8(opcode.as_byte());
    dst.put_bytes(0, HEADER_SIZE - 1);
    dst.put_slice(payload);
    dst[LENGTH_INDEX] = (dst.len() - HEADER_SIZE) as u8;

    CommandFrame {
        opcode,
        bytes: dst.freeze(),
    }
}

/// First step of a channel change: the bare sync preamble.
pub fn encode_sync() -> CommandFrame {
    CommandFrame {
        opcode: Opcode::Sync,
        bytes: Bytes::from_static(&SYNC_FRAME),
    }
}

/// Second step of a channel change. `channel` is truncated to its low byte.
pub fn encode_set_channel(channel: i64) -> CommandFrame {
    encode_fixed(Opcode::SetChannel, &[mask_byte(channel)])
}

pub fn encode_connect() -> CommandFrame {
    encode_fixed(Opcode::Connect, &[])
}

/// Move servo `index` to `position` (truncated to its low byte).
pub fn encode_set_servo(index: u8, position: i64) -> CommandFrame {
    encode_fixed(Opcode::SetServo, &[index, mask_byte(position)])
}

/// Read servo `index`. The same frame unlocks the servo.
pub fn encode_read_servo(index: u8) -> CommandFrame {
    encode_fixed(Opcode::ReadServo, &[index])
}

pub fn encode_lock_servo(index: u8) -> CommandFrame {
    encode_fixed(Opcode::LockServo, &[index])
}

pub fn encode_set_servos_16(angles: &[u8; SERVOS_16], speed: u8) -> CommandFrame {
    let mut payload = BytesMut::with_capacity(SERVOS_16 + 1);
    payload.put_slice(angles);
    payload.put_u8(speed);
    encode_fixed(Opcode::SetServos16, &payload)
}

pub fn encode_set_servos_19(angles: &[u8; SERVOS_19], speed: u8) -> CommandFrame {
    let mut payload = BytesMut::with_capacity(SERVOS_19 + 1);
    payload.put_slice(angles);
    payload.put_u8(speed);
    encode_fixed(Opcode::SetServos19, &payload)
}

pub fn encode_get_servos() -> CommandFrame {
    encode_fixed(Opcode::GetServos, &[])
}

pub fn encode_set_rigidity(values: &[u8; RIGIDITY_COUNT]) -> CommandFrame {
    encode_fixed(Opcode::SetRigidity, values)
}

/// Read input port `index` of the hub's `SensorInput` sensor.
pub fn encode_read_sensor(index: i16) -> Result<CommandFrame> {
    encode_read_named_sensor(SENSOR_INPUT, index)
}

/// Read a sensor by name, passing `index` as its single argument.
///
/// Payload layout:
/// ```text
/// name bytes, 0x00, arg_count (0x01), arg_len (0x03), type (0x02 = i16), index (2B LE)
/// ```
pub fn encode_read_named_sensor(name: &str, index: i16) -> Result<CommandFrame> {
    if !name.is_ascii() || name.contains('\0') {
        return Err(FrameError::InvalidName(name.to_string()));
    }

    let mut payload = BytesMut::with_capacity(name.len() + 6);
    payload.extend(name.chars().map(|c| c as u8));
    payload.put_u8(0);
    payload.put_u8(SENSOR_ARG_COUNT);
    payload.put_u8(SENSOR_ARG_LEN);
    payload.put_u8(SENSOR_ARG_I16);
    payload.put_i16_le(index);

    encode_frame(Opcode::ReadSensor, &payload)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(opcode: u8, len: u8) -> Vec<u8> {
        vec![opcode, 0, 0, 0, 0, len, 0, 0]
    }

    #[test]
    fn sync_is_five_cc_bytes_without_header() {
        let frame = encode_sync();
        assert_eq!(frame.as_bytes(), &[0xCC, 0xCC, 0xCC, 0xCC, 0xCC]);
        assert_eq!(frame.length_field(), None);
        assert_eq!(frame.response_len(), 6);
    }

    #[test]
    fn set_channel_masks_to_low_byte() {
        for (input, expected) in [(5i64, 5u8), (255, 255), (256, 0), (261, 5), (-1, 255)] {
            let frame = encode_set_channel(input);
            let mut want = header(0x29, 1);
            want.push(expected);
            assert_eq!(frame.as_bytes(), want.as_slice(), "channel {input}");
        }
    }

    #[test]
    fn set_servo_carries_index_and_position_verbatim() {
        for index in [0u8, 3, 18, 255] {
            for position in [0i64, 90, 255] {
                let frame = encode_set_servo(index, position);
                assert_eq!(&frame.as_bytes()[HEADER_SIZE..], &[index, position as u8]);
                assert_eq!(frame.length_field(), Some(2));
            }
        }
        assert_eq!(&encode_set_servo(1, 300).as_bytes()[HEADER_SIZE..], &[1, 44]);
    }

    #[test]
    fn read_and_lock_share_layout_with_different_opcodes() {
        let read = encode_read_servo(3);
        let lock = encode_lock_servo(3);
        assert_eq!(read.as_bytes(), &[0x75, 0, 0, 0, 0, 1, 0, 0, 3]);
        assert_eq!(lock.as_bytes(), &[0x79, 0, 0, 0, 0, 1, 0, 0, 3]);
        assert_eq!(lock.response_len(), 0);
    }

    #[test]
    fn connect_and_get_servos_are_bare_headers() {
        assert_eq!(encode_connect().as_bytes(), header(0x83, 0).as_slice());
        assert_eq!(encode_get_servos().as_bytes(), header(0xA5, 0).as_slice());
        assert_eq!(encode_get_servos().response_len(), 24);
    }

    #[test]
    fn batch_frames_append_speed() {
        let angles16: [u8; SERVOS_16] = std::array::from_fn(|i| i as u8 + 10);
        let frame = encode_set_servos_16(&angles16, DEFAULT_SPEED);
        assert_eq!(frame.wire_size(), HEADER_SIZE + 17);
        assert_eq!(frame.length_field(), Some(0x11));
        assert_eq!(&frame.as_bytes()[HEADER_SIZE..HEADER_SIZE + 16], &angles16);
        assert_eq!(frame.as_bytes().last(), Some(&30));

        let angles19 = [90u8; SERVOS_19];
        let frame = encode_set_servos_19(&angles19, 50);
        assert_eq!(frame.as_bytes()[0], 0x97);
        assert_eq!(frame.length_field(), Some(0x14));
        assert_eq!(frame.as_bytes().last(), Some(&50));
    }

    #[test]
    fn rigidity_frame_has_sixteen_values() {
        let values = [0x40u8; RIGIDITY_COUNT];
        let frame = encode_set_rigidity(&values);
        assert_eq!(frame.as_bytes()[0], 0x99);
        assert_eq!(frame.length_field(), Some(0x10));
        assert_eq!(&frame.as_bytes()[HEADER_SIZE..], &values);
    }

    #[test]
    fn sensor_length_field_counts_name_through_arguments() {
        for index in [0i16, 1, 255] {
            let frame = encode_read_sensor(index).unwrap();
            let bytes = frame.as_bytes();
            let len = frame.length_field().unwrap() as usize;

            assert_eq!(len, bytes.len() - HEADER_SIZE);
            assert_eq!(len, SENSOR_INPUT.len() + 1 + 5);

            let body = &bytes[HEADER_SIZE..];
            let name_end = body.iter().position(|&b| b == 0).unwrap();
            assert_eq!(&body[..name_end], SENSOR_INPUT.as_bytes());

            let args = &body[name_end + 1..];
            assert_eq!(args[0], SENSOR_ARG_COUNT);
            assert_eq!(args[1] as usize, args.len() - 2);
            assert_eq!(args[2], SENSOR_ARG_I16);
            assert_eq!(i16::from_le_bytes([args[3], args[4]]), index);
        }
    }

    #[test]
    fn named_sensor_length_tracks_name() {
        let frame = encode_read_named_sensor("Gyro", -2).unwrap();
        assert_eq!(frame.length_field(), Some(4 + 1 + 5));
        assert_eq!(&frame.as_bytes()[frame.wire_size() - 2..], &(-2i16).to_le_bytes());
    }

    #[test]
    fn named_sensor_rejects_non_ascii_and_nul() {
        assert!(matches!(
            encode_read_named_sensor("Sensör", 0),
            Err(FrameError::InvalidName(_))
        ));
        assert!(matches!(
            encode_read_named_sensor("a\0b", 0),
            Err(FrameError::InvalidName(_))
        ));
    }

    #[test]
    fn oversized_payload_is_rejected() {
        let payload = vec![0u8; MAX_PAYLOAD + 1];
        assert!(matches!(
            encode_frame(Opcode::ReadSensor, &payload),
            Err(FrameError::PayloadTooLarge { size: 256, max: 255 })
        ));

        let long_name = "x".repeat(MAX_PAYLOAD);
        assert!(encode_read_named_sensor(&long_name, 0).is_err());
    }

    #[test]
    fn encode_frame_matches_fixed_encoders() {
        let generic = encode_frame(Opcode::SetServo, &[4, 120]).unwrap();
        assert_eq!(generic, encode_set_servo(4, 120));
    }
}
