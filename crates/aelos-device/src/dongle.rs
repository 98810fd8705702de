use aelos_frame::{
    ack_from_status, encode_connect, encode_get_servos, encode_lock_servo,
    encode_read_named_sensor, encode_read_sensor, encode_read_servo, encode_set_channel,
    encode_set_rigidity, encode_set_servo, encode_set_servos_16, encode_set_servos_19,
    encode_sync, expect_len, last_byte, Ack, Opcode, RIGIDITY_COUNT, SERVOS_16, SERVOS_19,
};
use aelos_transport::{discover, ByteStream, DiscoveryConfig, SerialStream};
use bytes::Bytes;
use tracing::info;

use crate::error::Result;
use crate::session::{Session, SessionConfig};

/// The robot, as reached through the radio dongle.
///
/// One method per protocol operation. None of them is idempotent on the
/// device: even reading a servo position locks that servo.
#[derive(Debug)]
pub struct Dongle<S: ByteStream> {
    session: Session<S>,
}

impl Dongle<SerialStream> {
    /// Open the dongle on a known endpoint.
    pub fn open(endpoint: &str, config: SessionConfig) -> Result<Self> {
        Ok(Self::new(Session::open(endpoint, config)?))
    }

    /// Find the dongle among attached devices and open it.
    pub fn discover(discovery: &DiscoveryConfig, config: SessionConfig) -> Result<Self> {
        let endpoint = discover(discovery)?;
        Self::open(&endpoint, config)
    }
}

impl<S: ByteStream> Dongle<S> {
    pub fn new(session: Session<S>) -> Self {
        Self { session }
    }

    /// Borrow the underlying session.
    pub fn session(&self) -> &Session<S> {
        &self.session
    }

    /// Switch the dongle to radio `channel` (low byte only).
    ///
    /// Sends the sync preamble and waits for its 6-byte answer, then sends the
    /// assignment. The hub's answers carry no status, so success is `Ack::Ok`
    /// whenever both responses arrive in full.
    pub fn set_channel(&mut self, channel: i64) -> Result<Ack> {
        self.session.transact(&encode_sync())?;
        self.session.transact(&encode_set_channel(channel))?;
        info!(channel = channel & 0xFF, "radio channel set");
        Ok(Ack::Ok)
    }

    /// Establish the link to the robot.
    pub fn connect(&mut self) -> Result<Ack> {
        self.session.transact(&encode_connect())?;
        Ok(Ack::Ok)
    }

    /// Move servo `index` to `position` (low byte only). Returns the raw response.
    pub fn set_servo(&mut self, index: u8, position: i64) -> Result<Bytes> {
        self.session.transact(&encode_set_servo(index, position))
    }

    /// Read the position of servo `index`, then lock it.
    ///
    /// The lock is part of the operation: the servo holds its position after
    /// the call returns.
    pub fn get_servo(&mut self, index: u8) -> Result<u8> {
        let response = self.session.transact(&encode_read_servo(index))?;
        let position = last_byte(Opcode::ReadServo, &response)?;
        self.lock_servo(index)?;
        Ok(position)
    }

    /// Release servo `index` so it can be moved by hand.
    ///
    /// On the wire this is the same 0x75 frame as a position read; the hub
    /// unlocks as a side effect of being read. Returns the response's last
    /// byte.
    pub fn unlock_servo(&mut self, index: u8) -> Result<u8> {
        let response = self.session.transact(&encode_read_servo(index))?;
        Ok(last_byte(Opcode::ReadServo, &response)?)
    }

    /// Lock servo `index` in place. The hub does not answer.
    pub fn lock_servo(&mut self, index: u8) -> Result<()> {
        self.session.transact(&encode_lock_servo(index))?;
        Ok(())
    }

    /// Move the first 16 servos at `speed`.
    pub fn set_servos_16(&mut self, angles: &[u8; SERVOS_16], speed: u8) -> Result<Bytes> {
        self.session.transact(&encode_set_servos_16(angles, speed))
    }

    /// Move all 19 servos at `speed`.
    pub fn set_servos_19(&mut self, angles: &[u8; SERVOS_19], speed: u8) -> Result<Bytes> {
        self.session.transact(&encode_set_servos_19(angles, speed))
    }

    /// Read every servo position. Always exactly 24 bytes.
    pub fn get_servos(&mut self) -> Result<Bytes> {
        let response = self.session.transact(&encode_get_servos())?;
        expect_len(Opcode::GetServos, &response)?;
        Ok(response)
    }

    /// Read input port `index` of the `SensorInput` sensor.
    pub fn read_sensor(&mut self, index: i16) -> Result<u8> {
        let response = self.session.transact(&encode_read_sensor(index)?)?;
        Ok(last_byte(Opcode::ReadSensor, &response)?)
    }

    /// Read sensor `name` with `index` as its argument.
    pub fn read_named_sensor(&mut self, name: &str, index: i16) -> Result<u8> {
        let response = self
            .session
            .transact(&encode_read_named_sensor(name, index)?)?;
        Ok(last_byte(Opcode::ReadSensor, &response)?)
    }

    /// Set rigidity for 16 servos. `Ack::Failed` if the hub reports anything
    /// but success.
    pub fn set_rigidity(&mut self, values: &[u8; RIGIDITY_COUNT]) -> Result<Ack> {
        let response = self.session.transact(&encode_set_rigidity(values))?;
        Ok(ack_from_status(Opcode::SetRigidity, &response)?)
    }
}
