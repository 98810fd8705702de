//! Opcodes understood by the servo hub.
//!
//! The opcode is the first byte of every outbound frame and alone determines
//! how many bytes the hub answers with.

use std::fmt;

/// First byte of an outbound frame.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    /// Channel sync preamble (sent as five repeated bytes, no header).
    Sync = 0xCC,
    /// Assign the radio channel.
    SetChannel = 0x29,
    /// Establish the link to the robot.
    Connect = 0x83,
    /// Move one servo.
    SetServo = 0x76,
    /// Read one servo's position. Also used to unlock a servo.
    ReadServo = 0x75,
    /// Lock one servo in place. Not answered.
    LockServo = 0x79,
    /// Move 16 servos at once.
    SetServos16 = 0x92,
    /// Move 19 servos at once.
    SetServos19 = 0x97,
    /// Read every servo position.
    GetServos = 0xA5,
    /// Read a named sensor value.
    ReadSensor = 0x98,
    /// Set per-servo rigidity for 16 servos.
    SetRigidity = 0x99,
}

impl Opcode {
    /// Wire value of this opcode.
    pub fn as_byte(self) -> u8 {
        self as u8
    }

    /// Number of response bytes the hub sends for this opcode.
    ///
    /// Zero means the command is fire-and-forget.
    pub fn response_len(self) -> usize {
        match self {
            Opcode::Sync => 6,
            Opcode::SetChannel => 10,
            Opcode::Connect => 9,
            Opcode::SetServo => 9,
            Opcode::ReadServo => 10,
            Opcode::LockServo => 0,
            Opcode::SetServos16 => 9,
            Opcode::SetServos19 => 9,
            Opcode::GetServos => 24,
            Opcode::ReadSensor => 13,
            Opcode::SetRigidity => 9,
        }
    }

    /// Short lowercase name for logs.
    pub fn name(self) -> &'static str {
        match self {
            Opcode::Sync => "sync",
            Opcode::SetChannel => "set_channel",
            Opcode::Connect => "connect",
            Opcode::SetServo => "set_servo",
            Opcode::ReadServo => "read_servo",
            Opcode::LockServo => "lock_servo",
            Opcode::SetServos16 => "set_servos_16",
            Opcode::SetServos19 => "set_servos_19",
            Opcode::GetServos => "get_servos",
            Opcode::ReadSensor => "read_sensor",
            Opcode::SetRigidity => "set_rigidity",
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (0x{:02X})", self.name(), self.as_byte())
    }
}
