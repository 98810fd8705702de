//! Host command dispatch.
//!
//! The host runtime delivers commands either as plain text
//! (`"action:arg,arg"`) or as a structured object (`{"action", "args"}`).
//! Both resolve to an [`Action`] from a closed table; nothing outside that
//! table can be executed.

use std::fmt;

use aelos_frame::{mask_byte, Ack, DEFAULT_SPEED, RIGIDITY_COUNT, SERVOS_16, SERVOS_19};
use aelos_transport::ByteStream;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use crate::dongle::Dongle;
use crate::error::{DeviceError, Result};

/// Topic the host runtime addresses this device under.
pub const EXTENSION_TOPIC: &str = "eim/leju/aelosedupro";

/// A command as delivered by the host runtime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HostCommand {
    /// `"action"` or `"action:arg,arg"`.
    Text(String),
    /// `{"action": "...", "args": [...]}`.
    Structured {
        action: String,
        #[serde(default)]
        args: Vec<Value>,
    },
}

impl HostCommand {
    /// Resolve this command against the dispatch table.
    pub fn to_action(&self) -> Result<Action> {
        match self {
            HostCommand::Text(text) => Action::parse_text(text),
            HostCommand::Structured { action, args } => Action::parse(action, args),
        }
    }
}

/// One inbound host message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostMessage {
    #[serde(default = "default_topic")]
    pub topic: String,
    pub payload: HostCommand,
}

/// Reply published back to the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostReply {
    pub topic: String,
    pub payload: ReplyPayload,
}

/// Reply body: the result, or the error description on failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplyPayload {
    pub ok: bool,
    pub content: String,
}

fn default_topic() -> String {
    EXTENSION_TOPIC.to_string()
}

/// Every operation the host may invoke.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    SetChannel(i64),
    Connect,
    SetServo { index: u8, position: i64 },
    GetServo(u8),
    UnlockServo(u8),
    LockServo(u8),
    SetServos16 { angles: [u8; SERVOS_16], speed: u8 },
    SetServos19 { angles: [u8; SERVOS_19], speed: u8 },
    GetServos,
    ReadSensor(i16),
    ReadNamedSensor { name: String, index: i16 },
    SetRigidity([u8; RIGIDITY_COUNT]),
}

impl Action {
    /// Names accepted by [`Action::parse`].
    pub const NAMES: &'static [&'static str] = &[
        "set_channel",
        "connect",
        "set_servo",
        "get_servo",
        "unlock_servo",
        "lock_servo",
        "set_servos",
        "get_servos",
        "read_sensor",
        "read_named_sensor",
        "set_rigidity",
    ];

    /// Look `name` up in the dispatch table and bind `args`.
    ///
    /// `set_servos` picks the 16- or 19-servo command from the number of
    /// angles; an optional trailing extra value is the speed.
    pub fn parse(name: &str, args: &[Value]) -> Result<Self> {
        let action = match name {
            "set_channel" => Action::SetChannel(int_arg(args, 0, "channel")?),
            "connect" => Action::Connect,
            "set_servo" => Action::SetServo {
                index: index_arg(args, 0)?,
                position: int_arg(args, 1, "position")?,
            },
            "get_servo" => Action::GetServo(index_arg(args, 0)?),
            "unlock_servo" => Action::UnlockServo(index_arg(args, 0)?),
            "lock_servo" => Action::LockServo(index_arg(args, 0)?),
            "set_servos" => parse_set_servos(args)?,
            "get_servos" => Action::GetServos,
            "read_sensor" => Action::ReadSensor(sensor_index_arg(args, 0)?),
            "read_named_sensor" => Action::ReadNamedSensor {
                name: str_arg(args, 0, "name")?,
                index: sensor_index_arg(args, 1)?,
            },
            "set_rigidity" => Action::SetRigidity(byte_array(args, "rigidity")?),
            other => return Err(DeviceError::UnknownAction(other.to_string())),
        };
        Ok(action)
    }

    /// Parse the text form `action` or `action:arg,arg`.
    ///
    /// The text form mirrors what block-based editors send, so a channel here
    /// goes through the strict [`parse_channel`] check instead of masking.
    pub fn parse_text(text: &str) -> Result<Self> {
        let parts: Vec<&str> = text.trim().split(':').collect();
        let (name, raw_args) = match parts.as_slice() {
            [name] => (*name, ""),
            [name, args] => (*name, *args),
            _ => {
                return Err(DeviceError::MalformedInput(format!(
                    "expected `action:args`, got {text:?}"
                )))
            }
        };
        let name = name.trim();

        if name == "set_channel" {
            return Ok(Action::SetChannel(i64::from(parse_channel(raw_args)?)));
        }

        let args: Vec<Value> = raw_args
            .split(',')
            .map(str::trim)
            .filter(|arg| !arg.is_empty())
            .map(|arg| match arg.parse::<i64>() {
                Ok(n) => Value::from(n),
                Err(_) => Value::from(arg),
            })
            .collect();
        Self::parse(name, &args)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Action::SetChannel(_) => "set_channel",
            Action::Connect => "connect",
            Action::SetServo { .. } => "set_servo",
            Action::GetServo(_) => "get_servo",
            Action::UnlockServo(_) => "unlock_servo",
            Action::LockServo(_) => "lock_servo",
            Action::SetServos16 { .. } | Action::SetServos19 { .. } => "set_servos",
            Action::GetServos => "get_servos",
            Action::ReadSensor(_) => "read_sensor",
            Action::ReadNamedSensor { .. } => "read_named_sensor",
            Action::SetRigidity(_) => "set_rigidity",
        }
    }
}

/// Typed result of an executed [`Action`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Ack(Ack),
    Value(u8),
    Raw(Bytes),
    Sent,
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reply::Ack(ack) => write!(f, "{ack}"),
            Reply::Value(value) => write!(f, "{value}"),
            Reply::Raw(bytes) => {
                let hex = bytes
                    .iter()
                    .map(|b| format!("{b:02X}"))
                    .collect::<Vec<_>>()
                    .join(" ");
                f.write_str(&hex)
            }
            Reply::Sent => f.write_str("sent"),
        }
    }
}

impl<S: ByteStream> Dongle<S> {
    /// Run one dispatched action.
    pub fn execute(&mut self, action: &Action) -> Result<Reply> {
        info!(action = action.name(), "executing");
        let reply = match action {
            Action::SetChannel(channel) => Reply::Ack(self.set_channel(*channel)?),
            Action::Connect => Reply::Ack(self.connect()?),
            Action::SetServo { index, position } => Reply::Raw(self.set_servo(*index, *position)?),
            Action::GetServo(index) => Reply::Value(self.get_servo(*index)?),
            Action::UnlockServo(index) => Reply::Value(self.unlock_servo(*index)?),
            Action::LockServo(index) => {
                self.lock_servo(*index)?;
                Reply::Sent
            }
            Action::SetServos16 { angles, speed } => Reply::Raw(self.set_servos_16(angles, *speed)?),
            Action::SetServos19 { angles, speed } => Reply::Raw(self.set_servos_19(angles, *speed)?),
            Action::GetServos => Reply::Raw(self.get_servos()?),
            Action::ReadSensor(index) => Reply::Value(self.read_sensor(*index)?),
            Action::ReadNamedSensor { name, index } => {
                Reply::Value(self.read_named_sensor(name, *index)?)
            }
            Action::SetRigidity(values) => Reply::Ack(self.set_rigidity(values)?),
        };
        Ok(reply)
    }

    /// Handle one host message; failures become the reply content.
    pub fn handle_message(&mut self, message: &HostMessage) -> HostReply {
        let result = message
            .payload
            .to_action()
            .and_then(|action| self.execute(&action));

        let payload = match result {
            Ok(reply) => ReplyPayload {
                ok: true,
                content: reply.to_string(),
            },
            Err(err) => {
                warn!(topic = %message.topic, error = %err, "host command failed");
                ReplyPayload {
                    ok: false,
                    content: err.to_string(),
                }
            }
        };

        HostReply {
            topic: message.topic.clone(),
            payload,
        }
    }
}

/// Validate a radio channel typed by a user: an integer strictly between 0
/// and 255.
pub fn parse_channel(input: &str) -> Result<u8> {
    let value: i64 = input.trim().parse().map_err(|_| {
        DeviceError::MalformedInput(format!("channel is not a number: {input:?}"))
    })?;
    if value <= 0 || value >= 255 {
        return Err(DeviceError::MalformedInput(format!(
            "channel out of range (1-254): {value}"
        )));
    }
    Ok(value as u8)
}

fn arg<'a>(args: &'a [Value], pos: usize, what: &str) -> Result<&'a Value> {
    args.get(pos)
        .ok_or_else(|| DeviceError::MalformedInput(format!("missing argument {pos} ({what})")))
}

fn int_arg(args: &[Value], pos: usize, what: &str) -> Result<i64> {
    let value = arg(args, pos, what)?;
    let parsed = match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| {
        DeviceError::MalformedInput(format!("{what} is not an integer: {value}"))
    })
}

fn str_arg(args: &[Value], pos: usize, what: &str) -> Result<String> {
    match arg(args, pos, what)? {
        Value::String(s) => Ok(s.clone()),
        other => Err(DeviceError::MalformedInput(format!(
            "{what} is not a string: {other}"
        ))),
    }
}

fn index_arg(args: &[Value], pos: usize) -> Result<u8> {
    let value = int_arg(args, pos, "servo index")?;
    u8::try_from(value).map_err(|_| {
        DeviceError::MalformedInput(format!("servo index does not fit a byte: {value}"))
    })
}

fn sensor_index_arg(args: &[Value], pos: usize) -> Result<i16> {
    let value = int_arg(args, pos, "sensor index")?;
    i16::try_from(value).map_err(|_| {
        DeviceError::MalformedInput(format!("sensor index out of range: {value}"))
    })
}

fn byte_array<const N: usize>(args: &[Value], what: &str) -> Result<[u8; N]> {
    if args.len() != N {
        return Err(DeviceError::MalformedInput(format!(
            "{what} needs {N} values, got {}",
            args.len()
        )));
    }
    let mut out = [0u8; N];
    for (pos, slot) in out.iter_mut().enumerate() {
        *slot = mask_byte(int_arg(args, pos, what)?);
    }
    Ok(out)
}

fn parse_set_servos(args: &[Value]) -> Result<Action> {
    // Angles may also come as a single nested array, with speed second.
    let flat: Vec<Value> = match args {
        [Value::Array(angles)] => angles.clone(),
        [Value::Array(angles), speed] => {
            let mut flat = angles.clone();
            flat.push(speed.clone());
            flat
        }
        _ => args.to_vec(),
    };

    let (angles, speed) = match flat.len() {
        SERVOS_16 | SERVOS_19 => (&flat[..], DEFAULT_SPEED),
        n if n == SERVOS_16 + 1 || n == SERVOS_19 + 1 => {
            (&flat[..n - 1], mask_byte(int_arg(&flat, n - 1, "speed")?))
        }
        n => {
            return Err(DeviceError::MalformedInput(format!(
                "set_servos needs {SERVOS_16} or {SERVOS_19} angles, got {n} values"
            )))
        }
    };

    if angles.len() == SERVOS_16 {
        Ok(Action::SetServos16 {
            angles: byte_array(angles, "angles")?,
            speed,
        })
    } else {
        Ok(Action::SetServos19 {
            angles: byte_array(angles, "angles")?,
            speed,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;

    use super::*;
    use crate::session::{Session, SessionConfig};
    use crate::testing::{response, ScriptedStream};

    fn dongle(stream: ScriptedStream) -> Dongle<ScriptedStream> {
        Dongle::new(Session::new(
            stream,
            SessionConfig {
                timeout: Duration::from_millis(50),
                ..SessionConfig::default()
            },
        ))
    }

    #[test]
    fn structured_command_deserializes() {
        let cmd: HostCommand =
            serde_json::from_value(json!({"action": "get_servo", "args": [3]})).unwrap();
        assert_eq!(cmd.to_action().unwrap(), Action::GetServo(3));
    }

    #[test]
    fn text_command_deserializes() {
        let cmd: HostCommand = serde_json::from_value(json!("set_servo:2,90")).unwrap();
        assert_eq!(
            cmd.to_action().unwrap(),
            Action::SetServo {
                index: 2,
                position: 90
            }
        );
    }

    #[test]
    fn text_without_args() {
        assert_eq!(Action::parse_text("connect").unwrap(), Action::Connect);
        assert_eq!(Action::parse_text(" get_servos ").unwrap(), Action::GetServos);
    }

    #[test]
    fn text_with_extra_colon_is_malformed() {
        assert!(matches!(
            Action::parse_text("a:b:c"),
            Err(DeviceError::MalformedInput(_))
        ));
    }

    #[test]
    fn unknown_action_is_rejected() {
        let err = Action::parse("eval", &[json!("__import__('os')")]).unwrap_err();
        assert!(matches!(err, DeviceError::UnknownAction(name) if name == "eval"));
    }

    #[test]
    fn structured_channel_is_masked_text_channel_is_strict() {
        assert_eq!(
            Action::parse("set_channel", &[json!(261)]).unwrap(),
            Action::SetChannel(261)
        );
        assert_eq!(Action::parse_text("set_channel:5").unwrap(), Action::SetChannel(5));
        assert!(Action::parse_text("set_channel:261").is_err());
        assert!(Action::parse_text("set_channel:abc").is_err());
    }

    #[test]
    fn parse_channel_bounds() {
        assert_eq!(parse_channel("1").unwrap(), 1);
        assert_eq!(parse_channel(" 254 ").unwrap(), 254);
        assert!(parse_channel("0").is_err());
        assert!(parse_channel("255").is_err());
        assert!(parse_channel("-3").is_err());
        assert!(matches!(
            parse_channel("five"),
            Err(DeviceError::MalformedInput(_))
        ));
    }

    #[test]
    fn servo_index_must_fit_a_byte() {
        assert!(Action::parse("get_servo", &[json!(255)]).is_ok());
        assert!(Action::parse("get_servo", &[json!(256)]).is_err());
        assert!(Action::parse("get_servo", &[json!(-1)]).is_err());
        assert!(Action::parse("get_servo", &[]).is_err());
        assert!(Action::parse("get_servo", &[json!("x")]).is_err());
    }

    #[test]
    fn set_servos_selects_command_by_angle_count() {
        let sixteen: Vec<Value> = (0..16).map(|i| json!(i)).collect();
        assert!(matches!(
            Action::parse("set_servos", &sixteen).unwrap(),
            Action::SetServos16 { speed: 30, .. }
        ));

        let mut nineteen: Vec<Value> = (0..19).map(|i| json!(i)).collect();
        nineteen.push(json!(45));
        assert!(matches!(
            Action::parse("set_servos", &nineteen).unwrap(),
            Action::SetServos19 { speed: 45, .. }
        ));

        let nested = vec![json!(vec![90; 19]), json!(10)];
        assert!(matches!(
            Action::parse("set_servos", &nested).unwrap(),
            Action::SetServos19 { speed: 10, .. }
        ));

        assert!(Action::parse("set_servos", &[json!(1), json!(2)]).is_err());
    }

    #[test]
    fn rigidity_needs_exactly_sixteen() {
        let values: Vec<Value> = (0..16).map(|_| json!(200)).collect();
        assert_eq!(
            Action::parse("set_rigidity", &values).unwrap(),
            Action::SetRigidity([200; 16])
        );
        assert!(Action::parse("set_rigidity", &values[..15]).is_err());
    }

    #[test]
    fn every_table_name_parses_or_reports_bad_args() {
        for name in Action::NAMES {
            let err = Action::parse(name, &[]);
            if let Err(err) = err {
                assert!(matches!(err, DeviceError::MalformedInput(_)), "{name}: {err}");
            }
        }
    }

    #[test]
    fn execute_get_servo_reports_position() {
        let mut dongle = dongle(ScriptedStream::new().reply(0x75, response(10, 64)));
        let reply = dongle.execute(&Action::GetServo(3)).unwrap();
        assert_eq!(reply, Reply::Value(64));
        assert_eq!(reply.to_string(), "64");
    }

    #[test]
    fn handle_message_wraps_result() {
        let stream = ScriptedStream::new()
            .reply(0xCC, response(6, 0))
            .reply(0x29, response(10, 0));
        let mut dongle = dongle(stream);
        let message: HostMessage = serde_json::from_value(json!({
            "topic": "eim/leju/aelosedupro",
            "payload": {"action": "set_channel", "args": [5]}
        }))
        .unwrap();

        let reply = dongle.handle_message(&message);
        assert_eq!(reply.topic, EXTENSION_TOPIC);
        assert!(reply.payload.ok);
        assert_eq!(reply.payload.content, "OK");
    }

    #[test]
    fn handle_message_reports_timeout_as_content() {
        let mut dongle = dongle(ScriptedStream::new());
        let message: HostMessage =
            serde_json::from_value(json!({"payload": "get_servos"})).unwrap();

        let reply = dongle.handle_message(&message);
        assert_eq!(reply.topic, EXTENSION_TOPIC);
        assert!(!reply.payload.ok);
        assert!(reply.payload.content.contains("timed out"));
    }

    #[test]
    fn raw_reply_renders_as_hex() {
        let reply = Reply::Raw(Bytes::from_static(&[0x76, 0x00, 0x0A]));
        assert_eq!(reply.to_string(), "76 00 0A");
        assert_eq!(Reply::Sent.to_string(), "sent");
    }
}
