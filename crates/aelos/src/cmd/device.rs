use aelos_device::{Action, Reply};
use aelos_frame::{Ack, SENSOR_INPUT, SERVOS_16, SERVOS_19};

use crate::cmd::{
    open_dongle, ChannelArgs, LinkArgs, RigidityArgs, SensorArgs, ServoCommand, ServosCommand,
};
use crate::exit::{device_error, CliError, CliResult, FAILURE, SUCCESS, USAGE};
use crate::output::{print_reply, OutputFormat};

/// Open the dongle, run `action` once and print the result.
///
/// A protocol-level rejection (`FAILED`) prints normally but exits non-zero.
pub fn run_action(link: &LinkArgs, action: Action, format: OutputFormat) -> CliResult<i32> {
    let (mut dongle, endpoint) = open_dongle(link)?;
    let reply = dongle
        .execute(&action)
        .map_err(|err| device_error(&format!("{} failed", action.name()), err))?;

    print_reply(action.name(), &endpoint, &reply, format);

    match reply {
        Reply::Ack(Ack::Failed) => Ok(FAILURE),
        _ => Ok(SUCCESS),
    }
}

pub fn channel_action(args: ChannelArgs) -> Action {
    Action::SetChannel(args.channel)
}

pub fn servo_action(command: ServoCommand) -> Action {
    match command {
        ServoCommand::Get { index } => Action::GetServo(index),
        ServoCommand::Set { index, position } => Action::SetServo { index, position },
        ServoCommand::Lock { index } => Action::LockServo(index),
        ServoCommand::Unlock { index } => Action::UnlockServo(index),
    }
}

pub fn servos_action(command: ServosCommand) -> CliResult<Action> {
    match command {
        ServosCommand::Get => Ok(Action::GetServos),
        ServosCommand::Set { angles, speed } => match angles.len() {
            SERVOS_16 => Ok(Action::SetServos16 {
                angles: to_array(&angles, "angles")?,
                speed,
            }),
            SERVOS_19 => Ok(Action::SetServos19 {
                angles: to_array(&angles, "angles")?,
                speed,
            }),
            n => Err(CliError::new(
                USAGE,
                format!("servos set needs {SERVOS_16} or {SERVOS_19} angles, got {n}"),
            )),
        },
    }
}

pub fn sensor_action(args: SensorArgs) -> Action {
    match args.name {
        Some(name) if name != SENSOR_INPUT => Action::ReadNamedSensor {
            name,
            index: args.index,
        },
        _ => Action::ReadSensor(args.index),
    }
}

pub fn rigidity_action(args: RigidityArgs) -> CliResult<Action> {
    Ok(Action::SetRigidity(to_array(&args.values, "rigidity")?))
}

fn to_array<const N: usize>(values: &[u8], what: &str) -> CliResult<[u8; N]> {
    <[u8; N]>::try_from(values).map_err(|_| {
        CliError::new(
            USAGE,
            format!("{what} needs {N} values, got {}", values.len()),
        )
    })
}
