use std::time::Duration;

use aelos_device::{Dongle, SessionConfig, EXTENSION_TOPIC};
use aelos_frame::DEFAULT_SPEED;
use aelos_transport::{discover, DiscoveryConfig, SerialStream, DEFAULT_IDENTITY};
use clap::{Args, Subcommand};

use crate::exit::{device_error, transport_error, CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod device;
pub mod doctor;
pub mod ports;
pub mod serve;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List attached serial devices and mark the dongle.
    Ports(PortsArgs),
    /// Switch the dongle to a radio channel.
    Channel(ChannelArgs),
    /// Establish the radio link to the robot.
    Connect(ConnectArgs),
    /// Single-servo operations.
    #[command(subcommand)]
    Servo(ServoCommand),
    /// Whole-body servo operations.
    #[command(subcommand)]
    Servos(ServosCommand),
    /// Read a sensor value.
    Sensor(SensorArgs),
    /// Set rigidity for 16 servos.
    Rigidity(RigidityArgs),
    /// Bridge JSON-line host commands on stdin to the robot.
    Serve(ServeArgs),
    /// Run local environment and dongle health checks.
    Doctor(DoctorArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, link: &LinkArgs, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Ports(args) => ports::run(args, link, format),
        Command::Channel(args) => device::run_action(link, device::channel_action(args), format),
        Command::Connect(_) => device::run_action(link, aelos_device::Action::Connect, format),
        Command::Servo(cmd) => device::run_action(link, device::servo_action(cmd), format),
        Command::Servos(cmd) => device::run_action(link, device::servos_action(cmd)?, format),
        Command::Sensor(args) => device::run_action(link, device::sensor_action(args), format),
        Command::Rigidity(args) => {
            device::run_action(link, device::rigidity_action(args)?, format)
        }
        Command::Serve(args) => serve::run(args, link),
        Command::Doctor(args) => doctor::run(args, link, format),
        Command::Version(args) => version::run(args),
    }
}

/// How to reach the dongle. Shared by every subcommand that opens it.
#[derive(Args, Debug, Clone)]
pub struct LinkArgs {
    /// Serial endpoint of the dongle (e.g. /dev/ttyUSB0, COM3). Skips discovery.
    #[arg(long, env = "AELOS_PORT", global = true)]
    pub port: Option<String>,
    /// USB vendor:product identity used to discover the dongle.
    #[arg(long, env = "AELOS_IDENTITY", default_value = DEFAULT_IDENTITY, global = true)]
    pub identity: String,
    /// Serial baud rate.
    #[arg(long, env = "AELOS_BAUD", default_value_t = SerialStream::DEFAULT_BAUD, global = true)]
    pub baud: u32,
    /// Bound on the wait for each response (e.g. 3s, 500ms).
    #[arg(long, env = "AELOS_TIMEOUT", default_value = "3s", global = true)]
    pub timeout: String,
}

impl LinkArgs {
    pub fn discovery_config(&self) -> DiscoveryConfig {
        DiscoveryConfig {
            identity: self.identity.clone(),
            probe_baud: self.baud,
        }
    }

    pub fn session_config(&self) -> CliResult<SessionConfig> {
        Ok(SessionConfig {
            baud: self.baud,
            timeout: parse_duration(&self.timeout)?,
        })
    }
}

/// Resolve the endpoint (explicit or discovered) and open the dongle on it.
pub fn open_dongle(link: &LinkArgs) -> CliResult<(Dongle<SerialStream>, String)> {
    let config = link.session_config()?;
    let endpoint = match &link.port {
        Some(port) => port.clone(),
        None => discover(&link.discovery_config())
            .map_err(|err| transport_error("dongle discovery failed", err))?,
    };
    let dongle = Dongle::open(&endpoint, config)
        .map_err(|err| device_error(&format!("failed to open {endpoint}"), err))?;
    Ok((dongle, endpoint))
}

pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "s")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        _ => Ok(Duration::from_secs(value)),
    }
}

#[derive(Args, Debug, Default)]
pub struct PortsArgs {
    /// Only list candidates matching the dongle identity.
    #[arg(long)]
    pub matching: bool,
}

#[derive(Args, Debug)]
pub struct ChannelArgs {
    /// Radio channel; truncated to its low byte.
    #[arg(allow_negative_numbers = true)]
    pub channel: i64,
}

#[derive(Args, Debug, Default)]
pub struct ConnectArgs {}

#[derive(Subcommand, Debug)]
pub enum ServoCommand {
    /// Read a servo's position (locks the servo afterwards).
    Get { index: u8 },
    /// Move a servo; position is truncated to its low byte.
    Set {
        index: u8,
        #[arg(allow_negative_numbers = true)]
        position: i64,
    },
    /// Lock a servo in place.
    Lock { index: u8 },
    /// Release a servo so it can be moved by hand.
    Unlock { index: u8 },
}

#[derive(Subcommand, Debug)]
pub enum ServosCommand {
    /// Read every servo position (24 raw bytes).
    Get,
    /// Move 16 or 19 servos at once.
    Set {
        /// Comma-separated angles, 16 or 19 of them.
        #[arg(value_delimiter = ',', required = true)]
        angles: Vec<u8>,
        /// Movement speed.
        #[arg(long, default_value_t = DEFAULT_SPEED)]
        speed: u8,
    },
}

#[derive(Args, Debug)]
pub struct SensorArgs {
    /// Sensor input index.
    #[arg(allow_negative_numbers = true)]
    pub index: i16,
    /// Sensor name. Default: the hub's SensorInput ports.
    #[arg(long)]
    pub name: Option<String>,
}

#[derive(Args, Debug)]
pub struct RigidityArgs {
    /// Comma-separated rigidity values, exactly 16.
    #[arg(value_delimiter = ',', required = true)]
    pub values: Vec<u8>,
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Topic this bridge answers to; messages for other topics are skipped.
    #[arg(long, default_value = EXTENSION_TOPIC)]
    pub topic: String,
}

#[derive(Args, Debug, Default)]
pub struct DoctorArgs {}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}
