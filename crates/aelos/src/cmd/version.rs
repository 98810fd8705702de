use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("aelos {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: aelos");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);
    println!(
        "build_target: {}",
        option_env!("AELOS_BUILD_TARGET").unwrap_or("unknown")
    );
    println!("git_hash: {}", option_env!("GIT_HASH").unwrap_or("unknown"));
    println!("dongle_identity: {}", aelos_transport::DEFAULT_IDENTITY);
    println!("default_baud: {}", aelos_transport::SerialStream::DEFAULT_BAUD);
    println!("host_topic: {}", aelos_device::EXTENSION_TOPIC);

    Ok(SUCCESS)
}
