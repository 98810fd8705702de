use aelos_transport::available_candidates;

use crate::cmd::{LinkArgs, PortsArgs};
use crate::exit::{transport_error, CliResult, SUCCESS};
use crate::output::{print_candidates, OutputFormat};

pub fn run(args: PortsArgs, link: &LinkArgs, format: OutputFormat) -> CliResult<i32> {
    let mut candidates = available_candidates()
        .map_err(|err| transport_error("serial enumeration failed", err))?;
    candidates.sort();
    if args.matching {
        candidates.retain(|c| c.matches(&link.identity));
    }

    print_candidates(&candidates, &link.identity, format);
    Ok(SUCCESS)
}
