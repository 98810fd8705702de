use aelos_transport::{available_candidates, select_endpoint, Candidate, SerialStream};
use serde::Serialize;

use crate::cmd::{DoctorArgs, LinkArgs};
use crate::exit::{CliResult, HEALTH_CHECK_FAILED, SUCCESS};
use crate::output::OutputFormat;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
enum CheckStatus {
    Pass,
    Fail,
    Warn,
    Info,
    Skip,
}

#[derive(Debug, Serialize)]
struct CheckResult {
    name: String,
    status: CheckStatus,
    detail: String,
}

impl CheckResult {
    fn new(name: &str, status: CheckStatus, detail: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            status,
            detail: detail.into(),
        }
    }
}

#[derive(Debug, Serialize)]
struct DoctorOutput {
    identity: String,
    checks: Vec<CheckResult>,
    overall: &'static str,
}

pub fn run(_args: DoctorArgs, link: &LinkArgs, format: OutputFormat) -> CliResult<i32> {
    let mut checks = vec![link_config_check(link)];

    match available_candidates() {
        Ok(candidates) => {
            checks.push(CheckResult::new(
                "serial_enumeration",
                CheckStatus::Pass,
                format!("{} serial device(s) attached", candidates.len()),
            ));
            checks.extend(dongle_checks(candidates, link));
        }
        Err(err) => {
            checks.push(CheckResult::new(
                "serial_enumeration",
                CheckStatus::Fail,
                format!("could not list serial devices: {err}"),
            ));
            checks.push(CheckResult::new(
                "dongle_present",
                CheckStatus::Skip,
                "serial enumeration unavailable",
            ));
        }
    }

    checks.push(compiled_features_check());

    let has_fail = checks.iter().any(|c| c.status == CheckStatus::Fail);
    let overall = if has_fail { "fail" } else { "pass" };

    let output = DoctorOutput {
        identity: link.identity.clone(),
        checks,
        overall,
    };

    print_doctor(&output, format);

    if has_fail {
        Ok(HEALTH_CHECK_FAILED)
    } else {
        Ok(SUCCESS)
    }
}

fn link_config_check(link: &LinkArgs) -> CheckResult {
    match link.session_config() {
        Ok(config) => CheckResult::new(
            "link_config",
            CheckStatus::Info,
            format!("baud {}, response timeout {:?}", config.baud, config.timeout),
        ),
        Err(err) => CheckResult::new("link_config", CheckStatus::Fail, err.message),
    }
}

fn dongle_checks(candidates: Vec<Candidate>, link: &LinkArgs) -> Vec<CheckResult> {
    let matched = candidates
        .iter()
        .filter(|c| c.matches(&link.identity))
        .count();

    let present = match matched {
        0 => CheckResult::new(
            "dongle_present",
            CheckStatus::Warn,
            format!("no device matches {}", link.identity),
        ),
        1 => CheckResult::new("dongle_present", CheckStatus::Pass, "one matching device"),
        n => CheckResult::new(
            "dongle_present",
            CheckStatus::Warn,
            format!("{n} matching devices; the first in endpoint order is used"),
        ),
    };

    if matched == 0 {
        return vec![
            present,
            CheckResult::new("dongle_open", CheckStatus::Skip, "no candidate to probe"),
        ];
    }

    let opened = match select_endpoint(candidates, &link.identity, |endpoint| {
        SerialStream::probe(endpoint, link.baud)
    }) {
        Ok(endpoint) => CheckResult::new(
            "dongle_open",
            CheckStatus::Pass,
            format!("{endpoint} opened at {} baud", link.baud),
        ),
        Err(err) => CheckResult::new("dongle_open", CheckStatus::Fail, err.to_string()),
    };

    vec![present, opened]
}

fn compiled_features_check() -> CheckResult {
    let mut features = Vec::new();
    if cfg!(feature = "cli") {
        features.push("cli");
    }

    CheckResult::new("compiled_features", CheckStatus::Info, features.join(", "))
}

fn print_doctor(output: &DoctorOutput, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string(output).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table | OutputFormat::Pretty => {
            println!("aelos doctor ({})\n", output.identity);
            for c in &output.checks {
                println!(
                    "  [{:>4}] {:<20} {}",
                    status_text(c.status),
                    c.name,
                    c.detail
                );
            }
            if output.overall == "pass" {
                println!("\n  Result: all checks passed");
            } else {
                println!("\n  Result: one or more checks failed");
            }
        }
        OutputFormat::Raw => {
            println!("{}", output.overall);
        }
    }
}

fn status_text(status: CheckStatus) -> &'static str {
    match status {
        CheckStatus::Pass => "PASS",
        CheckStatus::Fail => "FAIL",
        CheckStatus::Warn => "WARN",
        CheckStatus::Info => "INFO",
        CheckStatus::Skip => "SKIP",
    }
}
