use std::io::{IsTerminal, Write};

use aelos_device::{HostReply, Reply};
use aelos_transport::Candidate;
use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Pretty
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct ReplyOutput<'a> {
    action: &'a str,
    endpoint: &'a str,
    content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    bytes: Option<Vec<u8>>,
}

pub fn print_reply(action: &str, endpoint: &str, reply: &Reply, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = ReplyOutput {
                action,
                endpoint,
                content: reply.to_string(),
                bytes: match reply {
                    Reply::Raw(bytes) => Some(bytes.to_vec()),
                    _ => None,
                },
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["ACTION", "ENDPOINT", "RESULT"])
                .add_row(vec![
                    action.to_string(),
                    endpoint.to_string(),
                    reply.to_string(),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!("{action} on {endpoint}: {reply}");
        }
        OutputFormat::Raw => match reply {
            Reply::Raw(bytes) => print_raw(bytes),
            other => println!("{other}"),
        },
    }
}

#[derive(Serialize)]
struct CandidateOutput<'a> {
    endpoint: &'a str,
    description: &'a str,
    hardware_id: &'a str,
    matches: bool,
}

pub fn print_candidates(candidates: &[Candidate], identity: &str, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out: Vec<CandidateOutput<'_>> = candidates
                .iter()
                .map(|c| CandidateOutput {
                    endpoint: &c.endpoint,
                    description: &c.description,
                    hardware_id: &c.hardware_id,
                    matches: c.matches(identity),
                })
                .collect();
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "[]".to_string())
            );
        }
        OutputFormat::Table | OutputFormat::Pretty => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["ENDPOINT", "DESCRIPTION", "HARDWARE ID", "DONGLE"]);
            for c in candidates {
                let mark = if c.matches(identity) { "yes" } else { "" };
                table.add_row(vec![
                    c.endpoint.as_str(),
                    c.description.as_str(),
                    c.hardware_id.as_str(),
                    mark,
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Raw => {
            for c in candidates {
                println!("{}", c.endpoint);
            }
        }
    }
}

/// Write one host reply as a JSON line and flush, so the host sees it
/// immediately.
pub fn write_host_reply(out: &mut impl Write, reply: &HostReply) -> std::io::Result<()> {
    serde_json::to_writer(&mut *out, reply)?;
    out.write_all(b"\n")?;
    out.flush()
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}
