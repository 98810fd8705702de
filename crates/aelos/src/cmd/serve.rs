use std::io::{self, BufRead, BufReader, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use aelos_device::{Dongle, HostMessage, HostReply, ReplyPayload};
use aelos_transport::ByteStream;
use tracing::{debug, info};

use crate::cmd::{open_dongle, LinkArgs, ServeArgs};
use crate::exit::{io_error, CliError, CliResult, INTERNAL, SUCCESS};
use crate::output::write_host_reply;

/// How often the bridge re-checks the shutdown flag while idle.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

pub fn run(args: ServeArgs, link: &LinkArgs) -> CliResult<i32> {
    let (mut dongle, endpoint) = open_dongle(link)?;
    info!(endpoint, topic = %args.topic, "host bridge ready");

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let lines = spawn_line_reader(BufReader::new(io::stdin()));
    let stdout = io::stdout();
    let handled = serve_lines(&mut dongle, &lines, &mut stdout.lock(), &args.topic, &running)?;

    info!(handled, "host bridge stopped");
    Ok(SUCCESS)
}

/// Read `input` line by line on a background thread.
///
/// The channel disconnects at EOF. The thread stays blocked in `read` if the
/// bridge stops first; it ends with the process.
fn spawn_line_reader<R>(input: R) -> Receiver<io::Result<String>>
where
    R: BufRead + Send + 'static,
{
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        for line in input.lines() {
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}

/// Answer one JSON message per input line until EOF or shutdown.
///
/// `running` is checked at least every [`POLL_INTERVAL`], whether or not input
/// arrives. Returns the number of messages answered.
fn serve_lines<S, W>(
    dongle: &mut Dongle<S>,
    lines: &Receiver<io::Result<String>>,
    out: &mut W,
    topic: &str,
    running: &AtomicBool,
) -> CliResult<usize>
where
    S: ByteStream,
    W: Write,
{
    let mut handled = 0usize;

    while running.load(Ordering::SeqCst) {
        let line = match lines.recv_timeout(POLL_INTERVAL) {
            Ok(line) => line.map_err(|err| io_error("reading host input failed", err))?,
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let reply = match parse_message(line, topic) {
            Ok(message) if message.topic != topic => {
                debug!(topic = %message.topic, "skipping message for another topic");
                continue;
            }
            Ok(message) => dongle.handle_message(&message),
            Err(reply) => reply,
        };

        write_host_reply(out, &reply).map_err(|err| io_error("writing host reply failed", err))?;
        handled += 1;
    }

    Ok(handled)
}

/// Decode one input line. Undecodable lines get an error reply on `topic`.
fn parse_message(line: &str, topic: &str) -> Result<HostMessage, HostReply> {
    serde_json::from_str(line).map_err(|err| HostReply {
        topic: topic.to_string(),
        payload: ReplyPayload {
            ok: false,
            content: format!("invalid host message: {err}"),
        },
    })
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}
