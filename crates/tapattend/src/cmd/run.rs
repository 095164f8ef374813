use std::io::{self, BufRead, BufReader};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tapattend_session::{Poller, PollerConfig, SessionEvent, StatusNotice};
use tapattend_transport::BlockLayout;
use tracing::{info, warn};

use crate::backend;
use crate::cmd::{parse_duration, RunArgs};
use crate::exit::{persistence_error, roster_error, session_error, CliError, CliResult, SUCCESS};
use crate::ledger::CsvLedger;
use crate::output::{print_event, OutputFormat};
use crate::roster::load_roster;

const EVENT_WAIT: Duration = Duration::from_millis(100);

pub fn run(args: RunArgs, format: OutputFormat) -> CliResult<i32> {
    let config = PollerConfig {
        interval: parse_duration(&args.interval)?,
        join_timeout: parse_duration(&args.join_timeout)?,
        max_cycles: args.max_cycles,
        ..PollerConfig::default()
    };

    let path = args.ledger.resolve()?;
    let ledger =
        CsvLedger::open(&path).map_err(|err| persistence_error("ledger open failed", err))?;
    info!(path = %ledger.path().display(), "attendance ledger");

    let session = backend::open(&args.reader, BlockLayout::default())?;
    let mut poller =
        Poller::new(session, ledger, config).map_err(|err| session_error("startup failed", err))?;
    if let Some(roster) = &args.roster {
        let roster = load_roster(roster).map_err(|err| roster_error("roster load failed", err))?;
        poller = poller.with_roster(roster);
    }
    let handle = poller
        .spawn()
        .map_err(|err| session_error("startup failed", err))?;

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;
    let commands = spawn_command_reader(BufReader::new(io::stdin())).unwrap_or_else(|err| {
        warn!(%err, "stdin reader failed to start; provisioning from stdin disabled");
        mpsc::channel().1
    });

    while running.load(Ordering::SeqCst) {
        for row in commands.try_iter() {
            if let Err(err) = handle.provision_row(row) {
                warn!(row, %err, "provision request dropped");
            }
        }

        match handle.next_event(EVENT_WAIT) {
            Some(event) => {
                let stopped = event == SessionEvent::Status(StatusNotice::Stopped);
                print_event(&event, format);
                if stopped {
                    break;
                }
            }
            None if handle.is_finished() => break,
            None => {}
        }
    }

    let remaining = handle
        .shutdown()
        .map_err(|err| session_error("stop failed", err))?;
    for event in &remaining {
        print_event(event, format);
    }
    Ok(SUCCESS)
}

/// Input lines become provisioning requests; the thread ends with the input.
fn spawn_command_reader(input: impl BufRead + Send + 'static) -> io::Result<Receiver<usize>> {
    let (tx, rx) = mpsc::channel();
    thread::Builder::new()
        .name("tapattend-stdin".to_string())
        .spawn(move || {
            for line in input.lines() {
                let Ok(line) = line else { break };
                match parse_command(&line) {
                    Some(Ok(row)) => {
                        if tx.send(row).is_err() {
                            break;
                        }
                    }
                    Some(Err(message)) => eprintln!("{message}"),
                    None => {}
                }
            }
        })?;
    Ok(rx)
}

/// `provision N` or a bare `N`. Blank lines are ignored.
fn parse_command(line: &str) -> Option<Result<usize, String>> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    let arg = line
        .strip_prefix("provision")
        .map(str::trim)
        .unwrap_or(line);
    Some(
        arg.parse()
            .map_err(|_| format!("expected a roster row number or `provision N`, got {line:?}")),
    )
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| {
        CliError::new(
            crate::exit::INTERNAL,
            format!("signal handler setup failed: {err}"),
        )
    })
}
