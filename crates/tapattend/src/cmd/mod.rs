use clap::{Args, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

use crate::backend::ReaderArgs;
use crate::exit::{CliError, CliResult, USAGE};
use crate::ledger::LedgerArgs;
use crate::output::OutputFormat;

pub mod doctor;
pub mod provision;
pub mod read;
pub mod roster;
pub mod run;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Poll the reader and log attendance until stopped.
    Run(RunArgs),
    /// Write a roster row onto the tag on the reader.
    Provision(ProvisionArgs),
    /// Read and decode the tag on the reader.
    Read(ReadArgs),
    /// List or search the roster.
    Roster(RosterArgs),
    /// Run local environment health checks.
    Doctor(DoctorArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Run(args) => run::run(args, format),
        Command::Provision(args) => provision::run(args, format),
        Command::Read(args) => read::run(args, format),
        Command::Roster(args) => roster::run(args, format),
        Command::Doctor(args) => doctor::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub reader: ReaderArgs,
    #[command(flatten)]
    pub ledger: LedgerArgs,
    /// Roster CSV used by `provision N` typed on stdin.
    #[arg(long, value_name = "PATH", env = "TAPATTEND_ROSTER")]
    pub roster: Option<PathBuf>,
    /// Delay between reads (e.g. 500ms, 1s).
    #[arg(long, default_value = "500ms")]
    pub interval: String,
    /// How long to wait for the poller to stop on exit.
    #[arg(long, default_value = "2s")]
    pub join_timeout: String,
    /// Stop after N poll cycles.
    #[arg(long)]
    pub max_cycles: Option<u64>,
}

#[derive(Args, Debug)]
pub struct ProvisionArgs {
    /// Roster row to write (data starts at row 2).
    pub row: usize,
    #[command(flatten)]
    pub reader: ReaderArgs,
    /// Roster CSV file.
    #[arg(long, value_name = "PATH", env = "TAPATTEND_ROSTER")]
    pub roster: PathBuf,
}

#[derive(Args, Debug)]
pub struct ReadArgs {
    #[command(flatten)]
    pub reader: ReaderArgs,
}

#[derive(Args, Debug)]
pub struct RosterArgs {
    /// Roster CSV file.
    #[arg(long, value_name = "PATH", env = "TAPATTEND_ROSTER")]
    pub roster: PathBuf,
    /// Show only the row holding this CIN.
    #[arg(long, value_name = "CIN")]
    pub search: Option<String>,
}

#[derive(Args, Debug, Default)]
pub struct DoctorArgs {
    #[command(flatten)]
    pub reader: ReaderArgs,
    /// Directory ledgers will be written to.
    #[arg(long, value_name = "DIR", default_value = ".")]
    pub dir: PathBuf,
    /// Roster CSV to validate.
    #[arg(long, value_name = "PATH", env = "TAPATTEND_ROSTER")]
    pub roster: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

/// Parse `500ms`, `2s` or a bare number of seconds.
pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, millis) = if let Some(num) = input.strip_suffix("ms") {
        (num, true)
    } else if let Some(num) = input.strip_suffix('s') {
        (num, false)
    } else {
        (input, false)
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    Ok(if millis {
        Duration::from_millis(value)
    } else {
        Duration::from_secs(value)
    })
}
