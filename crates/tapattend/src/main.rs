mod backend;
mod cmd;
mod exit;
mod ledger;
mod logging;
mod output;
mod roster;

use clap::Parser;

use crate::cmd::Command;
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "tapattend", version, about = "Contactless tag attendance logger")]
struct Cli {
    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(long, value_name = "LEVEL", default_value = "info", global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    let result = cmd::run(cli.command, format);

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_run_with_event_ledger() {
        let cli = Cli::try_parse_from([
            "tapattend",
            "run",
            "--sim-image",
            "/tmp/tag.bin",
            "--event",
            "orientation",
            "--dir",
            "/tmp/logs",
            "--max-cycles",
            "4",
        ])
        .expect("run args should parse");

        let Command::Run(args) = cli.command else {
            panic!("expected run command");
        };
        assert_eq!(args.max_cycles, Some(4));
        assert_eq!(args.ledger.event.as_deref(), Some("orientation"));
    }

    #[test]
    fn parses_roster_search() {
        let cli = Cli::try_parse_from([
            "tapattend",
            "roster",
            "--roster",
            "/tmp/roster.csv",
            "--search",
            "305123456",
        ])
        .expect("roster args should parse");
        assert!(matches!(cli.command, Command::Roster(ref a) if a.search.is_some()));
    }

    #[test]
    fn parses_provision_row() {
        let cli = Cli::try_parse_from([
            "tapattend",
            "provision",
            "7",
            "--roster",
            "/tmp/roster.csv",
        ])
        .expect("provision args should parse");
        assert!(matches!(cli.command, Command::Provision(ref a) if a.row == 7));
    }

    #[test]
    fn parses_global_format_after_subcommand() {
        let cli = Cli::try_parse_from(["tapattend", "version", "--format", "json"])
            .expect("global flag should parse");
        assert!(matches!(cli.format, Some(OutputFormat::Json)));
    }
}
