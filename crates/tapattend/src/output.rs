use std::io::{IsTerminal, Write};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use tapattend_frame::StudentProfile;
use tapattend_session::{RosterRow, SessionEvent};

use crate::ledger::TIMESTAMP_FORMAT;

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

fn print_json<T: Serialize>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

fn new_table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    table
}

/// One line per event; attendance rows render as a table in table mode.
pub fn print_event(event: &SessionEvent, format: OutputFormat) {
    match (format, event) {
        (OutputFormat::Json, _) => print_json(event),
        (OutputFormat::Table, SessionEvent::Logged(entry) | SessionEvent::Restored(entry)) => {
            let mut table = new_table(vec!["CIN", "NAME", "MAJOR", "TIMESTAMP"]);
            table.add_row(vec![
                entry.identifier.clone(),
                entry.display_name(),
                entry.major.clone(),
                entry.timestamp.format(TIMESTAMP_FORMAT).to_string(),
            ]);
            println!("{table}");
        }
        _ => println!("{event}"),
    }
}

#[derive(Serialize)]
pub struct ReadOutput {
    pub reader: String,
    pub uid: Option<String>,
    pub profile: Option<StudentProfile>,
}

pub fn print_read(out: &ReadOutput, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(out),
        OutputFormat::Table => {
            let mut table = new_table(vec!["FIELD", "VALUE"]);
            table.add_row(vec!["reader", out.reader.as_str()]);
            table.add_row(vec!["uid", out.uid.as_deref().unwrap_or("unknown")]);
            match &out.profile {
                Some(p) => {
                    table.add_row(vec!["cin", p.identifier.as_str()]);
                    table.add_row(vec!["first name", p.first_name.as_str()]);
                    table.add_row(vec!["last name", p.last_name.as_str()]);
                    table.add_row(vec!["major", p.major.as_str()]);
                }
                None => {
                    table.add_row(vec!["record", "blank"]);
                }
            }
            println!("{table}");
        }
        OutputFormat::Pretty | OutputFormat::Raw => {
            let uid = out.uid.as_deref().unwrap_or("unknown");
            match &out.profile {
                Some(p) => println!(
                    "{} (CIN {}, {}) uid={uid}",
                    p.display_name(),
                    p.identifier,
                    p.major
                ),
                None => println!("blank tag uid={uid}"),
            }
        }
    }
}

#[derive(Serialize)]
struct ProvisionOutput<'a> {
    row: usize,
    profile: &'a StudentProfile,
    blocks: usize,
}

pub fn print_provisioned(
    row: usize,
    profile: &StudentProfile,
    blocks: usize,
    format: OutputFormat,
) {
    match format {
        OutputFormat::Json => print_json(&ProvisionOutput {
            row,
            profile,
            blocks,
        }),
        OutputFormat::Table => {
            let mut table = new_table(vec!["ROW", "CIN", "NAME", "BLOCKS"]);
            table.add_row(vec![
                row.to_string(),
                profile.identifier.clone(),
                profile.display_name(),
                blocks.to_string(),
            ]);
            println!("{table}");
        }
        OutputFormat::Pretty | OutputFormat::Raw => println!(
            "Wrote row {row}: {} (CIN {}), {blocks} blocks",
            profile.display_name(),
            profile.identifier
        ),
    }
}

#[derive(Serialize)]
struct RosterOutput<'a> {
    row: usize,
    #[serde(flatten)]
    data: &'a RosterRow,
}

pub fn print_roster<'a>(
    rows: impl IntoIterator<Item = (usize, &'a RosterRow)>,
    format: OutputFormat,
) {
    match format {
        OutputFormat::Json => {
            let rows: Vec<_> = rows
                .into_iter()
                .map(|(row, data)| RosterOutput { row, data })
                .collect();
            print_json(&rows);
        }
        OutputFormat::Table => {
            let mut table = new_table(vec!["ROW", "FIRST NAME", "LAST NAME", "CIN", "MAJOR"]);
            for (row, data) in rows {
                table.add_row(vec![
                    row.to_string(),
                    data.first_name.clone(),
                    data.last_name.clone(),
                    data.identifier.clone(),
                    data.major.clone(),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty | OutputFormat::Raw => {
            for (row, data) in rows {
                println!(
                    "{row:>4}  {} {}  {}  {}",
                    data.first_name, data.last_name, data.identifier, data.major
                );
            }
        }
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}
