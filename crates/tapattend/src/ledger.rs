use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use clap::Args;
use tapattend_session::{AttendanceEntry, AttendanceStore, PersistenceError};
use tracing::{debug, info};

use crate::exit::{CliError, CliResult, USAGE};

pub const LEDGER_HEADER: [&str; 5] = [
    "Student CIN",
    "First Name",
    "Last Name",
    "Major",
    "Timestamp",
];

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Where attendance rows are written.
#[derive(Args, Debug, Clone, Default)]
pub struct LedgerArgs {
    /// Attendance ledger CSV file.
    #[arg(long, value_name = "PATH", env = "TAPATTEND_LEDGER")]
    pub ledger: Option<PathBuf>,
    /// Event name; the ledger becomes <DIR>/<EVENT>_attendance.csv.
    #[arg(long, value_name = "NAME")]
    pub event: Option<String>,
    /// Directory for event ledgers.
    #[arg(long, value_name = "DIR", default_value = ".")]
    pub dir: PathBuf,
}

impl LedgerArgs {
    /// `--event` takes precedence over `--ledger`.
    pub fn resolve(&self) -> CliResult<PathBuf> {
        if let Some(event) = &self.event {
            let event = event.trim();
            if event.is_empty() || event.contains(['/', '\\']) {
                return Err(CliError::new(USAGE, format!("invalid event name: {event:?}")));
            }
            return Ok(self.dir.join(format!("{event}_attendance.csv")));
        }
        self.ledger
            .clone()
            .ok_or_else(|| CliError::new(USAGE, "pass --ledger <PATH> or --event <NAME>"))
    }
}

/// Append-only CSV attendance ledger.
#[derive(Debug, Clone)]
pub struct CsvLedger {
    path: PathBuf,
}

impl CsvLedger {
    /// Open the ledger, creating its directory and header row when missing.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, PersistenceError> {
        let path = path.into();
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }

        let empty = match fs::metadata(&path) {
            Ok(meta) => meta.len() == 0,
            Err(err) if err.kind() == ErrorKind::NotFound => true,
            Err(err) => return Err(err.into()),
        };
        if empty {
            let mut writer = csv::Writer::from_path(&path).map_err(csv_error)?;
            writer.write_record(LEDGER_HEADER).map_err(csv_error)?;
            writer.flush()?;
            info!(path = %path.display(), "created attendance ledger");
        }
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AttendanceStore for CsvLedger {
    fn logged_entries(&mut self) -> Result<Vec<AttendanceEntry>, PersistenceError> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_path(&self.path)
            .map_err(csv_error)?;

        let mut entries = Vec::new();
        for record in reader.records() {
            let record = record.map_err(csv_error)?;
            let cell = |i: usize| record.get(i).map(str::trim).unwrap_or_default();
            if cell(0).is_empty() {
                continue;
            }
            let line = record.position().map_or(0, |p| p.line());
            let timestamp = NaiveDateTime::parse_from_str(cell(4), TIMESTAMP_FORMAT)
                .map_err(|err| {
                    PersistenceError::Format(format!(
                        "{} line {line}: timestamp {:?}: {err}",
                        self.path.display(),
                        cell(4)
                    ))
                })?;
            entries.push(AttendanceEntry {
                identifier: cell(0).to_string(),
                first_name: cell(1).to_string(),
                last_name: cell(2).to_string(),
                major: cell(3).to_string(),
                timestamp,
            });
        }
        debug!(path = %self.path.display(), count = entries.len(), "read logged entries");
        Ok(entries)
    }

    fn append(&mut self, entry: &AttendanceEntry) -> Result<(), PersistenceError> {
        let mut file = OpenOptions::new()
            .read(true)
            .create(true)
            .append(true)
            .open(&self.path)?;
        terminate_last_line(&mut file)?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);

        let timestamp = entry.timestamp.format(TIMESTAMP_FORMAT).to_string();
        writer
            .write_record([
                entry.identifier.as_str(),
                entry.first_name.as_str(),
                entry.last_name.as_str(),
                entry.major.as_str(),
                timestamp.as_str(),
            ])
            .map_err(csv_error)?;
        writer.flush()?;
        Ok(())
    }
}

/// A ledger edited by hand may lack the final newline; without one the next
/// row would be glued onto the last.
fn terminate_last_line(file: &mut File) -> std::io::Result<()> {
    if file.metadata()?.len() == 0 {
        return Ok(());
    }
    let mut last = [0u8; 1];
    file.seek(SeekFrom::End(-1))?;
    file.read_exact(&mut last)?;
    if last[0] != b'\n' {
        file.write_all(b"\n")?;
    }
    Ok(())
}

fn csv_error(err: csv::Error) -> PersistenceError {
    let message = err.to_string();
    match err.into_kind() {
        csv::ErrorKind::Io(source) => PersistenceError::Io(source),
        _ => PersistenceError::Format(message),
    }
}
