use std::sync::{Arc, Mutex, PoisonError};

use crate::recorder::AttendanceEntry;

/// Errors raised by an attendance store. Reported as-is.
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("attendance record I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("attendance record format error: {0}")]
    Format(String),
}

/// Append-only attendance record.
pub trait AttendanceStore: Send {
    /// Rows already in the record, oldest first. Read once at startup.
    fn logged_entries(&mut self) -> Result<Vec<AttendanceEntry>, PersistenceError>;

    /// Append one row.
    fn append(&mut self, entry: &AttendanceEntry) -> Result<(), PersistenceError>;
}

/// Store held in memory. Clones share rows.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    rows: Arc<Mutex<Vec<AttendanceEntry>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rows(rows: Vec<AttendanceEntry>) -> Self {
        Self {
            rows: Arc::new(Mutex::new(rows)),
        }
    }

    pub fn rows(&self) -> Vec<AttendanceEntry> {
        self.rows
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl AttendanceStore for MemoryStore {
    fn logged_entries(&mut self) -> Result<Vec<AttendanceEntry>, PersistenceError> {
        Ok(self.rows())
    }

    fn append(&mut self, entry: &AttendanceEntry) -> Result<(), PersistenceError> {
        self.rows
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(entry.clone());
        Ok(())
    }
}
