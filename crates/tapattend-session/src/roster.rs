//! Roster of students available for provisioning.
//!
//! Rows are numbered like a spreadsheet: row 1 is the header, data starts at
//! row 2. Columns are first name, last name, identifier, major.

use serde::{Deserialize, Serialize};
use tapattend_frame::StudentProfile;

/// First row holding data.
pub const FIRST_DATA_ROW: usize = 2;

/// Errors that can occur looking up a roster row.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RosterError {
    #[error("row {row} out of range (rows {first}..={last})", first = FIRST_DATA_ROW)]
    OutOfRange { row: usize, last: usize },

    #[error("incomplete data in row {row}")]
    Incomplete { row: usize },

    #[error("roster unavailable: {0}")]
    Unavailable(String),
}

/// One roster row as stored, fields possibly blank.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterRow {
    pub first_name: String,
    pub last_name: String,
    pub identifier: String,
    pub major: String,
}

impl RosterRow {
    /// Trimmed profile, or `Incomplete` if any field is blank.
    pub fn to_profile(&self, row: usize) -> Result<StudentProfile, RosterError> {
        let fields = [
            self.identifier.trim(),
            self.first_name.trim(),
            self.last_name.trim(),
            self.major.trim(),
        ];
        if fields.iter().any(|f| f.is_empty()) {
            return Err(RosterError::Incomplete { row });
        }
        let [identifier, first, last, major] = fields;
        Ok(StudentProfile::new(identifier, first, last, major))
    }
}

/// Source of roster rows.
pub trait Roster: Send {
    /// Profile for a data row (`2..=last_row`).
    fn row(&self, row: usize) -> Result<StudentProfile, RosterError>;
}

/// Roster held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryRoster {
    rows: Vec<RosterRow>,
}

impl MemoryRoster {
    pub fn new(rows: Vec<RosterRow>) -> Self {
        Self { rows }
    }

    /// Last data row number, or 1 when empty.
    pub fn last_row(&self) -> usize {
        self.rows.len() + FIRST_DATA_ROW - 1
    }

    /// `(row number, row)` pairs.
    pub fn rows(&self) -> impl Iterator<Item = (usize, &RosterRow)> {
        self.rows
            .iter()
            .enumerate()
            .map(|(i, r)| (i + FIRST_DATA_ROW, r))
    }

    /// Row number holding `identifier`.
    pub fn find(&self, identifier: &str) -> Option<usize> {
        self.rows()
            .find(|(_, r)| r.identifier.trim() == identifier)
            .map(|(n, _)| n)
    }
}

impl Roster for MemoryRoster {
    fn row(&self, row: usize) -> Result<StudentProfile, RosterError> {
        if row < FIRST_DATA_ROW || row > self.last_row() {
            return Err(RosterError::OutOfRange {
                row,
                last: self.last_row(),
            });
        }
        self.rows[row - FIRST_DATA_ROW].to_profile(row)
    }
}
