use std::fmt;

use serde::Serialize;

use crate::recorder::AttendanceEntry;

/// Everything the poll worker publishes, in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum SessionEvent {
    /// A row already in the record when the worker started.
    Restored(AttendanceEntry),
    /// A new attendance row.
    Logged(AttendanceEntry),
    /// A status change worth telling the operator about.
    Status(StatusNotice),
    /// A recoverable failure.
    Error(ErrorNotice),
}

/// Operator-facing status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StatusNotice {
    ReaderReady { reader: String },
    WaitingForTag,
    /// A blank tag is on the reader; a roster row should be assigned.
    AssignRow,
    AlreadySignedIn { identifier: String, name: String },
    TagRemoved,
    Provisioning { row: Option<usize>, name: String },
    Provisioned { identifier: String, blocks: usize },
    Stopped,
}

/// A failure reported without stopping the poll loop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorNotice {
    /// Which step failed: `poll`, `provision` or `persist`.
    pub context: &'static str,
    pub message: String,
}

impl ErrorNotice {
    pub fn new(context: &'static str, message: impl Into<String>) -> Self {
        Self {
            context,
            message: message.into(),
        }
    }
}

impl fmt::Display for StatusNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusNotice::ReaderReady { reader } => write!(f, "Using reader: {reader}"),
            StatusNotice::WaitingForTag => f.write_str("Waiting for a tag..."),
            StatusNotice::AssignRow => f.write_str(
                "Tag does not have a CIN recorded. Enter a roster row number to assign data.",
            ),
            StatusNotice::AlreadySignedIn { name, .. } => {
                write!(f, "{name} has already signed in.")
            }
            StatusNotice::TagRemoved => f.write_str("Card has been removed."),
            StatusNotice::Provisioning { name, .. } => write!(f, "Writing data for {name}..."),
            StatusNotice::Provisioned { identifier, blocks } => write!(
                f,
                "Wrote CIN {identifier} ({blocks} blocks). Tap the tag again to log attendance."
            ),
            StatusNotice::Stopped => f.write_str("Poller stopped."),
        }
    }
}

impl fmt::Display for ErrorNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failed: {}", self.context, self.message)
    }
}

impl fmt::Display for SessionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionEvent::Restored(entry) => write!(
                f,
                "Previously signed in: {} at {}",
                entry.display_name(),
                entry.timestamp.format("%Y-%m-%d %H:%M:%S")
            ),
            SessionEvent::Logged(entry) => write!(
                f,
                "Logged attendance for {} at {}",
                entry.display_name(),
                entry.timestamp.format("%Y-%m-%d %H:%M:%S")
            ),
            SessionEvent::Status(notice) => notice.fmt(f),
            SessionEvent::Error(notice) => notice.fmt(f),
        }
    }
}
