use std::fmt;
use std::io;

use tapattend_frame::FrameError;
use tapattend_session::{PersistenceError, RosterError, SessionError};
use tapattend_transport::TransportError;

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const HEALTH_CHECK_FAILED: i32 = 30;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        io::ErrorKind::NotFound => FAILURE,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    let code = match err {
        TransportError::NoTagPresent => FAILURE,
        TransportError::OutOfRange { .. } => DATA_INVALID,
        _ => TRANSPORT_ERROR,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn frame_error(context: &str, err: FrameError) -> CliError {
    let code = match err {
        FrameError::NoIdentifier => FAILURE,
        _ => DATA_INVALID,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn roster_error(context: &str, err: RosterError) -> CliError {
    let code = match err {
        RosterError::OutOfRange { .. } => USAGE,
        RosterError::Incomplete { .. } => DATA_INVALID,
        RosterError::Unavailable(_) => FAILURE,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn persistence_error(context: &str, err: PersistenceError) -> CliError {
    match err {
        PersistenceError::Io(source) => io_error(context, source),
        other => CliError::new(DATA_INVALID, format!("{context}: {other}")),
    }
}

pub fn session_error(context: &str, err: SessionError) -> CliError {
    match err {
        SessionError::Transport(err) => transport_error(context, err),
        SessionError::Frame(err) => frame_error(context, err),
        SessionError::Roster(err) => roster_error(context, err),
        SessionError::Persistence(err) => persistence_error(context, err),
        SessionError::NoRoster => CliError::new(USAGE, format!("{context}: {err}")),
        SessionError::ShutdownTimeout(_) => CliError::new(TIMEOUT, format!("{context}: {err}")),
        SessionError::Disconnected => CliError::new(FAILURE, format!("{context}: {err}")),
        other => CliError::new(INTERNAL, format!("{context}: {other}")),
    }
}
