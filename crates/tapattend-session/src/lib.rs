//! Attendance session tracking and tag polling.
//!
//! This is the "just works" layer. A [`Poller`] owns the reader, reads the
//! tag on a fixed interval, classifies what it saw, suppresses repeated
//! notices and records each identifier at most once per run. Everything a
//! presentation surface needs arrives as an ordered stream of
//! [`SessionEvent`]s.

pub mod error;
pub mod event;
pub mod outcome;
pub mod poller;
pub mod recorder;
pub mod roster;
pub mod store;
pub mod tracker;

pub use error::{Result, SessionError};
pub use event::{ErrorNotice, SessionEvent, StatusNotice};
pub use outcome::{PollFault, PollOutcome};
pub use poller::{
    Poller, PollerConfig, PollerHandle, DEFAULT_JOIN_TIMEOUT, DEFAULT_POLL_INTERVAL,
};
pub use recorder::{AttendanceEntry, AttendanceRecorder, RecordOutcome};
pub use roster::{MemoryRoster, Roster, RosterError, RosterRow, FIRST_DATA_ROW};
pub use store::{AttendanceStore, MemoryStore, PersistenceError};
pub use tracker::{step, SessionState, SessionTracker, StatusKey, Step};
