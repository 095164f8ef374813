use std::time::Duration;

/// Errors that can occur in session operations.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] tapattend_transport::TransportError),

    /// Record framing error.
    #[error("frame error: {0}")]
    Frame(#[from] tapattend_frame::FrameError),

    /// Roster lookup failed.
    #[error("roster error: {0}")]
    Roster(#[from] crate::roster::RosterError),

    /// The attendance store failed.
    #[error("persistence error: {0}")]
    Persistence(#[from] crate::store::PersistenceError),

    /// Provisioning by row was requested without a roster.
    #[error("no roster configured")]
    NoRoster,

    /// The poll worker is gone.
    #[error("poller disconnected")]
    Disconnected,

    /// The poll worker did not stop in time.
    #[error("poller did not stop within {0:?}")]
    ShutdownTimeout(Duration),

    /// The poll worker thread could not be started.
    #[error("failed to start poller: {0}")]
    Spawn(#[source] std::io::Error),

    /// The poll worker panicked.
    #[error("poller worker panicked")]
    WorkerPanicked,
}

pub type Result<T> = std::result::Result<T, SessionError>;
