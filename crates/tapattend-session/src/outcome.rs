use bytes::Bytes;
use tapattend_frame::{decode_record, FrameError, StudentProfile};
use tapattend_transport::TransportError;

/// Why a poll produced no usable profile.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PollFault {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Frame(#[from] FrameError),
}

/// What one poll cycle saw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// Reader present, nothing in range.
    NoTag,
    /// A tag without an identifier record.
    EmptyTag,
    /// A tag carrying a complete profile.
    Decoded(StudentProfile),
    /// Transport failure or unreadable record.
    Fault(PollFault),
}

impl PollOutcome {
    /// Classify the result of reading the record blocks.
    pub fn classify(read: Result<Bytes, TransportError>) -> Self {
        match read {
            Err(TransportError::NoTagPresent) => PollOutcome::NoTag,
            Err(err) => PollOutcome::Fault(err.into()),
            Ok(data) => match decode_record(&data) {
                Ok(profile) => PollOutcome::Decoded(profile),
                Err(FrameError::NoIdentifier) => PollOutcome::EmptyTag,
                Err(err) => PollOutcome::Fault(err.into()),
            },
        }
    }

    /// Short name used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            PollOutcome::NoTag => "no_tag",
            PollOutcome::EmptyTag => "empty_tag",
            PollOutcome::Decoded(_) => "decoded",
            PollOutcome::Fault(PollFault::Transport(_)) => "transport_error",
            PollOutcome::Fault(PollFault::Frame(_)) => "frame_error",
        }
    }
}
