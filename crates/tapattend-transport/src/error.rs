use crate::apdu::StatusWord;

/// Errors that can occur in tag transport operations.
///
/// Variants stay distinct because callers key notification suppression on
/// them: "no reader", "no tag" and "tag went away" are different states.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// No physical reader is attached.
    #[error("no reader found")]
    NoReaderFound,

    /// A reader is present but no tag is in range.
    #[error("no tag present")]
    NoTagPresent,

    /// The tag left the field during an operation.
    #[error("tag removed")]
    TagRemoved,

    /// A block read returned a non-success status.
    #[error("read failed at block {block} (status {status})")]
    ReadFailed { block: u8, status: StatusWord },

    /// A block write returned a non-success status.
    #[error("write failed at block {block} (status {status})")]
    WriteFailed { block: u8, status: StatusWord },

    /// The reader or tag stopped responding.
    #[error("reader unresponsive: {0}")]
    Unresponsive(String),

    /// The tag did not report a UID.
    #[error("uid unavailable (status {0})")]
    UidUnavailable(StatusWord),

    /// The response did not carry a status word.
    #[error("malformed response ({len} bytes)")]
    MalformedResponse { len: usize },

    /// A write would run past the last block of the layout.
    #[error("block {block} is outside the writable layout (last block {last})")]
    OutOfRange { block: usize, last: u8 },
}

impl TransportError {
    /// True for errors that mean the tag is no longer reachable.
    pub fn is_tag_gone(&self) -> bool {
        matches!(self, TransportError::TagRemoved | TransportError::Unresponsive(_))
    }
}

pub type Result<T> = std::result::Result<T, TransportError>;
