use crate::marker::Marker;

/// Errors that can occur during record encoding/decoding.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    /// The encoded record exceeds the writable capacity of the tag.
    #[error("record too long ({size} bytes, max {max})")]
    TooLong { size: usize, max: usize },

    /// A field contains a character outside the encodable repertoire.
    #[error("unsupported character {ch:?} in {field}")]
    UnsupportedCharacter { field: Marker, ch: char },

    /// A value contains the text of the marker that follows it, so the
    /// record would decode with the wrong field boundaries.
    #[error("{field} contains the marker text {:?}", .marker.text())]
    MarkerInValue { field: Marker, marker: Marker },

    /// The tag memory holds no identifier marker (blank or foreign tag).
    #[error("no identifier recorded on tag")]
    NoIdentifier,

    /// A marker is absent or its value is empty.
    #[error("malformed record: {missing} missing")]
    MalformedRecord { missing: Marker },
}

pub type Result<T> = std::result::Result<T, FrameError>;
