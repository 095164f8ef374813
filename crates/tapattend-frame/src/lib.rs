//! Marker-delimited student record framing for contactless tag memory.
//!
//! A record packs four text fields behind literal ASCII markers:
//! - `CinNumber` followed by the numeric identifier
//! - `FirstName`, `LastName` and `Major` followed by their values
//! - `End` terminating the record
//!
//! There is no length prefix. Field boundaries are the positions of the
//! next marker, so marker text inside a value corrupts the record.

pub mod codec;
pub mod error;
pub mod marker;
pub mod profile;

pub use codec::{
    decode_record, encode_record, encoded_len, printable, RecordConfig, DEFAULT_CAPACITY,
};
pub use error::{FrameError, Result};
pub use marker::{Marker, FIELD_ORDER};
pub use profile::StudentProfile;
