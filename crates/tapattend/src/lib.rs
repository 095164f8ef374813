//! Contactless tag attendance logging.
//!
//! tapattend reads student ID tags over a contactless reader, records each
//! student at most once per event, and writes blank tags from a roster.
//!
//! # Crate Structure
//!
//! - [`frame`]: the tag record format (`CinNumber…End`) and [`frame::StudentProfile`]
//! - [`transport`]: block reads and writes over a `CardReader` (PC/SC behind the `pcsc` feature)
//! - [`session`]: the poll worker, notice suppression and attendance recording
//!
//! ```
//! use tapattend::frame::{decode_record, encode_record, RecordConfig, StudentProfile};
//!
//! let profile = StudentProfile::new("305123456", "Ada", "Lovelace", "Mathematics");
//! let mut buf = bytes::BytesMut::new();
//! encode_record(&profile, &RecordConfig::default(), &mut buf).unwrap();
//! assert_eq!(decode_record(&buf).unwrap(), profile);
//! ```

/// Re-export frame types.
pub mod frame {
    pub use tapattend_frame::*;
}

/// Re-export transport types.
pub mod transport {
    pub use tapattend_transport::*;
}

/// Re-export session types.
pub mod session {
    pub use tapattend_session::*;
}
