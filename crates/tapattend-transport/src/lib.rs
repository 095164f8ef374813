//! Block-addressed transport for contactless memory tags.
//!
//! Provides a unified interface over reader backends:
//! - PC/SC readers (behind the `pcsc` feature)
//! - A file-backed tag image, for running without hardware
//! - An in-memory simulated reader, for tests
//!
//! This is the lowest layer of tapattend. Everything else builds on top of
//! the [`TagSession`] handle provided here.

pub mod apdu;
pub mod error;
pub mod image;
pub mod session;
pub mod sim;
pub mod traits;

#[cfg(feature = "pcsc")]
pub mod smartcard;

pub use apdu::{StatusWord, BLOCK_SIZE};
pub use error::{Result, TransportError};
pub use image::ImageBackend;
pub use session::{open_session, BlockLayout, TagSession};
pub use sim::{SimBackend, SimOp, SimReader, SimTag};
pub use traits::{CardReader, ReaderBackend};

#[cfg(feature = "pcsc")]
pub use smartcard::{PcscBackend, PcscReader};
