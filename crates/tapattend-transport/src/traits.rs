use bytes::Bytes;

use crate::error::Result;

/// A single reader slot that can hold one tag.
///
/// Implementations translate backend failures into [`TransportError`]
/// variants: no tag in range is `NoTagPresent`, a tag that disappears during
/// an exchange is `TagRemoved`.
///
/// [`TransportError`]: crate::TransportError
pub trait CardReader: Send {
    /// Reader name as reported by the backend.
    fn name(&self) -> &str;

    /// Establish a connection to the tag currently in the field.
    fn connect(&mut self) -> Result<()>;

    /// Send one command and return the raw response (data + status word).
    fn transmit(&mut self, command: &[u8]) -> Result<Bytes>;

    /// Drop the current tag connection, if any.
    fn disconnect(&mut self) {}
}

impl<R: CardReader + ?Sized> CardReader for Box<R> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn connect(&mut self) -> Result<()> {
        (**self).connect()
    }

    fn transmit(&mut self, command: &[u8]) -> Result<Bytes> {
        (**self).transmit(command)
    }

    fn disconnect(&mut self) {
        (**self).disconnect()
    }
}

/// Enumerates and opens readers.
pub trait ReaderBackend {
    type Reader: CardReader;

    /// Names of attached readers.
    fn list_readers(&self) -> Result<Vec<String>>;

    /// Open a reader by name.
    fn open(&self, name: &str) -> Result<Self::Reader>;
}
