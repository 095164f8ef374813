//! PC/SC reader backend.

use std::ffi::CString;

use bytes::Bytes;
use pcsc::{Card, Context, Disposition, Protocols, Scope, ShareMode, MAX_BUFFER_SIZE};
use tracing::debug;

use crate::error::{Result, TransportError};
use crate::traits::{CardReader, ReaderBackend};

/// Readers visible to the system PC/SC service.
pub struct PcscBackend {
    ctx: Context,
}

impl PcscBackend {
    /// Connect to the PC/SC service.
    pub fn establish() -> Result<Self> {
        let ctx = Context::establish(Scope::User).map_err(map_error)?;
        Ok(Self { ctx })
    }
}

impl ReaderBackend for PcscBackend {
    type Reader = PcscReader;

    fn list_readers(&self) -> Result<Vec<String>> {
        let names = self.ctx.list_readers_owned().map_err(map_error)?;
        Ok(names
            .into_iter()
            .map(|name| name.to_string_lossy().into_owned())
            .collect())
    }

    fn open(&self, name: &str) -> Result<PcscReader> {
        let cname = CString::new(name).map_err(|_| TransportError::NoReaderFound)?;
        Ok(PcscReader {
            ctx: self.ctx.clone(),
            name: name.to_string(),
            cname,
            card: None,
        })
    }
}

/// One PC/SC reader slot.
pub struct PcscReader {
    ctx: Context,
    name: String,
    cname: CString,
    card: Option<Card>,
}

impl CardReader for PcscReader {
    fn name(&self) -> &str {
        &self.name
    }

    fn connect(&mut self) -> Result<()> {
        self.disconnect();
        let card = self
            .ctx
            .connect(&self.cname, ShareMode::Shared, Protocols::ANY)
            .map_err(map_error)?;
        self.card = Some(card);
        Ok(())
    }

    fn transmit(&mut self, command: &[u8]) -> Result<Bytes> {
        let card = self.card.as_ref().ok_or(TransportError::TagRemoved)?;
        let mut buf = [0u8; MAX_BUFFER_SIZE];
        let response = card.transmit(command, &mut buf).map_err(|err| {
            debug!(reader = %self.name, %err, "transmit failed");
            map_error(err)
        })?;
        Ok(Bytes::copy_from_slice(response))
    }

    fn disconnect(&mut self) {
        if let Some(card) = self.card.take() {
            if let Err((_, err)) = card.disconnect(Disposition::LeaveCard) {
                debug!(reader = %self.name, %err, "disconnect failed");
            }
        }
    }
}

fn map_error(err: pcsc::Error) -> TransportError {
    match err {
        pcsc::Error::NoReadersAvailable
        | pcsc::Error::UnknownReader
        | pcsc::Error::ReaderUnavailable
        | pcsc::Error::NoService => TransportError::NoReaderFound,
        pcsc::Error::NoSmartcard => TransportError::NoTagPresent,
        pcsc::Error::RemovedCard | pcsc::Error::ResetCard => TransportError::TagRemoved,
        other => TransportError::Unresponsive(other.to_string()),
    }
}
