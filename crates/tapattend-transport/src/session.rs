use std::ops::RangeInclusive;

use bytes::{BufMut, Bytes, BytesMut};
use tracing::{debug, info, warn};

use crate::apdu::{
    get_uid_command, read_block_command, split_response, write_block_command, BLOCK_SIZE,
};
use crate::error::{Result, TransportError};
use crate::traits::{CardReader, ReaderBackend};

/// Which blocks of tag memory hold the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockLayout {
    /// First record block. Default: 4.
    pub start_block: u8,
    /// Last block read back (inclusive). Default: 49.
    pub end_block: u8,
}

impl Default for BlockLayout {
    fn default() -> Self {
        Self {
            start_block: 4,
            end_block: 49,
        }
    }
}

impl BlockLayout {
    /// Blocks read per poll.
    pub fn range(&self) -> RangeInclusive<u8> {
        self.start_block..=self.end_block
    }

    pub fn block_count(&self) -> usize {
        self.range().count()
    }

    /// Addressable bytes in the layout.
    pub fn capacity(&self) -> usize {
        self.block_count() * BLOCK_SIZE
    }
}

/// An open reader: the handle every block operation goes through.
///
/// One operation at a time; callers that share a session across threads must
/// serialize access themselves.
pub struct TagSession<R> {
    reader: R,
    layout: BlockLayout,
}

/// Open the preferred reader (substring match on its name), or the first one.
pub fn open_session<B: ReaderBackend>(
    backend: &B,
    preferred: Option<&str>,
    layout: BlockLayout,
) -> Result<TagSession<B::Reader>> {
    let names = backend.list_readers()?;
    let name = match preferred {
        Some(wanted) => names.iter().find(|name| name.contains(wanted)),
        None => names.first(),
    }
    .ok_or(TransportError::NoReaderFound)?;

    info!(reader = %name, "using reader");
    let reader = backend.open(name)?;
    Ok(TagSession::new(reader, layout))
}

impl<R: CardReader> TagSession<R> {
    pub fn new(reader: R, layout: BlockLayout) -> Self {
        Self { reader, layout }
    }

    pub fn reader_name(&self) -> &str {
        self.reader.name()
    }

    pub fn layout(&self) -> BlockLayout {
        self.layout
    }

    /// Read a contiguous block range, one block per command.
    ///
    /// A non-success status on any block discards everything read so far.
    pub fn read_blocks(&mut self, range: RangeInclusive<u8>) -> Result<Bytes> {
        self.reader.connect()?;

        let mut buf = BytesMut::with_capacity(range.clone().count() * BLOCK_SIZE);
        for block in range {
            let response = self.reader.transmit(&read_block_command(block))?;
            let (data, status) = split_response(response)?;
            if !status.is_success() {
                debug!(block, %status, "block read failed");
                return Err(TransportError::ReadFailed { block, status });
            }
            buf.put_slice(&data);
        }
        Ok(buf.freeze())
    }

    /// Read every block of the layout.
    pub fn read_record(&mut self) -> Result<Bytes> {
        self.read_blocks(self.layout.range())
    }

    /// Write `payload` in 4-byte chunks starting at `start_block`.
    ///
    /// Stops at the first failing chunk. Chunks already written stay written.
    /// Returns the number of blocks written.
    pub fn write_blocks(&mut self, start_block: u8, payload: &[u8]) -> Result<usize> {
        let chunks = payload.len().div_ceil(BLOCK_SIZE);
        if chunks > 0 {
            let last = usize::from(start_block) + chunks - 1;
            if last > usize::from(self.layout.end_block) {
                return Err(TransportError::OutOfRange {
                    block: last,
                    last: self.layout.end_block,
                });
            }
        }

        self.reader.connect()?;

        for (i, chunk) in payload.chunks(BLOCK_SIZE).enumerate() {
            // In range: checked against end_block above.
            let block = start_block + i as u8;
            let response = self.reader.transmit(&write_block_command(block, chunk))?;
            let (_, status) = split_response(response)?;
            if !status.is_success() {
                warn!(block, %status, written = i, "block write failed");
                return Err(TransportError::WriteFailed { block, status });
            }
        }

        debug!(start_block, blocks = chunks, "write complete");
        Ok(chunks)
    }

    /// Write a record at the layout's start block.
    pub fn write_record(&mut self, payload: &[u8]) -> Result<usize> {
        self.write_blocks(self.layout.start_block, payload)
    }

    /// Fetch the tag UID as uppercase hex.
    pub fn read_uid(&mut self) -> Result<String> {
        self.reader.connect()?;
        let response = self.reader.transmit(&get_uid_command())?;
        let (data, status) = split_response(response)?;
        if !status.is_success() {
            return Err(TransportError::UidUnavailable(status));
        }
        Ok(data.iter().map(|b| format!("{b:02X}")).collect())
    }

    /// Release the tag connection.
    pub fn disconnect(&mut self) {
        self.reader.disconnect();
    }

    /// Erase the reader type.
    pub fn boxed(self) -> TagSession<Box<dyn CardReader>>
    where
        R: 'static,
    {
        TagSession {
            reader: Box::new(self.reader),
            layout: self.layout,
        }
    }

    pub fn into_reader(self) -> R {
        self.reader
    }
}

impl<R: CardReader> std::fmt::Debug for TagSession<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TagSession")
            .field("reader", &self.reader.name())
            .field("layout", &self.layout)
            .finish()
    }
}
