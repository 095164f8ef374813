//! In-memory simulated reader.
//!
//! The tag can be inserted and removed while a session holds the reader, and
//! individual blocks can be made to fail. Every command is appended to an
//! operation log so tests can assert on ordering.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bytes::{BufMut, Bytes, BytesMut};

use crate::apdu::{StatusWord, BLOCK_SIZE, CLA, INS_GET_DATA, INS_READ, INS_WRITE};
use crate::error::{Result, TransportError};
use crate::traits::{CardReader, ReaderBackend};

/// Blocks on a simulated tag unless sized explicitly.
pub const DEFAULT_TAG_BLOCKS: usize = 64;

const SW_WRONG_LENGTH: StatusWord = StatusWord { sw1: 0x67, sw2: 0x00 };
const SW_NOT_FOUND: StatusWord = StatusWord { sw1: 0x6A, sw2: 0x82 };
const SW_UNSUPPORTED: StatusWord = StatusWord { sw1: 0x6D, sw2: 0x00 };

/// One logged reader operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimOp {
    Connect,
    Read(u8),
    Write(u8),
    GetUid,
}

/// Memory image of a tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimTag {
    blocks: Vec<[u8; BLOCK_SIZE]>,
    uid: Vec<u8>,
}

impl Default for SimTag {
    fn default() -> Self {
        Self::blank(DEFAULT_TAG_BLOCKS)
    }
}

impl SimTag {
    /// A zero-filled tag with `blocks` blocks.
    pub fn blank(blocks: usize) -> Self {
        Self {
            blocks: vec![[0; BLOCK_SIZE]; blocks],
            uid: vec![0x04, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00],
        }
    }

    /// Rebuild a tag from a flat memory image. A trailing partial block is zero-padded.
    pub fn from_image(image: &[u8]) -> Self {
        let mut tag = Self::blank(image.len().div_ceil(BLOCK_SIZE));
        tag.load(0, image);
        tag
    }

    pub fn with_uid(mut self, uid: Vec<u8>) -> Self {
        self.uid = uid;
        self
    }

    /// Copy `data` into memory starting at `start_block`, bypassing the command layer.
    /// Bytes past the end of the tag are dropped.
    pub fn load(&mut self, start_block: usize, data: &[u8]) {
        for (i, chunk) in data.chunks(BLOCK_SIZE).enumerate() {
            if let Some(block) = self.blocks.get_mut(start_block + i) {
                block[..chunk.len()].copy_from_slice(chunk);
            }
        }
    }

    pub fn block(&self, block: usize) -> Option<[u8; BLOCK_SIZE]> {
        self.blocks.get(block).copied()
    }

    /// `count` blocks starting at `start`, flattened.
    pub fn bytes(&self, start: usize, count: usize) -> Vec<u8> {
        self.blocks
            .iter()
            .skip(start)
            .take(count)
            .flatten()
            .copied()
            .collect()
    }

    /// Flat memory image.
    pub fn image(&self) -> Vec<u8> {
        self.bytes(0, self.blocks.len())
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Execute one reader command against this tag's memory.
    ///
    /// `status_override` replaces the status of a read/write (fault injection).
    pub(crate) fn execute(
        &mut self,
        command: &[u8],
        status_override: Option<StatusWord>,
    ) -> (Bytes, Option<SimOp>) {
        if command.len() < 5 || command[0] != CLA {
            return (status_only(SW_UNSUPPORTED), None);
        }
        let block = command[3];
        match command[1] {
            INS_READ => {
                let op = Some(SimOp::Read(block));
                if let Some(status) = status_override {
                    return (status_only(status), op);
                }
                match self.block(usize::from(block)) {
                    Some(data) => (with_success(&data), op),
                    None => (status_only(SW_NOT_FOUND), op),
                }
            }
            INS_WRITE => {
                let op = Some(SimOp::Write(block));
                if let Some(status) = status_override {
                    return (status_only(status), op);
                }
                if command.len() != 5 + BLOCK_SIZE {
                    return (status_only(SW_WRONG_LENGTH), op);
                }
                match self.blocks.get_mut(usize::from(block)) {
                    Some(slot) => {
                        slot.copy_from_slice(&command[5..]);
                        (status_only(StatusWord::SUCCESS), op)
                    }
                    None => (status_only(SW_NOT_FOUND), op),
                }
            }
            INS_GET_DATA => (with_success(&self.uid), Some(SimOp::GetUid)),
            _ => (status_only(SW_UNSUPPORTED), None),
        }
    }
}

fn status_only(status: StatusWord) -> Bytes {
    Bytes::copy_from_slice(&[status.sw1, status.sw2])
}

fn with_success(data: &[u8]) -> Bytes {
    let mut buf = BytesMut::with_capacity(data.len() + 2);
    buf.put_slice(data);
    buf.put_u8(StatusWord::SUCCESS.sw1);
    buf.put_u8(StatusWord::SUCCESS.sw2);
    buf.freeze()
}

#[derive(Debug, Default)]
struct Slot {
    tag: Option<SimTag>,
    read_fault: Option<(u8, StatusWord)>,
    write_fault: Option<(u8, StatusWord)>,
    remaining_before_removal: Option<usize>,
    log: Vec<SimOp>,
}

/// A simulated reader. Clones share the same slot.
#[derive(Debug, Clone)]
pub struct SimReader {
    name: String,
    slot: Arc<Mutex<Slot>>,
}

impl SimReader {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            slot: Arc::new(Mutex::new(Slot::default())),
        }
    }

    fn slot(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Place a tag on the reader, replacing any current one.
    pub fn insert(&self, tag: SimTag) {
        let mut slot = self.slot();
        slot.tag = Some(tag);
        slot.remaining_before_removal = None;
    }

    /// Take the tag off the reader.
    pub fn remove(&self) -> Option<SimTag> {
        self.slot().tag.take()
    }

    /// Snapshot of the current tag.
    pub fn tag(&self) -> Option<SimTag> {
        self.slot().tag.clone()
    }

    /// Reads of `block` return `status` instead of data.
    pub fn fail_reads_at(&self, block: u8, status: StatusWord) {
        self.slot().read_fault = Some((block, status));
    }

    /// Writes to `block` return `status` and leave memory untouched.
    pub fn fail_writes_at(&self, block: u8, status: StatusWord) {
        self.slot().write_fault = Some((block, status));
    }

    pub fn clear_faults(&self) {
        let mut slot = self.slot();
        slot.read_fault = None;
        slot.write_fault = None;
    }

    /// Pull the tag away after `commands` more successful exchanges.
    pub fn remove_after(&self, commands: usize) {
        self.slot().remaining_before_removal = Some(commands);
    }

    /// Operations executed so far, oldest first.
    pub fn operations(&self) -> Vec<SimOp> {
        self.slot().log.clone()
    }

    pub fn clear_operations(&self) {
        self.slot().log.clear();
    }
}

impl CardReader for SimReader {
    fn name(&self) -> &str {
        &self.name
    }

    fn connect(&mut self) -> Result<()> {
        let mut slot = self.slot();
        if slot.tag.is_none() {
            return Err(TransportError::NoTagPresent);
        }
        slot.log.push(SimOp::Connect);
        Ok(())
    }

    fn transmit(&mut self, command: &[u8]) -> Result<Bytes> {
        let mut slot = self.slot();
        match slot.remaining_before_removal {
            Some(0) => {
                slot.tag = None;
                slot.remaining_before_removal = None;
            }
            Some(n) => slot.remaining_before_removal = Some(n - 1),
            None => {}
        }

        let block = command.get(3).copied();
        let ins = command.get(1).copied();
        let fault = match (ins, slot.read_fault, slot.write_fault) {
            (Some(INS_READ), Some((at, status)), _) if Some(at) == block => Some(status),
            (Some(INS_WRITE), _, Some((at, status))) if Some(at) == block => Some(status),
            _ => None,
        };

        let Slot { tag, log, .. } = &mut *slot;
        let tag = tag.as_mut().ok_or(TransportError::TagRemoved)?;
        let (response, op) = tag.execute(command, fault);
        if let Some(op) = op {
            log.push(op);
        }
        Ok(response)
    }
}

/// A fixed set of simulated readers.
#[derive(Debug, Clone, Default)]
pub struct SimBackend {
    readers: Vec<SimReader>,
}

impl SimBackend {
    pub fn new(readers: Vec<SimReader>) -> Self {
        Self { readers }
    }
}

impl ReaderBackend for SimBackend {
    type Reader = SimReader;

    fn list_readers(&self) -> Result<Vec<String>> {
        Ok(self.readers.iter().map(|r| r.name.clone()).collect())
    }

    fn open(&self, name: &str) -> Result<SimReader> {
        self.readers
            .iter()
            .find(|r| r.name == name)
            .cloned()
            .ok_or(TransportError::NoReaderFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::apdu::{read_block_command, split_response, write_block_command};

    #[test]
    fn unknown_block_reports_not_found() {
        let mut tag = SimTag::blank(8);
        let (response, _) = tag.execute(&read_block_command(8), None);
        let (_, status) = split_response(response).unwrap();
        assert_eq!(status, SW_NOT_FOUND);
    }

    #[test]
    fn write_then_read_block() {
        let mut tag = SimTag::blank(8);
        let (response, op) = tag.execute(&write_block_command(2, b"abcd"), None);
        assert_eq!(op, Some(SimOp::Write(2)));
        assert!(split_response(response).unwrap().1.is_success());

        let (response, _) = tag.execute(&read_block_command(2), None);
        let (data, _) = split_response(response).unwrap();
        assert_eq!(data.as_ref(), b"abcd");
    }

    #[test]
    fn image_roundtrip_pads_partial_block() {
        let tag = SimTag::from_image(b"abcdef");
        assert_eq!(tag.block_count(), 2);
        assert_eq!(tag.image(), b"abcdef\0\0");
    }

    #[test]
    fn removed_tag_fails_connect() {
        let mut reader = SimReader::new("sim");
        reader.insert(SimTag::default());
        assert!(reader.connect().is_ok());
        reader.remove();
        assert_eq!(reader.connect(), Err(TransportError::NoTagPresent));
        assert_eq!(
            reader.transmit(&read_block_command(4)),
            Err(TransportError::TagRemoved)
        );
    }
}
