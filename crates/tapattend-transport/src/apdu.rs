//! Reader command encoding.
//!
//! Pseudo-APDUs understood by PC/SC contactless readers for memory tags.
//! Every response ends with a two-byte status word; `90 00` is success.

use std::fmt;

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{Result, TransportError};

/// Bytes per tag block.
pub const BLOCK_SIZE: usize = 4;

/// Class byte for reader-handled commands.
pub const CLA: u8 = 0xFF;
/// Read binary.
pub const INS_READ: u8 = 0xB0;
/// Update binary.
pub const INS_WRITE: u8 = 0xD6;
/// Get data (tag UID).
pub const INS_GET_DATA: u8 = 0xCA;

/// Read header (5) and write header plus one block of payload (9).
pub const READ_COMMAND_LEN: usize = 5;
pub const WRITE_COMMAND_LEN: usize = 5 + BLOCK_SIZE;

/// Trailing status word of a reader response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StatusWord {
    pub sw1: u8,
    pub sw2: u8,
}

impl StatusWord {
    /// `90 00`.
    pub const SUCCESS: StatusWord = StatusWord {
        sw1: 0x90,
        sw2: 0x00,
    };

    pub fn new(sw1: u8, sw2: u8) -> Self {
        Self { sw1, sw2 }
    }

    pub fn is_success(self) -> bool {
        self == Self::SUCCESS
    }
}

impl fmt::Display for StatusWord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02X} {:02X}", self.sw1, self.sw2)
    }
}

/// Command reading one block.
///
/// ```text
/// ┌──────┬──────┬──────┬───────┬──────┐
/// │ CLA  │ INS  │ P1   │ P2    │ Le   │
/// │ 0xFF │ 0xB0 │ 0x00 │ block │ 0x04 │
/// └──────┴──────┴──────┴───────┴──────┘
/// ```
pub fn read_block_command(block: u8) -> [u8; READ_COMMAND_LEN] {
    [CLA, INS_READ, 0x00, block, BLOCK_SIZE as u8]
}

/// Command writing one block. Short chunks are zero-padded.
///
/// ```text
/// ┌──────┬──────┬──────┬───────┬──────┬──────────────┐
/// │ CLA  │ INS  │ P1   │ P2    │ Lc   │ Data (4B)    │
/// │ 0xFF │ 0xD6 │ 0x00 │ block │ 0x04 │              │
/// └──────┴──────┴──────┴───────┴──────┴──────────────┘
/// ```
pub fn write_block_command(block: u8, chunk: &[u8]) -> Bytes {
    let mut buf = BytesMut::with_capacity(WRITE_COMMAND_LEN);
    buf.put_slice(&[CLA, INS_WRITE, 0x00, block, BLOCK_SIZE as u8]);
    let len = chunk.len().min(BLOCK_SIZE);
    buf.put_slice(&chunk[..len]);
    buf.put_bytes(0x00, BLOCK_SIZE - len);
    buf.freeze()
}

/// Command fetching the tag UID.
pub fn get_uid_command() -> [u8; READ_COMMAND_LEN] {
    [CLA, INS_GET_DATA, 0x00, 0x00, 0x00]
}

/// Split a raw response into data and status word.
pub fn split_response(response: Bytes) -> Result<(Bytes, StatusWord)> {
    let len = response.len();
    if len < 2 {
        return Err(TransportError::MalformedResponse { len });
    }
    let status = StatusWord::new(response[len - 2], response[len - 1]);
    Ok((response.slice(..len - 2), status))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_command_bytes() {
        assert_eq!(read_block_command(4), [0xFF, 0xB0, 0x00, 0x04, 0x04]);
        assert_eq!(read_block_command(49), [0xFF, 0xB0, 0x00, 0x31, 0x04]);
    }

    #[test]
    fn write_command_pads_short_chunk() {
        let cmd = write_block_command(7, b"En");
        assert_eq!(
            cmd.as_ref(),
            &[0xFF, 0xD6, 0x00, 0x07, 0x04, b'E', b'n', 0x00, 0x00]
        );
    }

    #[test]
    fn write_command_full_chunk() {
        let cmd = write_block_command(4, b"CinN");
        assert_eq!(cmd.len(), WRITE_COMMAND_LEN);
        assert_eq!(&cmd[5..], b"CinN");
    }

    #[test]
    fn split_response_extracts_status() {
        let (data, status) =
            split_response(Bytes::from_static(&[0x41, 0x42, 0x43, 0x44, 0x90, 0x00])).unwrap();
        assert_eq!(data.as_ref(), b"ABCD");
        assert!(status.is_success());

        let (data, status) = split_response(Bytes::from_static(&[0x63, 0x00])).unwrap();
        assert!(data.is_empty());
        assert_eq!(status.to_string(), "63 00");
        assert!(!status.is_success());
    }

    #[test]
    fn split_response_rejects_truncated() {
        assert_eq!(
            split_response(Bytes::from_static(&[0x90])),
            Err(TransportError::MalformedResponse { len: 1 })
        );
    }
}
