//! File-backed tag image.
//!
//! The "reader" is always attached; the "tag" is a flat memory image file.
//! A missing file means no tag in range. Writes go straight back to the file.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use tracing::debug;

use crate::error::{Result, TransportError};
use crate::sim::{SimOp, SimTag, DEFAULT_TAG_BLOCKS};
use crate::traits::{CardReader, ReaderBackend};

/// Backend exposing a single image-file reader.
#[derive(Debug, Clone)]
pub struct ImageBackend {
    path: PathBuf,
    blocks: usize,
}

impl ImageBackend {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            blocks: DEFAULT_TAG_BLOCKS,
        }
    }

    /// Size images shorter than `blocks` up to this many blocks when loaded.
    pub fn with_blocks(mut self, blocks: usize) -> Self {
        self.blocks = blocks;
        self
    }

    /// Create a blank image file (a freshly presented, unprovisioned tag).
    pub fn create_blank(&self) -> Result<()> {
        std::fs::write(&self.path, SimTag::blank(self.blocks).image()).map_err(io_error)
    }

    fn reader_name(&self) -> String {
        format!("image:{}", self.path.display())
    }
}

impl ReaderBackend for ImageBackend {
    type Reader = ImageReader;

    fn list_readers(&self) -> Result<Vec<String>> {
        Ok(vec![self.reader_name()])
    }

    fn open(&self, name: &str) -> Result<ImageReader> {
        if name != self.reader_name() {
            return Err(TransportError::NoReaderFound);
        }
        Ok(ImageReader {
            name: name.to_string(),
            path: self.path.clone(),
            blocks: self.blocks,
        })
    }
}

/// Reader over an image file.
#[derive(Debug)]
pub struct ImageReader {
    name: String,
    path: PathBuf,
    blocks: usize,
}

impl ImageReader {
    fn load(&self) -> Result<SimTag> {
        let mut image = match std::fs::read(&self.path) {
            Ok(image) => image,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Err(TransportError::TagRemoved)
            }
            Err(err) => return Err(io_error(err)),
        };
        let min_len = self.blocks * crate::apdu::BLOCK_SIZE;
        if image.len() < min_len {
            image.resize(min_len, 0);
        }
        Ok(SimTag::from_image(&image))
    }
}

impl CardReader for ImageReader {
    fn name(&self) -> &str {
        &self.name
    }

    fn connect(&mut self) -> Result<()> {
        if self.path.exists() {
            Ok(())
        } else {
            Err(TransportError::NoTagPresent)
        }
    }

    fn transmit(&mut self, command: &[u8]) -> Result<Bytes> {
        let mut tag = self.load()?;
        let (response, op) = tag.execute(command, None);
        if let Some(SimOp::Write(block)) = op {
            debug!(block, path = %self.path.display(), "persisting image write");
            std::fs::write(&self.path, tag.image()).map_err(io_error)?;
        }
        Ok(response)
    }
}

fn io_error(err: std::io::Error) -> TransportError {
    TransportError::Unresponsive(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{open_session, BlockLayout};

    #[test]
    fn missing_image_means_no_tag() {
        let dir = tempfile::tempdir().expect("temp dir");
        let backend = ImageBackend::new(dir.path().join("tag.bin"));
        let mut session = open_session(&backend, None, BlockLayout::default()).unwrap();
        assert_eq!(session.read_record(), Err(TransportError::NoTagPresent));
    }

    #[test]
    fn writes_persist_to_file() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("tag.bin");
        let backend = ImageBackend::new(&path);
        backend.create_blank().unwrap();

        let mut session = open_session(&backend, None, BlockLayout::default()).unwrap();
        session.write_record(b"CinNumber9End").unwrap();

        let image = std::fs::read(&path).unwrap();
        assert_eq!(image.len(), DEFAULT_TAG_BLOCKS * crate::apdu::BLOCK_SIZE);
        assert_eq!(&image[16..29], b"CinNumber9End");

        let data = session.read_record().unwrap();
        assert_eq!(&data[..13], b"CinNumber9End");
    }

    #[test]
    fn short_image_is_padded() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("tag.bin");
        std::fs::write(&path, b"\0\0\0\0").unwrap();

        let backend = ImageBackend::new(&path);
        let mut session = open_session(&backend, None, BlockLayout::default()).unwrap();
        let data = session.read_record().unwrap();
        assert!(data.iter().all(|b| *b == 0));
    }
}
