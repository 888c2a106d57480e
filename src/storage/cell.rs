use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::PathBuf;

use crate::error::CellError;

/// Small byte-addressed durable memory, like an EEPROM region.
pub trait SequenceCell {
    /// Prepares `size` cells; must succeed before reads or writes.
    fn begin(&mut self, size: usize) -> Result<(), CellError>;
    /// Unwritten or unavailable cells read as zero.
    fn read_byte(&self, slot: usize) -> u8;
    /// Durably stores one byte.
    fn write_byte(&mut self, slot: usize, value: u8) -> Result<(), CellError>;
}

/// Cells stored in a host file, committed by writing a sibling temp file and
/// renaming it over the original.
pub struct FileCell {
    path: PathBuf,
    bytes: Option<Vec<u8>>,
}

impl FileCell {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            bytes: None,
        }
    }

    fn commit(&self, bytes: &[u8]) -> Result<(), CellError> {
        let tmp = self.path.with_extension("tmp");
        // Left behind by an interrupted commit; the cell itself is intact.
        match fs::remove_file(&tmp) {
            Err(err) if err.kind() != ErrorKind::NotFound => return Err(err.into()),
            _ => {}
        }

        let mut temp = OpenOptions::new().write(true).create_new(true).open(&tmp)?;
        temp.write_all(bytes)?;
        temp.sync_all()?;
        fs::rename(&tmp, &self.path)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            File::open(parent)?.sync_all()?;
        }
        Ok(())
    }
}

impl SequenceCell for FileCell {
    fn begin(&mut self, size: usize) -> Result<(), CellError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                let fresh = vec![0; size];
                self.commit(&fresh)?;
                fresh
            }
            Err(err) => return Err(err.into()),
        };
        // Never zero a cell that exists; a short file means a torn write.
        if bytes.len() != size {
            return Err(CellError::Corrupt {
                len: bytes.len(),
                size,
            });
        }
        self.bytes = Some(bytes);
        Ok(())
    }

    fn read_byte(&self, slot: usize) -> u8 {
        self.bytes
            .as_ref()
            .and_then(|bytes| bytes.get(slot).copied())
            .unwrap_or(0)
    }

    fn write_byte(&mut self, slot: usize, value: u8) -> Result<(), CellError> {
        let mut bytes = self.bytes.clone().ok_or(CellError::NotInitialized)?;
        let size = bytes.len();
        let cell = bytes
            .get_mut(slot)
            .ok_or(CellError::OutOfRange { slot, size })?;
        *cell = value;
        self.commit(&bytes)?;
        self.bytes = Some(bytes);
        Ok(())
    }
}
