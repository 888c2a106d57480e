//! Persistent picture index.
//!
//! The cell holds the last assigned index. A candidate is read with `next()`
//! and only becomes durable through `commit()`, which callers issue after the
//! picture bytes are on storage. The cell is one byte wide, so committed
//! values wrap after 255; a crash between the picture write and the commit
//! reuses the index on the next cycle. Both are known limitations.

use crate::error::CellError;
use crate::storage::SequenceCell;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::log_warn;

pub const SEQUENCE_CELL_SIZE: usize = 1;
const SEQUENCE_SLOT: usize = 0;

pub struct SequenceStore {
    cell: Box<dyn SequenceCell>,
}

impl SequenceStore {
    pub fn new(cell: Box<dyn SequenceCell>) -> Self {
        Self { cell }
    }

    pub fn begin(&mut self) -> Result<(), CellError> {
        self.cell.begin(SEQUENCE_CELL_SIZE)
    }

    /// Last committed index.
    pub fn stored(&self) -> u8 {
        self.cell.read_byte(SEQUENCE_SLOT)
    }

    /// Candidate for the next picture; repeated calls without a commit return
    /// the same value.
    pub fn next(&self) -> u32 {
        u32::from(self.stored()) + 1
    }

    pub fn commit(&mut self, value: u32) -> Result<(), CellError> {
        let byte = (value & 0xff) as u8;
        if u32::from(byte) != value {
            log_warn!("sequence index {value} exceeds cell width, stored as {byte}");
        }
        self.cell.write_byte(SEQUENCE_SLOT, byte)
    }

    /// Operator reset back to zero.
    pub fn reset(&mut self) -> Result<(), CellError> {
        self.cell.write_byte(SEQUENCE_SLOT, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct MemoryCell {
        bytes: Vec<u8>,
        fail_writes: bool,
    }

    impl SequenceCell for MemoryCell {
        fn begin(&mut self, size: usize) -> Result<(), CellError> {
            self.bytes.resize(size, 0);
            Ok(())
        }

        fn read_byte(&self, slot: usize) -> u8 {
            self.bytes.get(slot).copied().unwrap_or(0)
        }

        fn write_byte(&mut self, slot: usize, value: u8) -> Result<(), CellError> {
            if self.fail_writes {
                return Err(CellError::Io(std::io::Error::other("cell worn out")));
            }
            self.bytes[slot] = value;
            Ok(())
        }
    }

    fn store_with(stored: u8) -> SequenceStore {
        let mut store = SequenceStore::new(Box::new(MemoryCell {
            bytes: vec![stored],
            fail_writes: false,
        }));
        store.begin().unwrap();
        store
    }

    #[test]
    fn next_is_idempotent_without_commit() {
        let store = store_with(4);
        assert_eq!(store.next(), 5);
        assert_eq!(store.next(), 5);
        assert_eq!(store.stored(), 4);
    }

    #[test]
    fn commits_yield_strictly_increasing_values() {
        let mut store = store_with(10);
        let mut committed = Vec::new();
        for _ in 0..5 {
            let candidate = store.next();
            store.commit(candidate).unwrap();
            committed.push(candidate);
        }
        assert_eq!(committed, vec![11, 12, 13, 14, 15]);
    }

    #[test]
    fn failed_commit_does_not_advance() {
        let mut store = SequenceStore::new(Box::new(MemoryCell {
            bytes: vec![7],
            fail_writes: true,
        }));
        store.begin().unwrap();
        assert!(store.commit(store.next()).is_err());
        assert_eq!(store.next(), 8);
    }

    #[test]
    fn index_past_cell_width_wraps() {
        let mut store = store_with(255);
        assert_eq!(store.next(), 256);
        store.commit(256).unwrap();
        assert_eq!(store.stored(), 0);
        assert_eq!(store.next(), 1);
    }

    #[test]
    fn reset_clears_counter() {
        let mut store = store_with(99);
        store.reset().unwrap();
        assert_eq!(store.next(), 1);
    }
}
