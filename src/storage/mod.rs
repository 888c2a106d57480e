//! Persistent storage collaborators: the picture card and the sequence cell.

mod cell;
mod fs;

pub use cell::{FileCell, SequenceCell};
pub use fs::FsStorage;

use crate::error::StorageError;

/// Block storage addressed by absolute logical paths such as `/pictures/1_2.jpg`.
pub trait BlockStorage {
    /// Mounts the medium. Every other operation fails until this succeeds.
    fn mount(&mut self) -> Result<(), StorageError>;
    fn write(&mut self, path: &str, bytes: &[u8]) -> Result<(), StorageError>;
    fn exists(&self, path: &str) -> bool;
    fn mkdir(&mut self, path: &str) -> Result<(), StorageError>;
    fn append(&mut self, path: &str, text: &str) -> Result<(), StorageError>;
}
