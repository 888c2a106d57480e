use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::StorageError;

use super::BlockStorage;

/// Card storage backed by a host directory.
///
/// The directory stands in for the card: if it is missing at mount time the
/// card counts as not attached.
pub struct FsStorage {
    root: PathBuf,
    mounted: bool,
}

impl FsStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            mounted: false,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> PathBuf {
        self.root.join(path.trim_start_matches('/'))
    }

    fn ensure_mounted(&self) -> Result<(), StorageError> {
        if self.mounted {
            Ok(())
        } else {
            Err(StorageError::NotMounted)
        }
    }
}

impl BlockStorage for FsStorage {
    fn mount(&mut self) -> Result<(), StorageError> {
        if !self.root.is_dir() {
            return Err(StorageError::NoCard(self.root.display().to_string()));
        }
        self.mounted = true;
        Ok(())
    }

    fn write(&mut self, path: &str, bytes: &[u8]) -> Result<(), StorageError> {
        self.ensure_mounted()?;
        let target = self.resolve(path);
        let mut file = fs::File::create(&target).map_err(|e| StorageError::io("open", path, e))?;
        file.write_all(bytes)
            .and_then(|_| file.sync_all())
            .map_err(|e| StorageError::io("write", path, e))
    }

    fn exists(&self, path: &str) -> bool {
        self.mounted && self.resolve(path).exists()
    }

    fn mkdir(&mut self, path: &str) -> Result<(), StorageError> {
        self.ensure_mounted()?;
        fs::create_dir(self.resolve(path)).map_err(|e| StorageError::io("mkdir", path, e))
    }

    fn append(&mut self, path: &str, text: &str) -> Result<(), StorageError> {
        self.ensure_mounted()?;
        let mut file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(self.resolve(path))
            .map_err(|e| StorageError::io("open", path, e))?;
        file.write_all(text.as_bytes())
            .map_err(|e| StorageError::io("append", path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_root_means_no_card() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = FsStorage::new(dir.path().join("absent"));
        assert!(matches!(storage.mount(), Err(StorageError::NoCard(_))));
        assert!(matches!(
            storage.write("/x.jpg", b"data"),
            Err(StorageError::NotMounted)
        ));
    }

    #[test]
    fn writes_and_appends_under_root() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = FsStorage::new(dir.path());
        storage.mount().unwrap();

        storage.mkdir("/pictures").unwrap();
        assert!(storage.exists("/pictures"));
        storage.write("/pictures/1_1.jpg", b"\xff\xd8").unwrap();
        assert_eq!(
            fs::read(dir.path().join("pictures/1_1.jpg")).unwrap(),
            b"\xff\xd8"
        );

        storage.append("/log.txt", "a\n").unwrap();
        storage.append("/log.txt", "b\n").unwrap();
        assert_eq!(
            fs::read_to_string(dir.path().join("log.txt")).unwrap(),
            "a\nb\n"
        );
    }

    #[test]
    fn write_into_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = FsStorage::new(dir.path());
        storage.mount().unwrap();
        assert!(matches!(
            storage.write("/pictures/1_1.jpg", b"x"),
            Err(StorageError::Io { op: "open", .. })
        ));
    }
}
