use crate::filesystem::secure::write_with_backups_n;
use crate::shelf::ports::ByteStore;
use anyhow::{Context, Result};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// The storage document on disk. A missing file reads as empty.
pub struct FileByteStore {
    path: PathBuf,
    backups: usize,
}

impl FileByteStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path, backups: 2 }
    }

    pub fn new_with_backups(path: PathBuf, backups: usize) -> Self {
        Self { path, backups }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ByteStore for FileByteStore {
    fn read(&self) -> Result<Vec<u8>> {
        match std::fs::read(&self.path) {
            Ok(buf) => Ok(buf),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e)
                .with_context(|| format!("Failed to read {}", self.path.display())),
        }
    }

    fn write(&self, bytes: &[u8]) -> Result<()> {
        write_with_backups_n(&self.path, bytes, self.backups)
    }
}
