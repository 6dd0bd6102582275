use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use super::models::CredentialRecord;

/// Raw persistence for the storage document.
pub trait ByteStore: Send + Sync {
    /// Empty bytes when nothing has been written yet.
    fn read(&self) -> Result<Vec<u8>>;
    fn write(&self, bytes: &[u8]) -> Result<()>;
}

/// Maps between the storage document and the record collection.
pub trait StorageCodec: Send + Sync {
    fn decode(&self, data: &[u8]) -> Result<Vec<CredentialRecord>>;
    /// Encode `records` into the document, keeping whatever else `previous` holds.
    fn encode(&self, previous: &[u8], records: &[CredentialRecord]) -> Result<Vec<u8>>;
}

// Time source, swappable for deterministic tests.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// In-memory store; writes can be made to fail to exercise rollback paths.
#[derive(Default)]
pub struct MemoryByteStore {
    bytes: Mutex<Vec<u8>>,
    reject_writes: AtomicBool,
}

impl MemoryByteStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_contents(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: Mutex::new(bytes.into()),
            reject_writes: AtomicBool::new(false),
        }
    }

    pub fn reject_writes(&self, reject: bool) {
        self.reject_writes.store(reject, Ordering::SeqCst);
    }

    pub fn contents(&self) -> Vec<u8> {
        self.bytes.lock().map(|b| b.clone()).unwrap_or_default()
    }
}

impl ByteStore for MemoryByteStore {
    fn read(&self) -> Result<Vec<u8>> {
        let guard = self.bytes.lock().map_err(|_| anyhow!("memory store poisoned"))?;
        Ok(guard.clone())
    }

    fn write(&self, bytes: &[u8]) -> Result<()> {
        if self.reject_writes.load(Ordering::SeqCst) {
            return Err(anyhow!("write rejected"));
        }
        let mut guard = self.bytes.lock().map_err(|_| anyhow!("memory store poisoned"))?;
        *guard = bytes.to_vec();
        Ok(())
    }
}
