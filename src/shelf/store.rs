use crate::shelf::error::ShelfError;
use crate::shelf::models::CredentialRecord;
use crate::shelf::ports::{ByteStore, StorageCodec};
use std::sync::Arc;
use tracing::{debug, warn};

/// Whole-collection persistence. Every save replaces the stored collection.
pub struct RecordStore {
    bytes: Arc<dyn ByteStore>,
    codec: Arc<dyn StorageCodec>,
    quota_bytes: Option<usize>,
}

impl RecordStore {
    pub fn new(bytes: Arc<dyn ByteStore>, codec: Arc<dyn StorageCodec>) -> Self {
        Self {
            bytes,
            codec,
            quota_bytes: None,
        }
    }

    /// Reject saves whose encoded document would exceed `quota` bytes.
    pub fn with_quota(mut self, quota: Option<usize>) -> Self {
        self.quota_bytes = quota;
        self
    }

    /// A store that has never been written loads as an empty collection.
    pub fn load(&self) -> Result<Vec<CredentialRecord>, ShelfError> {
        let bytes = self.bytes.read().map_err(|e| ShelfError::storage(format!("{e:#}")))?;
        let records = self
            .codec
            .decode(&bytes)
            .map_err(|e| ShelfError::storage(format!("{e:#}")))?;
        debug!(count = records.len(), bytes = bytes.len(), "loaded records");
        Ok(records)
    }

    pub fn save(&self, records: &[CredentialRecord]) -> Result<(), ShelfError> {
        let previous = self.bytes.read().unwrap_or_default();
        let encoded = self
            .codec
            .encode(&previous, records)
            .map_err(|e| ShelfError::storage(format!("{e:#}")))?;
        if let Some(quota) = self.quota_bytes {
            if encoded.len() > quota {
                warn!(bytes = encoded.len(), quota, "save rejected by quota");
                return Err(ShelfError::Storage(format!(
                    "quota exceeded: {} bytes needed, {quota} allowed",
                    encoded.len()
                )));
            }
        }
        self.bytes.write(&encoded).map_err(|e| {
            warn!(error = %e, "save failed");
            ShelfError::storage(format!("{e:#}"))
        })?;
        debug!(count = records.len(), bytes = encoded.len(), "saved records");
        Ok(())
    }
}
