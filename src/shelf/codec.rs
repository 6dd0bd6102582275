use crate::shelf::models::CredentialRecord;
use crate::shelf::ports::StorageCodec;
use anyhow::{anyhow, Context, Result};
use serde_json::{Map, Value};

/// Key the record array lives under inside the storage document.
pub const STORAGE_KEY: &str = "apiKeys";

/// A pretty-printed JSON object; the records sit under [`STORAGE_KEY`].
pub struct JsonDocumentCodec;

impl JsonDocumentCodec {
    fn parse_document(data: &[u8]) -> Result<Option<Map<String, Value>>> {
        let text = std::str::from_utf8(data).map_err(|_| anyhow!("storage is not valid UTF-8"))?;
        if text.trim().is_empty() {
            return Ok(None);
        }
        match serde_json::from_str::<Value>(text).context("storage is not valid JSON")? {
            Value::Object(map) => Ok(Some(map)),
            _ => Err(anyhow!("storage document is not a JSON object")),
        }
    }
}

impl StorageCodec for JsonDocumentCodec {
    fn decode(&self, data: &[u8]) -> Result<Vec<CredentialRecord>> {
        let Some(mut doc) = Self::parse_document(data)? else {
            return Ok(Vec::new());
        };
        match doc.remove(STORAGE_KEY) {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(value) => serde_json::from_value(value)
                .with_context(|| format!("failed to parse `{STORAGE_KEY}` records")),
        }
    }

    fn encode(&self, previous: &[u8], records: &[CredentialRecord]) -> Result<Vec<u8>> {
        // An unreadable previous document is replaced rather than blocking the save.
        let mut doc = Self::parse_document(previous).ok().flatten().unwrap_or_default();
        doc.insert(STORAGE_KEY.to_string(), serde_json::to_value(records)?);
        let mut out = serde_json::to_string_pretty(&Value::Object(doc))?;
        out.push('\n');
        Ok(out.into_bytes())
    }
}
