//! Bulk JSON import and export.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use tracing::debug;

use crate::shelf::error::ShelfError;
use crate::shelf::fields::DEFAULT_TAG;
use crate::shelf::models::{iso_timestamp, CredentialRecord, IdAllocator};

pub const EXPORT_FILE_NAME: &str = "api-keys-export.json";
pub const DUPLICATE_SUFFIX: &str = " (1)";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub imported: usize,
    /// Accepted records whose vendor was renamed because vendor+account
    /// already existed.
    pub duplicates: usize,
    /// Elements that were not usable records.
    pub skipped: usize,
}

/// Records produced by an import, not yet persisted.
#[derive(Debug, Clone, Default)]
pub struct ImportBatch {
    pub records: Vec<CredentialRecord>,
    pub summary: ImportSummary,
}

/// Parse an import file against the current collection.
///
/// The whole file fails with `Format` unless it is a JSON array. Elements
/// are handled one by one; malformed elements are skipped and counted.
pub fn plan_import(
    existing: &[CredentialRecord],
    text: &str,
    ids: &mut IdAllocator,
    now: DateTime<Utc>,
) -> Result<ImportBatch, ShelfError> {
    let parsed: Value = serde_json::from_str(text)
        .map_err(|e| ShelfError::format(format!("invalid JSON: {e}")))?;
    let Value::Array(items) = parsed else {
        return Err(ShelfError::format(
            "expected an array of credential objects",
        ));
    };

    let mut seen: Vec<(String, String)> = existing
        .iter()
        .map(|r| (r.vendor.to_lowercase(), r.account.to_lowercase()))
        .collect();
    let mut batch = ImportBatch::default();
    let stamp = iso_timestamp(now);

    for (n, item) in items.into_iter().enumerate() {
        match import_one(item, &seen, ids, now, &stamp) {
            Some((record, renamed)) => {
                if renamed {
                    batch.summary.duplicates += 1;
                }
                seen.push((record.vendor.to_lowercase(), record.account.to_lowercase()));
                batch.records.push(record);
                batch.summary.imported += 1;
            }
            None => {
                debug!(element = n, "skipped malformed import element");
                batch.summary.skipped += 1;
            }
        }
    }
    Ok(batch)
}

fn import_one(
    item: Value,
    seen: &[(String, String)],
    ids: &mut IdAllocator,
    now: DateTime<Utc>,
    stamp: &str,
) -> Option<(CredentialRecord, bool)> {
    let Value::Object(mut obj) = item else {
        return None;
    };
    let vendor = string_field(&obj, "vendor")?;
    let account = string_field(&obj, "account")?;
    string_field(&obj, "apiKey")?;

    let key = (vendor.to_lowercase(), account.to_lowercase());
    let renamed = seen.contains(&key);
    if renamed {
        obj.insert("vendor".into(), Value::String(format!("{vendor}{DUPLICATE_SUFFIX}")));
    }
    if string_field(&obj, "tag").is_none_or_empty() {
        obj.insert("tag".into(), Value::String(DEFAULT_TAG.to_string()));
    }
    if string_field(&obj, "createdAt").is_none_or_empty() {
        obj.insert("createdAt".into(), Value::String(stamp.to_string()));
    }
    obj.insert("id".into(), Value::String(ids.next_id(now)));
    obj.insert("updatedAt".into(), Value::String(stamp.to_string()));

    serde_json::from_value::<CredentialRecord>(Value::Object(obj))
        .ok()
        .map(|r| (r, renamed))
}

fn string_field(obj: &Map<String, Value>, name: &str) -> Option<String> {
    obj.get(name).and_then(Value::as_str).map(str::to_string)
}

trait BlankExt {
    fn is_none_or_empty(&self) -> bool;
}

impl BlankExt for Option<String> {
    fn is_none_or_empty(&self) -> bool {
        self.as_deref().map_or(true, str::is_empty)
    }
}

/// Pretty-printed JSON array of the selected records, in collection order.
pub fn export_selection(
    records: &[CredentialRecord],
    selected: &BTreeSet<String>,
) -> Result<String, ShelfError> {
    let chosen: Vec<&CredentialRecord> =
        records.iter().filter(|r| selected.contains(&r.id)).collect();
    serde_json::to_string_pretty(&chosen).map_err(ShelfError::format)
}
