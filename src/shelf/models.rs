use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Top-level keys owned by the record itself. Everything else on a stored
/// object belongs to the imported payload.
pub const STANDARD_FIELDS: [&str; 10] = [
    "id",
    "vendor",
    "account",
    "apiKey",
    "tag",
    "customFields",
    "markedField",
    "pinnedFields",
    "createdAt",
    "updatedAt",
];

pub type CustomFields = BTreeMap<String, String>;

/// A stored credential. Serializes to the flat object layout used on disk
/// and in export files, with the imported payload spread onto the top level.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "StoredRecord", into = "StoredRecord")]
pub struct CredentialRecord {
    pub id: String,
    pub vendor: String,
    pub account: String,
    pub api_key: SecretString,
    /// Comma separated; see [`CredentialRecord::tags`].
    pub tag: String,
    pub custom_fields: Option<CustomFields>,
    pub marked_field: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    pub kind: RecordKind,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum RecordKind {
    #[default]
    Standard,
    Imported(ImportedPayload),
}

/// Free-form JSON brought in through the import-to-form flow.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportedPayload {
    pub tree: Map<String, Value>,
    /// Paths into the record; only the first one is used for display.
    pub pinned: Vec<String>,
}

impl CredentialRecord {
    /// Trimmed tag tokens, in input order. Empty tokens are kept.
    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.tag.split(',').map(str::trim)
    }

    pub fn payload(&self) -> Option<&ImportedPayload> {
        match &self.kind {
            RecordKind::Imported(p) => Some(p),
            RecordKind::Standard => None,
        }
    }

    pub fn pinned_fields(&self) -> &[String] {
        self.payload().map(|p| p.pinned.as_slice()).unwrap_or(&[])
    }

    pub fn created_instant(&self) -> Option<DateTime<Utc>> {
        parse_instant(&self.created_at)
    }

    /// The record as the flat JSON object it is stored as.
    pub fn to_document(&self) -> Map<String, Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }
}

/// RFC 3339 timestamps, or bare `YYYY-MM-DD` dates read as midnight UTC.
pub fn parse_instant(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

pub fn iso_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Trim keys and values, drop entries with blank keys. `None` when nothing is left.
pub fn collect_custom_fields<I>(pairs: I) -> Option<CustomFields>
where
    I: IntoIterator<Item = (String, String)>,
{
    let fields: CustomFields = pairs
        .into_iter()
        .filter_map(|(k, v)| {
            let k = k.trim();
            (!k.is_empty()).then(|| (k.to_string(), v.trim().to_string()))
        })
        .collect();
    (!fields.is_empty()).then_some(fields)
}

/// Hands out millisecond-timestamp ids that never repeat within a store.
#[derive(Debug, Default)]
pub struct IdAllocator {
    last: i64,
}

impl IdAllocator {
    pub fn seeded(records: &[CredentialRecord]) -> Self {
        let last = records
            .iter()
            .filter_map(|r| r.id.parse::<i64>().ok())
            .max()
            .unwrap_or(0);
        Self { last }
    }

    pub fn next_id(&mut self, now: DateTime<Utc>) -> String {
        let id = now.timestamp_millis().max(self.last + 1);
        self.last = id;
        id.to_string()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredRecord {
    id: String,
    // Older popup imports could leave these out entirely.
    #[serde(default)]
    vendor: String,
    #[serde(default)]
    account: String,
    #[serde(default = "empty_secret", with = "crate::shelf::secret_serde::secret_string")]
    api_key: SecretString,
    #[serde(default)]
    tag: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    custom_fields: Option<CustomFields>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    marked_field: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pinned_fields: Option<Vec<String>>,
    #[serde(default)]
    created_at: String,
    #[serde(default)]
    updated_at: String,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

fn empty_secret() -> SecretString {
    SecretString::new(String::new().into())
}

impl From<StoredRecord> for CredentialRecord {
    fn from(s: StoredRecord) -> Self {
        let kind = if s.pinned_fields.is_some() || !s.extra.is_empty() {
            RecordKind::Imported(ImportedPayload {
                tree: s.extra,
                pinned: s.pinned_fields.unwrap_or_default(),
            })
        } else {
            RecordKind::Standard
        };
        CredentialRecord {
            id: s.id,
            vendor: s.vendor,
            account: s.account,
            api_key: s.api_key,
            tag: s.tag,
            custom_fields: s.custom_fields,
            marked_field: s.marked_field,
            created_at: s.created_at,
            updated_at: s.updated_at,
            kind,
        }
    }
}

impl From<CredentialRecord> for StoredRecord {
    fn from(r: CredentialRecord) -> Self {
        let (extra, pinned_fields) = match r.kind {
            RecordKind::Standard => (Map::new(), None),
            RecordKind::Imported(p) => {
                let pinned = (!p.pinned.is_empty()).then_some(p.pinned);
                (p.tree, pinned)
            }
        };
        StoredRecord {
            id: r.id,
            vendor: r.vendor,
            account: r.account,
            api_key: r.api_key,
            tag: r.tag,
            custom_fields: r.custom_fields,
            marked_field: r.marked_field,
            pinned_fields,
            created_at: r.created_at,
            updated_at: r.updated_at,
            extra,
        }
    }
}
