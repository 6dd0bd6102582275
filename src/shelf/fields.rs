//! Single-record "import to form": an arbitrary JSON object becomes a list
//! of editable leaf fields, one of which may be pinned as the credential.
//! Submitting the form rebuilds the nested structure from the field paths.

use secrecy::{ExposeSecret, SecretString};
use serde_json::{Map, Value};
use tracing::debug;

use crate::shelf::error::ShelfError;
use crate::shelf::models::{CredentialRecord, ImportedPayload, STANDARD_FIELDS};
use crate::shelf::path::FieldPath;

pub const NO_API_KEY: &str = "No API Key Found";
pub const DEFAULT_VENDOR: &str = "Imported API";
pub const DEFAULT_ACCOUNT: &str = "Default";
pub const DEFAULT_TAG: &str = "imported";

/// Substrings (lower case) that make a field name look like a credential.
const CREDENTIAL_HINTS: [&str; 3] = ["key", "secret", "token"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlatField {
    pub path: FieldPath,
    pub value: String,
    pub pinned: bool,
}

/// Flatten a JSON document into leaf fields, in document order.
///
/// A top-level array contributes its first element only.
pub fn flatten_json_to_fields(value: &Value) -> Result<Vec<FlatField>, ShelfError> {
    let target = match value {
        Value::Array(items) => items
            .first()
            .ok_or_else(|| ShelfError::format("expected an object, got an empty array"))?,
        other => other,
    };
    let Value::Object(map) = target else {
        return Err(ShelfError::format("expected a JSON object"));
    };
    let mut out = Vec::new();
    walk_object(map, &FieldPath::root(), &mut out);
    Ok(out)
}

fn walk_object(map: &Map<String, Value>, prefix: &FieldPath, out: &mut Vec<FlatField>) {
    for (key, value) in map {
        walk_value(value, prefix.child(key), out);
    }
}

fn walk_value(value: &Value, path: FieldPath, out: &mut Vec<FlatField>) {
    match value {
        Value::Object(map) => walk_object(map, &path, out),
        Value::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                walk_value(item, path.index(i), out);
            }
        }
        leaf => out.push(FlatField {
            path,
            value: leaf_text(leaf),
            pinned: false,
        }),
    }
}

/// Text shown in an input for a JSON leaf.
pub fn leaf_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}

/// First field whose path mentions key, secret or token (case-insensitive).
pub fn guess_api_key_field(fields: &[FlatField]) -> Option<&FlatField> {
    fields.iter().find(|f| {
        let name = f.path.to_string().to_lowercase();
        CREDENTIAL_HINTS.iter().any(|hint| name.contains(hint))
    })
}

/// Where the credential of an assembled record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiKeySource {
    Manual,
    Pinned,
    Guessed,
    Placeholder,
}

/// Dynamic fields plus the static inputs shown beside them.
#[derive(Debug, Clone, Default)]
pub struct ImportForm {
    fields: Vec<FlatField>,
    pub vendor: String,
    pub account: String,
    pub api_key: String,
    pub tag: String,
}

/// Result of submitting an [`ImportForm`].
#[derive(Debug, Clone)]
pub struct AssembledRecord {
    pub vendor: String,
    pub account: String,
    pub api_key: SecretString,
    pub api_key_source: ApiKeySource,
    pub tag: String,
    pub created_at: Option<String>,
    pub payload: ImportedPayload,
}

impl ImportForm {
    pub fn from_json(value: &Value) -> Result<Self, ShelfError> {
        Ok(Self {
            fields: flatten_json_to_fields(value)?,
            ..Self::default()
        })
    }

    /// Edit form for an existing imported record: its payload as dynamic
    /// fields with pins restored, the standard fields as static inputs.
    pub fn from_record(record: &CredentialRecord) -> Self {
        let mut fields = Vec::new();
        if let Some(payload) = record.payload() {
            walk_object(&payload.tree, &FieldPath::root(), &mut fields);
            // A literal key may itself contain a dot.
            let first_pin = payload.pinned.first().map(String::as_str);
            for f in &mut fields {
                f.pinned = first_pin == Some(f.path.to_string().as_str());
            }
        }
        Self {
            fields,
            vendor: record.vendor.clone(),
            account: record.account.clone(),
            api_key: record.api_key.expose_secret().to_string(),
            tag: record.tag.clone(),
        }
    }

    pub fn fields(&self) -> &[FlatField] {
        &self.fields
    }

    pub fn pinned(&self) -> Option<&FlatField> {
        self.fields.iter().find(|f| f.pinned)
    }

    /// Set a field's value, adding the field when the path is new.
    pub fn set_value(&mut self, raw_path: &str, value: &str) {
        let path = FieldPath::parse(raw_path);
        match self.fields.iter_mut().find(|f| f.path == path) {
            Some(field) => field.value = value.to_string(),
            None => self.fields.push(FlatField {
                path,
                value: value.to_string(),
                pinned: false,
            }),
        }
    }

    /// Pin `raw_path`, unpinning every other field; pinning the currently
    /// pinned field unpins it. Returns whether the field ends up pinned.
    pub fn toggle_pin(&mut self, raw_path: &str) -> Result<bool, ShelfError> {
        let path = FieldPath::parse(raw_path);
        let idx = self
            .fields
            .iter()
            .position(|f| f.path == path)
            .ok_or_else(|| ShelfError::Invalid(format!("no field named {raw_path}")))?;
        let now_pinned = !self.fields[idx].pinned;
        for (i, f) in self.fields.iter_mut().enumerate() {
            f.pinned = i == idx && now_pinned;
        }
        Ok(now_pinned)
    }

    pub fn unpin_all(&mut self) {
        for f in &mut self.fields {
            f.pinned = false;
        }
    }

    /// Rebuild the nested payload and derive the standard fields.
    ///
    /// Top-level `vendor`, `account`, `tag` and `createdAt` keys in the
    /// payload feed the standard fields; other reserved names are dropped.
    /// Credential precedence: manual input, pinned field, name heuristic,
    /// then [`NO_API_KEY`]. Fails when a field path cannot be written back,
    /// e.g. an array index past the end.
    pub fn assemble(&self) -> Result<AssembledRecord, ShelfError> {
        let mut tree = Map::new();
        for f in &self.fields {
            f.path.set(&mut tree, Value::String(f.value.trim().to_string()))?;
        }
        let mut lifted = |name: &str| match tree.remove(name) {
            Some(Value::String(s)) if !s.trim().is_empty() => Some(s),
            _ => None,
        };
        let from_vendor = lifted("vendor");
        let from_account = lifted("account");
        let from_tag = lifted("tag");
        let created_at = lifted("createdAt");
        for reserved in STANDARD_FIELDS {
            if tree.remove(reserved).is_some() {
                debug!(field = reserved, "dropped reserved key from imported payload");
            }
        }

        let (api_key, api_key_source) = self.choose_api_key();
        let pinned = self
            .pinned()
            .map(|f| vec![f.path.to_string()])
            .unwrap_or_default();

        Ok(AssembledRecord {
            vendor: non_blank(&self.vendor)
                .or(from_vendor)
                .unwrap_or_else(|| DEFAULT_VENDOR.to_string()),
            account: non_blank(&self.account)
                .or(from_account)
                .unwrap_or_else(|| DEFAULT_ACCOUNT.to_string()),
            api_key: SecretString::new(api_key.into()),
            api_key_source,
            tag: non_blank(&self.tag)
                .or(from_tag)
                .unwrap_or_else(|| DEFAULT_TAG.to_string()),
            created_at,
            payload: ImportedPayload { tree, pinned },
        })
    }

    fn choose_api_key(&self) -> (String, ApiKeySource) {
        if let Some(manual) = non_blank(&self.api_key) {
            return (manual, ApiKeySource::Manual);
        }
        if let Some(pinned) = self.pinned() {
            return match non_blank(&pinned.value) {
                Some(v) => (v, ApiKeySource::Pinned),
                None => (NO_API_KEY.to_string(), ApiKeySource::Placeholder),
            };
        }
        match guess_api_key_field(&self.fields).and_then(|f| non_blank(&f.value)) {
            Some(v) => (v, ApiKeySource::Guessed),
            None => (NO_API_KEY.to_string(), ApiKeySource::Placeholder),
        }
    }
}

fn non_blank(s: &str) -> Option<String> {
    let t = s.trim();
    (!t.is_empty()).then(|| t.to_string())
}
