//! Which field of a record is "the" credential, and how it is masked.
//!
//! Priority, first match wins:
//! 1. the first pinned path of an imported record,
//! 2. the marked custom field,
//! 3. `apiKey`.
//!
//! A pinned path that does not resolve falls straight through to `apiKey`;
//! the marked field is not consulted for imported records with pins.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::shelf::models::CredentialRecord;
use crate::shelf::path::{FieldPath, FieldResolutionError};

pub const API_KEY_LABEL: &str = "API Key";
pub const BULLET: char = '•';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldSource {
    Pinned,
    Marked,
    ApiKey,
}

#[derive(Debug, Clone)]
pub struct DisplayField {
    pub label: String,
    pub value: SecretString,
    pub source: FieldSource,
}

/// Boundary characters kept visible when masking. The interior is always a
/// run of `mask_run` bullets so the rendered string does not reveal length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaskPolicy {
    pub prefix_len: usize,
    pub suffix_len: usize,
    pub mask_run: usize,
}

impl Default for MaskPolicy {
    fn default() -> Self {
        Self {
            prefix_len: 2,
            suffix_len: 2,
            mask_run: 8,
        }
    }
}

impl MaskPolicy {
    pub fn mask(&self, value: &str) -> String {
        let chars: Vec<char> = value.chars().collect();
        if chars.len() <= self.prefix_len + self.suffix_len {
            return BULLET.to_string().repeat(chars.len());
        }
        let mut out = String::with_capacity(value.len() + self.mask_run * BULLET.len_utf8());
        out.extend(&chars[..self.prefix_len]);
        out.extend(std::iter::repeat(BULLET).take(self.mask_run));
        out.extend(&chars[chars.len() - self.suffix_len..]);
        out
    }
}

/// Mask with the default policy.
pub fn mask(value: &str) -> String {
    MaskPolicy::default().mask(value)
}

pub fn resolve_display_field(record: &CredentialRecord) -> DisplayField {
    if let Some(first) = record.pinned_fields().first() {
        let doc = record.to_document();
        if let Ok(value) = resolve_pinned(&doc, first) {
            return DisplayField {
                label: first.clone(),
                value: SecretString::new(value.into()),
                source: FieldSource::Pinned,
            };
        }
    } else if let Some(marked) = record.marked_field.as_deref() {
        if let Some(value) = record.custom_fields.as_ref().and_then(|f| f.get(marked)) {
            return DisplayField {
                label: marked.to_string(),
                value: SecretString::new(value.clone().into()),
                source: FieldSource::Marked,
            };
        }
    }
    DisplayField {
        label: API_KEY_LABEL.to_string(),
        value: record.api_key.clone(),
        source: FieldSource::ApiKey,
    }
}

/// Label and masked value for list rendering.
pub fn masked_display(record: &CredentialRecord, policy: &MaskPolicy) -> (String, String) {
    let field = resolve_display_field(record);
    let masked = policy.mask(field.value.expose_secret());
    (field.label, masked)
}

/// The unmasked value a copy action must place on the clipboard.
pub fn copy_value(record: &CredentialRecord) -> SecretString {
    resolve_display_field(record).value
}

/// Walk a nested path first, then try the whole path as one literal key.
fn resolve_pinned(doc: &Map<String, Value>, raw: &str) -> Result<String, FieldResolutionError> {
    let path = FieldPath::parse(raw);
    let walked = if path.is_nested() {
        path.get(doc).and_then(leaf)
    } else {
        Err(FieldResolutionError::Missing(raw.to_string()))
    };
    walked.or_else(|_| {
        doc.get(raw)
            .ok_or_else(|| FieldResolutionError::Missing(raw.to_string()))
            .and_then(leaf)
    })
}

fn leaf(value: &Value) -> Result<String, FieldResolutionError> {
    match value {
        Value::Null => Err(FieldResolutionError::Missing("null".to_string())),
        Value::String(s) => Ok(s.clone()),
        other => Ok(other.to_string()),
    }
}
