//! In-memory application state over a [`RecordStore`].
//!
//! Every mutation builds the next collection, saves it, and only then swaps
//! it in. A failed save leaves records and selection untouched.

use std::collections::BTreeSet;
use std::sync::Arc;

use secrecy::SecretString;
use tracing::{info, warn};

use crate::shelf::error::ShelfError;
use crate::shelf::fields::ImportForm;
use crate::shelf::models::{
    iso_timestamp, CredentialRecord, CustomFields, IdAllocator, RecordKind,
};
use crate::shelf::ports::Clock;
use crate::shelf::query::{all_tags, Query, SortKey};
use crate::shelf::store::RecordStore;
use crate::shelf::transfer::{export_selection, plan_import, ImportSummary};

/// Input for a manual add.
#[derive(Debug, Clone)]
pub struct NewRecord {
    pub vendor: String,
    pub account: String,
    pub api_key: SecretString,
    pub tag: String,
    pub custom_fields: Option<CustomFields>,
    pub marked_field: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub enum MarkedFieldEdit {
    #[default]
    Keep,
    Set(String),
    Clear,
}

/// Field-level replacements; `None` keeps the current value.
/// `custom_fields: Some(..)` replaces the whole map.
#[derive(Debug, Clone, Default)]
pub struct RecordEdit {
    pub vendor: Option<String>,
    pub account: Option<String>,
    pub api_key: Option<SecretString>,
    pub tag: Option<String>,
    pub custom_fields: Option<Option<CustomFields>>,
    pub marked_field: MarkedFieldEdit,
}

pub struct ShelfState {
    store: Arc<RecordStore>,
    clock: Arc<dyn Clock>,
    records: Vec<CredentialRecord>,
    ids: IdAllocator,
    selection: BTreeSet<String>,
    query: Query,
}

impl ShelfState {
    pub fn load(store: Arc<RecordStore>, clock: Arc<dyn Clock>) -> Result<Self, ShelfError> {
        let records = store.load()?;
        Ok(Self {
            ids: IdAllocator::seeded(&records),
            store,
            clock,
            records,
            selection: BTreeSet::new(),
            query: Query::default(),
        })
    }

    pub fn records(&self) -> &[CredentialRecord] {
        &self.records
    }

    pub fn find(&self, id: &str) -> Option<&CredentialRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    /// Records passing the current search and tag filter, in sort order.
    pub fn visible(&self) -> Vec<&CredentialRecord> {
        self.query.apply(&self.records)
    }

    pub fn query(&self) -> &Query {
        &self.query
    }

    pub fn set_search(&mut self, term: impl Into<String>) {
        self.query.search = term.into();
    }

    pub fn set_sort(&mut self, sort: SortKey) {
        self.query.sort = sort;
    }

    pub fn cycle_sort(&mut self) -> SortKey {
        self.query.sort = self.query.sort.next();
        self.query.sort
    }

    pub fn set_tag_filter(&mut self, tag: Option<String>) {
        self.query.tag = tag;
    }

    /// No filter, then each known tag in order, then back to no filter.
    pub fn cycle_tag_filter(&mut self) -> Option<&str> {
        let tags = all_tags(&self.records);
        let next = match self.query.tag.as_deref() {
            None => tags.iter().next().cloned(),
            Some(current) => tags
                .range::<str, _>((
                    std::ops::Bound::Excluded(current),
                    std::ops::Bound::Unbounded,
                ))
                .next()
                .cloned(),
        };
        self.query.tag = next;
        self.query.tag.as_deref()
    }

    pub fn add(&mut self, new: NewRecord) -> Result<String, ShelfError> {
        let custom_fields = new.custom_fields.filter(|f| !f.is_empty());
        let marked_field = checked_mark(new.marked_field, custom_fields.as_ref())?;
        let now = self.clock.now();
        let stamp = iso_timestamp(now);
        let record = CredentialRecord {
            id: self.ids.next_id(now),
            vendor: new.vendor,
            account: new.account,
            api_key: new.api_key,
            tag: new.tag,
            custom_fields,
            marked_field,
            created_at: stamp.clone(),
            updated_at: stamp,
            kind: RecordKind::Standard,
        };
        let id = record.id.clone();
        let mut next = self.records.clone();
        next.push(record);
        self.commit(next)?;
        Ok(id)
    }

    pub fn update(&mut self, id: &str, edit: RecordEdit) -> Result<(), ShelfError> {
        let mut next = self.records.clone();
        let record = next
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| ShelfError::NotFound(id.to_string()))?;

        if let Some(v) = edit.vendor {
            record.vendor = v;
        }
        if let Some(a) = edit.account {
            record.account = a;
        }
        if let Some(k) = edit.api_key {
            record.api_key = k;
        }
        if let Some(t) = edit.tag {
            record.tag = t;
        }
        if let Some(fields) = edit.custom_fields {
            record.custom_fields = fields.filter(|f| !f.is_empty());
        }
        let requested = match edit.marked_field {
            MarkedFieldEdit::Keep => record.marked_field.take().filter(|m| {
                record
                    .custom_fields
                    .as_ref()
                    .is_some_and(|f| f.contains_key(m))
            }),
            MarkedFieldEdit::Set(name) => Some(name),
            MarkedFieldEdit::Clear => None,
        };
        record.marked_field = checked_mark(requested, record.custom_fields.as_ref())?;
        record.updated_at = iso_timestamp(self.clock.now());
        self.commit(next)
    }

    /// Store the submitted form as a new imported record.
    pub fn add_from_form(&mut self, form: &ImportForm) -> Result<String, ShelfError> {
        let assembled = form.assemble()?;
        let now = self.clock.now();
        let stamp = iso_timestamp(now);
        let record = CredentialRecord {
            id: self.ids.next_id(now),
            vendor: assembled.vendor,
            account: assembled.account,
            api_key: assembled.api_key,
            tag: assembled.tag,
            custom_fields: None,
            marked_field: None,
            created_at: assembled.created_at.unwrap_or_else(|| stamp.clone()),
            updated_at: stamp,
            kind: RecordKind::Imported(assembled.payload),
        };
        let id = record.id.clone();
        let mut next = self.records.clone();
        next.push(record);
        self.commit(next)?;
        Ok(id)
    }

    /// Replace the standard fields and payload of `id` from an edited form.
    /// Custom fields, the marked field and `createdAt` are kept.
    pub fn update_from_form(&mut self, id: &str, form: &ImportForm) -> Result<(), ShelfError> {
        let assembled = form.assemble()?;
        let mut next = self.records.clone();
        let record = next
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| ShelfError::NotFound(id.to_string()))?;
        record.vendor = assembled.vendor;
        record.account = assembled.account;
        record.api_key = assembled.api_key;
        record.tag = assembled.tag;
        record.kind = RecordKind::Imported(assembled.payload);
        record.updated_at = iso_timestamp(self.clock.now());
        self.commit(next)
    }

    /// Remove every selected record. Returns how many were removed.
    pub fn delete_selected(&mut self) -> Result<usize, ShelfError> {
        if self.selection.is_empty() {
            return Ok(0);
        }
        let next: Vec<CredentialRecord> = self
            .records
            .iter()
            .filter(|r| !self.selection.contains(&r.id))
            .cloned()
            .collect();
        let removed = self.records.len() - next.len();
        self.commit(next)?;
        self.selection.clear();
        Ok(removed)
    }

    /// Bulk import. Writes once for the whole batch, and not at all when
    /// nothing was accepted.
    pub fn import_json(&mut self, text: &str) -> Result<ImportSummary, ShelfError> {
        let batch = plan_import(&self.records, text, &mut self.ids, self.clock.now())?;
        if !batch.records.is_empty() {
            let mut next = self.records.clone();
            next.extend(batch.records);
            self.commit(next)?;
        }
        let s = batch.summary;
        info!(
            imported = s.imported,
            duplicates = s.duplicates,
            skipped = s.skipped,
            "bulk import finished"
        );
        Ok(s)
    }

    pub fn export_selected(&self) -> Result<String, ShelfError> {
        export_selection(&self.records, &self.selection)
    }

    pub fn selection(&self) -> &BTreeSet<String> {
        &self.selection
    }

    pub fn is_selected(&self, id: &str) -> bool {
        self.selection.contains(id)
    }

    /// Unknown ids are ignored.
    pub fn select(&mut self, id: &str) -> bool {
        if self.find(id).is_none() {
            return false;
        }
        self.selection.insert(id.to_string());
        true
    }

    pub fn deselect(&mut self, id: &str) {
        self.selection.remove(id);
    }

    pub fn toggle(&mut self, id: &str) {
        if !self.selection.remove(id) {
            self.select(id);
        }
    }

    pub fn select_all(&mut self) {
        self.selection = self.records.iter().map(|r| r.id.clone()).collect();
    }

    /// Select every visible record, or clear the selection when all visible
    /// records are already selected.
    pub fn toggle_all_visible(&mut self) {
        let visible: Vec<String> = self.visible().iter().map(|r| r.id.clone()).collect();
        if !visible.is_empty() && visible.iter().all(|id| self.selection.contains(id)) {
            self.selection.clear();
        } else {
            self.selection.extend(visible);
        }
    }

    fn commit(&mut self, next: Vec<CredentialRecord>) -> Result<(), ShelfError> {
        match self.store.save(&next) {
            Ok(()) => {
                self.records = next;
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "save failed, keeping previous records");
                Err(e)
            }
        }
    }
}

fn checked_mark(
    marked: Option<String>,
    fields: Option<&CustomFields>,
) -> Result<Option<String>, ShelfError> {
    match marked {
        Some(name) if !fields.is_some_and(|f| f.contains_key(&name)) => Err(
            ShelfError::Invalid(format!("marked field '{name}' is not a custom field")),
        ),
        other => Ok(other),
    }
}
