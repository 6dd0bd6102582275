use crate::config::app_config::Config;
use crate::filesystem::clipboard::{
    copy_with_ttl, environment_warning, ttl_seconds, ClipboardEngine, SystemClipboardEngine,
};
use crate::filesystem::secure::{atomic_write_secure, ensure_parent_secure};
use crate::filesystem::store::FileByteStore;
use crate::shelf::codec::JsonDocumentCodec;
use crate::shelf::error::ShelfError;
use crate::shelf::fields::{ApiKeySource, ImportForm};
use crate::shelf::models::{collect_custom_fields, CredentialRecord, RecordKind};
use crate::shelf::ports::{ByteStore, Clock, StorageCodec, SystemClock};
use crate::shelf::query::{all_tags, parse_sort_selection};
use crate::shelf::resolver::{copy_value, masked_display, resolve_display_field, MaskPolicy};
use crate::shelf::state::{MarkedFieldEdit, NewRecord, RecordEdit, ShelfState};
use crate::shelf::store::RecordStore;
use crate::shelf::transfer::EXPORT_FILE_NAME;
use anyhow::{anyhow, bail, Context, Result};
use inquire::{Confirm, Password, Text};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::spawn_blocking;

pub struct Shelf<'a> {
    config: &'a Config,
    store: Arc<RecordStore>,
    clock: Arc<dyn Clock>,
}

impl<'a> Shelf<'a> {
    pub fn create(config: &'a Config) -> Self {
        let bytes: Arc<dyn ByteStore> = Arc::new(FileByteStore::new_with_backups(
            config.store_path.clone(),
            config.backups,
        ));
        let codec: Arc<dyn StorageCodec> = Arc::new(JsonDocumentCodec);
        let store = Arc::new(RecordStore::new(bytes, codec).with_quota(config.quota_bytes));
        Shelf {
            config,
            store,
            clock: Arc::new(SystemClock),
        }
    }

    pub async fn load(&self) -> Result<ShelfState> {
        let store = self.store.clone();
        let clock = self.clock.clone();
        let state = spawn_blocking(move || ShelfState::load(store, clock))
            .await
            .map_err(|_| anyhow!("task join error"))??;
        Ok(state)
    }

    /// Load, apply `f`, and hand back its result. `f` runs on the blocking pool.
    async fn mutate<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut ShelfState) -> Result<T, ShelfError> + Send + 'static,
    {
        let store = self.store.clone();
        let clock = self.clock.clone();
        let out = spawn_blocking(move || {
            let mut state = ShelfState::load(store, clock)?;
            f(&mut state)
        })
        .await
        .map_err(|_| anyhow!("task join error"))??;
        Ok(out)
    }

    pub async fn handle_add(&self, opts: AddOptions) -> Result<()> {
        let vendor = match opts.vendor {
            Some(v) => v,
            None => Text::new("Vendor").prompt()?,
        };
        let account = match opts.account {
            Some(a) => a,
            None => Text::new("Account").with_default("").prompt()?,
        };
        let api_key = match opts.api_key {
            Some(k) => k,
            None => Password::new("API key").without_confirmation().prompt()?,
        };
        let custom_fields = collect_custom_fields(parse_assignments(&opts.fields)?);

        let new = NewRecord {
            vendor: vendor.trim().to_string(),
            account: account.trim().to_string(),
            api_key: SecretString::new(api_key.trim().into()),
            tag: opts.tag.unwrap_or_default().trim().to_string(),
            custom_fields,
            marked_field: opts.mark,
        };
        let id = self.mutate(move |state| state.add(new)).await?;
        println!("✅ Record saved ({id}).");
        Ok(())
    }

    pub async fn handle_edit(&self, opts: EditOptions) -> Result<()> {
        let id = opts.id.clone();
        if opts.touches_payload() {
            let sets = parse_assignments(&opts.set)?;
            self.mutate(move |state| {
                let record = state
                    .find(&opts.id)
                    .ok_or_else(|| ShelfError::NotFound(opts.id.clone()))?;
                if record.payload().is_none() {
                    return Err(ShelfError::Invalid(format!(
                        "record '{}' has no imported fields",
                        opts.id
                    )));
                }
                let mut form = ImportForm::from_record(record);
                for (path, value) in &sets {
                    form.set_value(path, value);
                }
                if opts.unpin {
                    form.unpin_all();
                }
                if let Some(path) = &opts.pin {
                    let current = form.pinned().map(|f| f.path.to_string());
                    if current.as_deref() != Some(path.as_str()) {
                        form.toggle_pin(path)?;
                    }
                }
                if let Some(v) = opts.vendor {
                    form.vendor = v;
                }
                if let Some(a) = opts.account {
                    form.account = a;
                }
                if let Some(k) = opts.api_key {
                    form.api_key = k;
                }
                if let Some(t) = opts.tag {
                    form.tag = t;
                }
                state.update_from_form(&opts.id, &form)
            })
            .await?;
        } else {
            let custom_fields = if opts.clear_fields {
                Some(None)
            } else if opts.fields.is_empty() {
                None
            } else {
                Some(collect_custom_fields(parse_assignments(&opts.fields)?))
            };
            let marked_field = match (opts.mark, opts.unmark) {
                (_, true) => MarkedFieldEdit::Clear,
                (Some(name), false) => MarkedFieldEdit::Set(name),
                (None, false) => MarkedFieldEdit::Keep,
            };
            let edit = RecordEdit {
                vendor: opts.vendor,
                account: opts.account,
                api_key: opts.api_key.map(|k| SecretString::new(k.into())),
                tag: opts.tag,
                custom_fields,
                marked_field,
            };
            self.mutate(move |state| state.update(&opts.id, edit)).await?;
        }
        println!("✅ Record '{id}' updated.");
        Ok(())
    }

    pub async fn handle_list(
        &self,
        search: Option<String>,
        sort: Option<String>,
        tag: Option<String>,
        json_mode: bool,
    ) -> Result<()> {
        let mut state = self.load().await?;
        let (sort_key, sort_tag) = match sort.as_deref() {
            Some(raw) => parse_sort_selection(raw),
            None => (self.config.default_sort, None),
        };
        state.set_search(search.unwrap_or_default());
        state.set_sort(sort_key);
        state.set_tag_filter(tag.or(sort_tag));

        let rows: Vec<ListRow> = state
            .visible()
            .into_iter()
            .map(|r| ListRow::new(r, &self.config.mask))
            .collect();

        if json_mode {
            println!("{}", serde_json::to_string_pretty(&rows)?);
            return Ok(());
        }
        if rows.is_empty() {
            println!("(empty)");
            return Ok(());
        }
        for row in rows {
            println!("{}", row.line());
        }
        Ok(())
    }

    pub async fn handle_show(&self, id: &str, reveal: bool) -> Result<()> {
        let state = self.load().await?;
        let Some(record) = state.find(id) else {
            bail!("record '{}' not found", id);
        };
        let policy = &self.config.mask;
        let secret = |value: &str| {
            if reveal {
                value.to_string()
            } else {
                policy.mask(value)
            }
        };

        println!("Id:       {}", record.id);
        println!("Vendor:   {}", record.vendor);
        println!("Account:  {}", record.account);
        println!("Tags:     {}", record.tag);
        println!("Created:  {}", record.created_at);
        println!("Updated:  {}", record.updated_at);
        println!("API key:  {}", secret(record.api_key.expose_secret()));
        if let Some(fields) = &record.custom_fields {
            println!("Custom fields:");
            for (name, value) in fields {
                let marker = if record.marked_field.as_deref() == Some(name.as_str()) {
                    " ⭐"
                } else {
                    ""
                };
                println!("  {name}: {}{marker}", secret(value));
            }
        }
        if let RecordKind::Imported(payload) = &record.kind {
            let first_pin = payload.pinned.first().map(String::as_str);
            println!("Imported fields:");
            let form = ImportForm::from_record(record);
            for field in form.fields() {
                let path = field.path.to_string();
                let marker = if Some(path.as_str()) == first_pin { " 📌" } else { "" };
                println!("  {path}: {}{marker}", secret(&field.value));
            }
        }
        let shown = resolve_display_field(record);
        println!(
            "Displayed: {} = {}",
            shown.label,
            secret(shown.value.expose_secret())
        );
        if !reveal {
            println!("(use --reveal to show secrets)");
        }
        Ok(())
    }

    pub async fn handle_get(
        &self,
        id: &str,
        no_copy: bool,
        ttl_override: Option<u64>,
        echo: bool,
    ) -> Result<()> {
        let state = self.load().await?;
        let Some(record) = state.find(id) else {
            println!("❌ No record found with id '{id}'");
            return Ok(());
        };
        let value = copy_value(record);

        if echo {
            println!("{}", value.expose_secret());
        }
        if no_copy {
            return Ok(());
        }

        let ttl_secs = ttl_seconds(self.config, ttl_override);
        if let Some(warn) = environment_warning() {
            eprintln!("⚠️ {warn}");
        }
        match SystemClipboardEngine::new() {
            Ok(engine_impl) => {
                let engine = Arc::new(engine_impl) as Arc<dyn ClipboardEngine>;
                if let Err(e) = copy_with_ttl(engine, &value, Duration::from_secs(ttl_secs)) {
                    eprintln!("⚠️ Failed to copy to clipboard: {e}");
                }
            }
            Err(e) => {
                eprintln!("⚠️ Clipboard not available: {e}");
            }
        }
        Ok(())
    }

    pub async fn handle_rm(&self, ids: Vec<String>, yes: bool) -> Result<()> {
        let state = self.load().await?;
        let (known, unknown): (Vec<String>, Vec<String>) =
            ids.into_iter().partition(|id| state.find(id).is_some());
        for id in &unknown {
            println!("❌ No record found with id '{id}'");
        }
        if known.is_empty() {
            return Ok(());
        }

        if !yes {
            let msg = format!("Delete {} record(s)?", known.len());
            let proceed = Confirm::new(&msg).with_default(false).prompt()?;
            if !proceed {
                println!("❎ Deletion cancelled.");
                return Ok(());
            }
        }

        let removed = self
            .mutate(move |state| {
                for id in &known {
                    state.select(id);
                }
                state.delete_selected()
            })
            .await?;
        println!("🗑️ Removed {removed} record(s).");
        Ok(())
    }

    pub async fn handle_import(&self, file: PathBuf) -> Result<()> {
        let text = tokio::fs::read_to_string(&file)
            .await
            .with_context(|| format!("Failed to read {}", file.display()))?;
        let summary = self.mutate(move |state| state.import_json(&text)).await?;
        println!(
            "✅ Imported {} record(s): {} renamed as duplicates, {} skipped.",
            summary.imported, summary.duplicates, summary.skipped
        );
        Ok(())
    }

    pub async fn handle_export(
        &self,
        ids: Vec<String>,
        all: bool,
        out: Option<PathBuf>,
    ) -> Result<()> {
        let mut state = self.load().await?;
        if all {
            state.select_all();
        } else {
            for id in &ids {
                if !state.select(id) {
                    println!("❌ No record found with id '{id}'");
                }
            }
        }
        let count = state.selection().len();
        if count == 0 {
            bail!("nothing to export; pass record ids or --all");
        }
        let text = state.export_selected()?;
        let target = out.unwrap_or_else(|| PathBuf::from(EXPORT_FILE_NAME));
        let path = target.clone();
        spawn_blocking(move || {
            ensure_parent_secure(&path)?;
            atomic_write_secure(&path, format!("{text}\n").as_bytes())
        })
        .await
        .map_err(|_| anyhow!("task join error"))??;
        println!("✅ Exported {count} record(s) to {}", target.display());
        Ok(())
    }

    pub async fn handle_import_record(&self, opts: ImportRecordOptions) -> Result<()> {
        let text = tokio::fs::read_to_string(&opts.file)
            .await
            .with_context(|| format!("Failed to read {}", opts.file.display()))?;
        let value: serde_json::Value = serde_json::from_str(&text)
            .map_err(|e| ShelfError::format(format!("invalid JSON: {e}")))?;
        let mut form = ImportForm::from_json(&value)?;
        for (path, v) in parse_assignments(&opts.set)? {
            form.set_value(&path, &v);
        }
        if let Some(path) = &opts.pin {
            form.toggle_pin(path)?;
        }

        if opts.list_fields {
            for field in form.fields() {
                let marker = if field.pinned { " 📌" } else { "" };
                println!(
                    "{}: {}{marker}",
                    field.path,
                    self.config.mask.mask(&field.value)
                );
            }
            return Ok(());
        }

        form.vendor = opts.vendor.unwrap_or_default();
        form.account = opts.account.unwrap_or_default();
        form.api_key = opts.api_key.unwrap_or_default();
        form.tag = opts.tag.unwrap_or_default();
        let source = form.assemble()?.api_key_source;
        let id = self.mutate(move |state| state.add_from_form(&form)).await?;
        if source == ApiKeySource::Placeholder {
            eprintln!("⚠️ No credential field found; pin one with `keyshelf edit {id} --pin PATH`.");
        }
        println!("✅ Record saved ({id}).");
        Ok(())
    }

    pub async fn handle_tags(&self) -> Result<()> {
        let state = self.load().await?;
        let tags = all_tags(state.records());
        if tags.is_empty() {
            println!("(no tags)");
        }
        for tag in tags {
            println!("{tag}");
        }
        Ok(())
    }
}

/// `NAME=VALUE` pairs; the value may itself contain `=`.
pub fn parse_assignments(raw: &[String]) -> Result<Vec<(String, String)>> {
    raw.iter()
        .map(|item| {
            item.split_once('=')
                .map(|(k, v)| (k.trim().to_string(), v.to_string()))
                .ok_or_else(|| anyhow!("expected NAME=VALUE, got '{item}'"))
        })
        .collect()
}

/// One line of `list` output. Holds only the masked credential.
#[derive(Debug, Serialize)]
pub struct ListRow {
    pub id: String,
    pub vendor: String,
    pub account: String,
    pub created: String,
    pub label: String,
    pub masked: String,
    pub tags: Vec<String>,
}

impl ListRow {
    pub fn new(record: &CredentialRecord, policy: &MaskPolicy) -> Self {
        let (label, masked) = masked_display(record, policy);
        let created = record
            .created_instant()
            .map(|t| t.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| record.created_at.clone());
        ListRow {
            id: record.id.clone(),
            vendor: record.vendor.clone(),
            account: record.account.clone(),
            created,
            label,
            masked,
            tags: record.tags().map(str::to_string).collect(),
        }
    }

    pub fn line(&self) -> String {
        format!(
            "{:<14} {:<20} {:<16} {:<10} {}: {}  [{}]",
            self.id,
            self.vendor,
            self.account,
            self.created,
            self.label,
            self.masked,
            self.tags.join(", ")
        )
    }
}

// Options for the add command, constructed by CLI layer
#[derive(Debug, Clone, Default)]
pub struct AddOptions {
    pub vendor: Option<String>,
    pub account: Option<String>,
    pub api_key: Option<String>,
    pub tag: Option<String>,
    pub fields: Vec<String>,
    pub mark: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct EditOptions {
    pub id: String,
    pub vendor: Option<String>,
    pub account: Option<String>,
    pub api_key: Option<String>,
    pub tag: Option<String>,
    pub fields: Vec<String>,
    pub clear_fields: bool,
    pub mark: Option<String>,
    pub unmark: bool,
    pub set: Vec<String>,
    pub pin: Option<String>,
    pub unpin: bool,
}

impl EditOptions {
    fn touches_payload(&self) -> bool {
        !self.set.is_empty() || self.pin.is_some() || self.unpin
    }
}

#[derive(Debug, Clone, Default)]
pub struct ImportRecordOptions {
    pub file: PathBuf,
    pub list_fields: bool,
    pub set: Vec<String>,
    pub pin: Option<String>,
    pub vendor: Option<String>,
    pub account: Option<String>,
    pub api_key: Option<String>,
    pub tag: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn assignments_split_on_first_equals() {
        let parsed = parse_assignments(&["url=https://x?a=b".to_string()]).unwrap();
        assert_eq!(parsed, vec![("url".to_string(), "https://x?a=b".to_string())]);
        assert!(parse_assignments(&["novalue".to_string()]).is_err());
    }

    #[test]
    fn list_row_holds_masked_value_only() {
        let rec: CredentialRecord = serde_json::from_value(json!({
            "id": "1717243200000", "vendor": "OpenAI", "account": "main",
            "apiKey": "sk-12345678", "tag": "prod, ai",
            "createdAt": "2024-06-01T12:00:00.000Z", "updatedAt": "2024-06-01T12:00:00.000Z"
        }))
        .unwrap();
        let row = ListRow::new(&rec, &MaskPolicy::default());
        assert_eq!(row.created, "2024-06-01");
        assert_eq!(row.masked, "sk••••••••78");
        assert_eq!(row.tags, vec!["prod", "ai"]);
        let line = row.line();
        assert!(line.contains("API Key: sk••••••••78"));
        assert!(!line.contains("12345678"));
        let json = serde_json::to_string(&row).unwrap();
        assert!(!json.contains("12345678"));
    }
}
