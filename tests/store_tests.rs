use keyshelf::filesystem::secure::backup_path;
use keyshelf::filesystem::store::FileByteStore;
use keyshelf::shelf::codec::JsonDocumentCodec;
use keyshelf::shelf::error::ShelfError;
use keyshelf::shelf::models::CredentialRecord;
use keyshelf::shelf::ports::ByteStore;
use keyshelf::shelf::store::RecordStore;
use secrecy::ExposeSecret;
use serde_json::json;
#[cfg(target_family = "unix")]
use std::os::unix::fs::PermissionsExt;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tempfile::tempdir;

fn record(id: &str, vendor: &str) -> CredentialRecord {
    serde_json::from_value(json!({
        "id": id, "vendor": vendor, "account": "main", "apiKey": format!("key-{id}"),
        "tag": "prod", "createdAt": "2024-01-01T00:00:00.000Z",
        "updatedAt": "2024-01-01T00:00:00.000Z"
    }))
    .unwrap()
}

fn store_at(path: &Path, backups: usize, quota: Option<usize>) -> RecordStore {
    let bytes = Arc::new(FileByteStore::new_with_backups(path.to_path_buf(), backups));
    RecordStore::new(bytes, Arc::new(JsonDocumentCodec)).with_quota(quota)
}

#[test]
fn missing_file_loads_as_empty() {
    let td = tempdir().unwrap();
    let store = store_at(&td.path().join("nested").join("storage.json"), 2, None);
    assert!(store.load().unwrap().is_empty());
}

#[test]
fn save_then_load_round_trips() {
    let td = tempdir().unwrap();
    let path = td.path().join("keyshelf").join("storage.json");
    let store = store_at(&path, 2, None);
    store.save(&[record("1", "Acme"), record("2", "Other")]).unwrap();

    let loaded = store_at(&path, 2, None).load().unwrap();
    assert_eq!(loaded.len(), 2);
    assert_eq!(loaded[0].vendor, "Acme");
    assert_eq!(loaded[1].api_key.expose_secret(), "key-2");
    let text = fs::read_to_string(&path).unwrap();
    assert!(text.contains("\"apiKeys\""));
}

#[test]
fn unrelated_document_keys_survive_saves() {
    let td = tempdir().unwrap();
    let path = td.path().join("storage.json");
    fs::write(&path, r#"{"settings": {"theme": "dark"}, "apiKeys": []}"#).unwrap();
    store_at(&path, 0, None).save(&[record("1", "Acme")]).unwrap();
    let doc: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(doc["settings"]["theme"], "dark");
    assert_eq!(doc["apiKeys"].as_array().unwrap().len(), 1);
}

#[test]
fn rotating_backups_keep_n_versions() {
    let td = tempdir().unwrap();
    let path = td.path().join("storage.json");
    let store = store_at(&path, 2, None);
    store.save(&[record("1", "one")]).unwrap();
    store.save(&[record("2", "two")]).unwrap();
    store.save(&[record("3", "three")]).unwrap();

    assert!(fs::read_to_string(&path).unwrap().contains("three"));
    assert!(fs::read_to_string(backup_path(&path, 1)).unwrap().contains("two"));
    assert!(fs::read_to_string(backup_path(&path, 2)).unwrap().contains("one"));
    assert!(!backup_path(&path, 3).exists());
}

#[cfg(target_family = "unix")]
#[test]
fn storage_file_is_private() {
    let td = tempdir().unwrap();
    let path = td.path().join("storage.json");
    store_at(&path, 1, None).save(&[record("1", "Acme")]).unwrap();
    store_at(&path, 1, None).save(&[record("1", "Acme")]).unwrap();
    for p in [path.clone(), backup_path(&path, 1)] {
        let mode = fs::metadata(&p).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o600, "{}", p.display());
    }
}

#[test]
fn quota_rejects_oversized_documents_without_writing() {
    let td = tempdir().unwrap();
    let path = td.path().join("storage.json");
    store_at(&path, 0, None).save(&[record("1", "Acme")]).unwrap();
    let before = fs::read(&path).unwrap();

    let tight = store_at(&path, 0, Some(before.len() + 10));
    let many: Vec<_> = (0..20).map(|i| record(&i.to_string(), "Vendor")).collect();
    match tight.save(&many) {
        Err(ShelfError::Storage(msg)) => assert!(msg.contains("quota exceeded")),
        other => panic!("expected quota error, got {other:?}"),
    }
    assert_eq!(fs::read(&path).unwrap(), before);
}

#[test]
fn corrupt_document_is_a_storage_error() {
    let td = tempdir().unwrap();
    let path = td.path().join("storage.json");
    fs::write(&path, "{ not json").unwrap();
    assert!(matches!(
        store_at(&path, 0, None).load(),
        Err(ShelfError::Storage(_))
    ));
}

#[test]
fn byte_store_reads_raw_bytes() {
    let td = tempdir().unwrap();
    let path = td.path().join("raw.json");
    let bytes = FileByteStore::new(path.clone());
    assert!(bytes.read().unwrap().is_empty());
    bytes.write(b"{}").unwrap();
    assert_eq!(bytes.read().unwrap(), b"{}");
    assert_eq!(bytes.path(), path.as_path());
}
