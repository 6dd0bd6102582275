use assert_cmd::prelude::*;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::Path;
use std::process::Command;
use tempfile::{tempdir, TempDir};

struct Env {
    dir: TempDir,
}

impl Env {
    fn new() -> Self {
        Self {
            dir: tempdir().unwrap(),
        }
    }

    fn store(&self) -> String {
        self.dir.path().join("storage.json").to_string_lossy().to_string()
    }

    fn file(&self, name: &str, content: &str) -> String {
        let path = self.dir.path().join(name);
        fs::write(&path, content).unwrap();
        path.to_string_lossy().to_string()
    }

    fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("keyshelf").unwrap();
        cmd.env("KEYSHELF_CONFIG_DIR", self.dir.path().join("cfg"))
            .env_remove("KEYSHELF_STORE_PATH")
            .env_remove("KEYSHELF_QUOTA_BYTES")
            .arg("--path")
            .arg(self.store());
        cmd
    }

    fn add(&self, vendor: &str, account: &str, key: &str, tag: &str) {
        self.cmd()
            .args(["add", "--vendor", vendor, "--account", account])
            .args(["--api-key", key, "--tag", tag])
            .assert()
            .success()
            .stdout(predicate::str::contains("✅ Record saved"));
    }

    fn rows(&self) -> Vec<Value> {
        let out = self.cmd().args(["list", "--json"]).output().unwrap();
        assert!(out.status.success());
        match serde_json::from_slice(&out.stdout).unwrap() {
            Value::Array(rows) => rows,
            other => panic!("expected array, got {other}"),
        }
    }

    fn id_of(&self, vendor: &str) -> String {
        self.rows()
            .into_iter()
            .find(|r| r["vendor"] == vendor)
            .and_then(|r| r["id"].as_str().map(str::to_string))
            .expect("record present")
    }
}

#[test]
fn add_then_list_shows_masked_key_only() {
    let env = Env::new();
    env.add("OpenAI", "main", "sk-12345678", "prod, ai");

    env.cmd()
        .args(["list", "--search", "openai"])
        .assert()
        .success()
        .stdout(predicate::str::contains("OpenAI"))
        .stdout(predicate::str::contains("API Key: sk••••••••78"))
        .stdout(predicate::str::contains("sk-12345678").not());

    env.cmd()
        .args(["list", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("sk-12345678").not());
}

#[test]
fn list_filters_by_exact_tag_and_sorts() {
    let env = Env::new();
    env.add("beta", "a", "key-beta-1", "prod, production");
    env.add("Alpha", "a", "key-alpha-1", "production");
    env.add("gamma", "a", "key-gamma-1", "prod");

    let out = env.cmd().args(["list", "--json", "--tag", "prod"]).output().unwrap();
    let rows: Vec<Value> = serde_json::from_slice(&out.stdout).unwrap();
    let vendors: Vec<&str> = rows.iter().filter_map(|r| r["vendor"].as_str()).collect();
    assert_eq!(vendors, vec!["beta", "gamma"]);

    let out = env
        .cmd()
        .args(["list", "--json", "--sort", "vendor-desc"])
        .output()
        .unwrap();
    let rows: Vec<Value> = serde_json::from_slice(&out.stdout).unwrap();
    let vendors: Vec<&str> = rows.iter().filter_map(|r| r["vendor"].as_str()).collect();
    assert_eq!(vendors, vec!["gamma", "beta", "Alpha"]);

    let out = env
        .cmd()
        .args(["list", "--json", "--sort", "tag:production"])
        .output()
        .unwrap();
    let rows: Vec<Value> = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(rows.len(), 2);
}

#[test]
fn get_echoes_marked_custom_field() {
    let env = Env::new();
    env.cmd()
        .args(["add", "--vendor", "Stripe", "--account", "live", "--api-key", "sk-live"])
        .args(["--field", "publishable=pk-live-123", "--mark", "publishable"])
        .assert()
        .success();
    let id = env.id_of("Stripe");

    env.cmd()
        .args(["get", &id, "--no-copy", "--echo"])
        .assert()
        .success()
        .stdout(predicate::str::diff("pk-live-123\n"));

    env.cmd()
        .args(["get", "does-not-exist", "--no-copy"])
        .assert()
        .success()
        .stdout(predicate::str::contains("❌ No record found"));
}

#[test]
fn show_masks_until_reveal() {
    let env = Env::new();
    env.add("OpenAI", "main", "sk-12345678", "prod");
    let id = env.id_of("OpenAI");

    env.cmd()
        .args(["show", &id])
        .assert()
        .success()
        .stdout(predicate::str::contains("Vendor:   OpenAI"))
        .stdout(predicate::str::contains("sk-12345678").not());

    env.cmd()
        .args(["show", &id, "--reveal"])
        .assert()
        .success()
        .stdout(predicate::str::contains("API key:  sk-12345678"));

    env.cmd()
        .args(["show", "missing"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("❌ Error: record 'missing' not found"));
}

#[test]
fn edit_replaces_fields_and_rejects_unknown_mark() {
    let env = Env::new();
    env.add("Acme", "x", "k-000001", "dev");
    let id = env.id_of("Acme");

    env.cmd()
        .args(["edit", &id, "--vendor", "Acme Corp", "--field", "region=eu"])
        .assert()
        .success();
    let rows = env.rows();
    assert_eq!(rows[0]["vendor"], "Acme Corp");

    env.cmd()
        .args(["edit", &id, "--mark", "nope"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not a custom field"));
}

#[test]
fn rm_with_yes_removes_records() {
    let env = Env::new();
    env.add("one", "a", "k-000001", "");
    env.add("two", "a", "k-000002", "");
    let id = env.id_of("one");

    env.cmd()
        .args(["rm", &id, "unknown-id", "--yes"])
        .assert()
        .success()
        .stdout(predicate::str::contains("❌ No record found with id 'unknown-id'"))
        .stdout(predicate::str::contains("🗑️ Removed 1 record(s)."));
    let rows = env.rows();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["vendor"], "two");
}

#[test]
fn import_renames_duplicates_and_counts_skips() {
    let env = Env::new();
    env.add("Acme", "x", "k-000000", "");
    let file = env.file(
        "import.json",
        r#"[{"vendor":"Acme","account":"x","apiKey":"k1"}, {"vendor": 3}]"#,
    );

    env.cmd()
        .args(["import", &file])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Imported 1 record(s): 1 renamed as duplicates, 1 skipped.",
        ));
    let rows = env.rows();
    assert!(rows.iter().any(|r| r["vendor"] == "Acme (1)"));
    assert!(rows.iter().any(|r| r["tags"][0] == "imported"));

    let bad = env.file("bad.json", r#"{"vendor":"Acme"}"#);
    env.cmd()
        .args(["import", &bad])
        .assert()
        .failure()
        .stderr(predicate::str::contains("format error"));
    assert_eq!(env.rows().len(), 2);
}

#[test]
fn export_then_import_into_fresh_store() {
    let source = Env::new();
    source.add("OpenAI", "main", "sk-12345678", "prod, ai");
    source.add("Anthropic", "team", "sk-ant-000000", "dev");
    let out = source.dir.path().join("api-keys-export.json");

    source
        .cmd()
        .args(["export", "--all", "--out"])
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("Exported 2 record(s)"));
    let exported: Value = serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
    assert_eq!(exported.as_array().unwrap().len(), 2);

    let target = Env::new();
    target
        .cmd()
        .arg("import")
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("Imported 2 record(s): 0 renamed"));
    let rows = target.rows();
    let mut vendors: Vec<&str> = rows.iter().filter_map(|r| r["vendor"].as_str()).collect();
    vendors.sort();
    assert_eq!(vendors, vec!["Anthropic", "OpenAI"]);
    assert!(rows.iter().any(|r| r["masked"] == "sk••••••••78"));
}

#[test]
fn export_without_selection_fails() {
    let env = Env::new();
    env.cmd()
        .arg("export")
        .assert()
        .failure()
        .stderr(predicate::str::contains("nothing to export"));
}

#[test]
fn import_record_pins_nested_field() {
    let env = Env::new();
    let file = env.file(
        "google.json",
        r#"{"web": {"client_id": "cid-123456", "client_secret": "shh-secret-value",
            "redirect_uris": ["http://localhost"]}}"#,
    );

    env.cmd()
        .args(["import-record", &file, "--list-fields"])
        .assert()
        .success()
        .stdout(predicate::str::contains("web.client_id"))
        .stdout(predicate::str::contains("web.redirect_uris[0]"))
        .stdout(predicate::str::contains("shh-secret-value").not());

    env.cmd()
        .args(["import-record", &file, "--pin", "web.client_secret", "--vendor", "Google"])
        .assert()
        .success();
    let rows = env.rows();
    assert_eq!(rows[0]["vendor"], "Google");
    assert_eq!(rows[0]["account"], "Default");
    assert_eq!(rows[0]["label"], "web.client_secret");
    assert_eq!(rows[0]["masked"], "sh••••••••ue");

    let id = env.id_of("Google");
    env.cmd()
        .args(["edit", &id, "--pin", "web.client_id"])
        .assert()
        .success();
    env.cmd()
        .args(["get", &id, "--no-copy", "--echo"])
        .assert()
        .success()
        .stdout(predicate::str::diff("cid-123456\n"));
}

#[test]
fn tags_are_listed_sorted_and_distinct() {
    let env = Env::new();
    env.add("a", "x", "k-000001", "prod, ai");
    env.add("b", "x", "k-000002", "ai");
    env.cmd()
        .arg("tags")
        .assert()
        .success()
        .stdout(predicate::str::diff("ai\nprod\n"));
}

#[test]
fn version_reports_build_metadata() {
    let mut cmd = Command::cargo_bin("keyshelf").unwrap();
    cmd.arg("--version");
    cmd.assert().success().stdout(
        predicate::str::contains("version:")
            .and(predicate::str::contains("git sha:"))
            .and(predicate::str::contains("build time (UTC):"))
            .and(predicate::str::contains("target:")),
    );
}

#[test]
fn storage_file_lands_at_path() {
    let env = Env::new();
    env.add("Acme", "x", "k-000001", "");
    let doc: Value =
        serde_json::from_str(&fs::read_to_string(Path::new(&env.store())).unwrap()).unwrap();
    assert_eq!(doc["apiKeys"][0]["apiKey"], "k-000001");
}

#[test]
fn edit_rejects_mixing_imported_and_custom_field_flags() {
    let env = Env::new();
    let file = env.file("svc.json", r#"{"region": "eu", "token": "tok-123456"}"#);
    env.cmd()
        .args(["import-record", &file, "--vendor", "Svc"])
        .assert()
        .success();
    let id = env.id_of("Svc");

    env.cmd()
        .args(["edit", &id, "--set", "region=us", "--field", "note=hello", "--mark", "note"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot be used with"));
    env.cmd()
        .args(["edit", &id, "--unpin", "--clear-fields"])
        .assert()
        .failure();

    let doc: Value =
        serde_json::from_str(&fs::read_to_string(Path::new(&env.store())).unwrap()).unwrap();
    let stored = &doc["apiKeys"][0];
    assert_eq!(stored["region"], "eu");
    assert!(stored.get("customFields").is_none());
}

#[test]
fn edit_rejects_index_past_array_end() {
    let env = Env::new();
    let file = env.file("svc.json", r#"{"items": ["a"], "token": "tok-123456"}"#);
    env.cmd()
        .args(["import-record", &file, "--vendor", "Svc"])
        .assert()
        .success();
    let id = env.id_of("Svc");

    env.cmd()
        .args(["edit", &id, "--set", "items[18446744073709551615]=x"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid input"));
    env.cmd()
        .args(["edit", &id, "--set", "items[1]=b"])
        .assert()
        .success();
    let doc: Value =
        serde_json::from_str(&fs::read_to_string(Path::new(&env.store())).unwrap()).unwrap();
    assert_eq!(doc["apiKeys"][0]["items"], serde_json::json!(["a", "b"]));
}
