use crate::shelf::query::SortKey;
use crate::shelf::resolver::MaskPolicy;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

pub const APP_DIR: &str = "keyshelf";
pub const STORE_FILE: &str = "storage.json";
pub const DEFAULT_CLIP_TTL: u64 = 20;
pub const DEFAULT_BACKUPS: usize = 2;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("profile \"{0}\" is not defined in config.toml")]
    UnknownProfile(String),
    #[error("profile \"{0}\" is missing a store_path")]
    InvalidProfile(String),
}

#[derive(Debug, Serialize, Deserialize, Default)]
pub struct FileConfig {
    pub store_path: Option<String>,
    pub clipboard_ttl: Option<u64>,
    pub backups: Option<usize>,
    pub quota_bytes: Option<usize>,
    // List rendering
    pub mask_prefix: Option<usize>,
    pub mask_suffix: Option<usize>,
    pub mask_run: Option<usize>,
    pub default_sort: Option<String>,

    // Profile management
    pub default_profile: Option<String>,
    pub profiles: Option<BTreeMap<String, FileProfileConfig>>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct FileProfileConfig {
    pub store_path: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub store_path: PathBuf,
    pub clipboard_ttl: Option<u64>,
    pub backups: usize,
    pub quota_bytes: Option<usize>,
    pub mask: MaskPolicy,
    pub default_sort: SortKey,
}

impl Config {
    pub fn create(path: Option<PathBuf>, profile: Option<String>) -> Result<Self, ConfigError> {
        let file_cfg = load_file_config();

        let store_path = resolve_store_path(path, profile.as_deref(), &file_cfg)?;

        // env > config file > None (command default applies)
        let clipboard_ttl = env_parse::<u64>("KEYSHELF_CLIP_TTL").or(file_cfg.clipboard_ttl);

        let backups = env_parse::<usize>("KEYSHELF_BACKUPS")
            .or(file_cfg.backups)
            .unwrap_or(DEFAULT_BACKUPS);

        let quota_bytes = env_parse::<usize>("KEYSHELF_QUOTA_BYTES").or(file_cfg.quota_bytes);

        let defaults = MaskPolicy::default();
        let mask = MaskPolicy {
            prefix_len: file_cfg.mask_prefix.unwrap_or(defaults.prefix_len),
            suffix_len: file_cfg.mask_suffix.unwrap_or(defaults.suffix_len),
            mask_run: file_cfg.mask_run.unwrap_or(defaults.mask_run),
        };

        let default_sort = file_cfg
            .default_sort
            .as_deref()
            .map(SortKey::parse)
            .unwrap_or_default();

        Ok(Config {
            store_path,
            clipboard_ttl,
            backups,
            quota_bytes,
            mask,
            default_sort,
        })
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|s| s.trim().parse::<T>().ok())
}

fn resolve_store_path(
    cli_path: Option<PathBuf>,
    cli_profile: Option<&str>,
    file_cfg: &FileConfig,
) -> Result<PathBuf, ConfigError> {
    if let Some(p) = cli_path {
        return Ok(p);
    }

    if let Some(name) = cli_profile {
        return match file_cfg.profiles.as_ref().and_then(|p| p.get(name)) {
            Some(prof) if prof.store_path.trim().is_empty() => {
                Err(ConfigError::InvalidProfile(name.to_string()))
            }
            Some(prof) => Ok(PathBuf::from(&prof.store_path)),
            None => Err(ConfigError::UnknownProfile(name.to_string())),
        };
    }

    if let Ok(p) = env::var("KEYSHELF_STORE_PATH") {
        return Ok(PathBuf::from(p));
    }

    // A default_profile naming a missing profile is ignored.
    if let Some(default_name) = file_cfg.default_profile.as_deref() {
        if let Some(prof) = file_cfg.profiles.as_ref().and_then(|p| p.get(default_name)) {
            return Ok(PathBuf::from(&prof.store_path));
        }
    }

    if let Some(p) = file_cfg.store_path.as_ref() {
        return Ok(PathBuf::from(p));
    }

    Ok(default_store_path())
}

fn load_file_config() -> FileConfig {
    let (_, cfg) = load_file_config_with_path();
    cfg
}

/// `KEYSHELF_CONFIG_DIR` overrides the platform config dir.
pub fn config_file_path() -> PathBuf {
    let cfg_dir = match env::var("KEYSHELF_CONFIG_DIR") {
        Ok(p) => PathBuf::from(p),
        Err(_) => dirs::config_dir().unwrap_or_else(|| PathBuf::from(".")),
    };
    cfg_dir.join(APP_DIR).join("config.toml")
}

pub fn load_file_config_with_path() -> (PathBuf, FileConfig) {
    let path = config_file_path();
    let cfg = match std::fs::read_to_string(&path) {
        Ok(s) => toml::from_str::<FileConfig>(&s).unwrap_or_else(|e| {
            warn!(path = %path.display(), error = %e, "ignoring malformed config file");
            FileConfig::default()
        }),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => FileConfig::default(),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "config file unreadable");
            FileConfig::default()
        }
    };
    (path, cfg)
}

pub fn save_file_config(path: &Path, cfg: &FileConfig) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let s = toml::to_string_pretty(cfg).map_err(std::io::Error::other)?;
    std::fs::write(path, s)
}

fn default_store_path() -> PathBuf {
    if let Ok(base) = env::var("KEYSHELF_DATA_DIR") {
        return PathBuf::from(base).join(APP_DIR).join(STORE_FILE);
    }
    if let Some(mut p) = dirs::data_dir() {
        p.push(APP_DIR);
        p.push(STORE_FILE);
        return p;
    }
    let home = env::var("HOME").unwrap_or_else(|_| ".".to_string());
    PathBuf::from(&home).join(".keyshelf").join(STORE_FILE)
}
