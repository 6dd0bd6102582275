use crate::config::app_config::{Config, DEFAULT_CLIP_TTL};
use anyhow::{anyhow, Result};
use copypasta::{ClipboardContext, ClipboardProvider};
use secrecy::{ExposeSecret, SecretString};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;
use tracing::debug;

pub trait ClipboardEngine: Send + Sync + 'static {
    fn get_contents(&self) -> Result<Option<String>>;
    fn set_contents(&self, contents: &str) -> Result<()>;
}

pub struct SystemClipboardEngine {
    ctx: Mutex<ClipboardContext>,
}

impl SystemClipboardEngine {
    pub fn new() -> Result<Self> {
        let ctx =
            ClipboardContext::new().map_err(|e| anyhow!("Failed to access clipboard: {e}"))?;
        Ok(Self {
            ctx: Mutex::new(ctx),
        })
    }
}

impl ClipboardEngine for SystemClipboardEngine {
    fn get_contents(&self) -> Result<Option<String>> {
        let mut guard = self.ctx.lock().map_err(|_| anyhow!("clipboard lock poisoned"))?;
        Ok(guard.get_contents().ok())
    }

    fn set_contents(&self, contents: &str) -> Result<()> {
        let mut guard = self.ctx.lock().map_err(|_| anyhow!("clipboard lock poisoned"))?;
        guard
            .set_contents(contents.to_string())
            .map_err(|e| anyhow!("Failed to copy to clipboard: {e}"))
    }
}

/// Put `secret` on the clipboard and restore the previous contents after
/// `ttl` on a background thread. The returned handle joins that restore.
pub fn copy_with_ttl(
    engine: Arc<dyn ClipboardEngine>,
    secret: &SecretString,
    ttl: Duration,
) -> Result<thread::JoinHandle<()>> {
    let previous = engine.get_contents()?;
    engine.set_contents(secret.expose_secret())?;

    let handle = thread::spawn(move || {
        thread::sleep(ttl);
        let restored = engine.set_contents(previous.as_deref().unwrap_or(""));
        debug!(ok = restored.is_ok(), "clipboard restored");
    });

    Ok(handle)
}

/// override > KEYSHELF_CLIP_TTL > config file > 20s
pub fn ttl_seconds(config: &Config, override_ttl: Option<u64>) -> u64 {
    override_ttl
        .or_else(|| {
            std::env::var("KEYSHELF_CLIP_TTL")
                .ok()
                .and_then(|s| s.parse::<u64>().ok())
        })
        .or(config.clipboard_ttl)
        .unwrap_or(DEFAULT_CLIP_TTL)
}

/// Best-effort hint when the clipboard is likely unavailable (SSH/headless).
pub fn environment_warning() -> Option<String> {
    let is_ssh = std::env::var("SSH_CONNECTION").is_ok() || std::env::var("SSH_TTY").is_ok();
    #[cfg(all(target_family = "unix", not(target_os = "macos")))]
    let headless = std::env::var("DISPLAY").is_err() && std::env::var("WAYLAND_DISPLAY").is_err();
    #[cfg(any(not(target_family = "unix"), target_os = "macos"))]
    let headless = false;
    if is_ssh {
        return Some(
            "Detected SSH session; clipboard may be unavailable. Consider --no-copy --echo"
                .to_string(),
        );
    }
    if headless {
        return Some("No DISPLAY/WAYLAND detected; clipboard may be unavailable.".to_string());
    }
    None
}
