use anyhow::{Context, Result};
use std::fs::{self, File};
use std::io::Write;
#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

/// Create the parent directory of `path`, 0700 on Unix.
pub fn ensure_parent_secure(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).context("Failed to create storage directory")?;
        #[cfg(unix)]
        {
            let _ = fs::set_permissions(parent, fs::Permissions::from_mode(0o700));
        }
    }
    Ok(())
}

/// Write to a sibling temp file, then rename over `path`. 0600 on Unix.
pub fn atomic_write_secure(path: &Path, bytes: &[u8]) -> Result<()> {
    let tmp_path: PathBuf = path.with_extension("tmp");
    {
        let mut tmp = File::create(&tmp_path).context("Failed to create temporary storage file")?;
        #[cfg(unix)]
        {
            let _ = fs::set_permissions(&tmp_path, fs::Permissions::from_mode(0o600));
        }
        tmp.write_all(bytes)
            .context("Failed to write temporary storage file")?;
        let _ = tmp.sync_data();
    }
    fs::rename(&tmp_path, path).context("Failed to replace storage file atomically")?;
    Ok(())
}

#[cfg(unix)]
fn set_perm_0600(path: &Path) {
    let _ = fs::set_permissions(path, fs::Permissions::from_mode(0o600));
}

/// `<file>.n`
pub fn backup_path(path: &Path, n: usize) -> PathBuf {
    PathBuf::from(format!("{}.{n}", path.display()))
}

/// Rotate up to `n` backups (`<file>.1` newest) and write atomically.
pub fn write_with_backups_n(path: &Path, bytes: &[u8], n: usize) -> Result<()> {
    ensure_parent_secure(path)?;

    if n > 0 {
        let _ = fs::remove_file(backup_path(path, n));

        for i in (1..n).rev() {
            let src = backup_path(path, i);
            let dst = backup_path(path, i + 1);
            if src.exists() {
                let _ = fs::rename(&src, &dst);
                #[cfg(unix)]
                set_perm_0600(&dst);
            }
        }

        if path.exists() {
            let first = backup_path(path, 1);
            fs::copy(path, &first).context("Failed to back up storage file")?;
            #[cfg(unix)]
            set_perm_0600(&first);
        }
    }

    atomic_write_secure(path, bytes)
}
