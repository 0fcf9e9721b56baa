//! Advisory lock files: `<path>.lock~` holding `user@host`. An
//! existing lock aborts the open unless the user overrides (or the
//! lock is our own).

use std::path::{Path, PathBuf};

use tracing::debug;

use core_input::get1key;
use core_state::{CmdResult, EdError, Editor};

pub fn lock_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".lock~");
    PathBuf::from(name)
}

pub fn lock_owner_id() -> String {
    let user = std::env::var("USER").unwrap_or_else(|_| "unknown".to_string());
    let host = std::fs::read_to_string("/etc/hostname")
        .map(|s| s.trim().to_string())
        .unwrap_or_else(|_| "localhost".to_string());
    format!("{user}@{host}")
}

/// Take the lock for `path`. If someone else holds it, ask before
/// stealing; declining aborts the open. Returns false when the user
/// declined.
pub fn lock(ed: &mut Editor, path: &Path) -> CmdResult<bool> {
    let lp = lock_path(path);
    let me = lock_owner_id();
    if let Ok(owner) = std::fs::read_to_string(&lp) {
        let owner = owner.trim();
        if owner == me {
            return Ok(true);
        }
        ed.mlforce(format!("File is locked by {owner}. Proceed anyway? (y/n)"));
        let c = get1key(ed)?;
        if c == ed.abortc {
            return Err(EdError::Abort);
        }
        if (c & 0xff) as u8 != b'y' {
            return Ok(false);
        }
    }
    std::fs::write(&lp, format!("{me}\n")).map_err(EdError::Io)?;
    debug!(lock = %lp.display(), "locked");
    Ok(true)
}

/// Drop the lock for `path` (only our own).
pub fn unlock(path: &Path) {
    let lp = lock_path(path);
    if let Ok(owner) = std::fs::read_to_string(&lp)
        && owner.trim() == lock_owner_id()
    {
        let _ = std::fs::remove_file(&lp);
    }
}
