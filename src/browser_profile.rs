//! Per-worker Chrome profile directories
//!
//! Every browser worker gets its own UUID-named profile under the temp dir,
//! so concurrent sessions never fight over Chrome's `SingletonLock`.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Directory-name prefix for every profile this service creates
pub const PROFILE_PREFIX: &str = "searcrawl_chrome";

/// RAII owner of a profile directory
///
/// Removes the directory on drop. The browser worker drops it only after
/// Chrome has exited, so no file in it is still locked.
#[derive(Debug)]
pub struct BrowserProfile {
    path: PathBuf,
}

impl BrowserProfile {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for BrowserProfile {
    fn drop(&mut self) {
        if self.path.exists() {
            debug!("Removing profile {}", self.path.display());
            if let Err(e) = std::fs::remove_dir_all(&self.path) {
                warn!("Failed to remove profile directory {}: {}", self.path.display(), e);
            }
        }
    }
}

/// Create `{temp}/{PROFILE_PREFIX}_{worker_id}_{uuid}`.
///
/// `create_dir` (not `create_dir_all`) makes creation atomic: an existing
/// directory is an error rather than a shared profile.
pub fn create_worker_profile(worker_id: u64) -> Result<BrowserProfile> {
    create_profile_in(&std::env::temp_dir(), worker_id)
}

fn create_profile_in(base: &Path, worker_id: u64) -> Result<BrowserProfile> {
    let path = base.join(format!("{PROFILE_PREFIX}_{worker_id}_{}", Uuid::new_v4()));
    std::fs::create_dir(&path)
        .with_context(|| format!("Failed to create profile directory: {}", path.display()))?;
    debug!("Created Chrome profile directory: {}", path.display());
    Ok(BrowserProfile { path })
}

/// Check whether the Chrome that owned `profile_dir` is gone.
///
/// `SingletonLock` is a symlink to `{hostname}-{pid}`. On Linux the PID is
/// looked up in `/proc`; elsewhere a present lock is assumed live.
fn is_profile_stale(profile_dir: &Path) -> bool {
    let lock_path = profile_dir.join("SingletonLock");
    if !lock_path.exists() && !lock_path.is_symlink() {
        return true;
    }

    let Ok(target) = std::fs::read_link(&lock_path) else {
        // A regular file where the symlink should be: leftover from a crash
        return lock_path.is_file();
    };
    let target = target.to_string_lossy();
    let Some(pid) = target.rsplit('-').next().and_then(|p| p.parse::<u32>().ok()) else {
        warn!("Could not parse PID from SingletonLock target: {}", target);
        return false;
    };

    if cfg!(target_os = "linux") {
        !Path::new("/proc").join(pid.to_string()).exists()
    } else {
        false
    }
}

/// Remove profile directories left behind by crashed runs.
///
/// Called once at startup, before the pool launches its own browsers.
pub fn cleanup_stale_profiles() -> Result<usize> {
    cleanup_stale_profiles_in(&std::env::temp_dir())
}

fn cleanup_stale_profiles_in(base: &Path) -> Result<usize> {
    let entries = std::fs::read_dir(base)
        .with_context(|| format!("Failed to read temp directory: {}", base.display()))?;

    let mut cleaned = 0;
    for entry in entries.flatten() {
        let path = entry.path();
        let ours = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with(PROFILE_PREFIX));
        if ours && path.is_dir() && is_profile_stale(&path) {
            match std::fs::remove_dir_all(&path) {
                Ok(()) => cleaned += 1,
                Err(e) => warn!("Failed to remove stale profile {}: {}", path.display(), e),
            }
        }
    }

    if cleaned > 0 {
        info!("Cleaned {} stale Chrome profile directories", cleaned);
    }
    Ok(cleaned)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_is_removed_on_drop() {
        let base = tempfile::tempdir().unwrap();

        let profile = create_profile_in(base.path(), 2).unwrap();
        let path = profile.path().to_path_buf();
        assert!(path.exists());
        assert!(
            path.file_name()
                .unwrap()
                .to_string_lossy()
                .starts_with("searcrawl_chrome_2_")
        );
        drop(profile);
        assert!(!path.exists());
    }

    #[test]
    fn cleanup_removes_unlocked_profiles_only_with_our_prefix() {
        let base = tempfile::tempdir().unwrap();
        // Left behind by a crashed run: no SingletonLock inside
        let ours = base.path().join(format!("{PROFILE_PREFIX}_7_leftover"));
        std::fs::create_dir(&ours).unwrap();
        let foreign = base.path().join("someone_elses_dir");
        std::fs::create_dir(&foreign).unwrap();

        assert_eq!(cleanup_stale_profiles_in(base.path()).unwrap(), 1);
        assert!(!ours.exists());
        assert!(foreign.exists());
    }
}
