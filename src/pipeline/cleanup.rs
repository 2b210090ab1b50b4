//! Guaranteed removal of per-request temporary files.
//!
//! A [`ReleaseGuard`] is armed the moment a temporary path is claimed, before
//! a single byte is written. From then on the file is removed exactly once:
//! either explicitly through [`ReleaseGuard::release`], which reports the
//! outcome, or implicitly when the guard is dropped (early `?` return, panic
//! unwinding, or the request future being cancelled mid-flight).
//!
//! Removing a file that is already gone is a success. Any other removal
//! failure is logged and swallowed: it must never replace the error the
//! request is already reporting.

use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// What happened when a temporary file was released.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleanupOutcome {
    Removed,
    /// Nothing was on disk (never written, or removed by someone else).
    AlreadyGone,
    /// Removal failed; the error was logged.
    Failed(io::ErrorKind),
}

impl CleanupOutcome {
    /// `true` unless the file may still be on disk.
    pub fn is_clean(self) -> bool {
        !matches!(self, CleanupOutcome::Failed(_))
    }
}

/// Remove `path`, treating a missing file as already cleaned up.
pub fn remove_quietly(path: &Path) -> CleanupOutcome {
    match std::fs::remove_file(path) {
        Ok(()) => {
            debug!("Removed temporary file {}", path.display());
            CleanupOutcome::Removed
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => CleanupOutcome::AlreadyGone,
        Err(e) => {
            warn!(
                path = %path.display(),
                error = %e,
                "Failed to remove temporary file"
            );
            CleanupOutcome::Failed(e.kind())
        }
    }
}

/// Owns the obligation to delete one temporary file.
#[derive(Debug)]
pub struct ReleaseGuard {
    path: PathBuf,
    armed: bool,
}

impl ReleaseGuard {
    /// Register `path` for removal. Call before creating the file.
    pub fn arm(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            armed: true,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove the file now and report how it went.
    pub fn release(mut self) -> CleanupOutcome {
        self.armed = false;
        remove_quietly(&self.path)
    }
}

impl Drop for ReleaseGuard {
    fn drop(&mut self) {
        if self.armed {
            self.armed = false;
            remove_quietly(&self.path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn release_removes_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.upload");
        std::fs::write(&path, b"x").unwrap();

        let guard = ReleaseGuard::arm(&path);
        assert_eq!(guard.release(), CleanupOutcome::Removed);
        assert!(!path.exists());
    }

    #[test]
    fn release_of_absent_file_is_not_an_error() {
        let dir = TempDir::new().unwrap();
        let guard = ReleaseGuard::arm(dir.path().join("never-written"));
        let outcome = guard.release();
        assert_eq!(outcome, CleanupOutcome::AlreadyGone);
        assert!(outcome.is_clean());
    }

    #[test]
    fn drop_removes_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("b.upload");
        std::fs::write(&path, b"x").unwrap();
        {
            let _guard = ReleaseGuard::arm(&path);
        }
        assert!(!path.exists());
    }

    #[test]
    fn drop_after_release_does_not_touch_a_new_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("c.upload");
        std::fs::write(&path, b"x").unwrap();
        let guard = ReleaseGuard::arm(&path);
        assert_eq!(guard.release(), CleanupOutcome::Removed);

        // Same name re-created by someone else must survive; the guard is spent.
        std::fs::write(&path, b"y").unwrap();
        assert!(path.exists());
    }

    #[test]
    fn removing_a_directory_reports_failure() {
        let dir = TempDir::new().unwrap();
        let sub = dir.path().join("sub");
        std::fs::create_dir(&sub).unwrap();
        let outcome = remove_quietly(&sub);
        assert!(!outcome.is_clean());
        assert!(sub.exists());
    }
}
