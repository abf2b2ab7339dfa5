//! Run-scoped working directory and cancellation flag.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::RunError;

/// Directory holding every intermediate file of one run.
///
/// Removed with its contents when dropped, on success, error, or
/// cancellation alike, unless `keep` was requested.
#[derive(Debug)]
pub struct ScratchScope {
    path: PathBuf,
    keep: bool,
}

impl ScratchScope {
    /// Create (or reset) the scratch directory at `path`.
    ///
    /// Leftovers from an earlier kept run are removed first so stale
    /// frames never leak into this run.
    ///
    /// # Errors
    ///
    /// Returns [`RunError::Io`] if the directory cannot be created.
    pub fn create(path: impl Into<PathBuf>, keep: bool) -> Result<Self, RunError> {
        let path = path.into();
        if path.exists() {
            std::fs::remove_dir_all(&path).map_err(|e| RunError::io(&path, e))?;
        }
        std::fs::create_dir_all(&path).map_err(|e| RunError::io(&path, e))?;
        tracing::debug!(dir = %path.display(), keep, "created scratch directory");
        Ok(Self { path, keep })
    }

    /// The scratch directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create a subdirectory and return its path.
    ///
    /// # Errors
    ///
    /// Returns [`RunError::Io`] if it cannot be created.
    pub fn subdir(&self, name: &str) -> Result<PathBuf, RunError> {
        let dir = self.path.join(name);
        std::fs::create_dir_all(&dir).map_err(|e| RunError::io(&dir, e))?;
        Ok(dir)
    }
}

impl Drop for ScratchScope {
    fn drop(&mut self) {
        if self.keep {
            tracing::info!("kept intermediate files in {}", self.path.display());
            return;
        }
        if let Err(e) = std::fs::remove_dir_all(&self.path) {
            tracing::warn!("failed to remove {}: {e}", self.path.display());
        }
    }
}

/// Shared flag raised by Ctrl-C and polled between units of work.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// A token that has not been cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// `Err(Cancelled)` once cancellation was requested.
    ///
    /// # Errors
    ///
    /// Returns [`RunError::Cancelled`] if the token is raised.
    pub fn check(&self) -> Result<(), RunError> {
        if self.is_cancelled() {
            Err(RunError::Cancelled)
        } else {
            Ok(())
        }
    }
}
