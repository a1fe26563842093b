// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Annotated Output Storage
//!
//! Writes annotated JPEGs into the output directory under unique names,
//! serves them back by name and removes them shortly after download.
//! Deletions run on a task tracker so shutdown can flush them.

use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Extension of every stored output
pub const OUTPUT_EXTENSION: &str = "jpg";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("File not found")]
    NotFound,

    #[error("Output storage I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Output directory with delayed, cancellable deletion
#[derive(Debug)]
pub struct OutputStore {
    dir: PathBuf,
    delete_delay: Duration,
    tracker: TaskTracker,
    cancel: CancellationToken,
}

impl OutputStore {
    /// Create the store, making sure `dir` exists
    pub fn new<P: Into<PathBuf>>(dir: P, delete_delay: Duration) -> Result<Self, StoreError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        info!("📁 Output directory ready: {}", dir.display());

        Ok(Self {
            dir,
            delete_delay,
            tracker: TaskTracker::new(),
            cancel: CancellationToken::new(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Token cancelled when the store shuts down
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Write a JPEG under a fresh unique name and return that name
    pub async fn save(&self, jpeg: &[u8]) -> Result<String, StoreError> {
        let filename = format!("{}.{}", Uuid::new_v4(), OUTPUT_EXTENSION);
        let path = self.dir.join(&filename);

        tokio::fs::write(&path, jpeg).await?;
        debug!("💾 Saved {} ({} bytes)", filename, jpeg.len());
        Ok(filename)
    }

    /// Map a requested filename to a path inside the output directory
    ///
    /// Names that could escape the directory resolve to `None`.
    pub fn resolve(&self, filename: &str) -> Option<PathBuf> {
        if filename.is_empty()
            || filename == "."
            || filename == ".."
            || filename.contains(['/', '\\', '\0'])
        {
            return None;
        }
        Some(self.dir.join(filename))
    }

    /// Read a stored file by name
    pub async fn read(&self, filename: &str) -> Result<(PathBuf, Vec<u8>), StoreError> {
        let path = self.resolve(filename).ok_or(StoreError::NotFound)?;

        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok((path, bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(StoreError::NotFound),
            // A directory with the requested name is not a downloadable file
            Err(_) if path.is_dir() => Err(StoreError::NotFound),
            Err(e) => Err(StoreError::Io(e)),
        }
    }

    /// Delete `path` after the configured delay, or at once on shutdown
    pub fn schedule_deletion(&self, path: PathBuf) {
        let delay = self.delete_delay;
        let cancel = self.cancel.clone();

        self.tracker.spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = cancel.cancelled() => {
                    debug!("Shutdown: deleting {} early", path.display());
                }
            }

            match tokio::fs::remove_file(&path).await {
                Ok(()) => debug!("🗑️ Deleted {}", path.display()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    debug!("{} already removed", path.display());
                }
                Err(e) => warn!("⚠️ Failed to delete {}: {}", path.display(), e),
            }
        });
    }

    /// Number of deletions not yet finished
    pub fn pending_deletions(&self) -> usize {
        self.tracker.len()
    }

    /// Run pending deletions immediately and wait for them
    pub async fn shutdown(&self) {
        let pending = self.tracker.len();
        self.cancel.cancel();
        self.tracker.close();
        self.tracker.wait().await;
        info!("Output store shut down ({} pending deletions flushed)", pending);
    }
}
