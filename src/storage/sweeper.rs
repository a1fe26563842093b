// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Periodic removal of outputs that were never downloaded

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::output_store::OUTPUT_EXTENSION;

/// Delete `.jpg` files in `dir` whose modification time is at least `ttl` ago
///
/// Returns the number of files removed.
pub async fn sweep_once(dir: &Path, ttl: Duration) -> std::io::Result<usize> {
    let now = SystemTime::now();
    let mut removed = 0;
    let mut entries = tokio::fs::read_dir(dir).await?;

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some(OUTPUT_EXTENSION) {
            continue;
        }

        let metadata = match entry.metadata().await {
            Ok(m) if m.is_file() => m,
            _ => continue,
        };
        let age = metadata
            .modified()
            .ok()
            .and_then(|modified| now.duration_since(modified).ok())
            .unwrap_or_default();
        if age < ttl {
            continue;
        }

        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                debug!("🧹 Swept {}", path.display());
                removed += 1;
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("⚠️ Failed to sweep {}: {}", path.display(), e),
        }
    }

    Ok(removed)
}

/// Run [`sweep_once`] every `interval` until `cancel` fires
pub fn spawn_sweeper(
    dir: PathBuf,
    ttl: Duration,
    interval: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(
            "🧹 Output sweeper started (ttl: {}s, every {}s)",
            ttl.as_secs(),
            interval.as_secs()
        );
        let mut ticker = tokio::time::interval(interval);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("Output sweeper stopped");
                    break;
                }
                _ = ticker.tick() => {
                    match sweep_once(&dir, ttl).await {
                        Ok(0) => {}
                        Ok(n) => info!("🧹 Removed {} expired outputs", n),
                        Err(e) => warn!("⚠️ Output sweep failed: {}", e),
                    }
                }
            }
        }
    })
}
