use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::interval_at;

use crate::error::SnapshotError;
use crate::metrics::{SNAPSHOT_FAILURES, TRACKED_URLS};
use crate::models::UrlEntry;
use crate::registry::Registry;

pub type Entries = HashMap<String, UrlEntry>;

// Read a snapshot. A missing file is a first run, not an error.
pub async fn load(path: &Path) -> Result<Entries, SnapshotError> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(HashMap::new()),
        Err(source) => {
            return Err(SnapshotError::Io {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    serde_json::from_slice(&bytes).map_err(|source| SnapshotError::Serde {
        path: path.to_path_buf(),
        source,
    })
}

// Write a snapshot to a fresh temp file beside `path` and rename it into
// place, so the file on disk is always a complete snapshot. Every save gets
// its own temp file; overlapping saves never share one.
pub async fn save(path: &Path, entries: &Entries) -> Result<(), SnapshotError> {
    let data = serde_json::to_vec_pretty(entries).map_err(|source| SnapshotError::Serde {
        path: path.to_path_buf(),
        source,
    })?;

    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || write_atomic(&path, &data)).await?
}

fn write_atomic(path: &Path, data: &[u8]) -> Result<(), SnapshotError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let io_err = |source| SnapshotError::Io {
        path: path.to_path_buf(),
        source,
    };

    let mut tmp = tempfile::Builder::new()
        .prefix(".snapshot-")
        .suffix(".tmp")
        .tempfile_in(dir)
        .map_err(io_err)?;
    tmp.write_all(data).map_err(io_err)?;
    tmp.as_file().sync_all().map_err(io_err)?;
    tmp.persist(path).map_err(|e| io_err(e.error))?;

    sync_dir(dir);
    Ok(())
}

// Make the rename itself durable. Best effort: not every platform or
// filesystem can fsync a directory.
#[cfg(unix)]
fn sync_dir(dir: &Path) {
    if let Err(e) = std::fs::File::open(dir).and_then(|d| d.sync_all()) {
        tracing::debug!(dir = %dir.display(), error = %e, "could not sync snapshot directory");
    }
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) {}

// Hydrate the registry at startup. A broken snapshot degrades to an empty
// registry instead of stopping the process.
pub async fn restore(registry: &Registry, path: &Path) {
    match load(path).await {
        Ok(entries) if entries.is_empty() => {
            tracing::info!(path = %path.display(), "no existing data found, starting fresh");
        }
        Ok(entries) => {
            let loaded = entries.len();
            registry.load_snapshot(entries);
            TRACKED_URLS.set(registry.len() as f64);
            tracing::info!(path = %path.display(), loaded, "restored snapshot");
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to load snapshot, starting fresh");
        }
    }
}

// Held across snapshot-and-save, so a later save always writes later state
static SAVE_LOCK: Mutex<()> = Mutex::const_new(());

// Save the whole registry, logging instead of failing
pub async fn persist(registry: &Registry, path: &Path) -> bool {
    let _guard = SAVE_LOCK.lock().await;
    let entries = registry.snapshot();
    match save(path, &entries).await {
        Ok(()) => {
            tracing::info!(path = %path.display(), entries = entries.len(), "snapshot saved");
            true
        }
        Err(e) => {
            SNAPSHOT_FAILURES.inc();
            tracing::warn!(error = %e, "failed to save snapshot");
            false
        }
    }
}

// Periodic saver; a failed save is simply retried at the next tick
pub async fn saver(registry: Arc<Registry>, path: PathBuf, every: Duration) {
    let mut ticker = interval_at(tokio::time::Instant::now() + every, every);

    loop {
        ticker.tick().await;
        persist(&registry, &path).await;
    }
}
