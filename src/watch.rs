use std::path::Path;
use std::sync::mpsc::{self, Receiver};
use std::time::Duration;

use anyhow::{Context, Result};
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};

/// Watches a SQLite database file for writes made by other processes.
///
/// The parent directory is watched because SQLite writes through `-wal` and
/// `-shm` side files; events are filtered down to paths whose file name starts
/// with the database file name.
pub struct StoreWatcher {
    _watcher: RecommendedWatcher,
    rx: Receiver<()>,
}

impl StoreWatcher {
    pub fn new(db_path: &str) -> Result<Self> {
        let (tx, rx) = mpsc::channel();

        let db_filename = Path::new(db_path)
            .file_name()
            .map(|f| f.to_string_lossy().into_owned())
            .unwrap_or_default();

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
            let Ok(event) = res else {
                return;
            };
            // Reads by any process show up as access events.
            if matches!(event.kind, EventKind::Access(_)) {
                return;
            }
            let ours = event.paths.iter().any(|p| {
                p.file_name()
                    .map(|f| f.to_string_lossy().starts_with(&*db_filename))
                    .unwrap_or(false)
            });
            if ours {
                let _ = tx.send(());
            }
        })
        .context("failed to create file watcher")?;

        let path = Path::new(db_path);
        let watch_path = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        watcher
            .watch(watch_path, RecursiveMode::NonRecursive)
            .with_context(|| format!("failed to watch {}", watch_path.display()))?;

        Ok(Self {
            _watcher: watcher,
            rx,
        })
    }

    /// Blocks until a change arrives or `timeout` passes.
    /// Returns true if a change was seen.
    pub fn wait(&self, timeout: Duration) -> bool {
        self.rx.recv_timeout(timeout).is_ok()
    }

    /// Discards events queued behind the one already handled.
    pub fn drain(&self) {
        while self.rx.try_recv().is_ok() {}
    }
}
