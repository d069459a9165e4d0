/// Directory watcher: turns raw filesystem creation events into registry
/// registrations.
///
/// Only files born *after* the watcher started are considered — replays
/// already sitting in the directory at startup belong to earlier sessions
/// and are deliberately left alone. Duplicate creation events for a path
/// already being tracked are absorbed by the registry's insert-if-absent.
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use anyhow::{bail, Context, Result};
use notify::{Config as NotifyConfig, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::registry::MonitorRegistry;

/// A running directory watch. Dropping it unregisters the OS-level watch;
/// the forwarding task then drains and exits on its own.
pub struct DirectoryWatcher {
    _watcher: RecommendedWatcher,
}

/// Starts watching `dir` for newly created replay files.
///
/// Failure to start — directory missing, not a directory, or the OS watch
/// cannot be registered — is returned synchronously and is fatal to the
/// daemon; there is no retry.
pub fn start(dir: &Path, registry: Arc<MonitorRegistry>) -> Result<DirectoryWatcher> {
    let started_at = SystemTime::now();

    let meta = std::fs::metadata(dir)
        .with_context(|| format!("Cannot access replays directory {}", dir.display()))?;
    if !meta.is_dir() {
        bail!("Replays path is not a directory: {}", dir.display());
    }

    let (watch_tx, mut watch_rx) = mpsc::channel::<notify::Event>(64);

    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<notify::Event>| {
            if let Ok(event) = res {
                if matches!(event.kind, EventKind::Create(_)) {
                    let _ = watch_tx.blocking_send(event);
                }
            }
        },
        NotifyConfig::default(),
    )
    .context("Failed to create filesystem watcher")?;

    watcher
        .watch(dir, RecursiveMode::Recursive)
        .with_context(|| format!("Failed to watch {}", dir.display()))?;

    let dispatcher = Dispatcher {
        started_at,
        registry,
    };

    tokio::spawn(async move {
        while let Some(event) = watch_rx.recv().await {
            for path in event.paths {
                // Creation time comes from the filesystem; paths whose
                // platform reports no birth time are skipped.
                if let Some(created_at) = file_creation_time(&path) {
                    dispatcher.dispatch(path, created_at);
                }
            }
        }
    });

    println!("[watcher] Monitoring directory: {}", dir.display());
    Ok(DirectoryWatcher { _watcher: watcher })
}

/// The filtering half of the watcher, separated from notify so the
/// inclusion rules are testable with hand-built events.
struct Dispatcher {
    started_at: SystemTime,
    registry: Arc<MonitorRegistry>,
}

impl Dispatcher {
    /// Registers `path` if it is a genuinely new file: created strictly
    /// after the watcher started, not a dot-file, and not already tracked.
    fn dispatch(&self, path: PathBuf, created_at: SystemTime) {
        if created_at <= self.started_at {
            return;
        }
        if is_dot_file(&path) {
            return;
        }
        if self.registry.register(path.clone()) {
            println!("[watcher] Detected: {}", path.display());
        }
    }
}

fn is_dot_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.starts_with('.'))
        .unwrap_or(false)
}

/// Birth timestamp of a regular file, if the platform records one.
fn file_creation_time(path: &Path) -> Option<SystemTime> {
    let meta = std::fs::metadata(path).ok()?;
    if !meta.is_file() {
        return None;
    }
    meta.created().ok()
}
