/// Concurrent bookkeeping for in-flight file watches.
///
/// The registry holds at most one active tracker per path. Registration is
/// an atomic insert-if-absent; every terminal outcome unregisters the path
/// *before* the event sink hears about it, so a file that is deleted and
/// later rewritten under the same name starts a fresh watch.
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};

use tokio::sync::watch;

use crate::probe::StatProbe;
use crate::sink::EventSink;
use crate::tracker::{self, WatchOutcome, WatchSettings};

pub struct MonitorRegistry {
    /// Paths with a live tracker task. Inserts (from the directory watcher)
    /// and removals (from terminal outcomes) both go through this lock.
    active: Mutex<HashSet<PathBuf>>,
    probe: Arc<dyn StatProbe>,
    sink: Arc<dyn EventSink>,
    /// Applied to trackers created after the last update; running trackers
    /// keep the settings they started with.
    settings: RwLock<WatchSettings>,
    /// Flipped once at shutdown; every tracker task selects on it.
    stop_tx: watch::Sender<bool>,
}

impl MonitorRegistry {
    pub fn new(
        probe: Arc<dyn StatProbe>,
        sink: Arc<dyn EventSink>,
        settings: WatchSettings,
    ) -> Arc<Self> {
        let (stop_tx, _) = watch::channel(false);
        Arc::new(Self {
            active: Mutex::new(HashSet::new()),
            probe,
            sink,
            settings: RwLock::new(settings),
            stop_tx,
        })
    }

    /// Starts tracking `path` unless it is already being tracked (or the
    /// registry is shutting down). Returns whether a tracker was created.
    pub fn register(self: &Arc<Self>, path: PathBuf) -> bool {
        if *self.stop_tx.borrow() {
            return false;
        }
        if !self.active.lock().unwrap().insert(path.clone()) {
            return false;
        }

        let registry = Arc::clone(self);
        let probe = Arc::clone(&self.probe);
        let settings = *self.settings.read().unwrap();
        let mut stop_rx = self.stop_tx.subscribe();

        tokio::spawn(async move {
            tokio::select! {
                outcome = tracker::run(path.clone(), probe, settings) => {
                    registry.finish(&path, outcome).await;
                }
                _ = stop_rx.changed() => {
                    // Shutdown: drop the watch without a terminal
                    // notification. Documented behavior — watch state does
                    // not survive a daemon restart.
                    registry.active.lock().unwrap().remove(&path);
                }
            }
        });
        true
    }

    /// Unregisters `path`, then forwards its terminal outcome to the sink.
    async fn finish(&self, path: &Path, outcome: WatchOutcome) {
        self.active.lock().unwrap().remove(path);
        match outcome {
            WatchOutcome::Ready => self.sink.on_file_ready(path).await,
            WatchOutcome::Abandoned => self.sink.on_file_abandoned(path).await,
            WatchOutcome::Failed(cause) => self.sink.on_error(path, cause).await,
        }
    }

    /// Number of paths currently being watched.
    pub fn in_flight(&self) -> usize {
        self.active.lock().unwrap().len()
    }

    /// New timing for trackers registered from here on.
    pub fn update_settings(&self, settings: WatchSettings) {
        *self.settings.write().unwrap() = settings;
    }

    /// Signals every in-flight tracker to stop and blocks further
    /// registration. Returns how many paths were still being watched;
    /// those paths receive no terminal notification.
    pub fn shutdown(&self) -> usize {
        let remaining = self.active.lock().unwrap().len();
        let _ = self.stop_tx.send(true);
        remaining
    }
}
