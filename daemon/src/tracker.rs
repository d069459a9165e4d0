/// Per-file stability tracking.
///
/// A replay file is "ready" once its size has stopped changing for at least
/// `stable_threshold`, observed by polling every `poll_interval`.  A file
/// that never stabilizes is abandoned when `discard_threshold` elapses.
/// Each tracked file gets exactly one task running [`run`]; that task owns
/// both the poll ticker and the discard deadline, so the two can never race
/// each other into emitting a second terminal outcome.
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::time::{self, Instant};

use crate::probe::StatProbe;

/// Timing knobs for one tracker. All three are required configuration;
/// there are no built-in fallbacks.
#[derive(Debug, Clone, Copy)]
pub struct WatchSettings {
    /// Spacing between successive size probes. The first probe fires as
    /// soon as tracking starts.
    pub poll_interval: Duration,
    /// How long the size must hold unchanged before the file is ready.
    pub stable_threshold: Duration,
    /// Absolute give-up deadline, measured from the start of tracking.
    pub discard_threshold: Duration,
}

/// Lifecycle state of a tracked file. `Watching` is the only non-terminal
/// state; the terminal states are final.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchStatus {
    Watching,
    Ready,
    Abandoned,
    Failed,
}

impl WatchStatus {
    pub fn is_terminal(self) -> bool {
        self != WatchStatus::Watching
    }
}

/// How a tracker finished. Carried back to the registry, which unregisters
/// the path before the event sink hears about it.
pub enum WatchOutcome {
    /// Size held stable for `stable_threshold` before the deadline.
    Ready,
    /// The discard deadline fired while the file was still changing.
    Abandoned,
    /// A size probe failed (file deleted mid-watch, I/O error). Never retried.
    Failed(anyhow::Error),
}

/// Bookkeeping for one tracked file.
///
/// The timing decisions live here, separated from the timers that drive
/// them, so the threshold arithmetic is testable without a runtime.
pub struct FileWatchState {
    path: PathBuf,
    /// Size seen by the previous poll; unset until the first probe lands.
    last_size: Option<u64>,
    /// When the size was first seen unchanged; cleared whenever it moves.
    stable_since: Option<Instant>,
    started_at: Instant,
    status: WatchStatus,
}

impl FileWatchState {
    pub fn new(path: PathBuf, now: Instant) -> Self {
        Self {
            path,
            last_size: None,
            stable_since: None,
            started_at: now,
            status: WatchStatus::Watching,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Folds one successful size probe into the state machine.
    ///
    /// Unchanged means unchanged since the *previous poll*, not since the
    /// start of tracking — a file that grows and then plateaus only needs
    /// `stable_threshold` of plateau time. Returns the (possibly new)
    /// status; once terminal, further observations are no-ops.
    pub fn observe(&mut self, size: u64, now: Instant, stable_threshold: Duration) -> WatchStatus {
        if self.status.is_terminal() {
            return self.status;
        }

        if self.last_size == Some(size) {
            match self.stable_since {
                None => self.stable_since = Some(now),
                Some(since) if now.duration_since(since) >= stable_threshold => {
                    self.status = WatchStatus::Ready;
                }
                Some(_) => {}
            }
        } else {
            self.last_size = Some(size);
            self.stable_since = None;
        }

        self.status
    }

    /// The discard deadline fired while still watching.
    pub fn abandon(&mut self) -> WatchStatus {
        if !self.status.is_terminal() {
            self.status = WatchStatus::Abandoned;
        }
        self.status
    }

    /// A probe failed while still watching.
    pub fn fail(&mut self) -> WatchStatus {
        if !self.status.is_terminal() {
            self.status = WatchStatus::Failed;
        }
        self.status
    }
}

/// Watches one file until it reaches a terminal outcome.
///
/// The poll ticker (first tick at tracking start) and the discard deadline
/// are raced inside a single `select!`. The deadline arm is checked first:
/// a file must stabilize strictly before the deadline, so when both fire on
/// the same instant, abandonment wins.
pub async fn run(path: PathBuf, probe: Arc<dyn StatProbe>, settings: WatchSettings) -> WatchOutcome {
    let mut state = FileWatchState::new(path, Instant::now());

    let deadline = time::sleep_until(state.started_at + settings.discard_threshold);
    tokio::pin!(deadline);
    let mut ticker = time::interval_at(state.started_at, settings.poll_interval);

    loop {
        tokio::select! {
            biased;

            _ = &mut deadline => {
                state.abandon();
                return WatchOutcome::Abandoned;
            }

            _ = ticker.tick() => {
                let size = match probe.file_size(state.path()) {
                    Ok(size) => size,
                    Err(e) => {
                        state.fail();
                        let cause = anyhow::Error::new(e)
                            .context(format!("Failed to stat {}", state.path().display()));
                        return WatchOutcome::Failed(cause);
                    }
                };

                if state.observe(size, Instant::now(), settings.stable_threshold) == WatchStatus::Ready {
                    return WatchOutcome::Ready;
                }
            }
        }
    }
}
