use serde::{Deserialize, Serialize};
use std::path::Path;

/// Current operational state of the daemon.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
#[serde(rename_all = "lowercase")]
pub enum DaemonState {
    /// The replays directory is being watched for new files.
    Watching,
    /// The daemon is shutting down; no further replays will be reported.
    Stopped,
}

/// Runtime status written by the daemon to %APPDATA%\Replaywatch\status.toml.
/// The GUI reads this file (read-only) to display daemon state.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DaemonStatus {
    /// Daemon binary version (set from Cargo.toml at compile time).
    pub version: String,
    /// Current operational state.
    pub state: DaemonState,
    /// The directory being watched for new replay files.
    pub replays_directory: String,
    /// Number of files currently being monitored for stability.
    pub files_in_flight: usize,
    /// Most recently completed replay file, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_ready_path: Option<String>,
    /// RFC 3339 timestamp of the most recently completed replay, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_ready_timestamp: Option<String>,
    /// Human-readable message for the last per-file failure, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DaemonStatus {
    /// Constructs the initial status on daemon startup.
    pub fn new(replays_directory: String) -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            state: DaemonState::Watching,
            replays_directory,
            files_in_flight: 0,
            last_ready_path: None,
            last_ready_timestamp: None,
            error: None,
        }
    }
}

/// Serializes `status` to TOML and writes it to `path`.
/// Creates the parent directory if it does not exist.
/// Logs errors to stderr rather than panicking — a status write failure should
/// never crash the daemon.
pub fn write_status(path: &Path, status: &DaemonStatus) {
    if let Some(parent) = path.parent() {
        if let Err(e) = std::fs::create_dir_all(parent) {
            eprintln!("[status] Failed to create directory {}: {e}", parent.display());
            return;
        }
    }
    match toml::to_string_pretty(status) {
        Ok(content) => {
            if let Err(e) = std::fs::write(path, content) {
                eprintln!("[status] Failed to write status file: {e}");
            }
        }
        Err(e) => eprintln!("[status] Failed to serialize status: {e}"),
    }
}
