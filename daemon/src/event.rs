use std::path::PathBuf;

use crate::config::Config;

pub enum DaemonEvent {
    /// A tracked replay file held a stable size long enough to be complete.
    FileReady(PathBuf),
    /// A tracked file never stabilized before the discard deadline.
    FileAbandoned(PathBuf),
    /// Probing a tracked file failed (deleted mid-write, I/O error).
    FileFailed(PathBuf, anyhow::Error),
    /// The config file changed on disk and was successfully re-parsed.
    ConfigReloaded(Config),
    /// Ctrl+C received; the daemon should drop in-flight watches and exit.
    Shutdown,
}
