use std::path::Path;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::event::DaemonEvent;

/// Receiver of terminal watch outcomes.
///
/// For every registered path exactly one of these three callbacks fires —
/// the registry unregisters the path first, so a later re-creation of the
/// same file starts a fresh watch. Paths still being watched at shutdown
/// receive no callback at all; the daemon has no persisted watch state
/// across restarts.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// The file's size held stable long enough; it is safe to consume.
    async fn on_file_ready(&self, path: &Path);
    /// The file never stabilized before the discard deadline.
    async fn on_file_abandoned(&self, path: &Path);
    /// Probing the file failed; `cause` says how.
    async fn on_error(&self, path: &Path, cause: anyhow::Error);
}

/// Production sink: forwards each outcome into the daemon event loop.
pub struct ChannelSink {
    tx: mpsc::Sender<DaemonEvent>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::Sender<DaemonEvent>) -> Self {
        Self { tx }
    }
}

#[async_trait]
impl EventSink for ChannelSink {
    async fn on_file_ready(&self, path: &Path) {
        let _ = self.tx.send(DaemonEvent::FileReady(path.to_path_buf())).await;
    }

    async fn on_file_abandoned(&self, path: &Path) {
        let _ = self
            .tx
            .send(DaemonEvent::FileAbandoned(path.to_path_buf()))
            .await;
    }

    async fn on_error(&self, path: &Path, cause: anyhow::Error) {
        let _ = self
            .tx
            .send(DaemonEvent::FileFailed(path.to_path_buf(), cause))
            .await;
    }
}

/// Test sink that records every callback in order.
#[cfg(test)]
pub(crate) struct RecordingSink {
    pub events: std::sync::Mutex<Vec<(std::path::PathBuf, &'static str)>>,
}

#[cfg(test)]
impl RecordingSink {
    pub fn new() -> std::sync::Arc<Self> {
        std::sync::Arc::new(Self {
            events: std::sync::Mutex::new(Vec::new()),
        })
    }
}

#[cfg(test)]
#[async_trait]
impl EventSink for RecordingSink {
    async fn on_file_ready(&self, path: &Path) {
        self.events.lock().unwrap().push((path.to_path_buf(), "ready"));
    }

    async fn on_file_abandoned(&self, path: &Path) {
        self.events.lock().unwrap().push((path.to_path_buf(), "abandoned"));
    }

    async fn on_error(&self, path: &Path, _cause: anyhow::Error) {
        self.events.lock().unwrap().push((path.to_path_buf(), "error"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[tokio::test]
    async fn channel_sink_forwards_ready() {
        let (tx, mut rx) = mpsc::channel(4);
        let sink = ChannelSink::new(tx);
        sink.on_file_ready(Path::new("a.replay")).await;

        match rx.recv().await {
            Some(DaemonEvent::FileReady(path)) => assert_eq!(path, PathBuf::from("a.replay")),
            _ => panic!("expected FileReady"),
        }
    }

    #[tokio::test]
    async fn channel_sink_forwards_abandoned() {
        let (tx, mut rx) = mpsc::channel(4);
        let sink = ChannelSink::new(tx);
        sink.on_file_abandoned(Path::new("b.replay")).await;

        match rx.recv().await {
            Some(DaemonEvent::FileAbandoned(path)) => assert_eq!(path, PathBuf::from("b.replay")),
            _ => panic!("expected FileAbandoned"),
        }
    }

    #[tokio::test]
    async fn channel_sink_forwards_error_with_cause() {
        let (tx, mut rx) = mpsc::channel(4);
        let sink = ChannelSink::new(tx);
        sink.on_error(Path::new("c.replay"), anyhow::anyhow!("stat failed")).await;

        match rx.recv().await {
            Some(DaemonEvent::FileFailed(path, cause)) => {
                assert_eq!(path, PathBuf::from("c.replay"));
                assert_eq!(cause.to_string(), "stat failed");
            }
            _ => panic!("expected FileFailed"),
        }
    }
}
