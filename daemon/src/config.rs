use anyhow::{bail, Context, Result};
use notify::{Config as NotifyConfig, RecommendedWatcher, RecursiveMode, Watcher};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;

use crate::event::DaemonEvent;
use crate::tracker::WatchSettings;

/// Root configuration structure. Deserialized from %APPDATA%\Replaywatch\config.toml.
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub monitor: MonitorConfig,
}

/// Stable-file detection settings.
///
/// All four fields are required: the right thresholds depend on how the
/// game streams its replay out, so the daemon refuses to guess and refuses
/// to start without them.
#[derive(Debug, Deserialize, Clone)]
pub struct MonitorConfig {
    /// Directory the game writes finished replays into.
    /// %VAR%-style environment tokens are expanded at access time.
    pub replays_directory: String,
    /// Spacing between successive size checks of a tracked file.
    pub polling_interval_ms: u64,
    /// How long a file's size must hold unchanged before it counts as
    /// fully written.
    pub stable_threshold_ms: u64,
    /// How long a file may keep changing before the daemon gives up on it.
    pub discard_threshold_ms: u64,
}

impl MonitorConfig {
    /// The replays directory with %VAR% tokens expanded.
    pub fn replays_dir(&self) -> PathBuf {
        PathBuf::from(expand_env(&self.replays_directory))
    }

    pub fn settings(&self) -> WatchSettings {
        WatchSettings {
            poll_interval: Duration::from_millis(self.polling_interval_ms),
            stable_threshold: Duration::from_millis(self.stable_threshold_ms),
            discard_threshold: Duration::from_millis(self.discard_threshold_ms),
        }
    }

    fn validate(&self) -> Result<()> {
        if self.replays_directory.trim().is_empty() {
            bail!("monitor.replays_directory must not be empty");
        }
        if self.polling_interval_ms == 0 {
            bail!("monitor.polling_interval_ms must be positive");
        }
        if self.stable_threshold_ms == 0 {
            bail!("monitor.stable_threshold_ms must be positive");
        }
        if self.discard_threshold_ms == 0 {
            bail!("monitor.discard_threshold_ms must be positive");
        }
        Ok(())
    }
}

/// Loads and validates the config file at `path`. A missing file is an
/// error — the monitor section has no defaults to fall back on.
pub fn load(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
    config.monitor.validate()?;
    Ok(config)
}

/// Expands common `%VAR%`-style environment variables embedded in Windows paths.
fn expand_env(s: &str) -> String {
    let mut result = s.to_string();
    for var in &["USERPROFILE", "APPDATA", "LOCALAPPDATA", "TEMP", "TMP"] {
        if let Ok(val) = std::env::var(var) {
            result = result.replace(&format!("%{var}%"), &val);
        }
    }
    result
}

/// Spawns a file watcher on the parent directory of `path`.  Whenever the
/// config file is created or modified, reloads it and sends a
/// `ConfigReloaded` event. A reload that fails to parse or validate is
/// logged and ignored; the running config stays in effect.
pub async fn watch_config(path: PathBuf, tx: mpsc::Sender<DaemonEvent>) {
    let (watch_tx, mut watch_rx) = mpsc::channel::<notify::Event>(16);

    let mut watcher = match RecommendedWatcher::new(
        move |res: notify::Result<notify::Event>| {
            if let Ok(event) = res {
                let _ = watch_tx.blocking_send(event);
            }
        },
        NotifyConfig::default(),
    ) {
        Ok(w) => w,
        Err(e) => {
            eprintln!("[config] Failed to create file watcher: {e}");
            return;
        }
    };

    // Watch the parent directory rather than the file directly so we catch
    // editor-style atomic saves (write-new + rename).
    let watch_dir = match path.parent() {
        Some(d) => d.to_path_buf(),
        None => {
            eprintln!("[config] Config path has no parent directory");
            return;
        }
    };

    if let Err(e) = watcher.watch(&watch_dir, RecursiveMode::NonRecursive) {
        eprintln!("[config] Failed to watch config directory: {e}");
        return;
    }

    while let Some(event) = watch_rx.recv().await {
        let affects_config = event.paths.iter().any(|p| p == path.as_path());
        let is_write = matches!(
            event.kind,
            notify::EventKind::Create(_) | notify::EventKind::Modify(_)
        );

        if affects_config && is_write {
            match load(&path) {
                Ok(config) => {
                    if tx.send(DaemonEvent::ConfigReloaded(config)).await.is_err() {
                        break;
                    }
                }
                Err(e) => eprintln!("[config] Failed to reload config: {e}"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = r#"
[monitor]
replays_directory = 'C:\Replays'
polling_interval_ms = 2000
stable_threshold_ms = 5000
discard_threshold_ms = 30000
"#;

    fn write_config(content: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, content).unwrap();
        (dir, path)
    }

    // ── load ──────────────────────────────────────────────────────────────────

    #[test]
    fn load_parses_valid_toml() {
        let (_dir, path) = write_config(VALID);
        let config = load(&path).unwrap();
        assert_eq!(config.monitor.replays_directory, r"C:\Replays");
        assert_eq!(config.monitor.polling_interval_ms, 2000);
        assert_eq!(config.monitor.stable_threshold_ms, 5000);
        assert_eq!(config.monitor.discard_threshold_ms, 30000);
    }

    #[test]
    fn load_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nonexistent.toml");
        assert!(load(&path).is_err());
    }

    #[test]
    fn load_invalid_toml_is_an_error() {
        let (_dir, path) = write_config("this is not valid toml ][[[");
        assert!(load(&path).is_err());
    }

    #[test]
    fn load_rejects_missing_threshold() {
        // No discard_threshold_ms: there is no default to fall back on.
        let (_dir, path) = write_config(
            r#"
[monitor]
replays_directory = 'C:\Replays'
polling_interval_ms = 2000
stable_threshold_ms = 5000
"#,
        );
        assert!(load(&path).is_err());
    }

    #[test]
    fn load_rejects_zero_durations() {
        for field in [
            "polling_interval_ms",
            "stable_threshold_ms",
            "discard_threshold_ms",
        ] {
            let content = VALID.replace(&format!("{field} = "), &format!("{field} = 0 # "));
            let (_dir, path) = write_config(&content);
            assert!(load(&path).is_err(), "{field} = 0 should be rejected");
        }
    }

    #[test]
    fn load_rejects_empty_replays_directory() {
        let (_dir, path) = write_config(
            r#"
[monitor]
replays_directory = ""
polling_interval_ms = 2000
stable_threshold_ms = 5000
discard_threshold_ms = 30000
"#,
        );
        assert!(load(&path).is_err());
    }

    // ── settings ──────────────────────────────────────────────────────────────

    #[test]
    fn settings_converts_milliseconds() {
        let (_dir, path) = write_config(VALID);
        let settings = load(&path).unwrap().monitor.settings();
        assert_eq!(settings.poll_interval, Duration::from_millis(2000));
        assert_eq!(settings.stable_threshold, Duration::from_millis(5000));
        assert_eq!(settings.discard_threshold, Duration::from_millis(30000));
    }

    // ── expand_env ────────────────────────────────────────────────────────────

    #[test]
    fn replays_dir_expands_env_vars() {
        std::env::set_var("LOCALAPPDATA", r"C:\Users\player\AppData\Local");
        let config = MonitorConfig {
            replays_directory: r"%LOCALAPPDATA%\FortniteGame\Saved\Demos".to_string(),
            polling_interval_ms: 2000,
            stable_threshold_ms: 5000,
            discard_threshold_ms: 30000,
        };
        assert_eq!(
            config.replays_dir(),
            PathBuf::from(r"C:\Users\player\AppData\Local\FortniteGame\Saved\Demos")
        );
    }

    #[test]
    fn expand_env_leaves_unknown_tokens_alone() {
        assert_eq!(expand_env("%NOT_A_REAL_VAR%\\x"), "%NOT_A_REAL_VAR%\\x");
    }
}
