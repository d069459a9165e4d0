mod config;
mod event;
mod paths;
mod probe;
mod registry;
mod sink;
mod status;
mod tracker;
mod watcher;

use std::sync::Arc;
use tokio::sync::mpsc;

#[tokio::main]
async fn main() {
    // ── App data directory ────────────────────────────────────────────────────
    let app_dir = paths::app_data_dir();
    if let Err(e) = std::fs::create_dir_all(&app_dir) {
        eprintln!("Failed to create app data directory {}: {e}", app_dir.display());
        std::process::exit(1);
    }

    // ── Configuration ─────────────────────────────────────────────────────────
    let config_path = paths::config_file_path();
    let initial_config = match config::load(&config_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("[config] Error: {e:#}");
            eprintln!(
                "[config] Create {} with a complete [monitor] section before starting.",
                config_path.display()
            );
            std::process::exit(1);
        }
    };
    let replays_dir = initial_config.monitor.replays_dir();

    println!("Using replays_directory: {}", replays_dir.display());
    println!("Using polling_interval_ms: {}", initial_config.monitor.polling_interval_ms);
    println!("Using stable_threshold_ms: {}", initial_config.monitor.stable_threshold_ms);
    println!("Using discard_threshold_ms: {}", initial_config.monitor.discard_threshold_ms);

    // ── Initial status ────────────────────────────────────────────────────────
    let status_path = paths::status_file_path();
    let mut current_status = status::DaemonStatus::new(replays_dir.display().to_string());
    status::write_status(&status_path, &current_status);

    let (event_tx, mut event_rx) = mpsc::channel::<event::DaemonEvent>(32);

    // ── Monitor registry + directory watcher ──────────────────────────────────
    let sink = Arc::new(sink::ChannelSink::new(event_tx.clone()));
    let registry = registry::MonitorRegistry::new(
        Arc::new(probe::FsProbe),
        sink,
        initial_config.monitor.settings(),
    );

    // Without the directory watch nothing can ever be detected, so a
    // startup failure here is fatal.
    let _dir_watch = match watcher::start(&replays_dir, Arc::clone(&registry)) {
        Ok(w) => w,
        Err(e) => {
            eprintln!("[watcher] {e:#}");
            std::process::exit(1);
        }
    };

    // ── Background tasks ──────────────────────────────────────────────────────
    tokio::spawn(config::watch_config(config_path, event_tx.clone()));

    // Graceful shutdown on Ctrl+C.
    {
        let tx = event_tx.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                let _ = tx.send(event::DaemonEvent::Shutdown).await;
            }
        });
    }

    println!("replaywatch-daemon v{} started", env!("CARGO_PKG_VERSION"));

    // ── Event loop ────────────────────────────────────────────────────────────
    while let Some(evt) = event_rx.recv().await {
        match evt {
            event::DaemonEvent::FileReady(path) => {
                println!("[monitor] Ready: {}", path.display());
                current_status.files_in_flight = registry.in_flight();
                current_status.last_ready_path = Some(path.to_string_lossy().into_owned());
                current_status.last_ready_timestamp = Some(chrono::Local::now().to_rfc3339());
                current_status.error = None;
                status::write_status(&status_path, &current_status);
            }

            event::DaemonEvent::FileAbandoned(path) => {
                eprintln!("[monitor] Ignoring long-running file: {}", path.display());
                current_status.files_in_flight = registry.in_flight();
                status::write_status(&status_path, &current_status);
            }

            event::DaemonEvent::FileFailed(path, cause) => {
                eprintln!("[monitor] Error: {cause:#}");
                current_status.files_in_flight = registry.in_flight();
                current_status.error = Some(format!("{}: {cause:#}", path.display()));
                status::write_status(&status_path, &current_status);
            }

            event::DaemonEvent::ConfigReloaded(new_config) => {
                println!("Config reloaded");
                if new_config.monitor.replays_dir() != replays_dir {
                    // The notify watch is bound at startup; re-pointing it
                    // mid-session is not supported.
                    eprintln!(
                        "[config] replays_directory changed; restart the daemon to watch the new directory"
                    );
                }
                registry.update_settings(new_config.monitor.settings());
            }

            event::DaemonEvent::Shutdown => {
                println!("Shutting down");
                let dropped = registry.shutdown();
                if dropped > 0 {
                    // These paths get no terminal notification; watch state
                    // does not survive a restart.
                    eprintln!(
                        "[monitor] {dropped} file(s) were still being watched and will not be reported"
                    );
                }
                current_status.state = status::DaemonState::Stopped;
                current_status.files_in_flight = 0;
                status::write_status(&status_path, &current_status);
                break;
            }
        }
    }
}
