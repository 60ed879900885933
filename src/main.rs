//! keybind-daemon: global keybind monitor for window management
//!
//! This daemon runs as a LaunchAgent and provides:
//! - A global keyboard event tap via CGEventTap
//! - Chord tracking with release debounce
//! - Swallow/forward decisions so bound chords never reach the focused app
//! - Force-cancel and action-triggered signals for the window manager
//!
//! Window placement itself and all UI live outside this process.

use anyhow::Result;
use tokio::sync::broadcast;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use keybind_daemon::actions::WindowDirection;
use keybind_daemon::config::Config;
use keybind_daemon::lifecycle::ShutdownSignal;
use keybind_daemon::monitor::{forward_to_channel, KeybindMonitor, Signal};
use keybind_daemon::tap::{PlatformPermission, PlatformTap};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "keybind-daemon starting"
    );

    // Load configuration
    let config = Config::load()?;
    info!(
        data_dir = ?config.data_dir,
        path = ?config.config_path,
        keybinds = config.settings.keybinds.len(),
        triggers = ?config.settings.trigger_keys,
        "configuration loaded"
    );

    let shutdown = ShutdownSignal::new();

    // Monitor callback -> async signal consumers
    let (signal_tx, signal_rx) = broadcast::channel::<Signal<WindowDirection>>(64);

    let monitor = KeybindMonitor::new(
        PlatformTap::default(),
        PlatformPermission,
        config.keybind_table(),
        config.monitor_settings(),
    );
    forward_to_channel(monitor.signals(), signal_tx);

    match monitor.start() {
        Ok(()) if monitor.is_running() => {
            info!(state = %monitor.state(), "keybind monitor ready");
        }
        Ok(()) => {
            warn!("keybinds disabled - grant Accessibility permission and restart");
        }
        Err(e) => {
            error!(?e, "failed to start keybind monitor");
            warn!("continuing without keybind support");
        }
    }

    info!("daemon initialized, entering main loop");

    tokio::select! {
        _ = log_signals(signal_rx) => {
            info!("signal channel closed");
        }

        result = shutdown.wait() => {
            match result {
                Ok(()) => info!("shutdown signal received"),
                Err(e) => error!(?e, "failed to register shutdown handlers"),
            }
        }
    }

    info!("shutting down...");
    monitor.stop();
    info!("keybind-daemon stopped");

    Ok(())
}

/// Log every keybind signal as it arrives
async fn log_signals(mut signal_rx: broadcast::Receiver<Signal<WindowDirection>>) {
    loop {
        match signal_rx.recv().await {
            Ok(signal) => {
                info!(%signal, "keybind signal");
            }
            Err(broadcast::error::RecvError::Lagged(n)) => {
                warn!(skipped = n, "keybind signal receiver lagged");
            }
            Err(broadcast::error::RecvError::Closed) => {
                break;
            }
        }
    }
}
