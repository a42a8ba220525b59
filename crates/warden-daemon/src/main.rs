//! Warden Daemon - Main entry point
//!
//! Wires the three execution contexts (sensor loop, keypad processor,
//! display scheduler) around one shared lock state and runs them until
//! a shutdown signal. This binary uses the simulated drivers: keypad
//! characters come from stdin (`!` is the reset button, `#` the
//! terminator), the display is rendered into the log, and the range
//! sensor is an adjustable stub. Real deployments implement
//! `RangeSensor`/`DisplaySink` for their hardware and reuse the rest.

use std::sync::Arc;
use std::thread;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use warden_core::SharedLockState;
use warden_daemon::sim::{spawn_stdin_keypad, AdjustableRangeSensor, TextDisplay};
use warden_daemon::{
    DisplayScheduler, FileCredentialStore, IntrusionMonitor, KeypadEventProcessor, WardenConfig,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warden_daemon=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Warden daemon v{}", env!("CARGO_PKG_VERSION"));

    // Load or create config
    let config_path = WardenConfig::default_path();
    let config = if config_path.exists() {
        WardenConfig::load(&config_path)?
    } else {
        let config = WardenConfig::default();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        config.save(&config_path)?;
        info!("Created default config at {:?}", config_path);
        config
    };

    config.ensure_directories()?;

    // Shared state and collaborators
    let state = SharedLockState::new();
    let store = Arc::new(FileCredentialStore::new(config.credential_path.clone()));

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let (key_tx, key_rx) = tokio::sync::mpsc::channel(64);

    // Keypad driver (stdin in the simulated rig; debouncing is the
    // driver's job)
    spawn_stdin_keypad(key_tx);

    // Sensor loop on a dedicated thread: the echo measurement blocks,
    // so it stays off the async runtime
    let sensor_handle = {
        let monitor = IntrusionMonitor::new(state.clone(), config.near_threshold);
        let (sensor, _range) = AdjustableRangeSensor::new(100.0);
        let period = config.sample_period();
        let shutdown = shutdown_rx.clone();
        thread::spawn(move || monitor.run_blocking(sensor, period, shutdown))
    };

    // Keypad event processor
    let keypad_handle = {
        let processor = KeypadEventProcessor::new(
            state.clone(),
            store,
            config.username.clone(),
            config.hash_iterations,
        );
        tokio::spawn(processor.run(key_rx))
    };

    // Display scheduler
    let display_handle = {
        let scheduler = DisplayScheduler::new(
            state,
            TextDisplay::new(),
            config.display_period(),
            config.idle_timeout(),
            config.failure_blink_count,
        );
        tokio::spawn(scheduler.run(shutdown_rx))
    };

    info!("Daemon started successfully");

    // Wait for shutdown signal
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal");
        }
        _ = keypad_handle => {
            error!("Keypad processor exited unexpectedly");
        }
    }

    // Stop the periodic contexts; the display pushes one final cleared
    // frame before exiting
    let _ = shutdown_tx.send(true);
    if let Err(e) = display_handle.await {
        error!("Display scheduler join error: {}", e);
    }
    if sensor_handle.join().is_err() {
        error!("Sensor loop panicked");
    }

    info!("Daemon shutting down");

    Ok(())
}
