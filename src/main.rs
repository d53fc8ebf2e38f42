//! Wristguard - hand posture monitor.
//!
//! Runs the capture loop on the main thread with the status watcher,
//! scheduler and console observer beside it. Stops on Ctrl+C, on Cancel in
//! the camera-missing dialog, or on a fatal loop fault.

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;
use wristguard::alerts::{
    resolve_audio_paths, AlertChannel, AlertEvent, AlertSink, DesktopAlerts, DialogResponse,
    MissingCameraLatch,
};
use wristguard::config::{AppConfig, APP_DISPLAY_NAME};
use wristguard::device::{DeviceManager, OpenCvBackend, OpenCvImageWriter};
use wristguard::monitor::*;
use wristguard::posture::{ForestClassifier, ProcessExtractor};
use wristguard::shutdown::ShutdownSignal;
use wristguard::store::{CapturePersistence, PersistenceSnapshot, WorkerPool};

const STARTUP_DIALOG: &str = "The background application will start. Do you want to continue?";

const STATUS_INTERVAL: Duration = Duration::from_secs(30);

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(AppConfig::default_config_path);
    let config = AppConfig::load_or_default(&config_path)?;

    init_logging(&config)?;

    println!("╔════════════════════════════════════════════════════════════╗");
    println!("║            Wristguard - Hand Posture Monitor               ║");
    println!("╚════════════════════════════════════════════════════════════╝");
    println!();
    tracing::info!(config = %config_path.display(), "Configuration loaded");

    // relative cue files live next to the config file
    let audio_base = config_path.parent().unwrap_or_else(|| Path::new("."));
    let audio = resolve_audio_paths(&config.audio, audio_base);
    let sink: Arc<dyn AlertSink> = Arc::new(DesktopAlerts::new(
        config.alerts.notification_timeout_millis,
        &audio,
    ));

    let alert_pool = Arc::new(WorkerPool::new("wristguard-alerts", 2)?);
    let alerts = Arc::new(AlertChannel::new(
        sink,
        &config.alerts,
        config.audio.enabled,
        alert_pool,
    ));

    if config.alerts.startup_dialog
        && alerts.confirm(APP_DISPLAY_NAME, STARTUP_DIALOG) == DialogResponse::Cancel
    {
        println!("🛑 Start cancelled.");
        tracing::info!("Start cancelled from startup dialog");
        return Ok(());
    }

    println!("🔧 Loading models...");
    let classifier_path = config
        .model
        .classifier_path
        .clone()
        .ok_or("no classifier model configured ([model] classifier_path)")?;
    let classifier = Arc::new(ForestClassifier::load(&classifier_path)?);
    let extractor = ProcessExtractor::spawn(&config.model.extractor_command)?;
    println!("   ✓ Classifier ready ({} trees)", classifier.tree_count());

    println!("🔧 Starting workers...");
    let persist_pool = Arc::new(WorkerPool::new(
        "wristguard-persist",
        config.persistence.workers,
    )?);
    alerts.emit(AlertEvent::startup());

    let shutdown = ShutdownSignal::new();

    let policy = NotificationPolicy::new(config.signal.initial_enabled);
    let watcher = StatusWatcher::new(config.status_file(), policy.clone());
    let status_handle =
        spawn_status_watcher_thread(shutdown.clone(), watcher, config.signal.poll_interval());
    println!("   ✓ Watching {}", config.status_file().display());

    let device = DeviceManager::new(Box::new(OpenCvBackend::new()), &config.device);
    let scheduler = PeriodicScheduler::new(
        SchedulerConfig::from(&config),
        Arc::clone(&alerts),
        device.status(),
        MissingCameraLatch::new(),
        shutdown.clone(),
    );
    let scheduler_handle = spawn_scheduler_thread(shutdown.clone(), scheduler);
    println!("   ✓ Health check and break reminders scheduled");

    let persistence =
        CapturePersistence::new(&config, Arc::new(OpenCvImageWriter), persist_pool);
    let mut monitor = MonitorLoop::new(
        MonitorParts {
            device,
            extractor: Box::new(extractor),
            classifier,
            alerts: Arc::clone(&alerts),
            persistence,
            policy,
            shutdown: shutdown.clone(),
        },
        config.alerts.cooldown(),
    );

    // stdin blocks forever; never joined
    let _console = spawn_console_thread(shutdown.clone(), monitor.quit_keys());

    let shutdown_ctrlc = shutdown.clone();
    ctrlc::set_handler(move || {
        println!("\n🛑 Shutdown signal received...");
        shutdown_ctrlc.request();
    })?;

    let counters = monitor.counters();
    let shutdown_display = shutdown.clone();
    let display_handle = thread::spawn(move || {
        let mut last = counters.snapshot();
        while shutdown_display.sleep(STATUS_INTERVAL) {
            let snap = counters.snapshot();
            if snap != last {
                tracing::info!(
                    frames = snap.frames_processed,
                    alerts = snap.alerts_fired,
                    suppressed = snap.suppressed_by_policy + snap.suppressed_by_cooldown,
                    reconnects = snap.device_reconnects,
                    "Monitor update"
                );
                last = snap;
            }
        }
    });

    println!();
    println!("════════════════════════════════════════════════════════════════");
    println!("🎯 Wristguard is watching your hands!");
    println!("   • Plug in an external USB camera if none is connected");
    println!("   • Write 1 / 0 to the status file to enable / mute alerts");
    println!("   • Press Ctrl+C to quit");
    println!("════════════════════════════════════════════════════════════════");
    println!();

    let final_state = monitor.run();

    println!("\n⏳ Shutting down...");
    shutdown.request();
    for (name, handle) in [
        ("status watcher", status_handle),
        ("scheduler", scheduler_handle),
        ("status display", display_handle),
    ] {
        if handle.join().is_err() {
            tracing::warn!(thread = name, "Thread panicked");
        }
    }

    println!("💾 Writing pending captures...");
    monitor.persistence().flush();

    print_summary(
        &monitor.counters().snapshot(),
        &monitor.persistence().stats(),
        &alerts,
        final_state,
    );

    println!("\n👋 Wristguard has exited. Goodbye!");
    Ok(())
}

/// Logs to the configured file, or to stderr when none is set.
fn init_logging(config: &AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("wristguard=info"));

    match config.app_log() {
        Some(path) => {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            let file = OpenOptions::new().create(true).append(true).open(&path)?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
            println!("📝 Logging to {}", path.display());
        }
        None => {
            tracing_subscriber::fmt().with_env_filter(filter).init();
        }
    }
    Ok(())
}

fn print_summary(
    counters: &CountersSnapshot,
    persisted: &PersistenceSnapshot,
    alerts: &AlertChannel,
    state: LoopState,
) {
    println!();
    println!("════════════════════════════════════════════════════════════════");
    println!("📊 Final Monitor Summary");
    println!("════════════════════════════════════════════════════════════════");
    println!("   Final State:        {:?}", state);
    println!("   Frames:             {}", counters.frames_processed);
    println!("   Alerts Fired:       {}", counters.alerts_fired);
    println!("   Alerts Sent:        {}", alerts.emitted());
    println!("   Alerts Disabled:    {}", alerts.disabled());
    println!("   Muted (policy):     {}", counters.suppressed_by_policy);
    println!("   Muted (cool-down):  {}", counters.suppressed_by_cooldown);
    println!("   Odd Readings:       {}", counters.anomalous_readings);
    println!("   Reconnects:         {}", counters.device_reconnects);
    println!("   Images Saved:       {}", persisted.images_saved);
    println!("   Log Lines:          {}", persisted.log_lines);
    if persisted.failures > 0 {
        println!("   ⚠ Write Failures:   {}", persisted.failures);
    }
    if persisted.dropped > 0 {
        println!("   ⚠ Frames Dropped:   {}", persisted.dropped);
    }
    println!("════════════════════════════════════════════════════════════════");
}
