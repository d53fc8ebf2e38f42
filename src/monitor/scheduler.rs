//! Periodic health check and break reminders.
//!
//! One thread ticks both timers at a fixed resolution. Timers count elapsed
//! time handed to them rather than reading the wall clock, so they can be
//! driven directly in tests.

use crate::alerts::{AlertChannel, AlertEvent, DialogResponse, MissingCameraLatch};
use crate::config::{AppConfig, APP_DISPLAY_NAME};
use crate::device::DeviceStatus;
use crate::shutdown::ShutdownSignal;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Text of the camera-missing escalation dialog.
pub const MISSING_CAMERA_DIALOG: &str =
    "No external camera found, Please Insert an External Camera.";

/// Configuration for the scheduler thread.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Tick resolution (default: 1s).
    pub tick: Duration,
    /// Health check period (default: 10s).
    pub health_check_period: Duration,
    /// Active time between breaks (default: 2h).
    pub break_interval: Duration,
    /// Break length (default: 5min).
    pub break_duration: Duration,
    /// Offer the escalation dialog when the camera goes missing.
    pub missing_camera_dialog: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for SchedulerConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            tick: config.schedule.tick(),
            health_check_period: config.schedule.health_check_period(),
            break_interval: config.schedule.break_interval(),
            break_duration: config.schedule.break_duration(),
            missing_camera_dialog: config.alerts.missing_camera_dialog,
        }
    }
}

/// Fires once per period of accumulated time.
#[derive(Debug, Clone)]
pub struct HealthCheckTimer {
    period: Duration,
    since_last: Duration,
}

impl HealthCheckTimer {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            since_last: Duration::ZERO,
        }
    }

    /// Returns `true` when a check is due.
    pub fn tick(&mut self, elapsed: Duration) -> bool {
        self.since_last += elapsed;
        if self.since_last >= self.period {
            self.since_last = Duration::ZERO;
            true
        } else {
            false
        }
    }
}

/// Counts active time towards the next break.
///
/// Time does not accumulate while a break is running and no second break
/// starts until the current one has finished.
#[derive(Debug, Clone)]
pub struct BreakTimer {
    interval: Duration,
    worked: Duration,
    on_break: Arc<AtomicBool>,
}

impl BreakTimer {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            worked: Duration::ZERO,
            on_break: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Returns `true` when a break should start now.
    pub fn tick(&mut self, elapsed: Duration) -> bool {
        if self.is_on_break() {
            return false;
        }
        self.worked += elapsed;
        if self.worked < self.interval {
            return false;
        }
        self.worked = Duration::ZERO;
        self.on_break.store(true, Ordering::SeqCst);
        true
    }

    pub fn worked(&self) -> Duration {
        self.worked
    }

    pub fn is_on_break(&self) -> bool {
        self.on_break.load(Ordering::SeqCst)
    }

    /// Handle the countdown uses to end the break.
    fn break_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.on_break)
    }

    /// Starts counting again from zero.
    pub fn reset(&mut self) {
        self.worked = Duration::ZERO;
        self.on_break.store(false, Ordering::SeqCst);
    }
}

pub struct PeriodicScheduler {
    config: SchedulerConfig,
    alerts: Arc<AlertChannel>,
    device: DeviceStatus,
    latch: MissingCameraLatch,
    shutdown: ShutdownSignal,
    health: HealthCheckTimer,
    breaks: BreakTimer,
    countdown: Option<JoinHandle<()>>,
    /// Escalation dialog thread. Never joined: nobody may answer it.
    dialog: Option<JoinHandle<()>>,
}

impl PeriodicScheduler {
    pub fn new(
        config: SchedulerConfig,
        alerts: Arc<AlertChannel>,
        device: DeviceStatus,
        latch: MissingCameraLatch,
        shutdown: ShutdownSignal,
    ) -> Self {
        Self {
            health: HealthCheckTimer::new(config.health_check_period),
            breaks: BreakTimer::new(config.break_interval),
            config,
            alerts,
            device,
            latch,
            shutdown,
            countdown: None,
            dialog: None,
        }
    }

    /// Advances both timers by `elapsed` and runs whatever is due.
    pub fn tick(&mut self, elapsed: Duration) {
        if self.health.tick(elapsed) {
            self.check_device();
        }
        if self.breaks.tick(elapsed) {
            self.start_break();
        }
    }

    /// Alerts once when the camera goes missing; re-arms when it is back.
    pub fn check_device(&mut self) {
        if self.device.is_open() {
            if self.latch.reset() {
                tracing::info!(index = ?self.device.current_index(), "Camera restored");
            }
            return;
        }

        if !self.latch.trip() {
            return;
        }
        tracing::warn!("No USB camera detected");
        self.alerts.emit(AlertEvent::camera_missing());

        if self.config.missing_camera_dialog {
            let shutdown = self.shutdown.clone();
            let dialog = self.alerts.confirm_in_background(
                APP_DISPLAY_NAME,
                MISSING_CAMERA_DIALOG,
                move |response| {
                    if response == DialogResponse::Cancel {
                        tracing::info!("Camera dialog cancelled, stopping");
                        shutdown.request();
                    }
                },
            );
            if dialog.is_some() {
                self.dialog = dialog;
            }
        }
    }

    #[cfg(test)]
    fn join_dialog(&mut self) {
        if let Some(handle) = self.dialog.take() {
            handle.join().unwrap();
        }
    }

    fn start_break(&mut self) {
        self.join_countdown();

        let interval = self.config.break_interval;
        let duration = self.config.break_duration;
        tracing::info!(
            minutes = duration.as_secs() / 60,
            "Break time, starting countdown"
        );
        self.alerts.emit(AlertEvent::break_start(interval, duration));

        let on_break = self.breaks.break_flag();
        let alerts = Arc::clone(&self.alerts);
        let shutdown = self.shutdown.clone();
        self.countdown = Some(thread::spawn(move || {
            if shutdown.sleep(duration) {
                tracing::info!("Break over");
                alerts.emit(AlertEvent::break_over(duration));
            }
            on_break.store(false, Ordering::SeqCst);
        }));
    }

    /// Waits for a running break countdown.
    pub fn join_countdown(&mut self) {
        if let Some(handle) = self.countdown.take() {
            if handle.join().is_err() {
                tracing::warn!("Break countdown thread panicked");
            }
        }
    }
}

/// Spawns the scheduler thread.
pub fn spawn_scheduler_thread(
    shutdown: ShutdownSignal,
    mut scheduler: PeriodicScheduler,
) -> JoinHandle<()> {
    thread::spawn(move || {
        let tick = scheduler.config.tick;
        tracing::info!(
            tick_ms = tick.as_millis(),
            health_check_secs = scheduler.config.health_check_period.as_secs(),
            break_interval_secs = scheduler.config.break_interval.as_secs(),
            "Scheduler thread started"
        );

        let mut last = Instant::now();
        while shutdown.sleep(tick) {
            let now = Instant::now();
            scheduler.tick(now - last);
            last = now;
        }

        scheduler.join_countdown();
        tracing::info!("Scheduler thread stopped");
    })
}
