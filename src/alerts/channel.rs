//! Alert dispatch.
//!
//! [`AlertChannel`] is shared by the capture loop and the scheduler. It
//! applies the per-kind enable flags and hands delivery to a worker pool, so
//! emitting never blocks the caller. Dialogs never run on that pool: they
//! block until answered, so they get a thread of their own.

use super::types::{AlertEvent, AlertKind, AudioCue, DialogResponse};
use crate::config::AlertsConfig;
use crate::error::AlertError;
use crate::store::WorkerPool;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Platform alert delivery.
pub trait AlertSink: Send + Sync {
    fn notify(&self, event: &AlertEvent) -> Result<(), AlertError>;

    fn play_audio(&self, cue: AudioCue) -> Result<(), AlertError>;

    /// Blocks until the user answers.
    fn confirm_dialog(&self, title: &str, body: &str) -> DialogResponse;
}

pub struct AlertChannel {
    sink: Arc<dyn AlertSink>,
    config: AlertsConfig,
    audio_enabled: bool,
    pool: Arc<WorkerPool>,
    emitted: AtomicU64,
    disabled: AtomicU64,
    dialog_open: Arc<AtomicBool>,
}

impl AlertChannel {
    pub fn new(
        sink: Arc<dyn AlertSink>,
        config: &AlertsConfig,
        audio_enabled: bool,
        pool: Arc<WorkerPool>,
    ) -> Self {
        Self {
            sink,
            config: config.clone(),
            audio_enabled,
            pool,
            emitted: AtomicU64::new(0),
            disabled: AtomicU64::new(0),
            dialog_open: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn is_enabled(&self, kind: AlertKind) -> bool {
        self.config.is_enabled(kind)
    }

    /// Delivers an alert in the background.
    ///
    /// Returns `false` if the alert kind is disabled.
    pub fn emit(&self, event: AlertEvent) -> bool {
        if !self.is_enabled(event.kind) {
            self.disabled.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(kind = ?event.kind, "Alert disabled, dropping");
            return false;
        }

        self.emitted.fetch_add(1, Ordering::Relaxed);
        tracing::info!(kind = ?event.kind, title = %event.title, "{}", event.body);

        let sink = Arc::clone(&self.sink);
        let cue = self.audio_enabled.then(|| event.kind.audio_cue()).flatten();
        self.pool.submit(move || {
            if let Err(e) = sink.notify(&event) {
                tracing::warn!(kind = ?event.kind, error = %e, "Notification failed");
            }
            if let Some(cue) = cue {
                if let Err(e) = sink.play_audio(cue) {
                    tracing::warn!(?cue, error = %e, "Audio cue failed");
                }
            }
        });
        true
    }

    /// Shows a dialog on the calling thread.
    pub fn confirm(&self, title: &str, body: &str) -> DialogResponse {
        let response = self.sink.confirm_dialog(title, body);
        tracing::info!(title, ?response, "Dialog answered");
        response
    }

    /// Shows a dialog on its own thread and passes the answer to
    /// `on_response`.
    ///
    /// At most one background dialog is open at a time; while one is shown,
    /// further requests are skipped and `None` is returned.
    pub fn confirm_in_background<F>(
        &self,
        title: &str,
        body: &str,
        on_response: F,
    ) -> Option<JoinHandle<()>>
    where
        F: FnOnce(DialogResponse) + Send + 'static,
    {
        if self
            .dialog_open
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            tracing::debug!(title, "Dialog already open, skipping");
            return None;
        }

        let sink = Arc::clone(&self.sink);
        let open = Arc::clone(&self.dialog_open);
        let title = title.to_string();
        let body = body.to_string();
        let spawned = thread::Builder::new()
            .name("wristguard-dialog".into())
            .spawn(move || {
                let response = sink.confirm_dialog(&title, &body);
                open.store(false, Ordering::SeqCst);
                tracing::info!(title = %title, ?response, "Dialog answered");
                on_response(response);
            });

        match spawned {
            Ok(handle) => Some(handle),
            Err(e) => {
                self.dialog_open.store(false, Ordering::SeqCst);
                tracing::warn!(error = %e, "Failed to start dialog thread");
                None
            }
        }
    }

    /// Alerts handed to the sink so far.
    pub fn emitted(&self) -> u64 {
        self.emitted.load(Ordering::Relaxed)
    }

    /// Alerts dropped by the per-kind flags.
    pub fn disabled(&self) -> u64 {
        self.disabled.load(Ordering::Relaxed)
    }

    /// Waits for queued deliveries.
    pub fn flush(&self) {
        self.pool.flush();
    }
}
