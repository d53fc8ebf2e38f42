//! The capture loop.
//!
//! Runs on the main thread: acquire a camera, then read, extract, classify,
//! alert and persist one frame per iteration until stopped. Read failures
//! send the loop back to device search; extractor failures stop it.

use super::console::QuitKeyPresses;
use super::counters::MonitorCounters;
use super::status_signal::NotificationPolicy;
use crate::alerts::{AlertChannel, AlertEvent, AlertGate, AlertKind};
use crate::device::{DeviceManager, Frame};
use crate::error::MonitorError;
use crate::posture::{assess, Assessment, LandmarkExtractor, PostureClassifier, PostureVerdict};
use crate::shutdown::ShutdownSignal;
use crate::store::CapturePersistence;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Idle,
    DeviceSearching,
    Capturing,
    Stopped,
}

/// Everything the loop drives.
pub struct MonitorParts {
    pub device: DeviceManager,
    pub extractor: Box<dyn LandmarkExtractor>,
    pub classifier: Arc<dyn PostureClassifier>,
    pub alerts: Arc<AlertChannel>,
    pub persistence: CapturePersistence,
    pub policy: NotificationPolicy,
    pub shutdown: ShutdownSignal,
}

pub struct MonitorLoop {
    device: DeviceManager,
    extractor: Box<dyn LandmarkExtractor>,
    classifier: Arc<dyn PostureClassifier>,
    alerts: Arc<AlertChannel>,
    persistence: CapturePersistence,
    policy: NotificationPolicy,
    shutdown: ShutdownSignal,
    gate: AlertGate,
    counters: Arc<MonitorCounters>,
    quit_keys: QuitKeyPresses,
    state: LoopState,
}

impl MonitorLoop {
    pub fn new(parts: MonitorParts, cooldown: Duration) -> Self {
        Self {
            device: parts.device,
            extractor: parts.extractor,
            classifier: parts.classifier,
            alerts: parts.alerts,
            persistence: parts.persistence,
            policy: parts.policy,
            shutdown: parts.shutdown,
            gate: AlertGate::new(cooldown),
            counters: Arc::new(MonitorCounters::new()),
            quit_keys: QuitKeyPresses::new(),
            state: LoopState::Idle,
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn counters(&self) -> Arc<MonitorCounters> {
        Arc::clone(&self.counters)
    }

    /// Handle for the console observer.
    pub fn quit_keys(&self) -> QuitKeyPresses {
        self.quit_keys.clone()
    }

    pub fn persistence(&self) -> &CapturePersistence {
        &self.persistence
    }

    /// Runs until a stop is requested or a fatal fault occurs.
    ///
    /// The device is released on return.
    pub fn run(&mut self) -> LoopState {
        tracing::info!("Monitor loop started");
        self.transition(LoopState::DeviceSearching);

        while self.state != LoopState::Stopped {
            match self.state {
                LoopState::Idle => self.transition(LoopState::DeviceSearching),
                LoopState::DeviceSearching => self.search(),
                LoopState::Capturing => self.capture_once(),
                LoopState::Stopped => {}
            }
        }

        self.device.release();
        tracing::info!("Monitor loop stopped");
        self.state
    }

    fn transition(&mut self, next: LoopState) {
        if self.state != next {
            tracing::debug!(from = ?self.state, to = ?next, "Monitor state changed");
            self.state = next;
        }
    }

    fn search(&mut self) {
        match self.device.acquire(&self.shutdown) {
            Some(index) => {
                if self.device.status().acquisitions() > 1 {
                    self.counters.device_reconnect();
                }
                tracing::info!(index, "Monitoring camera");
                self.transition(LoopState::Capturing);
            }
            None => self.transition(LoopState::Stopped),
        }
    }

    fn capture_once(&mut self) {
        if self.shutdown.is_requested() {
            self.transition(LoopState::Stopped);
            return;
        }
        self.drain_quit_keys();

        let frame = match self.device.read_frame() {
            Ok(frame) => frame,
            Err(e) => {
                let err = MonitorError::FrameRead(e);
                tracing::warn!(error = %err, "Camera read failed, searching again");
                self.device.release();
                self.transition(LoopState::DeviceSearching);
                return;
            }
        };

        match self.process_frame(&frame, Instant::now()) {
            Ok(_) => {}
            Err(e) if e.is_recoverable() => {
                tracing::warn!(error = %e, "Frame skipped");
            }
            Err(e) => {
                tracing::error!(error = %e, "Monitor loop fault, stopping");
                self.device.release();
                self.transition(LoopState::Stopped);
            }
        }
    }

    fn drain_quit_keys(&self) {
        for _ in 0..self.quit_keys.take() {
            self.counters.quit_pressed();
            tracing::info!("User pressed 'q', but continuing");
        }
    }

    /// Runs one frame through extraction, alerting and persistence.
    ///
    /// `now` positions the frame for the alert cool-down.
    pub fn process_frame(
        &mut self,
        frame: &Frame,
        now: Instant,
    ) -> Result<PostureVerdict, MonitorError> {
        let features = self.extractor.extract(frame)?;
        let assessment = assess(&features, self.classifier.as_ref());
        self.counters.frame_processed();

        self.log_assessment(&assessment);
        self.maybe_alert(assessment.verdict, now);
        self.persistence.persist(frame, assessment.verdict);

        Ok(assessment.verdict)
    }

    fn log_assessment(&self, assessment: &Assessment) {
        match assessment.verdict {
            PostureVerdict::NoHands => tracing::warn!("No hands detected"),
            PostureVerdict::OneHand => tracing::warn!("One hand detected"),
            PostureVerdict::CorrectPosture => {
                tracing::info!(probability = ?assessment.probability, "Correct hand posture")
            }
            PostureVerdict::IncorrectPosture => {
                tracing::info!(probability = ?assessment.probability, "Incorrect hand posture detected")
            }
            PostureVerdict::AnomalousReading => {
                self.counters.anomalous_reading();
                match &assessment.anomaly {
                    Some(e) => tracing::warn!(error = %e, "Unexpected landmark reading"),
                    None => tracing::warn!("Unexpected landmark reading"),
                }
            }
        }
    }

    fn maybe_alert(&mut self, verdict: PostureVerdict, now: Instant) {
        let Some(event) = AlertEvent::for_verdict(verdict) else {
            return;
        };
        let kind: AlertKind = event.kind;

        if !self.alerts.is_enabled(kind) {
            return;
        }
        if kind.is_gated_by_policy() && !self.policy.is_enabled() {
            self.counters.suppressed_by_policy();
            tracing::debug!(?kind, "Notifications disabled, alert suppressed");
            return;
        }
        if !self.gate.try_fire(now) {
            self.counters.suppressed_by_cooldown();
            tracing::debug!(
                ?kind,
                remaining_ms = self.gate.remaining(now).as_millis(),
                "Alert cooling down"
            );
            return;
        }

        if self.alerts.emit(event) {
            self.counters.alert_fired();
        }
    }
}
