//! End-to-end runs of the capture loop with scripted hardware and models.

use std::collections::VecDeque;
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use wristguard::alerts::{
    AlertChannel, AlertEvent, AlertKind, AlertSink, AudioCue, DialogResponse,
    MissingCameraLatch,
};
use wristguard::config::AppConfig;
use wristguard::device::{CaptureBackend, CaptureDevice, DeviceInfo, DeviceManager, Frame};
use wristguard::error::{
    AlertError, CaptureError, ClassifierError, ExtractorError, PersistenceError,
};
use wristguard::monitor::*;
use wristguard::posture::{FeatureVector, LandmarkExtractor, PostureClassifier};
use wristguard::shutdown::ShutdownSignal;
use wristguard::store::{CapturePersistence, ImageWriter, WorkerPool};

#[derive(Default)]
struct Recorder {
    notifications: Mutex<Vec<AlertKind>>,
    cues: Mutex<Vec<AudioCue>>,
}

impl AlertSink for Recorder {
    fn notify(&self, event: &AlertEvent) -> Result<(), AlertError> {
        self.notifications.lock().unwrap().push(event.kind);
        Ok(())
    }

    fn play_audio(&self, cue: AudioCue) -> Result<(), AlertError> {
        self.cues.lock().unwrap().push(cue);
        Ok(())
    }

    fn confirm_dialog(&self, _title: &str, _body: &str) -> DialogResponse {
        DialogResponse::Ok
    }
}

/// Only index 4 opens, like a single external camera.
struct UsbCamera;

impl CaptureDevice for UsbCamera {
    fn index(&self) -> i32 {
        4
    }

    fn is_open(&self) -> bool {
        true
    }

    fn read_frame(&mut self) -> Result<Frame, CaptureError> {
        Ok(Frame::new(2, 2, vec![128; 12]))
    }

    fn release(&mut self) {}
}

struct ClosedDevice(i32);

impl CaptureDevice for ClosedDevice {
    fn index(&self) -> i32 {
        self.0
    }

    fn is_open(&self) -> bool {
        false
    }

    fn read_frame(&mut self) -> Result<Frame, CaptureError> {
        Err(CaptureError::NotOpen)
    }

    fn release(&mut self) {}
}

struct Backend;

impl CaptureBackend for Backend {
    fn enumerate(&self) -> Vec<DeviceInfo> {
        vec![DeviceInfo {
            name: "USB Camera".into(),
            description: "UVC webcam".into(),
            bus_path: "/sys/devices/pci0000:00/usb1/1-2".into(),
        }]
    }

    fn open(&self, index: i32) -> Result<Box<dyn CaptureDevice>, CaptureError> {
        if index == 4 {
            Ok(Box::new(UsbCamera))
        } else {
            Ok(Box::new(ClosedDevice(index)))
        }
    }
}

struct Script {
    readings: VecDeque<FeatureVector>,
    shutdown: ShutdownSignal,
}

impl LandmarkExtractor for Script {
    fn extract(&mut self, _frame: &Frame) -> Result<FeatureVector, ExtractorError> {
        match self.readings.pop_front() {
            Some(reading) => Ok(reading),
            None => {
                self.shutdown.request();
                Err(ExtractorError::Unavailable("script finished".into()))
            }
        }
    }
}

struct Threshold(f32);

impl PostureClassifier for Threshold {
    fn probability_correct(&self, _row: &[f32]) -> Result<f32, ClassifierError> {
        Ok(self.0)
    }
}

struct Writer;

impl ImageWriter for Writer {
    fn write_png(&self, frame: &Frame, path: &Path) -> Result<(), PersistenceError> {
        fs::write(path, frame.data()).map_err(|source| PersistenceError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

struct Setup {
    dir: TempDir,
    config: AppConfig,
    recorder: Arc<Recorder>,
    alerts: Arc<AlertChannel>,
    shutdown: ShutdownSignal,
}

fn setup(status: &str) -> Setup {
    let dir = TempDir::new().unwrap();
    let mut config = AppConfig::default();
    config.paths.data_dir = Some(dir.path().to_path_buf());
    config.device.retry_backoff_secs = 0;
    fs::write(config.status_file(), status).unwrap();

    let recorder = Arc::new(Recorder::default());
    let pool = Arc::new(WorkerPool::new("it-alerts", 2).unwrap());
    let alerts = Arc::new(AlertChannel::new(
        Arc::clone(&recorder) as Arc<dyn AlertSink>,
        &config.alerts,
        true,
        pool,
    ));

    Setup {
        dir,
        config,
        recorder,
        alerts,
        shutdown: ShutdownSignal::new(),
    }
}

fn readings(lengths: &[usize]) -> VecDeque<FeatureVector> {
    lengths
        .iter()
        .map(|&len| FeatureVector::from_values(&vec![0.25; len]))
        .collect()
}

fn run(s: &Setup, script: VecDeque<FeatureVector>, probability: f32) -> (MonitorLoop, LoopState) {
    let mut watcher = StatusWatcher::new(s.config.status_file(), NotificationPolicy::new(false));
    watcher.poll();

    let device = DeviceManager::new(Box::new(Backend), &s.config.device);
    let persistence = CapturePersistence::new(
        &s.config,
        Arc::new(Writer),
        // one worker keeps detection-log lines in frame order
        Arc::new(WorkerPool::new("it-persist", 1).unwrap()),
    );
    let mut monitor = MonitorLoop::new(
        MonitorParts {
            device,
            extractor: Box::new(Script {
                readings: script,
                shutdown: s.shutdown.clone(),
            }),
            classifier: Arc::new(Threshold(probability)),
            alerts: Arc::clone(&s.alerts),
            persistence,
            policy: watcher.policy(),
            shutdown: s.shutdown.clone(),
        },
        s.config.alerts.cooldown(),
    );

    let state = monitor.run();
    monitor.persistence().flush();
    s.alerts.flush();
    (monitor, state)
}

fn detection_lines(s: &Setup) -> Vec<String> {
    fs::read_to_string(s.config.detection_log())
        .unwrap_or_default()
        .lines()
        .map(|line| line.split_once(" - ").unwrap().1.to_string())
        .collect()
}

#[test]
fn test_enabled_notifications_alert_once_per_cooldown() {
    let s = setup("1");

    let (monitor, state) = run(&s, readings(&[0, 21, 42, 42]), 0.1);

    assert_eq!(state, LoopState::Stopped);
    // frames arrive within milliseconds, so only the first alert passes
    assert_eq!(*s.recorder.notifications.lock().unwrap(), vec![AlertKind::NoHands]);
    assert_eq!(*s.recorder.cues.lock().unwrap(), vec![AudioCue::NoHands]);

    let snap = monitor.counters().snapshot();
    assert_eq!(snap.frames_processed, 4);
    assert_eq!(snap.alerts_fired, 1);
    assert_eq!(snap.suppressed_by_cooldown, 3);

    assert_eq!(
        detection_lines(&s),
        vec![
            "No hands detected",
            "One hand detected",
            "Incorrect hand posture detected",
            "Incorrect hand posture detected",
        ]
    );
    let images = fs::read_dir(s.dir.path().join("captured_images"))
        .unwrap()
        .count();
    assert_eq!(images, 4);
}

#[test]
fn test_muted_notifications_still_capture_and_log() {
    let s = setup("0");

    let (monitor, _state) = run(&s, readings(&[42, 0, 13]), 0.9);

    assert!(s.recorder.notifications.lock().unwrap().is_empty());
    let snap = monitor.counters().snapshot();
    assert_eq!(snap.suppressed_by_policy, 1);
    assert_eq!(snap.anomalous_readings, 1);
    assert_eq!(
        detection_lines(&s),
        vec!["Correct hand posture", "No hands detected"]
    );
}

#[test]
fn test_camera_missing_alert_ignores_muted_notifications() {
    let s = setup("0");
    let device = DeviceManager::new(Box::new(Backend), &s.config.device);

    let mut config = SchedulerConfig::from(&s.config);
    config.missing_camera_dialog = false;
    let mut scheduler = PeriodicScheduler::new(
        config,
        Arc::clone(&s.alerts),
        device.status(),
        MissingCameraLatch::new(),
        s.shutdown.clone(),
    );

    for _ in 0..3 {
        scheduler.tick(Duration::from_secs(10));
    }
    s.alerts.flush();

    assert_eq!(
        *s.recorder.notifications.lock().unwrap(),
        vec![AlertKind::CameraMissing]
    );
}
