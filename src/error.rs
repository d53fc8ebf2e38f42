//! Error types for the monitor.
//!
//! Each subsystem has its own error enum; [`MonitorError`] is the loop-level
//! taxonomy that decides whether an iteration failure is recovered locally or
//! stops the monitor.

use std::path::PathBuf;
use thiserror::Error;

/// Failures from the capture backend.
#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("camera index {0} could not be opened")]
    OpenFailed(i32),
    #[error("failed to read frame from camera {index}: {reason}")]
    ReadFailed { index: i32, reason: String },
    #[error("no camera is open")]
    NotOpen,
    #[error("capture backend error: {0}")]
    Backend(String),
}

/// Failures from the landmark extractor.
#[derive(Error, Debug)]
pub enum ExtractorError {
    #[error("extractor process unavailable: {0}")]
    Unavailable(String),
    #[error("extractor I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed extractor output: {0}")]
    Malformed(String),
}

/// Failures inside the posture classifier.
#[derive(Error, Debug)]
pub enum ClassifierError {
    #[error("expected {expected} features, got {actual}")]
    WrongLength { expected: usize, actual: usize },
    #[error("feature {0} is absent")]
    MissingFeature(usize),
    #[error("invalid model: {0}")]
    InvalidModel(String),
    #[error("failed to load model from {path}: {reason}")]
    Load { path: PathBuf, reason: String },
}

/// Failures while writing captured frames or detection log lines.
#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("image encoding failed: {0}")]
    Encode(String),
    #[error("worker pool unavailable: {0}")]
    Pool(String),
}

/// Failures delivering an alert through one of the channels.
#[derive(Error, Debug)]
pub enum AlertError {
    #[error("failed to send notification: {0}")]
    SendFailed(String),
    #[error("alert channel unavailable: {0}")]
    ChannelUnavailable(String),
}

/// Failures loading or validating the configuration file.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Loop-level error taxonomy.
#[derive(Error, Debug)]
pub enum MonitorError {
    /// No capture device could be opened. Retried forever.
    #[error("capture device unavailable")]
    DeviceUnavailable,

    /// A frame read failed; the device is re-acquired.
    #[error("frame read failed: {0}")]
    FrameRead(#[from] CaptureError),

    /// The extractor returned a vector of non-standard length.
    #[error("unexpected landmark vector length {0}")]
    ExtractionAnomaly(usize),

    /// The classifier failed on one frame.
    #[error("classification failed: {0}")]
    Classification(#[from] ClassifierError),

    /// Writing evidence for one frame failed.
    #[error("persistence failed: {0}")]
    Persistence(#[from] PersistenceError),

    /// Anything else. Stops the loop.
    #[error("fatal monitor fault: {0}")]
    Fatal(String),
}

impl MonitorError {
    /// Whether the loop recovers from this error locally.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, MonitorError::Fatal(_))
    }
}

impl From<ExtractorError> for MonitorError {
    fn from(e: ExtractorError) -> Self {
        MonitorError::Fatal(format!("landmark extractor failed: {e}"))
    }
}
