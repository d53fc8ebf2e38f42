//! Application configuration loaded from TOML.
//!
//! Every section and field has a default, so a missing or empty file gives a
//! working monitor. Paths that are not set explicitly resolve below the
//! per-user data directory.

use crate::alerts::AlertKind;
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Directory name used below the platform config/data directories.
pub const APP_DIR_NAME: &str = "wristguard";

/// Name shown on notifications and dialogs.
pub const APP_DISPLAY_NAME: &str = "Don't Wrist It";

/// Top-level application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub device: DeviceConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub alerts: AlertsConfig,
    #[serde(default)]
    pub audio: AudioConfig,
    #[serde(default)]
    pub signal: SignalConfig,
    #[serde(default)]
    pub persistence: PersistenceConfig,
    #[serde(default)]
    pub model: ModelConfig,
}

/// File locations. `None` means "below the data directory".
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub data_dir: Option<PathBuf>,
    /// File written by the external control surface ("0" / "1").
    pub status_file: Option<PathBuf>,
    pub detection_log: Option<PathBuf>,
    pub image_dir: Option<PathBuf>,
    /// Application log. Set to an empty path to log to stderr.
    pub app_log: Option<PathBuf>,
}

/// Camera acquisition settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// First probed index. Index 0 is the built-in camera and is skipped.
    pub probe_first: i32,
    pub probe_last: i32,
    pub retry_backoff_secs: u64,
}

/// Periodic timers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    pub tick_millis: u64,
    pub health_check_secs: u64,
    pub break_interval_secs: u64,
    pub break_duration_secs: u64,
}

/// Alert behaviour and per-kind enable flags.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertsConfig {
    pub cooldown_secs: u64,
    pub notification_timeout_millis: u32,
    pub startup_dialog: bool,
    pub missing_camera_dialog: bool,
    pub no_hands: bool,
    pub one_hand: bool,
    pub incorrect_posture: bool,
    pub camera_missing: bool,
    pub breaks: bool,
    pub startup: bool,
}

/// Audio cue files and the player used where no native API exists.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    pub enabled: bool,
    pub no_hands: PathBuf,
    pub one_hand: PathBuf,
    pub incorrect_posture: PathBuf,
    /// Command used to play a WAV file on non-Windows platforms.
    pub player: Vec<String>,
}

/// StatusSignal polling.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalConfig {
    pub poll_millis: u64,
    /// Policy value before the status file is first read.
    pub initial_enabled: bool,
}

/// Frame and detection-log persistence.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistenceConfig {
    pub save_images: bool,
    pub workers: usize,
    /// Frames allowed to wait for a worker; later frames are not persisted.
    pub max_pending: usize,
    pub image_prefix: String,
}

/// Model locations.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// JSON random-forest export.
    pub classifier_path: Option<PathBuf>,
    /// Helper process that turns frames into landmark vectors.
    pub extractor_command: Vec<String>,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            probe_first: 1,
            probe_last: 9,
            retry_backoff_secs: 5,
        }
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            tick_millis: 1000,
            health_check_secs: 10,
            break_interval_secs: 2 * 60 * 60,
            break_duration_secs: 5 * 60,
        }
    }
}

impl Default for AlertsConfig {
    fn default() -> Self {
        Self {
            cooldown_secs: 3,
            notification_timeout_millis: 3000,
            startup_dialog: true,
            missing_camera_dialog: true,
            no_hands: true,
            one_hand: true,
            incorrect_posture: true,
            camera_missing: true,
            breaks: true,
            startup: true,
        }
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            no_hands: PathBuf::from("audio2.wav"),
            one_hand: PathBuf::from("audio3.wav"),
            incorrect_posture: PathBuf::from("audio.wav"),
            player: vec!["aplay".into(), "-q".into()],
        }
    }
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            poll_millis: 100,
            initial_enabled: false,
        }
    }
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            save_images: true,
            workers: 2,
            max_pending: 8,
            image_prefix: "capture".into(),
        }
    }
}

impl DeviceConfig {
    pub fn probe_range(&self) -> RangeInclusive<i32> {
        self.probe_first..=self.probe_last
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_secs(self.retry_backoff_secs)
    }
}

impl ScheduleConfig {
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_millis)
    }

    pub fn health_check_period(&self) -> Duration {
        Duration::from_secs(self.health_check_secs)
    }

    pub fn break_interval(&self) -> Duration {
        Duration::from_secs(self.break_interval_secs)
    }

    pub fn break_duration(&self) -> Duration {
        Duration::from_secs(self.break_duration_secs)
    }
}

impl AlertsConfig {
    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_secs)
    }

    /// Per-kind enable flag.
    pub fn is_enabled(&self, kind: AlertKind) -> bool {
        match kind {
            AlertKind::NoHands => self.no_hands,
            AlertKind::OneHand => self.one_hand,
            AlertKind::IncorrectPosture => self.incorrect_posture,
            AlertKind::CameraMissing => self.camera_missing,
            AlertKind::BreakStart | AlertKind::BreakOver => self.breaks,
            AlertKind::Startup => self.startup,
        }
    }
}

impl SignalConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_millis)
    }
}

impl AppConfig {
    /// Loads from `path`, or returns defaults if the file does not exist.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load_from(path)
        } else {
            tracing::info!(path = ?path, "Config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Loads and validates a config file.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects values the monitor cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.device.probe_first > self.device.probe_last {
            return Err(ConfigError::Invalid {
                field: "device.probe_first",
                reason: format!(
                    "probe range {}..={} is empty",
                    self.device.probe_first, self.device.probe_last
                ),
            });
        }
        if self.schedule.tick_millis == 0 {
            return Err(ConfigError::Invalid {
                field: "schedule.tick_millis",
                reason: "must be greater than zero".into(),
            });
        }
        if self.persistence.workers == 0 {
            return Err(ConfigError::Invalid {
                field: "persistence.workers",
                reason: "at least one worker is required".into(),
            });
        }
        if self.persistence.max_pending == 0 {
            return Err(ConfigError::Invalid {
                field: "persistence.max_pending",
                reason: "must be greater than zero".into(),
            });
        }
        if self.signal.poll_millis == 0 {
            return Err(ConfigError::Invalid {
                field: "signal.poll_millis",
                reason: "must be greater than zero".into(),
            });
        }
        Ok(())
    }

    /// Default config file location.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR_NAME)
            .join("config.toml")
    }

    pub fn data_dir(&self) -> PathBuf {
        self.paths.data_dir.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(APP_DIR_NAME)
        })
    }

    pub fn status_file(&self) -> PathBuf {
        self.paths
            .status_file
            .clone()
            .unwrap_or_else(|| self.data_dir().join("Notification.log"))
    }

    pub fn detection_log(&self) -> PathBuf {
        self.paths
            .detection_log
            .clone()
            .unwrap_or_else(|| self.data_dir().join("detection.log"))
    }

    pub fn image_dir(&self) -> PathBuf {
        self.paths
            .image_dir
            .clone()
            .unwrap_or_else(|| self.data_dir().join("captured_images"))
    }

    /// Application log file, or `None` for stderr.
    pub fn app_log(&self) -> Option<PathBuf> {
        match &self.paths.app_log {
            Some(p) if p.as_os_str().is_empty() => None,
            Some(p) => Some(p.clone()),
            None => Some(self.data_dir().join("camera.log")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_match_documented_intervals() {
        let config = AppConfig::default();
        assert_eq!(config.device.probe_range(), 1..=9);
        assert_eq!(config.device.retry_backoff(), Duration::from_secs(5));
        assert_eq!(config.schedule.tick(), Duration::from_secs(1));
        assert_eq!(config.schedule.health_check_period(), Duration::from_secs(10));
        assert_eq!(config.schedule.break_interval(), Duration::from_secs(7200));
        assert_eq!(config.schedule.break_duration(), Duration::from_secs(300));
        assert_eq!(config.alerts.cooldown(), Duration::from_secs(3));
        assert_eq!(config.signal.poll_interval(), Duration::from_millis(100));
        assert_eq!(config.persistence.workers, 2);
        assert_eq!(config.persistence.max_pending, 8);
        assert!(!config.signal.initial_enabled);
    }

    #[test]
    fn test_empty_file_gives_defaults() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert_eq!(config.device.probe_first, 1);
        assert_eq!(config.persistence.image_prefix, "capture");
        assert!(config.alerts.camera_missing);
    }

    #[test]
    fn test_partial_section_keeps_other_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [alerts]
            cooldown_secs = 10
            one_hand = false

            [device]
            probe_last = 4
            "#,
        )
        .unwrap();

        assert_eq!(config.alerts.cooldown_secs, 10);
        assert!(!config.alerts.is_enabled(AlertKind::OneHand));
        assert!(config.alerts.is_enabled(AlertKind::NoHands));
        assert_eq!(config.device.probe_range(), 1..=4);
        assert_eq!(config.device.retry_backoff_secs, 5);
    }

    #[test]
    fn test_validate_rejects_empty_probe_range() {
        let mut config = AppConfig::default();
        config.device.probe_first = 5;
        config.device.probe_last = 2;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid {
                field: "device.probe_first",
                ..
            })
        ));
    }

    #[test]
    fn test_validate_rejects_zero_workers() {
        let mut config = AppConfig::default();
        config.persistence.workers = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.persistence.max_pending = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid {
                field: "persistence.max_pending",
                ..
            })
        ));
    }

    #[test]
    fn test_paths_resolve_below_data_dir() {
        let mut config = AppConfig::default();
        config.paths.data_dir = Some(PathBuf::from("/tmp/wg"));

        assert_eq!(config.status_file(), PathBuf::from("/tmp/wg/Notification.log"));
        assert_eq!(config.detection_log(), PathBuf::from("/tmp/wg/detection.log"));
        assert_eq!(config.image_dir(), PathBuf::from("/tmp/wg/captured_images"));
        assert_eq!(config.app_log(), Some(PathBuf::from("/tmp/wg/camera.log")));

        config.paths.app_log = Some(PathBuf::new());
        assert_eq!(config.app_log(), None);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "[schedule]\nbreak_interval_secs = 60").unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.schedule.break_interval(), Duration::from_secs(60));
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load_or_default(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.alerts.cooldown_secs, 3);
    }

    #[test]
    fn test_load_from_rejects_bad_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[device\nprobe_first = ").unwrap();
        assert!(matches!(
            AppConfig::load_from(&path),
            Err(ConfigError::Parse(_))
        ));
    }
}
