//! Desktop alert sink: system notifications, WAV cues and confirm dialogs.

use super::channel::AlertSink;
use super::types::{AlertEvent, AlertKind, AudioCue, DialogResponse};
use crate::config::{AudioConfig, APP_DISPLAY_NAME};
use crate::error::AlertError;
use notify_rust::{Notification, Timeout};
use std::path::{Path, PathBuf};

pub struct DesktopAlerts {
    timeout_millis: u32,
    audio: AudioConfig,
}

impl DesktopAlerts {
    pub fn new(timeout_millis: u32, audio: &AudioConfig) -> Self {
        Self {
            timeout_millis,
            audio: audio.clone(),
        }
    }

    fn cue_path(&self, cue: AudioCue) -> &Path {
        match cue {
            AudioCue::NoHands => &self.audio.no_hands,
            AudioCue::OneHand => &self.audio.one_hand,
            AudioCue::IncorrectPosture => &self.audio.incorrect_posture,
        }
    }

    /// Alerts that need acknowledging stay up until dismissed.
    fn timeout_for(&self, event: &AlertEvent) -> Timeout {
        if event.requires_ack {
            Timeout::Never
        } else {
            Timeout::Milliseconds(self.timeout_millis)
        }
    }
}

impl AlertSink for DesktopAlerts {
    fn notify(&self, event: &AlertEvent) -> Result<(), AlertError> {
        let mut notification = Notification::new();
        notification
            .appname(APP_DISPLAY_NAME)
            .summary(&event.title)
            .body(&event.body)
            .timeout(self.timeout_for(event));

        set_urgency(&mut notification, event.kind);

        notification
            .show()
            .map(|_| ())
            .map_err(|e| AlertError::SendFailed(e.to_string()))
    }

    fn play_audio(&self, cue: AudioCue) -> Result<(), AlertError> {
        let path = self.cue_path(cue);
        if !path.exists() {
            return Err(AlertError::ChannelUnavailable(format!(
                "audio file {} not found",
                path.display()
            )));
        }
        play_wav(&self.audio.player, path)
    }

    fn confirm_dialog(&self, title: &str, body: &str) -> DialogResponse {
        show_confirm_dialog(title, body)
    }
}

#[cfg(all(unix, not(target_os = "macos")))]
fn set_urgency(notification: &mut Notification, kind: AlertKind) {
    if matches!(kind, AlertKind::CameraMissing | AlertKind::BreakStart) {
        notification.urgency(notify_rust::Urgency::Critical);
    }
}

#[cfg(not(all(unix, not(target_os = "macos"))))]
fn set_urgency(_notification: &mut Notification, _kind: AlertKind) {}

#[cfg(windows)]
fn play_wav(_player: &[String], path: &Path) -> Result<(), AlertError> {
    crate::winapi_utils::play_wav_sync(path)
}

#[cfg(not(windows))]
fn play_wav(player: &[String], path: &Path) -> Result<(), AlertError> {
    let (program, args) = player
        .split_first()
        .ok_or_else(|| AlertError::ChannelUnavailable("no audio player configured".into()))?;

    let status = std::process::Command::new(program)
        .args(args)
        .arg(path)
        .status()
        .map_err(|e| AlertError::ChannelUnavailable(format!("{program}: {e}")))?;

    if status.success() {
        Ok(())
    } else {
        Err(AlertError::SendFailed(format!("{program} exited with {status}")))
    }
}

#[cfg(windows)]
fn show_confirm_dialog(title: &str, body: &str) -> DialogResponse {
    if crate::winapi_utils::confirm_ok_cancel(title, body) {
        DialogResponse::Ok
    } else {
        DialogResponse::Cancel
    }
}

/// Asks through zenity. Without a dialog tool the answer is `Ok`, so an
/// unattended session keeps running.
#[cfg(not(windows))]
fn show_confirm_dialog(title: &str, body: &str) -> DialogResponse {
    let result = std::process::Command::new("zenity")
        .arg("--question")
        .arg(format!("--title={title}"))
        .arg(format!("--text={body}"))
        .status();

    match result {
        Ok(status) if status.success() => DialogResponse::Ok,
        Ok(_) => DialogResponse::Cancel,
        Err(e) => {
            tracing::warn!(error = %e, title, "No dialog tool available, assuming Ok");
            DialogResponse::Ok
        }
    }
}

/// Resolves cue files relative to a base directory.
pub fn resolve_audio_paths(audio: &AudioConfig, base: &Path) -> AudioConfig {
    let resolve = |p: &PathBuf| {
        if p.is_absolute() {
            p.clone()
        } else {
            base.join(p)
        }
    };
    AudioConfig {
        no_hands: resolve(&audio.no_hands),
        one_hand: resolve(&audio.one_hand),
        incorrect_posture: resolve(&audio.incorrect_posture),
        ..audio.clone()
    }
}
