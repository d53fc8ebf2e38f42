//! Alert kinds, events and audio cues.

use crate::posture::PostureVerdict;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Source of an alert. Each kind has its own enable flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AlertKind {
    NoHands,
    OneHand,
    IncorrectPosture,
    CameraMissing,
    BreakStart,
    BreakOver,
    Startup,
}

impl AlertKind {
    /// Alert raised for a posture verdict, if any.
    pub fn from_verdict(verdict: PostureVerdict) -> Option<Self> {
        match verdict {
            PostureVerdict::NoHands => Some(AlertKind::NoHands),
            PostureVerdict::OneHand => Some(AlertKind::OneHand),
            PostureVerdict::IncorrectPosture => Some(AlertKind::IncorrectPosture),
            PostureVerdict::CorrectPosture | PostureVerdict::AnomalousReading => None,
        }
    }

    /// Posture alerts can be silenced by the notification policy; the rest
    /// always fire.
    pub fn is_gated_by_policy(&self) -> bool {
        matches!(
            self,
            AlertKind::NoHands | AlertKind::OneHand | AlertKind::IncorrectPosture
        )
    }

    pub fn audio_cue(&self) -> Option<AudioCue> {
        match self {
            AlertKind::NoHands => Some(AudioCue::NoHands),
            AlertKind::OneHand => Some(AudioCue::OneHand),
            AlertKind::IncorrectPosture => Some(AudioCue::IncorrectPosture),
            _ => None,
        }
    }
}

/// Distinct sound per posture alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AudioCue {
    NoHands,
    OneHand,
    IncorrectPosture,
}

/// Answer from a blocking confirmation dialog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogResponse {
    Ok,
    Cancel,
}

/// One alert to deliver. Never stored; only its text is logged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertEvent {
    pub kind: AlertKind,
    pub title: String,
    pub body: String,
    pub requires_ack: bool,
}

impl AlertEvent {
    pub fn new(kind: AlertKind, title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            kind,
            title: title.into(),
            body: body.into(),
            requires_ack: false,
        }
    }

    pub fn with_ack(mut self) -> Self {
        self.requires_ack = true;
        self
    }

    /// Posture alert for a verdict, with the user-facing wording.
    pub fn for_verdict(verdict: PostureVerdict) -> Option<Self> {
        let kind = AlertKind::from_verdict(verdict)?;
        let event = match kind {
            AlertKind::NoHands => {
                Self::new(kind, "No hands detected.", "Align both hands in the camera")
            }
            AlertKind::OneHand => {
                Self::new(kind, "One hand is detected.", "Align both hands in the camera")
            }
            _ => Self::new(
                kind,
                "Incorrect hand posture detected.",
                "Correct your posture immediately!",
            ),
        };
        Some(event)
    }

    pub fn camera_missing() -> Self {
        Self::new(
            AlertKind::CameraMissing,
            "No USB camera detected.",
            "Please insert an external camera.",
        )
    }

    pub fn break_start(worked: Duration, rest: Duration) -> Self {
        Self::new(
            AlertKind::BreakStart,
            "Take a Break",
            format!(
                "You have been working for {}. Please take a {} break.",
                describe_span(worked),
                describe_span_adjective(rest)
            ),
        )
        .with_ack()
    }

    pub fn break_over(rest: Duration) -> Self {
        Self::new(
            AlertKind::BreakOver,
            "Break Over",
            format!(
                "Your {} break is over. Please resume work.",
                describe_span_adjective(rest)
            ),
        )
    }

    pub fn startup() -> Self {
        Self::new(AlertKind::Startup, crate::config::APP_DISPLAY_NAME, "App has started")
    }
}

fn span_parts(d: Duration) -> (u64, &'static str) {
    let secs = d.as_secs();
    if secs >= 3600 && secs % 3600 == 0 {
        (secs / 3600, "hour")
    } else if secs >= 60 && secs % 60 == 0 {
        (secs / 60, "minute")
    } else {
        (secs, "second")
    }
}

/// "2 hours", "1 minute".
fn describe_span(d: Duration) -> String {
    let (n, unit) = span_parts(d);
    if n == 1 {
        format!("{n} {unit}")
    } else {
        format!("{n} {unit}s")
    }
}

/// "5-minute".
fn describe_span_adjective(d: Duration) -> String {
    let (n, unit) = span_parts(d);
    format!("{n}-{unit}")
}
