//! Debounce state: the posture cool-down window and the missing-camera latch.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Skip-alert window opened by every fired posture alert.
///
/// Frames keep flowing while the window is open; only alert emission is
/// suppressed.
#[derive(Debug, Clone)]
pub struct AlertGate {
    window: Duration,
    last_fired: Option<Instant>,
}

impl AlertGate {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_fired: None,
        }
    }

    /// Whether an alert fired less than one window before `now`.
    pub fn is_cooling(&self, now: Instant) -> bool {
        self.last_fired
            .is_some_and(|last| now.saturating_duration_since(last) < self.window)
    }

    /// Records a fired alert at `now` if the window is closed.
    ///
    /// Returns `true` if the alert may fire.
    pub fn try_fire(&mut self, now: Instant) -> bool {
        if self.is_cooling(now) {
            return false;
        }
        self.last_fired = Some(now);
        true
    }

    /// Time left in the current window.
    pub fn remaining(&self, now: Instant) -> Duration {
        self.last_fired
            .map(|last| self.window.saturating_sub(now.saturating_duration_since(last)))
            .unwrap_or(Duration::ZERO)
    }
}

/// Latched "camera missing" flag.
///
/// Trips once per continuous missing interval and resets when the camera is
/// back. Clones share one flag.
#[derive(Debug, Clone, Default)]
pub struct MissingCameraLatch {
    tripped: Arc<AtomicBool>,
}

impl MissingCameraLatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the latch. Returns `true` only for the call that set it.
    pub fn trip(&self) -> bool {
        self.tripped
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    /// Clears the latch. Returns `true` only for the call that cleared it.
    pub fn reset(&self) -> bool {
        self.tripped
            .compare_exchange(true, false, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    pub fn is_tripped(&self) -> bool {
        self.tripped.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_gate_blocks_within_window() {
        let mut gate = AlertGate::new(Duration::from_secs(3));
        let t0 = Instant::now();

        assert!(gate.try_fire(t0));
        assert!(!gate.try_fire(t0 + Duration::from_millis(100)));
        assert!(!gate.try_fire(t0 + Duration::from_millis(2999)));
        assert!(gate.try_fire(t0 + Duration::from_secs(3)));
    }

    #[test]
    fn test_gate_blocked_attempts_do_not_extend_window() {
        let mut gate = AlertGate::new(Duration::from_secs(3));
        let t0 = Instant::now();

        assert!(gate.try_fire(t0));
        assert!(!gate.try_fire(t0 + Duration::from_secs(2)));
        assert!(gate.try_fire(t0 + Duration::from_secs(3)));
    }

    #[test]
    fn test_gate_remaining() {
        let mut gate = AlertGate::new(Duration::from_secs(3));
        let t0 = Instant::now();
        assert_eq!(gate.remaining(t0), Duration::ZERO);

        gate.try_fire(t0);
        assert_eq!(gate.remaining(t0 + Duration::from_secs(1)), Duration::from_secs(2));
        assert_eq!(gate.remaining(t0 + Duration::from_secs(10)), Duration::ZERO);
    }

    #[test]
    fn test_gate_fired_alerts_are_spaced_by_window() {
        // any verdict stream: frames every 100ms for 20s, alert wanted on each
        let window = Duration::from_secs(3);
        let mut gate = AlertGate::new(window);
        let t0 = Instant::now();
        let mut fired = Vec::new();

        for i in 0..200u64 {
            let now = t0 + Duration::from_millis(i * 100);
            if gate.try_fire(now) {
                fired.push(now);
            }
        }

        assert_eq!(fired.len(), 7);
        for pair in fired.windows(2) {
            assert!(pair[1] - pair[0] >= window);
        }
    }

    #[test]
    fn test_latch_trips_once() {
        let latch = MissingCameraLatch::new();
        assert!(latch.trip());
        assert!(!latch.trip());
        assert!(!latch.trip());
        assert!(latch.is_tripped());

        assert!(latch.reset());
        assert!(!latch.reset());
        assert!(latch.trip());
    }

    #[test]
    fn test_latch_trips_once_under_contention() {
        let latch = MissingCameraLatch::new();
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let latch = latch.clone();
                thread::spawn(move || latch.trip())
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|&won| won)
            .count();
        assert_eq!(winners, 1);
    }
}
