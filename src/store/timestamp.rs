//! Microsecond timestamps that never repeat.

use chrono::{DateTime, Duration as ChronoDuration, Local, SubsecRound};
use std::sync::Mutex;

/// Hands out strictly increasing local timestamps at microsecond precision.
///
/// Two frames captured within the same microsecond, or across a backwards
/// clock step, still get distinct image names.
#[derive(Debug, Default)]
pub struct CaptureClock {
    last: Mutex<Option<DateTime<Local>>>,
}

impl CaptureClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> DateTime<Local> {
        self.stamp(Local::now())
    }

    /// Timestamp for a wall-clock reading.
    pub fn stamp(&self, wall: DateTime<Local>) -> DateTime<Local> {
        let wall = wall.trunc_subsecs(6);
        let Ok(mut last) = self.last.lock() else {
            return wall;
        };

        let next = match *last {
            Some(prev) if wall <= prev => prev + ChronoDuration::microseconds(1),
            _ => wall,
        };
        *last = Some(next);
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(micros: u32) -> DateTime<Local> {
        Local
            .with_ymd_and_hms(2024, 3, 1, 9, 30, 0)
            .unwrap()
            + ChronoDuration::microseconds(micros as i64)
    }

    #[test]
    fn test_same_instant_is_bumped() {
        let clock = CaptureClock::new();
        let a = clock.stamp(at(10));
        let b = clock.stamp(at(10));
        let c = clock.stamp(at(10));

        assert_eq!(a, at(10));
        assert_eq!(b, at(11));
        assert_eq!(c, at(12));
    }

    #[test]
    fn test_backwards_step_is_bumped() {
        let clock = CaptureClock::new();
        clock.stamp(at(500));
        assert_eq!(clock.stamp(at(100)), at(501));
        assert_eq!(clock.stamp(at(900)), at(900));
    }

    #[test]
    fn test_nanoseconds_are_truncated() {
        let clock = CaptureClock::new();
        let wall = at(7) + ChronoDuration::nanoseconds(999);
        assert_eq!(clock.stamp(wall), at(7));
    }

    #[test]
    fn test_now_is_strictly_increasing() {
        let clock = CaptureClock::new();
        let stamps: Vec<_> = (0..1000).map(|_| clock.now()).collect();
        for pair in stamps.windows(2) {
            assert!(pair[1] > pair[0]);
        }
    }
}
