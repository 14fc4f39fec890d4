use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// A point in time, measured as an offset from the Unix epoch.
///
/// Every time-gated decision takes one of these explicitly so behavior can be
/// driven deterministically from tests.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(Duration);

impl Timestamp {
    pub const fn from_secs(secs: u64) -> Self {
        Self(Duration::from_secs(secs))
    }

    pub fn from_secs_f64(secs: f64) -> Self {
        Self(Duration::from_secs_f64(secs.max(0.0)))
    }

    pub fn as_secs(&self) -> u64 {
        self.0.as_secs()
    }

    /// Time elapsed from `earlier` to `self`, zero if `earlier` is in the future.
    pub fn saturating_since(&self, earlier: Timestamp) -> Duration {
        self.0.saturating_sub(earlier.0)
    }

    /// Distance between two timestamps regardless of order.
    ///
    /// Time gates use this so a record stamped before the clock stepped back
    /// expires after the same span it would have going forward.
    pub fn distance(&self, other: Timestamp) -> Duration {
        self.0.abs_diff(other.0)
    }
}

impl std::ops::Add<Duration> for Timestamp {
    type Output = Timestamp;

    fn add(self, rhs: Duration) -> Timestamp {
        Timestamp(self.0 + rhs)
    }
}

/// Source of the current time.
pub trait Clock: Send {
    fn now(&self) -> Timestamp;
}

/// Wall-clock time that never runs backwards.
///
/// The Unix offset is read once at construction; later readings add the
/// monotonic time elapsed since then, so NTP or DST adjustments after startup
/// do not move it.
pub struct SystemClock {
    epoch_offset: Duration,
    anchor: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self::anchored(
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default(),
            Instant::now(),
        )
    }

    fn anchored(epoch_offset: Duration, anchor: Instant) -> Self {
        Self {
            epoch_offset,
            anchor,
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp(self.epoch_offset + self.anchor.elapsed())
    }
}

/// Clock that only moves when told to. Clones share the same time.
#[derive(Clone, Default)]
pub struct ManualClock {
    now: Arc<Mutex<Timestamp>>,
}

impl ManualClock {
    pub fn new(start: Timestamp) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    pub fn set(&self, at: Timestamp) {
        if let Ok(mut now) = self.now.lock() {
            *now = at;
        }
    }

    pub fn advance(&self, by: Duration) {
        if let Ok(mut now) = self.now.lock() {
            *now = *now + by;
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        self.now.lock().map(|now| *now).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_saturating_since() {
        let a = Timestamp::from_secs(100);
        let b = Timestamp::from_secs(130);
        assert_eq!(b.saturating_since(a), Duration::from_secs(30));
        assert_eq!(a.saturating_since(b), Duration::ZERO);
    }

    #[test]
    fn test_manual_clock_clones_share_time() {
        let clock = ManualClock::new(Timestamp::from_secs(5));
        let other = clock.clone();
        clock.advance(Duration::from_secs(10));
        assert_eq!(other.now(), Timestamp::from_secs(15));
        other.set(Timestamp::from_secs(1));
        assert_eq!(clock.now(), Timestamp::from_secs(1));
    }

    #[test]
    fn test_distance_ignores_order() {
        let a = Timestamp::from_secs(100);
        let b = Timestamp::from_secs(130);
        assert_eq!(a.distance(b), Duration::from_secs(30));
        assert_eq!(b.distance(a), Duration::from_secs(30));
    }

    #[test]
    fn test_system_clock_is_after_epoch() {
        assert!(SystemClock::new().now().as_secs() > 0);
    }

    #[test]
    fn test_system_clock_advances_from_anchor() {
        let started = Instant::now();
        let clock = SystemClock::anchored(Duration::from_secs(10_000), started);

        let first = clock.now();
        std::thread::sleep(Duration::from_millis(20));
        let second = clock.now();

        assert!(first >= Timestamp::from_secs(10_000));
        assert!(second.saturating_since(first) >= Duration::from_millis(20));
    }

    #[test]
    fn test_system_clock_readings_never_decrease() {
        let clock = SystemClock::new();
        let mut last = clock.now();
        for _ in 0..1_000 {
            let next = clock.now();
            assert!(next >= last);
            last = next;
        }
    }

    #[test]
    fn test_serde_round_trip() {
        let ts = Timestamp::from_secs(42);
        let json = serde_json::to_string(&ts).unwrap();
        let back: Timestamp = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ts);
    }
}
