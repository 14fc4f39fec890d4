use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::shared::timestamp::Timestamp;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Inactive,
    Active,
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionStatus::Inactive => write!(f, "inactive"),
            SessionStatus::Active => write!(f, "active"),
        }
    }
}

/// Whether monitoring is switched on, and when it last polled.
///
/// Only `start` and `stop` change the status; nothing times out on its own.
#[derive(Debug)]
pub struct MonitoringSession {
    status: SessionStatus,
    last_poll_at: Option<Timestamp>,
}

impl MonitoringSession {
    pub fn new() -> Self {
        Self {
            status: SessionStatus::Inactive,
            last_poll_at: None,
        }
    }

    /// Activates the session. Returns `false` if it was already active.
    ///
    /// Clears the last poll time so the first tick after starting always polls.
    pub fn start(&mut self) -> bool {
        if self.status == SessionStatus::Active {
            return false;
        }
        self.status = SessionStatus::Active;
        self.last_poll_at = None;
        true
    }

    /// Deactivates the session. Returns `false` if it was already inactive.
    pub fn stop(&mut self) -> bool {
        if self.status == SessionStatus::Inactive {
            return false;
        }
        self.status = SessionStatus::Inactive;
        true
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn is_active(&self) -> bool {
        self.status == SessionStatus::Active
    }

    pub fn last_poll_at(&self) -> Option<Timestamp> {
        self.last_poll_at
    }

    /// Whether a tick at `now` should poll.
    ///
    /// If the clock has stepped back past `last_poll_at`, the gap is measured
    /// in the other direction instead of stalling until wall time catches up.
    pub fn is_due(&self, now: Timestamp, poll_interval: Duration) -> bool {
        if !self.is_active() {
            return false;
        }
        match self.last_poll_at {
            None => true,
            Some(last) => now.distance(last) >= poll_interval,
        }
    }

    pub fn mark_polled(&mut self, now: Timestamp) {
        self.last_poll_at = Some(now);
    }
}

impl Default for MonitoringSession {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const INTERVAL: Duration = Duration::from_secs(10);

    #[test]
    fn test_starts_inactive() {
        let session = MonitoringSession::new();
        assert_eq!(session.status(), SessionStatus::Inactive);
        assert_eq!(session.last_poll_at(), None);
    }

    #[test]
    fn test_inactive_is_never_due() {
        let session = MonitoringSession::new();
        assert!(!session.is_due(Timestamp::from_secs(0), INTERVAL));
        assert!(!session.is_due(Timestamp::from_secs(1_000_000), INTERVAL));
    }

    #[test]
    fn test_start_clears_last_poll() {
        let mut session = MonitoringSession::new();
        session.start();
        session.mark_polled(Timestamp::from_secs(100));
        session.stop();

        assert!(session.start());
        assert_eq!(session.last_poll_at(), None);
        assert!(session.is_due(Timestamp::from_secs(101), INTERVAL));
    }

    #[test]
    fn test_start_and_stop_are_idempotent() {
        let mut session = MonitoringSession::new();
        assert!(!session.stop());
        assert!(session.start());
        session.mark_polled(Timestamp::from_secs(5));
        assert!(!session.start());
        assert_eq!(session.last_poll_at(), Some(Timestamp::from_secs(5)));
        assert!(session.stop());
        assert!(!session.stop());
    }

    #[rstest]
    #[case::immediately(100, false)]
    #[case::just_before(109, false)]
    #[case::exactly_interval(110, true)]
    #[case::later(500, true)]
    fn test_is_due_after_poll(#[case] now: u64, #[case] expected: bool) {
        let mut session = MonitoringSession::new();
        session.start();
        session.mark_polled(Timestamp::from_secs(100));
        assert_eq!(session.is_due(Timestamp::from_secs(now), INTERVAL), expected);
    }

    #[rstest]
    #[case::small_step_back(95, false)]
    #[case::step_back_by_interval(90, true)]
    #[case::hour_step_back(0, true)]
    fn test_is_due_after_clock_steps_back(#[case] now: u64, #[case] expected: bool) {
        let mut session = MonitoringSession::new();
        session.start();
        session.mark_polled(Timestamp::from_secs(100));
        assert_eq!(session.is_due(Timestamp::from_secs(now), INTERVAL), expected);
    }
}
