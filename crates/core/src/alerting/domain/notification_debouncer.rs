use std::collections::HashMap;
use std::time::Duration;

use crate::shared::constants::NOTIFICATION_COOLDOWN;
use crate::shared::timestamp::Timestamp;

/// Identifies one subject seen at one source.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct DebounceKey {
    pub subject: String,
    pub source: String,
}

impl DebounceKey {
    pub fn new(subject: &str, source: &str) -> Self {
        Self {
            subject: subject.to_string(),
            source: source.to_string(),
        }
    }
}

/// Drops repeat alerts for the same subject at the same source within a cool-down.
///
/// The window is anchored to the last alert that was let through. Suppressed
/// attempts leave the stored time alone, so a person standing in front of the
/// camera gets one alert per cool-down rather than one and then silence.
pub struct NotificationDebouncer {
    cooldown: Duration,
    last_sent: HashMap<DebounceKey, Timestamp>,
}

impl NotificationDebouncer {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            last_sent: HashMap::new(),
        }
    }

    /// Returns `true` and records `now` if an alert may go out.
    pub fn should_notify(&mut self, subject: &str, source: &str, now: Timestamp) -> bool {
        let key = DebounceKey::new(subject, source);
        if let Some(last) = self.last_sent.get(&key) {
            if now.distance(*last) < self.cooldown {
                return false;
            }
        }
        self.last_sent.insert(key, now);
        true
    }

    pub fn last_notified(&self, subject: &str, source: &str) -> Option<Timestamp> {
        self.last_sent.get(&DebounceKey::new(subject, source)).copied()
    }

    /// Drops every entry for `source`, e.g. after the camera was removed.
    pub fn forget_source(&mut self, source: &str) {
        self.last_sent.retain(|key, _| key.source != source);
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    pub fn len(&self) -> usize {
        self.last_sent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.last_sent.is_empty()
    }
}

impl Default for NotificationDebouncer {
    fn default() -> Self {
        Self::new(NOTIFICATION_COOLDOWN)
    }
}
