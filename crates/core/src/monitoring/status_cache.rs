use std::collections::HashMap;
use std::time::Duration;

use crate::capture::domain::frame_source::FrameSource;
use crate::shared::constants::STATUS_TTL;
use crate::shared::source::SourceDescriptor;
use crate::shared::timestamp::Timestamp;

/// One liveness probe result.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StatusEntry {
    pub reachable: bool,
    pub observed_at: Timestamp,
}

/// Memoizes "is this camera reachable" per connection descriptor.
///
/// Entries older than the TTL are never served; the next lookup re-probes and
/// overwrites them. A probe that errors is cached as unreachable so a broken
/// camera is not hammered until the TTL runs out.
pub struct StatusCache {
    ttl: Duration,
    entries: HashMap<SourceDescriptor, StatusEntry>,
}

impl StatusCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: HashMap::new(),
        }
    }

    /// Returns the cached status if fresh, otherwise probes through `frame_source`.
    pub fn status(
        &mut self,
        descriptor: &SourceDescriptor,
        frame_source: &mut dyn FrameSource,
        now: Timestamp,
    ) -> bool {
        if let Some(entry) = self.fresh(descriptor, now) {
            return entry.reachable;
        }
        self.refresh(descriptor, frame_source, now)
    }

    /// Probes unconditionally and stores the result.
    pub fn refresh(
        &mut self,
        descriptor: &SourceDescriptor,
        frame_source: &mut dyn FrameSource,
        now: Timestamp,
    ) -> bool {
        let reachable = match frame_source.probe(descriptor) {
            Ok(reachable) => reachable,
            Err(e) => {
                log::debug!("Probe of {descriptor} failed: {e}");
                false
            }
        };
        self.entries.insert(
            descriptor.clone(),
            StatusEntry {
                reachable,
                observed_at: now,
            },
        );
        reachable
    }

    /// The cached entry, if it is still within the TTL at `now`.
    pub fn fresh(&self, descriptor: &SourceDescriptor, now: Timestamp) -> Option<StatusEntry> {
        self.entries
            .get(descriptor)
            .filter(|entry| now.distance(entry.observed_at) < self.ttl)
            .copied()
    }

    pub fn invalidate(&mut self, descriptor: &SourceDescriptor) {
        self.entries.remove(descriptor);
    }

    /// All entries, fresh or not, for status displays.
    pub fn snapshot(&self) -> Vec<(SourceDescriptor, StatusEntry)> {
        self.entries
            .iter()
            .map(|(descriptor, entry)| (descriptor.clone(), *entry))
            .collect()
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}

impl Default for StatusCache {
    fn default() -> Self {
        Self::new(STATUS_TTL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::frame::Frame;
    use rstest::rstest;

    struct CountingProbe {
        answers: Vec<Result<bool, &'static str>>,
        probes: usize,
    }

    impl CountingProbe {
        fn new(answers: Vec<Result<bool, &'static str>>) -> Self {
            Self { answers, probes: 0 }
        }
    }

    impl FrameSource for CountingProbe {
        fn probe(&mut self, _d: &SourceDescriptor) -> Result<bool, Box<dyn std::error::Error>> {
            let answer = self.answers[self.probes % self.answers.len()];
            self.probes += 1;
            answer.map_err(|e| e.into())
        }

        fn capture(
            &mut self,
            _d: &SourceDescriptor,
        ) -> Result<Option<Frame>, Box<dyn std::error::Error>> {
            Ok(None)
        }
    }

    const T0: Timestamp = Timestamp::from_secs(500);

    fn at(offset: u64) -> Timestamp {
        T0 + Duration::from_secs(offset)
    }

    fn cam() -> SourceDescriptor {
        SourceDescriptor::Stream("http://cam/snap.jpg".into())
    }

    #[test]
    fn test_first_lookup_probes() {
        let mut cache = StatusCache::default();
        let mut probe = CountingProbe::new(vec![Ok(true)]);
        assert!(cache.status(&cam(), &mut probe, T0));
        assert_eq!(probe.probes, 1);
    }

    #[test]
    fn test_at_most_one_probe_per_ttl_window() {
        let mut cache = StatusCache::default();
        let mut probe = CountingProbe::new(vec![Ok(true)]);
        for offset in 0..30 {
            cache.status(&cam(), &mut probe, at(offset));
        }
        assert_eq!(probe.probes, 1);
    }

    #[rstest]
    #[case::fresh(29, 1)]
    #[case::exactly_stale(30, 2)]
    #[case::long_stale(300, 2)]
    fn test_staleness_boundary(#[case] offset: u64, #[case] expected_probes: usize) {
        let mut cache = StatusCache::default();
        let mut probe = CountingProbe::new(vec![Ok(true)]);
        cache.status(&cam(), &mut probe, T0);
        cache.status(&cam(), &mut probe, at(offset));
        assert_eq!(probe.probes, expected_probes);
    }

    #[test]
    fn test_stale_entry_is_overwritten_with_fresh_result() {
        let mut cache = StatusCache::default();
        let mut probe = CountingProbe::new(vec![Ok(true), Ok(false)]);
        assert!(cache.status(&cam(), &mut probe, T0));
        assert!(!cache.status(&cam(), &mut probe, at(31)));
        assert_eq!(
            cache.fresh(&cam(), at(31)),
            Some(StatusEntry {
                reachable: false,
                observed_at: at(31)
            })
        );
    }

    #[test]
    fn test_probe_error_is_cached_as_unreachable() {
        let mut cache = StatusCache::default();
        let mut probe = CountingProbe::new(vec![Err("connection refused")]);
        assert!(!cache.status(&cam(), &mut probe, T0));
        assert!(!cache.status(&cam(), &mut probe, at(10)));
        assert_eq!(probe.probes, 1);
    }

    #[test]
    fn test_descriptors_are_cached_independently() {
        let mut cache = StatusCache::default();
        let mut probe = CountingProbe::new(vec![Ok(true)]);
        cache.status(&cam(), &mut probe, T0);
        cache.status(&SourceDescriptor::Device(0), &mut probe, T0);
        cache.status(&cam(), &mut probe, T0);
        assert_eq!(probe.probes, 2);
        assert_eq!(cache.snapshot().len(), 2);
    }

    #[test]
    fn test_refresh_always_probes() {
        let mut cache = StatusCache::default();
        let mut probe = CountingProbe::new(vec![Ok(true)]);
        cache.status(&cam(), &mut probe, T0);
        cache.refresh(&cam(), &mut probe, at(1));
        assert_eq!(probe.probes, 2);
        assert_eq!(cache.fresh(&cam(), at(1)).unwrap().observed_at, at(1));
    }

    #[test]
    fn test_invalidate_forces_reprobe() {
        let mut cache = StatusCache::default();
        let mut probe = CountingProbe::new(vec![Ok(true)]);
        cache.status(&cam(), &mut probe, T0);
        cache.invalidate(&cam());
        cache.status(&cam(), &mut probe, at(1));
        assert_eq!(probe.probes, 2);
    }

    #[test]
    fn test_entry_from_before_clock_step_back_expires() {
        let mut cache = StatusCache::default();
        let mut probe = CountingProbe::new(vec![Ok(true), Ok(false)]);
        cache.status(&cam(), &mut probe, at(3_600));

        assert!(!cache.status(&cam(), &mut probe, T0));
        assert_eq!(probe.probes, 2);
    }
}
