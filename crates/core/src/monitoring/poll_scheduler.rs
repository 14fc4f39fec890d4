use std::time::Duration;

use crate::alerting::domain::alert_sink::AlertSink;
use crate::alerting::domain::notification_debouncer::NotificationDebouncer;
use crate::capture::domain::frame_source::FrameSource;
use crate::monitoring::cycle_report::{
    AlertOutcome, CycleReport, DetectionOutcome, SourceOutcome, SourceReport,
};
use crate::monitoring::monitoring_session::MonitoringSession;
use crate::monitoring::status_cache::StatusCache;
use crate::recognition::domain::detection_match::DetectionMatch;
use crate::recognition::domain::face_matcher::FaceMatcher;
use crate::shared::constants::{DEFAULT_CONFIDENCE_THRESHOLD, DEFAULT_POLL_INTERVAL};
use crate::shared::source::Source;
use crate::shared::timestamp::Timestamp;

/// The tunables the scheduler reads on every tick.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PollPolicy {
    /// Minimum match confidence (0-1) for an alert.
    pub confidence_threshold: f64,
    pub poll_interval: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

/// The external services a polling cycle calls out to.
pub struct Collaborators {
    pub frame_source: Box<dyn FrameSource>,
    pub matcher: Box<dyn FaceMatcher>,
    pub alert_sink: Box<dyn AlertSink>,
}

pub fn alert_message(subject: &str, source: &str, confidence_percent: f64) -> String {
    format!(
        "Face Detection Alert: {subject} detected at {source} with {confidence_percent:.1}% confidence"
    )
}

/// Decides when to poll and runs capture → match → alert for each source.
///
/// Sources are processed one after another; a failure at any step only skips
/// that source for this cycle.
pub struct PollScheduler {
    session: MonitoringSession,
    status_cache: StatusCache,
    debouncer: NotificationDebouncer,
}

impl PollScheduler {
    pub fn new(status_cache: StatusCache, debouncer: NotificationDebouncer) -> Self {
        Self {
            session: MonitoringSession::new(),
            status_cache,
            debouncer,
        }
    }

    pub fn session(&self) -> &MonitoringSession {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut MonitoringSession {
        &mut self.session
    }

    pub fn status_cache(&self) -> &StatusCache {
        &self.status_cache
    }

    pub fn status_cache_mut(&mut self) -> &mut StatusCache {
        &mut self.status_cache
    }

    pub fn debouncer(&self) -> &NotificationDebouncer {
        &self.debouncer
    }

    pub fn debouncer_mut(&mut self) -> &mut NotificationDebouncer {
        &mut self.debouncer
    }

    /// Polls every source if the session is active and the interval has elapsed.
    ///
    /// Returns `None` when the tick did nothing.
    pub fn tick(
        &mut self,
        now: Timestamp,
        sources: &[Source],
        collaborators: &mut Collaborators,
        policy: &PollPolicy,
    ) -> Option<CycleReport> {
        if !self.session.is_due(now, policy.poll_interval) {
            return None;
        }
        self.session.mark_polled(now);

        let reports = sources
            .iter()
            .map(|source| self.poll_source(source, now, collaborators, policy))
            .collect();
        Some(CycleReport {
            at: now,
            sources: reports,
        })
    }

    /// Runs one capture → match → alert pass for `source`, ignoring the
    /// session and interval gates.
    pub fn poll_source(
        &mut self,
        source: &Source,
        now: Timestamp,
        collaborators: &mut Collaborators,
        policy: &PollPolicy,
    ) -> SourceReport {
        let outcome = self.poll_source_outcome(source, now, collaborators, policy);
        SourceReport {
            source: source.name.clone(),
            outcome,
        }
    }

    fn poll_source_outcome(
        &mut self,
        source: &Source,
        now: Timestamp,
        collaborators: &mut Collaborators,
        policy: &PollPolicy,
    ) -> SourceOutcome {
        let frame_source = collaborators.frame_source.as_mut();
        if !self.status_cache.status(&source.descriptor, frame_source, now) {
            log::debug!("Skipping {}: offline", source.name);
            return SourceOutcome::Offline;
        }

        let frame = match frame_source.capture(&source.descriptor) {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                log::warn!("No frame from {}", source.name);
                return SourceOutcome::CaptureFailed { reason: None };
            }
            Err(e) => {
                log::warn!("Capture from {} failed: {e}", source.name);
                return SourceOutcome::CaptureFailed {
                    reason: Some(e.to_string()),
                };
            }
        };

        let detections = match collaborators.matcher.detect(&frame, &source.name) {
            Ok(detections) => detections,
            Err(e) => {
                log::warn!("Face matching on {} failed: {e}", source.name);
                return SourceOutcome::MatcherFailed {
                    reason: e.to_string(),
                };
            }
        };

        let sink = collaborators.alert_sink.as_mut();
        let detections = detections
            .into_iter()
            .map(|detection| {
                let alert = self.dispatch_alert(&detection, &source.name, now, sink, policy);
                DetectionOutcome { detection, alert }
            })
            .collect();
        SourceOutcome::Analyzed { detections }
    }

    fn dispatch_alert(
        &mut self,
        detection: &DetectionMatch,
        source_name: &str,
        now: Timestamp,
        sink: &mut dyn AlertSink,
        policy: &PollPolicy,
    ) -> AlertOutcome {
        let Some(subject) = detection.subject.name() else {
            return AlertOutcome::NoMatch;
        };
        if !detection.is_alertable(policy.confidence_threshold) {
            return AlertOutcome::BelowThreshold;
        }
        if !self.debouncer.should_notify(subject, source_name, now) {
            log::debug!("Suppressed repeat alert for {subject} at {source_name}");
            return AlertOutcome::Suppressed;
        }

        let message = alert_message(subject, source_name, detection.confidence_percent);
        match sink.notify(&message) {
            Ok(()) => {
                log::info!("{message}");
                AlertOutcome::Sent
            }
            Err(e) => {
                log::warn!("Alert delivery for {subject} at {source_name} failed: {e}");
                AlertOutcome::DeliveryFailed(e.to_string())
            }
        }
    }
}

impl Default for PollScheduler {
    fn default() -> Self {
        Self::new(StatusCache::default(), NotificationDebouncer::default())
    }
}
