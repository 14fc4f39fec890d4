use std::path::PathBuf;

use crate::capture::domain::frame_store::FrameStore;
use crate::config::settings::Settings;
use crate::config::source_registry::SourceRegistry;
use crate::monitoring::cycle_report::{CycleReport, SourceReport};
use crate::monitoring::detection_recorder::{
    records_from, records_from_cycle, DetectionRecord, DetectionRecorder, RecentDetections,
};
use crate::monitoring::error::MonitorError;
use crate::monitoring::monitoring_session::SessionStatus;
use crate::monitoring::poll_scheduler::{Collaborators, PollPolicy, PollScheduler};
use crate::shared::source::{Source, SourceDescriptor};
use crate::shared::timestamp::Timestamp;

/// Liveness of one configured source.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceStatus {
    pub name: String,
    pub descriptor: SourceDescriptor,
    pub reachable: bool,
}

/// Entry point for hosts: owns the source list, the scheduler and its caches,
/// and the collaborators.
///
/// Every operation takes `now` explicitly; the caller (usually the monitor
/// loop) supplies it from a clock.
pub struct Orchestrator {
    registry: SourceRegistry,
    scheduler: PollScheduler,
    collaborators: Collaborators,
    frame_store: Box<dyn FrameStore>,
    policy: PollPolicy,
    recent: RecentDetections,
    recorder: Option<Box<dyn DetectionRecorder>>,
}

impl Orchestrator {
    pub fn new(
        registry: SourceRegistry,
        scheduler: PollScheduler,
        collaborators: Collaborators,
        frame_store: Box<dyn FrameStore>,
        policy: PollPolicy,
    ) -> Self {
        Self {
            registry,
            scheduler,
            collaborators,
            frame_store,
            policy,
            recent: RecentDetections::default(),
            recorder: None,
        }
    }

    /// Adds a persistent sink for every detection, alongside the in-memory history.
    pub fn with_recorder(mut self, recorder: Box<dyn DetectionRecorder>) -> Self {
        self.recorder = Some(recorder);
        self
    }

    pub fn start_monitoring(&mut self) -> bool {
        let changed = self.scheduler.session_mut().start();
        if changed {
            log::info!("Monitoring started for {} source(s)", self.registry.len());
        }
        changed
    }

    pub fn stop_monitoring(&mut self) -> bool {
        let changed = self.scheduler.session_mut().stop();
        if changed {
            log::info!("Monitoring stopped");
        }
        changed
    }

    pub fn session_status(&self) -> SessionStatus {
        self.scheduler.session().status()
    }

    /// Runs a polling cycle over every source if one is due.
    pub fn poll_all_sources(&mut self, now: Timestamp) -> Option<CycleReport> {
        let report = self.scheduler.tick(
            now,
            self.registry.list(),
            &mut self.collaborators,
            &self.policy,
        )?;
        log::debug!("{}", report.summary());
        self.record(records_from_cycle(&report));
        Some(report)
    }

    /// Captures and analyzes one source immediately, regardless of session
    /// state or poll interval. An offline source is reported, not an error.
    pub fn analyze_source_now(
        &mut self,
        name: &str,
        now: Timestamp,
    ) -> Result<SourceReport, MonitorError> {
        let source = self
            .registry
            .get(name)
            .ok_or_else(|| MonitorError::UnknownSource(name.to_string()))?;
        let report = self
            .scheduler
            .poll_source(source, now, &mut self.collaborators, &self.policy);
        self.record(records_from(now, &report));
        Ok(report)
    }

    /// Grabs one frame from a source and hands it to the frame store.
    pub fn capture_and_save(&mut self, name: &str, now: Timestamp) -> Result<PathBuf, MonitorError> {
        let source = self
            .registry
            .get(name)
            .ok_or_else(|| MonitorError::UnknownSource(name.to_string()))?;
        let frame_source = self.collaborators.frame_source.as_mut();
        if !self
            .scheduler
            .status_cache_mut()
            .status(&source.descriptor, frame_source, now)
        {
            return Err(MonitorError::SourceUnreachable(source.name.clone()));
        }

        let frame = match frame_source.capture(&source.descriptor) {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                return Err(MonitorError::CaptureFailed {
                    source_name: source.name.clone(),
                    reason: "no frame returned".into(),
                })
            }
            Err(e) => {
                return Err(MonitorError::CaptureFailed {
                    source_name: source.name.clone(),
                    reason: e.to_string(),
                })
            }
        };

        let path = self
            .frame_store
            .save(&source.name, &frame, now)
            .map_err(|e| MonitorError::Persist {
                source_name: source.name.clone(),
                reason: e.to_string(),
            })?;
        log::info!("Saved capture from {} to {}", source.name, path.display());
        Ok(path)
    }

    /// Validates and applies new settings; the next tick uses them.
    pub fn update_settings(&mut self, settings: &Settings) -> Result<(), MonitorError> {
        settings.validate()?;
        self.update_policy(settings.poll_policy());
        Ok(())
    }

    pub fn update_policy(&mut self, policy: PollPolicy) {
        self.policy = policy;
    }

    pub fn policy(&self) -> PollPolicy {
        self.policy
    }

    /// Liveness of every source, probing only those whose cache entry is stale.
    pub fn source_statuses(&mut self, now: Timestamp) -> Vec<SourceStatus> {
        let frame_source = self.collaborators.frame_source.as_mut();
        let cache = self.scheduler.status_cache_mut();
        self.registry
            .list()
            .iter()
            .map(|source| SourceStatus {
                name: source.name.clone(),
                descriptor: source.descriptor.clone(),
                reachable: cache.status(&source.descriptor, frame_source, now),
            })
            .collect()
    }

    /// Re-probes a source now, replacing its cached status.
    pub fn test_connection(&mut self, name: &str, now: Timestamp) -> Result<bool, MonitorError> {
        let source = self
            .registry
            .get(name)
            .ok_or_else(|| MonitorError::UnknownSource(name.to_string()))?;
        let reachable = self.scheduler.status_cache_mut().refresh(
            &source.descriptor,
            self.collaborators.frame_source.as_mut(),
            now,
        );
        log::info!(
            "Connection test for {}: {}",
            source.name,
            if reachable { "online" } else { "offline" }
        );
        Ok(reachable)
    }

    pub fn recent_detections(&self) -> &RecentDetections {
        &self.recent
    }

    pub fn sources(&self) -> &SourceRegistry {
        &self.registry
    }

    pub fn add_source(
        &mut self,
        name: &str,
        descriptor: SourceDescriptor,
        now: Timestamp,
    ) -> Result<Source, MonitorError> {
        let source = self.registry.add(name, descriptor, now)?.clone();
        log::info!("Added source {} ({})", source.name, source.descriptor);
        Ok(source)
    }

    /// Drops a source along with its cached status and alert history.
    pub fn remove_source(&mut self, name: &str) -> Result<Source, MonitorError> {
        let source = self.registry.remove(name)?;
        self.scheduler.status_cache_mut().invalidate(&source.descriptor);
        self.scheduler.debouncer_mut().forget_source(&source.name);
        log::info!("Removed source {}", source.name);
        Ok(source)
    }

    fn record(&mut self, records: Vec<DetectionRecord>) {
        for record in records {
            if let Some(recorder) = self.recorder.as_mut() {
                if let Err(e) = recorder.record(&record) {
                    log::warn!("Failed to record detection at {}: {e}", record.source);
                }
            }
            self.recent.push(record);
        }
    }
}
