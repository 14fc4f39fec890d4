use std::collections::VecDeque;

use serde::Serialize;

use crate::monitoring::cycle_report::{AlertOutcome, CycleReport, SourceReport};
use crate::recognition::domain::detection_match::DetectionMatch;
use crate::shared::constants::RECENT_DETECTIONS_CAPACITY;
use crate::shared::timestamp::Timestamp;

/// One detection as it is kept for history, alerted or not.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DetectionRecord {
    pub at: Timestamp,
    pub source: String,
    pub detection: DetectionMatch,
    pub alert: AlertOutcome,
}

/// Receives every detection the orchestrator produces.
pub trait DetectionRecorder: Send {
    fn record(&mut self, record: &DetectionRecord) -> Result<(), Box<dyn std::error::Error>>;
}

/// Flattens a source report into per-detection records.
pub fn records_from(at: Timestamp, report: &SourceReport) -> Vec<DetectionRecord> {
    report
        .detections()
        .iter()
        .map(|d| DetectionRecord {
            at,
            source: report.source.clone(),
            detection: d.detection.clone(),
            alert: d.alert.clone(),
        })
        .collect()
}

pub fn records_from_cycle(cycle: &CycleReport) -> Vec<DetectionRecord> {
    cycle
        .sources
        .iter()
        .flat_map(|report| records_from(cycle.at, report))
        .collect()
}

/// Bounded in-memory history, oldest first.
pub struct RecentDetections {
    capacity: usize,
    records: VecDeque<DetectionRecord>,
}

impl RecentDetections {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            records: VecDeque::new(),
        }
    }

    pub fn push(&mut self, record: DetectionRecord) {
        if self.records.len() == self.capacity {
            self.records.pop_front();
        }
        self.records.push_back(record);
    }

    pub fn iter(&self) -> impl Iterator<Item = &DetectionRecord> {
        self.records.iter()
    }

    /// The newest `n` records, oldest first.
    pub fn latest(&self, n: usize) -> Vec<DetectionRecord> {
        let skip = self.records.len().saturating_sub(n);
        self.records.iter().skip(skip).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl Default for RecentDetections {
    fn default() -> Self {
        Self::new(RECENT_DETECTIONS_CAPACITY)
    }
}

impl DetectionRecorder for RecentDetections {
    fn record(&mut self, record: &DetectionRecord) -> Result<(), Box<dyn std::error::Error>> {
        self.push(record.clone());
        Ok(())
    }
}
