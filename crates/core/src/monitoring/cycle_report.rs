use serde::Serialize;

use crate::recognition::domain::detection_match::DetectionMatch;
use crate::shared::timestamp::Timestamp;

/// What happened to one detection's alert.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", content = "error", rename_all = "snake_case")]
pub enum AlertOutcome {
    /// Face found but not matched to anyone in the gallery.
    NoMatch,
    /// Matched, but under the confidence threshold.
    BelowThreshold,
    Sent,
    /// Inside the cool-down for this subject and source.
    Suppressed,
    /// The debouncer let it through but the sink failed. The cool-down still applies.
    DeliveryFailed(String),
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DetectionOutcome {
    pub detection: DetectionMatch,
    pub alert: AlertOutcome,
}

/// Result of polling one source.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceOutcome {
    /// Status cache says unreachable; nothing was captured.
    Offline,
    /// Camera was reachable but no frame came back.
    CaptureFailed { reason: Option<String> },
    /// Matcher errored; treated as no detections.
    MatcherFailed { reason: String },
    Analyzed { detections: Vec<DetectionOutcome> },
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SourceReport {
    pub source: String,
    pub outcome: SourceOutcome,
}

impl SourceReport {
    pub fn detections(&self) -> &[DetectionOutcome] {
        match &self.outcome {
            SourceOutcome::Analyzed { detections } => detections,
            _ => &[],
        }
    }

    pub fn alerts_sent(&self) -> usize {
        self.detections()
            .iter()
            .filter(|d| d.alert == AlertOutcome::Sent)
            .count()
    }
}

/// Everything one polling cycle did, in source order.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CycleReport {
    pub at: Timestamp,
    pub sources: Vec<SourceReport>,
}

impl CycleReport {
    pub fn alerts_sent(&self) -> usize {
        self.sources.iter().map(SourceReport::alerts_sent).sum()
    }

    pub fn offline_sources(&self) -> impl Iterator<Item = &str> {
        self.sources
            .iter()
            .filter(|s| s.outcome == SourceOutcome::Offline)
            .map(|s| s.source.as_str())
    }

    /// One-line summary for logs.
    pub fn summary(&self) -> String {
        let mut analyzed = 0;
        let mut offline = 0;
        let mut failed = 0;
        let mut detections = 0;
        for report in &self.sources {
            match &report.outcome {
                SourceOutcome::Offline => offline += 1,
                SourceOutcome::CaptureFailed { .. } | SourceOutcome::MatcherFailed { .. } => {
                    failed += 1
                }
                SourceOutcome::Analyzed { detections: d } => {
                    analyzed += 1;
                    detections += d.len();
                }
            }
        }
        format!(
            "Polled {} source(s): {analyzed} analyzed, {offline} offline, {failed} failed, \
             {detections} detection(s), {} alert(s) sent",
            self.sources.len(),
            self.alerts_sent()
        )
    }
}
