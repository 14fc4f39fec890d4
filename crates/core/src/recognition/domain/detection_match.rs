use std::fmt;

use serde::{Deserialize, Serialize};

/// Who a detected face was matched to.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatchSubject {
    Named(String),
    NoMatch,
}

impl MatchSubject {
    pub fn name(&self) -> Option<&str> {
        match self {
            MatchSubject::Named(name) => Some(name.as_str()),
            MatchSubject::NoMatch => None,
        }
    }
}

impl fmt::Display for MatchSubject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchSubject::Named(name) => write!(f, "{name}"),
            MatchSubject::NoMatch => write!(f, "No Match"),
        }
    }
}

/// Score of one detected face against one reference.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    pub reference: String,
    pub confidence_percent: f64,
}

/// One detected face and how well it matched the gallery.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DetectionMatch {
    pub subject: MatchSubject,
    /// Confidence of the best match, 0-100.
    pub confidence_percent: f64,
    /// Every reference the face was compared with, in gallery order.
    pub comparisons: Vec<Comparison>,
}

impl DetectionMatch {
    pub fn new(subject: MatchSubject, confidence_percent: f64, comparisons: Vec<Comparison>) -> Self {
        Self {
            subject,
            confidence_percent: confidence_percent.clamp(0.0, 100.0),
            comparisons,
        }
    }

    /// Whether this detection names a subject with at least `threshold` (0-1) confidence.
    pub fn is_alertable(&self, threshold: f64) -> bool {
        self.subject.name().is_some() && self.confidence_percent >= threshold * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn named(percent: f64) -> DetectionMatch {
        DetectionMatch::new(MatchSubject::Named("alice".into()), percent, Vec::new())
    }

    #[rstest]
    #[case::well_above(75.0, 0.6, true)]
    #[case::exactly_at(60.0, 0.6, true)]
    #[case::just_below(59.9, 0.6, false)]
    #[case::well_below(55.0, 0.6, false)]
    #[case::zero_threshold(0.0, 0.0, true)]
    fn test_is_alertable(#[case] percent: f64, #[case] threshold: f64, #[case] expected: bool) {
        assert_eq!(named(percent).is_alertable(threshold), expected);
    }

    #[test]
    fn test_no_match_is_never_alertable() {
        let m = DetectionMatch::new(MatchSubject::NoMatch, 99.0, Vec::new());
        assert!(!m.is_alertable(0.0));
    }

    #[test]
    fn test_confidence_is_clamped() {
        assert_eq!(named(140.0).confidence_percent, 100.0);
        assert_eq!(named(-3.0).confidence_percent, 0.0);
    }

    #[test]
    fn test_display() {
        assert_eq!(MatchSubject::Named("bob".into()).to_string(), "bob");
        assert_eq!(MatchSubject::NoMatch.to_string(), "No Match");
    }
}
