use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::shared::timestamp::Timestamp;

/// How to reach a camera.
///
/// Used as the status cache key, so two sources sharing a connection share
/// one liveness probe.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceDescriptor {
    /// Local capture device by index (0 = built-in webcam).
    Device(u32),
    /// Network stream URL, snapshot URL, or local image path.
    Stream(String),
}

impl SourceDescriptor {
    /// Whether this is an http(s) URL.
    pub fn is_http(&self) -> bool {
        match self {
            SourceDescriptor::Stream(url) => {
                let lower = url.to_ascii_lowercase();
                lower.starts_with("http://") || lower.starts_with("https://")
            }
            SourceDescriptor::Device(_) => false,
        }
    }

    /// Whether this looks like a URL with a scheme (`rtsp://`, `http://`, ...).
    pub fn has_scheme(&self) -> bool {
        matches!(self, SourceDescriptor::Stream(s) if s.contains("://"))
    }
}

impl FromStr for SourceDescriptor {
    type Err = String;

    /// All-digit strings are device indices; anything else is a stream.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err("descriptor must not be empty".into());
        }
        if trimmed.bytes().all(|b| b.is_ascii_digit()) {
            return trimmed
                .parse::<u32>()
                .map(SourceDescriptor::Device)
                .map_err(|e| format!("invalid device index '{trimmed}': {e}"));
        }
        Ok(SourceDescriptor::Stream(trimmed.to_string()))
    }
}

impl fmt::Display for SourceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceDescriptor::Device(index) => write!(f, "{index}"),
            SourceDescriptor::Stream(url) => write!(f, "{url}"),
        }
    }
}

/// A configured camera.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Source {
    pub name: String,
    pub descriptor: SourceDescriptor,
    pub added_at: Timestamp,
}

impl Source {
    pub fn new(name: impl Into<String>, descriptor: SourceDescriptor, added_at: Timestamp) -> Self {
        Self {
            name: name.into(),
            descriptor,
            added_at,
        }
    }
}
