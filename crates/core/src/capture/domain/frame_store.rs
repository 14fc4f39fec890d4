use std::path::PathBuf;

use crate::shared::frame::Frame;
use crate::shared::timestamp::Timestamp;

/// Persists manually captured frames.
pub trait FrameStore: Send {
    /// Saves `frame` taken from `source_name` at `taken_at`, returning where it went.
    fn save(
        &self,
        source_name: &str,
        frame: &Frame,
        taken_at: Timestamp,
    ) -> Result<PathBuf, Box<dyn std::error::Error>>;
}
