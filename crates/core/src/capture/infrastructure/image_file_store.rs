use std::path::{Path, PathBuf};

use crate::capture::domain::frame_store::FrameStore;
use crate::shared::frame::Frame;
use crate::shared::timestamp::Timestamp;

/// Writes manual captures as JPEG files into a directory.
///
/// Files are named `manual_capture_{source}_{unix_seconds}.jpg`; characters
/// outside `[A-Za-z0-9_-]` in the source name become `_`.
pub struct ImageFileStore {
    dir: PathBuf,
}

impl ImageFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn file_name(source_name: &str, taken_at: Timestamp) -> String {
        let safe: String = source_name
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        format!("manual_capture_{safe}_{}.jpg", taken_at.as_secs())
    }
}

impl FrameStore for ImageFileStore {
    fn save(
        &self,
        source_name: &str,
        frame: &Frame,
        taken_at: Timestamp,
    ) -> Result<PathBuf, Box<dyn std::error::Error>> {
        std::fs::create_dir_all(&self.dir)?;

        let img = frame
            .to_rgb_image()
            .ok_or("Failed to create image from frame data")?;
        let path = self.dir.join(Self::file_name(source_name, taken_at));
        img.save(&path)?;
        Ok(path)
    }
}
