use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::monitoring::detection_recorder::{DetectionRecord, DetectionRecorder};

/// Appends one JSON object per detection to a file.
pub struct JsonlDetectionRecorder {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl JsonlDetectionRecorder {
    pub fn open(path: &Path) -> Result<Self, std::io::Error> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            writer: BufWriter::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DetectionRecorder for JsonlDetectionRecorder {
    fn record(&mut self, record: &DetectionRecord) -> Result<(), Box<dyn std::error::Error>> {
        serde_json::to_writer(&mut self.writer, record)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }
}
