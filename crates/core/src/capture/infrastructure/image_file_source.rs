use std::path::Path;

use crate::capture::domain::frame_source::FrameSource;
use crate::capture::infrastructure::capture_error::CaptureError;
use crate::shared::frame::Frame;
use crate::shared::source::SourceDescriptor;

/// Treats a local image file as a camera that always shows the same picture.
///
/// Useful for replaying stills from a snapshot directory that another
/// process keeps overwriting.
pub struct ImageFileSource;

impl ImageFileSource {
    pub fn new() -> Self {
        Self
    }

    fn path(descriptor: &SourceDescriptor) -> Result<&Path, CaptureError> {
        match descriptor {
            SourceDescriptor::Stream(path) if !descriptor.has_scheme() => Ok(Path::new(path)),
            _ => Err(CaptureError::Unsupported(descriptor.clone())),
        }
    }
}

impl Default for ImageFileSource {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameSource for ImageFileSource {
    fn probe(&mut self, descriptor: &SourceDescriptor) -> Result<bool, Box<dyn std::error::Error>> {
        Ok(Self::path(descriptor)?.is_file())
    }

    fn capture(
        &mut self,
        descriptor: &SourceDescriptor,
    ) -> Result<Option<Frame>, Box<dyn std::error::Error>> {
        let path = Self::path(descriptor)?;
        if !path.is_file() {
            return Ok(None);
        }
        let img = image::open(path).map_err(CaptureError::Decode)?;
        Ok(Some(Frame::from_rgb_image(img.to_rgb8())))
    }
}
