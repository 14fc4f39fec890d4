use crate::capture::domain::frame_source::FrameSource;
use crate::capture::infrastructure::capture_error::CaptureError;
use crate::shared::frame::Frame;
use crate::shared::source::SourceDescriptor;

/// Dispatches each descriptor to the frame source that understands it.
///
/// - http(s) URLs go to the HTTP source
/// - scheme-less strings are local files
/// - everything else (devices, rtsp://, ...) goes to the stream source, if one is configured
pub struct RoutingFrameSource {
    http: Box<dyn FrameSource>,
    files: Box<dyn FrameSource>,
    streams: Option<Box<dyn FrameSource>>,
}

impl RoutingFrameSource {
    pub fn new(
        http: Box<dyn FrameSource>,
        files: Box<dyn FrameSource>,
        streams: Option<Box<dyn FrameSource>>,
    ) -> Self {
        Self {
            http,
            files,
            streams,
        }
    }

    fn route(&mut self, descriptor: &SourceDescriptor) -> Result<&mut dyn FrameSource, CaptureError> {
        if descriptor.is_http() {
            return Ok(self.http.as_mut());
        }
        if matches!(descriptor, SourceDescriptor::Stream(_)) && !descriptor.has_scheme() {
            return Ok(self.files.as_mut());
        }
        match self.streams.as_mut() {
            Some(streams) => Ok(streams.as_mut()),
            None => Err(CaptureError::Unsupported(descriptor.clone())),
        }
    }
}

impl FrameSource for RoutingFrameSource {
    fn probe(&mut self, descriptor: &SourceDescriptor) -> Result<bool, Box<dyn std::error::Error>> {
        self.route(descriptor)?.probe(descriptor)
    }

    fn capture(
        &mut self,
        descriptor: &SourceDescriptor,
    ) -> Result<Option<Frame>, Box<dyn std::error::Error>> {
        self.route(descriptor)?.capture(descriptor)
    }
}
