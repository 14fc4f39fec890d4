use crate::shared::frame::Frame;
use crate::shared::source::SourceDescriptor;

/// Domain interface to a camera connection.
///
/// Implementations must bound both calls with their own timeout; the
/// orchestrator never aborts a call in flight.
pub trait FrameSource: Send {
    /// Reports whether the camera can currently be reached.
    ///
    /// An `Err` means the probe itself failed, which callers treat as unreachable.
    fn probe(&mut self, descriptor: &SourceDescriptor) -> Result<bool, Box<dyn std::error::Error>>;

    /// Grabs a single still. `Ok(None)` means the camera answered but produced no frame.
    fn capture(
        &mut self,
        descriptor: &SourceDescriptor,
    ) -> Result<Option<Frame>, Box<dyn std::error::Error>>;
}
