use crate::recognition::domain::detection_match::DetectionMatch;
use crate::shared::frame::Frame;

/// Domain interface for recognizing gallery subjects in a frame.
///
/// An empty result means no faces were found.
pub trait FaceMatcher: Send {
    fn detect(
        &mut self,
        frame: &Frame,
        source_label: &str,
    ) -> Result<Vec<DetectionMatch>, Box<dyn std::error::Error>>;
}
