use crate::detection::domain::detection::Detection;
use crate::shared::frame::Frame;

/// Domain interface for object detection.
///
/// Returns every detection the model reports, whatever its class or
/// confidence; filtering belongs to the threat context. `&mut self` because
/// inference sessions need exclusive access while running.
pub trait ObjectDetector: Send {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>, Box<dyn std::error::Error>>;
}
