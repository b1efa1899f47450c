use crate::shared::bounding_box::BoundingBox;
use crate::shared::frame::Frame;

/// Domain interface for marking a threatening person on a frame.
///
/// Each call draws once; callers decide how many times a person is marked.
pub trait FrameAnnotator: Send {
    fn annotate(
        &self,
        frame: &mut Frame,
        person: &BoundingBox,
    ) -> Result<(), Box<dyn std::error::Error>>;
}
