use std::path::Path;

use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;

/// Source of RGB frames, either a video stream or a single image.
///
/// The pipeline only ever sees `Frame` and `VideoMetadata`; container and
/// codec details stay behind this trait.
pub trait VideoReader: Send {
    /// Opens `path` and reports what it contains. Fails when the file is
    /// missing, unreadable, or holds no video stream.
    fn open(&mut self, path: &Path) -> Result<VideoMetadata, Box<dyn std::error::Error>>;

    /// Frames in decode order, decoded lazily.
    fn frames(
        &mut self,
    ) -> Box<dyn Iterator<Item = Result<Frame, Box<dyn std::error::Error>>> + '_>;

    fn close(&mut self);
}
