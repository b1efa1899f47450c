use std::path::Path;

use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;

/// Sink for annotated frames, encoded in the order they are written.
pub trait VideoWriter: Send {
    /// Creates (or truncates) the output at `path` using the resolution and
    /// frame rate in `metadata`.
    fn open(
        &mut self,
        path: &Path,
        metadata: &VideoMetadata,
    ) -> Result<(), Box<dyn std::error::Error>>;

    fn write(&mut self, frame: &Frame) -> Result<(), Box<dyn std::error::Error>>;

    /// Flushes the encoder and finalizes the container. Safe to call on a
    /// writer that was never opened.
    fn close(&mut self) -> Result<(), Box<dyn std::error::Error>>;
}
