use std::path::PathBuf;

use super::constants::{FRAME_SIZE, OUTPUT_FPS};

#[derive(Clone, Debug, PartialEq)]
pub struct VideoMetadata {
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    pub total_frames: usize,
    pub codec: String,
    pub source_path: Option<PathBuf>,
}

impl VideoMetadata {
    /// Output stream description: fixed square frames at the fixed rate,
    /// carrying over the source frame count for progress reporting.
    pub fn annotated_output(source: &VideoMetadata) -> Self {
        Self {
            width: FRAME_SIZE,
            height: FRAME_SIZE,
            fps: OUTPUT_FPS,
            total_frames: source.total_frames,
            codec: "mpeg4".to_string(),
            source_path: None,
        }
    }
}
