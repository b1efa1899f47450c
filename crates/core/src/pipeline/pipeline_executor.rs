use crate::video::domain::video_reader::VideoReader;
use crate::video::domain::video_writer::VideoWriter;

use super::frame_pipeline::FramePipeline;
use super::pipeline_logger::PipelineLogger;
use super::processing_error::ProcessingError;

/// Drives frames from an opened reader through the pipeline into an opened
/// writer, in decode order.
///
/// Opening and closing the reader and writer stays with the caller, so they
/// are released the same way whichever executor ran. Returns the number of
/// frames written.
pub trait PipelineExecutor: Send {
    fn execute(
        &self,
        reader: &mut dyn VideoReader,
        writer: &mut dyn VideoWriter,
        pipeline: &mut FramePipeline,
        total_frames: usize,
        logger: &mut dyn PipelineLogger,
    ) -> Result<usize, ProcessingError>;
}
