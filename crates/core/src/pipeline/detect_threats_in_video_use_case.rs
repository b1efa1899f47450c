use std::path::Path;

use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::video_reader::VideoReader;
use crate::video::domain::video_writer::VideoWriter;

use super::frame_pipeline::FramePipeline;
use super::pipeline_executor::PipelineExecutor;
use super::pipeline_logger::PipelineLogger;
use super::processing_error::ProcessingError;

/// Annotates every frame of a video and encodes the result at 640×640, 30 fps.
///
/// The pipeline is borrowed per run so one loaded model serves any number of
/// videos. Reader and writer are closed on every path, and a failed run
/// leaves no output file behind.
pub struct DetectThreatsInVideoUseCase {
    reader: Box<dyn VideoReader>,
    writer: Box<dyn VideoWriter>,
    executor: Box<dyn PipelineExecutor>,
    logger: Box<dyn PipelineLogger>,
}

impl DetectThreatsInVideoUseCase {
    pub fn new(
        reader: Box<dyn VideoReader>,
        writer: Box<dyn VideoWriter>,
        executor: Box<dyn PipelineExecutor>,
        logger: Box<dyn PipelineLogger>,
    ) -> Self {
        Self {
            reader,
            writer,
            executor,
            logger,
        }
    }

    /// Runs `input` through `pipeline` into `output`, overwriting it.
    /// Returns the number of frames written.
    pub fn execute(
        &mut self,
        pipeline: &mut FramePipeline,
        input: &Path,
        output: &Path,
    ) -> Result<usize, ProcessingError> {
        let metadata = self
            .reader
            .open(input)
            .map_err(|source| ProcessingError::MediaOpen {
                path: input.to_path_buf(),
                source,
            })?;
        self.logger.info(&format!(
            "Input: {}x{} @ {:.2} fps, {} frames",
            metadata.width, metadata.height, metadata.fps, metadata.total_frames
        ));

        let run_result = self.run(pipeline, &metadata, output);
        self.reader.close();
        let close_result = self
            .writer
            .close()
            .map_err(|source| ProcessingError::Output { source });

        // The run's own error wins over a close failure it may have caused
        let result = run_result
            .and_then(|written| close_result.map(|()| written))
            .and_then(|written| {
                if written == 0 {
                    Err(ProcessingError::EmptyMedia(input.to_path_buf()))
                } else {
                    Ok(written)
                }
            });

        match result {
            Ok(written) => {
                self.logger.info(&format!(
                    "Wrote {written} frames to {}",
                    output.display()
                ));
                self.logger.summary();
                Ok(written)
            }
            Err(e) => {
                remove_partial_output(output);
                Err(e)
            }
        }
    }

    fn run(
        &mut self,
        pipeline: &mut FramePipeline,
        metadata: &VideoMetadata,
        output: &Path,
    ) -> Result<usize, ProcessingError> {
        let out_metadata = VideoMetadata::annotated_output(metadata);
        self.writer
            .open(output, &out_metadata)
            .map_err(|source| ProcessingError::Output { source })?;

        self.executor.execute(
            self.reader.as_mut(),
            self.writer.as_mut(),
            pipeline,
            metadata.total_frames,
            self.logger.as_mut(),
        )
    }
}

fn remove_partial_output(output: &Path) {
    match std::fs::remove_file(output) {
        Ok(()) => log::debug!("Removed partial output {}", output.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => log::warn!("Could not remove partial output {}: {e}", output.display()),
    }
}
