use std::path::Path;

use crate::video::domain::image_writer::ImageWriter;
use crate::video::domain::video_reader::VideoReader;

use super::frame_pipeline::{FramePipeline, ProcessedFrame};
use super::pipeline_logger::PipelineLogger;
use super::processing_error::ProcessingError;

/// Single-image pass: read → pipeline → optional write.
pub struct DetectThreatsInImageUseCase {
    reader: Box<dyn VideoReader>,
    image_writer: Box<dyn ImageWriter>,
    logger: Box<dyn PipelineLogger>,
}

impl DetectThreatsInImageUseCase {
    pub fn new(
        reader: Box<dyn VideoReader>,
        image_writer: Box<dyn ImageWriter>,
        logger: Box<dyn PipelineLogger>,
    ) -> Self {
        Self {
            reader,
            image_writer,
            logger,
        }
    }

    /// Annotates the image at `input` and returns it. When `output` is given
    /// the annotated frame is also saved there.
    pub fn execute(
        &mut self,
        pipeline: &mut FramePipeline,
        input: &Path,
        output: Option<&Path>,
    ) -> Result<ProcessedFrame, ProcessingError> {
        self.reader
            .open(input)
            .map_err(|source| ProcessingError::MediaOpen {
                path: input.to_path_buf(),
                source,
            })?;

        let first = self.reader.frames().next();
        self.reader.close();
        let frame = match first {
            Some(Ok(frame)) => frame,
            Some(Err(source)) => return Err(ProcessingError::Decode { source }),
            None => return Err(ProcessingError::EmptyMedia(input.to_path_buf())),
        };

        let processed = pipeline.process(frame, self.logger.as_mut())?;
        self.logger.info(&format!(
            "{}: {} threat(s) among {} person(s) and {} weapon(s)",
            input.display(),
            processed.report.threats,
            processed.report.persons,
            processed.report.weapons
        ));

        if let Some(path) = output {
            self.image_writer
                .write(path, &processed.frame)
                .map_err(|source| ProcessingError::Output { source })?;
            self.logger.info(&format!("Saved {}", path.display()));
        }

        Ok(processed)
    }
}
