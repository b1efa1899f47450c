use crate::pipeline::frame_pipeline::FramePipeline;
use crate::pipeline::pipeline_executor::PipelineExecutor;
use crate::pipeline::pipeline_logger::PipelineLogger;
use crate::pipeline::processing_error::ProcessingError;
use crate::video::domain::video_reader::VideoReader;
use crate::video::domain::video_writer::VideoWriter;

/// Runs everything on the calling thread: each frame is read, processed and
/// written before the next one is decoded.
#[derive(Clone, Copy, Debug, Default)]
pub struct SequentialPipelineExecutor;

impl SequentialPipelineExecutor {
    pub fn new() -> Self {
        Self
    }
}

impl PipelineExecutor for SequentialPipelineExecutor {
    fn execute(
        &self,
        reader: &mut dyn VideoReader,
        writer: &mut dyn VideoWriter,
        pipeline: &mut FramePipeline,
        total_frames: usize,
        logger: &mut dyn PipelineLogger,
    ) -> Result<usize, ProcessingError> {
        let mut written = 0;
        for frame_result in reader.frames() {
            let frame = frame_result.map_err(|source| ProcessingError::Decode { source })?;
            let processed = pipeline.process(frame, logger)?;
            writer
                .write(&processed.frame)
                .map_err(|source| ProcessingError::Output { source })?;
            written += 1;
            logger.progress(written, total_frames);
        }
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::pipeline_logger::NullPipelineLogger;
    use crate::pipeline::test_support::{
        gray_frame_at, FailingDetector, RecordingAnnotator, StubDetector, StubReader, StubWriter,
    };
    use crate::threat::domain::threat_policy::ThreatPolicy;

    fn pipeline() -> FramePipeline {
        FramePipeline::new(
            Box::new(StubDetector::new(vec![])),
            Box::new(RecordingAnnotator::new()),
            ThreatPolicy::default(),
        )
    }

    fn frames(n: usize) -> Vec<crate::shared::frame::Frame> {
        (0..n).map(|i| gray_frame_at(320, 240, i as u8, i)).collect()
    }

    #[test]
    fn test_writes_every_frame_in_order() {
        let mut reader = StubReader::new(frames(5));
        let mut writer = StubWriter::new();
        let written = writer.written.clone();

        let count = SequentialPipelineExecutor::new()
            .execute(&mut reader, &mut writer, &mut pipeline(), 5, &mut NullPipelineLogger)
            .unwrap();

        assert_eq!(count, 5);
        let written = written.lock().unwrap();
        let indices: Vec<_> = written.iter().map(|f| f.index()).collect();
        assert_eq!(indices, vec![0, 1, 2, 3, 4]);
        assert!(written.iter().all(|f| f.width() == 640 && f.height() == 640));
    }

    #[test]
    fn test_empty_source_writes_nothing() {
        let mut reader = StubReader::new(vec![]);
        let mut writer = StubWriter::new();
        let count = SequentialPipelineExecutor::new()
            .execute(&mut reader, &mut writer, &mut pipeline(), 0, &mut NullPipelineLogger)
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn test_decode_error_stops_run() {
        let mut reader = StubReader::failing_at(frames(5), 2);
        let mut writer = StubWriter::new();
        let written = writer.written.clone();

        let err = SequentialPipelineExecutor::new()
            .execute(&mut reader, &mut writer, &mut pipeline(), 5, &mut NullPipelineLogger)
            .unwrap_err();

        assert!(matches!(err, ProcessingError::Decode { .. }));
        assert_eq!(written.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_write_error_is_output_error() {
        let mut reader = StubReader::new(frames(3));
        let mut writer = StubWriter::failing_on_write(1);
        let err = SequentialPipelineExecutor::new()
            .execute(&mut reader, &mut writer, &mut pipeline(), 3, &mut NullPipelineLogger)
            .unwrap_err();
        assert!(matches!(err, ProcessingError::Output { .. }));
    }

    #[test]
    fn test_inference_error_is_fatal() {
        let mut failing = FramePipeline::new(
            Box::new(FailingDetector),
            Box::new(RecordingAnnotator::new()),
            ThreatPolicy::default(),
        );
        let mut reader = StubReader::new(frames(3));
        let mut writer = StubWriter::new();
        let err = SequentialPipelineExecutor::new()
            .execute(&mut reader, &mut writer, &mut failing, 3, &mut NullPipelineLogger)
            .unwrap_err();
        assert!(matches!(err, ProcessingError::Inference { index: 0, .. }));
    }
}
