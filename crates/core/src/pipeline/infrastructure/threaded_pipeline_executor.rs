use crate::pipeline::frame_pipeline::FramePipeline;
use crate::pipeline::pipeline_executor::PipelineExecutor;
use crate::pipeline::pipeline_logger::PipelineLogger;
use crate::pipeline::processing_error::ProcessingError;
use crate::shared::frame::Frame;
use crate::video::domain::video_reader::VideoReader;
use crate::video::domain::video_writer::VideoWriter;

const DEFAULT_CHANNEL_CAPACITY: usize = 8;

type SendError = Box<dyn std::error::Error + Send + Sync>;

/// Overlaps decoding and encoding with detection.
///
/// Layout: `reader thread → main [resize/detect/annotate] → writer thread`
///
/// Frames are processed on the calling thread in the order they arrive, so
/// output order always equals decode order.
pub struct ThreadedPipelineExecutor {
    channel_capacity: usize,
}

impl ThreadedPipelineExecutor {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    pub fn with_capacity(channel_capacity: usize) -> Self {
        Self {
            channel_capacity: channel_capacity.max(1),
        }
    }
}

impl Default for ThreadedPipelineExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineExecutor for ThreadedPipelineExecutor {
    fn execute(
        &self,
        reader: &mut dyn VideoReader,
        writer: &mut dyn VideoWriter,
        pipeline: &mut FramePipeline,
        total_frames: usize,
        logger: &mut dyn PipelineLogger,
    ) -> Result<usize, ProcessingError> {
        let cap = self.channel_capacity;
        let (frame_tx, frame_rx) = crossbeam_channel::bounded::<Result<Frame, SendError>>(cap);
        let (write_tx, write_rx) = crossbeam_channel::bounded::<Frame>(cap);

        std::thread::scope(|scope| {
            let reader_handle = scope.spawn(move || {
                for frame_result in reader.frames() {
                    let mapped = frame_result.map_err(|e| -> SendError { e.to_string().into() });
                    if frame_tx.send(mapped).is_err() {
                        break;
                    }
                }
            });

            let writer_handle = scope.spawn(move || -> Result<usize, SendError> {
                let mut written = 0;
                for frame in write_rx {
                    writer
                        .write(&frame)
                        .map_err(|e| -> SendError { e.to_string().into() })?;
                    written += 1;
                }
                Ok(written)
            });

            let main_result = run_main_loop(frame_rx, write_tx, pipeline, total_frames, logger);

            let reader_panicked = reader_handle.join().is_err();
            let writer_result = writer_handle.join();

            // A failed write closes the channel under the main loop, so the
            // writer's own error is the one worth reporting.
            match writer_result {
                Err(_) => Err(ProcessingError::Output {
                    source: "Writer thread panicked".into(),
                }),
                Ok(Err(e)) => Err(ProcessingError::Output {
                    source: e.to_string().into(),
                }),
                Ok(Ok(written)) => {
                    main_result?;
                    if reader_panicked {
                        return Err(ProcessingError::Decode {
                            source: "Reader thread panicked".into(),
                        });
                    }
                    Ok(written)
                }
            }
        })
    }
}

/// Receives decoded frames, processes them and forwards them to the writer.
///
/// Returning drops both channel ends, which stops the reader and lets the
/// writer drain and finish.
fn run_main_loop(
    frame_rx: crossbeam_channel::Receiver<Result<Frame, SendError>>,
    write_tx: crossbeam_channel::Sender<Frame>,
    pipeline: &mut FramePipeline,
    total_frames: usize,
    logger: &mut dyn PipelineLogger,
) -> Result<(), ProcessingError> {
    let mut processed = 0;
    for frame_result in frame_rx {
        let frame = frame_result.map_err(|e| ProcessingError::Decode {
            source: e.to_string().into(),
        })?;
        let out = pipeline.process(frame, logger)?;
        write_tx
            .send(out.frame)
            .map_err(|_| ProcessingError::Output {
                source: "Writer channel closed unexpectedly".into(),
            })?;
        processed += 1;
        logger.progress(processed, total_frames);
    }
    Ok(())
}
