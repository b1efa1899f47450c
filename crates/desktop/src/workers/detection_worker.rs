use std::path::PathBuf;
use std::sync::{Arc, PoisonError};
use std::thread;

use crossbeam_channel::{Receiver, Sender};

use threatwatch_core::annotation::infrastructure::overlay_annotator::OverlayAnnotator;
use threatwatch_core::pipeline::detect_threats_in_image_use_case::DetectThreatsInImageUseCase;
use threatwatch_core::pipeline::detect_threats_in_video_use_case::DetectThreatsInVideoUseCase;
use threatwatch_core::pipeline::frame_pipeline::FramePipeline;
use threatwatch_core::pipeline::infrastructure::sequential_pipeline_executor::SequentialPipelineExecutor;
use threatwatch_core::pipeline::pipeline_logger::PipelineLogger;
use threatwatch_core::shared::frame::Frame;
use threatwatch_core::video::infrastructure::ffmpeg_reader::FfmpegReader;
use threatwatch_core::video::infrastructure::ffmpeg_writer::FfmpegWriter;
use threatwatch_core::video::infrastructure::image_file_reader::ImageFileReader;
use threatwatch_core::video::infrastructure::image_file_writer::ImageFileWriter;

use super::pipeline_cache::PipelineCache;
use crate::settings::Settings;

/// Shown in place of the output whenever a job fails; details go to the log.
pub const FAILURE_MESSAGE: &str = "Detection failed. See the log for details.";

#[derive(Debug, Clone, PartialEq)]
pub enum Job {
    Video { input: PathBuf, output: PathBuf },
    Image { input: PathBuf },
}

/// Annotated still, converted to RGBA for display.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotatedImage {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
    pub threats: usize,
}

/// Messages sent from the worker thread to the UI.
#[derive(Debug, Clone, PartialEq)]
pub enum WorkerMessage {
    DownloadProgress(u64, u64),
    Progress(usize, usize),
    VideoComplete { output: PathBuf, frames: usize },
    ImageComplete(AnnotatedImage),
    Error(String),
}

/// Runs `job` on a background thread against the shared pipeline.
pub fn spawn(job: Job, settings: Settings, cache: Arc<PipelineCache>) -> Receiver<WorkerMessage> {
    let (tx, rx) = crossbeam_channel::unbounded::<WorkerMessage>();

    thread::spawn(move || {
        let tx_dl = tx.clone();
        let shared = cache.wait(&|downloaded, total| {
            let _ = tx_dl.send(WorkerMessage::DownloadProgress(downloaded, total));
        });

        let result = shared.and_then(|shared| {
            let mut pipeline = shared.lock().unwrap_or_else(PoisonError::into_inner);
            pipeline.set_policy(settings.policy());
            pipeline.set_annotator(Box::new(OverlayAnnotator::new(settings.overlay_style())));
            run_job(&job, &mut pipeline, &tx).map_err(|e| e.to_string())
        });

        let message = match result {
            Ok(done) => done,
            Err(e) => {
                log::error!("{job:?} failed: {e}");
                WorkerMessage::Error(FAILURE_MESSAGE.to_string())
            }
        };
        let _ = tx.send(message);
    });

    rx
}

fn run_job(
    job: &Job,
    pipeline: &mut FramePipeline,
    tx: &Sender<WorkerMessage>,
) -> Result<WorkerMessage, Box<dyn std::error::Error>> {
    match job {
        Job::Video { input, output } => {
            let mut use_case = DetectThreatsInVideoUseCase::new(
                Box::new(FfmpegReader::new()),
                Box::new(FfmpegWriter::new()),
                Box::new(SequentialPipelineExecutor::new()),
                Box::new(ChannelLogger { tx: tx.clone() }),
            );
            let frames = use_case.execute(pipeline, input, output)?;
            Ok(WorkerMessage::VideoComplete {
                output: output.clone(),
                frames,
            })
        }
        Job::Image { input } => {
            let mut use_case = DetectThreatsInImageUseCase::new(
                Box::new(ImageFileReader::new()),
                Box::new(ImageFileWriter::new()),
                Box::new(ChannelLogger { tx: tx.clone() }),
            );
            let processed = use_case.execute(pipeline, input, None)?;
            Ok(WorkerMessage::ImageComplete(AnnotatedImage {
                width: processed.frame.width(),
                height: processed.frame.height(),
                rgba: to_rgba(&processed.frame),
                threats: processed.report.threats,
            }))
        }
    }
}

/// Forwards frame progress to the UI and everything else to `log`.
struct ChannelLogger {
    tx: Sender<WorkerMessage>,
}

impl PipelineLogger for ChannelLogger {
    fn progress(&mut self, current: usize, total: usize) {
        let _ = self.tx.send(WorkerMessage::Progress(current, total));
    }

    fn timing(&mut self, _stage: &str, _duration_ms: f64) {}

    fn metric(&mut self, _name: &str, _value: f64) {}

    fn info(&mut self, message: &str) {
        log::info!("{message}");
    }
}

fn to_rgba(frame: &Frame) -> Vec<u8> {
    let mut rgba = Vec::with_capacity(frame.data().len() / 3 * 4);
    for px in frame.data().chunks_exact(3) {
        rgba.extend_from_slice(&[px[0], px[1], px[2], 255]);
    }
    rgba
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workers::test_support::{empty_pipeline, scenario_pipeline};
    use threatwatch_core::video::domain::image_writer::ImageWriter;

    fn write_png(dir: &std::path::Path) -> PathBuf {
        let path = dir.join("scene.png");
        let frame = Frame::new(vec![0; 640 * 640 * 3], 640, 640, 3, 0);
        ImageFileWriter::new().write(&path, &frame).unwrap();
        path
    }

    #[test]
    fn test_to_rgba_adds_opaque_alpha() {
        let frame = Frame::new(vec![1, 2, 3, 4, 5, 6], 2, 1, 3, 0);
        assert_eq!(to_rgba(&frame), vec![1, 2, 3, 255, 4, 5, 6, 255]);
    }

    #[test]
    fn test_image_job_returns_annotated_image() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_png(dir.path());
        let (tx, _rx) = crossbeam_channel::unbounded();

        let mut pipeline = scenario_pipeline();
        let message = run_job(&Job::Image { input }, &mut pipeline, &tx).unwrap();

        match message {
            WorkerMessage::ImageComplete(image) => {
                assert_eq!((image.width, image.height), (640, 640));
                assert_eq!(image.rgba.len(), 640 * 640 * 4);
                assert_eq!(image.threats, 1);
            }
            other => panic!("expected ImageComplete, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_input_is_an_error() {
        let (tx, _rx) = crossbeam_channel::unbounded();
        let job = Job::Image {
            input: PathBuf::from("/nonexistent/scene.png"),
        };
        assert!(run_job(&job, &mut empty_pipeline(), &tx).is_err());
    }

    #[test]
    fn test_spawned_failure_sends_opaque_message() {
        let cache = PipelineCache::spawn_with(|_| Ok(empty_pipeline()));
        let rx = spawn(
            Job::Video {
                input: PathBuf::from("/nonexistent/clip.mp4"),
                output: PathBuf::from("/nonexistent/output.mp4"),
            },
            Settings::default(),
            cache,
        );

        let last = rx.iter().last().unwrap();
        assert_eq!(last, WorkerMessage::Error(FAILURE_MESSAGE.to_string()));
    }

    #[test]
    fn test_spawned_failure_when_pipeline_never_loads() {
        let cache = PipelineCache::spawn_with(|_| Err("no model".to_string()));
        let dir = tempfile::tempdir().unwrap();
        let rx = spawn(
            Job::Image {
                input: write_png(dir.path()),
            },
            Settings::default(),
            cache,
        );
        assert_eq!(
            rx.iter().last().unwrap(),
            WorkerMessage::Error(FAILURE_MESSAGE.to_string())
        );
    }
}
