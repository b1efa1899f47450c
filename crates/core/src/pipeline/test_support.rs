//! Stub collaborators shared by the pipeline tests.

use std::path::Path;
use std::sync::{Arc, Mutex};

use crate::annotation::domain::frame_annotator::FrameAnnotator;
use crate::detection::domain::detection::Detection;
use crate::detection::domain::object_detector::ObjectDetector;
use crate::shared::bounding_box::BoundingBox;
use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::image_writer::ImageWriter;
use crate::video::domain::video_reader::VideoReader;
use crate::video::domain::video_writer::VideoWriter;

pub fn gray_frame(width: u32, height: u32, value: u8) -> Frame {
    gray_frame_at(width, height, value, 0)
}

pub fn gray_frame_at(width: u32, height: u32, value: u8, index: usize) -> Frame {
    Frame::new(
        vec![value; (width * height * 3) as usize],
        width,
        height,
        3,
        index,
    )
}

pub fn metadata(width: u32, height: u32, total_frames: usize) -> VideoMetadata {
    VideoMetadata {
        width,
        height,
        fps: 25.0,
        total_frames,
        codec: "stub".to_string(),
        source_path: None,
    }
}

/// Returns the same detections for every frame.
pub struct StubDetector {
    detections: Vec<Detection>,
}

impl StubDetector {
    pub fn new(detections: Vec<Detection>) -> Self {
        Self { detections }
    }
}

impl ObjectDetector for StubDetector {
    fn detect(&mut self, _frame: &Frame) -> Result<Vec<Detection>, Box<dyn std::error::Error>> {
        Ok(self.detections.clone())
    }
}

pub struct FailingDetector;

impl ObjectDetector for FailingDetector {
    fn detect(&mut self, _frame: &Frame) -> Result<Vec<Detection>, Box<dyn std::error::Error>> {
        Err("inference session crashed".into())
    }
}

/// Records every box it is asked to annotate; clones share the record.
#[derive(Clone, Default)]
pub struct RecordingAnnotator {
    calls: Arc<Mutex<Vec<BoundingBox>>>,
}

impl RecordingAnnotator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<BoundingBox> {
        self.calls.lock().unwrap().clone()
    }
}

impl FrameAnnotator for RecordingAnnotator {
    fn annotate(
        &self,
        _frame: &mut Frame,
        person: &BoundingBox,
    ) -> Result<(), Box<dyn std::error::Error>> {
        self.calls.lock().unwrap().push(*person);
        Ok(())
    }
}

/// Serves a fixed list of frames, optionally failing to open or failing
/// partway through.
pub struct StubReader {
    frames: Vec<Frame>,
    fail_open: bool,
    fail_at: Option<usize>,
    pub closed: Arc<Mutex<bool>>,
}

impl StubReader {
    pub fn new(frames: Vec<Frame>) -> Self {
        Self {
            frames,
            fail_open: false,
            fail_at: None,
            closed: Arc::new(Mutex::new(false)),
        }
    }

    pub fn failing_open() -> Self {
        Self {
            fail_open: true,
            ..Self::new(Vec::new())
        }
    }

    pub fn failing_at(frames: Vec<Frame>, index: usize) -> Self {
        Self {
            fail_at: Some(index),
            ..Self::new(frames)
        }
    }
}

impl VideoReader for StubReader {
    fn open(&mut self, _path: &Path) -> Result<VideoMetadata, Box<dyn std::error::Error>> {
        if self.fail_open {
            return Err("cannot open".into());
        }
        let (w, h) = self
            .frames
            .first()
            .map(|f| (f.width(), f.height()))
            .unwrap_or((0, 0));
        Ok(metadata(w, h, self.frames.len()))
    }

    fn frames(
        &mut self,
    ) -> Box<dyn Iterator<Item = Result<Frame, Box<dyn std::error::Error>>> + '_> {
        let fail_at = self.fail_at;
        Box::new(self.frames.drain(..).enumerate().map(
            move |(i, f)| -> Result<Frame, Box<dyn std::error::Error>> {
                if Some(i) == fail_at {
                    Err("corrupt packet".into())
                } else {
                    Ok(f)
                }
            },
        ))
    }

    fn close(&mut self) {
        *self.closed.lock().unwrap() = true;
    }
}

/// Collects written frames in memory; can be told to fail on open or on a
/// given write.
pub struct StubWriter {
    pub written: Arc<Mutex<Vec<Frame>>>,
    pub opened_with: Arc<Mutex<Option<VideoMetadata>>>,
    pub closed: Arc<Mutex<bool>>,
    fail_open: bool,
    fail_on_write: Option<usize>,
}

impl StubWriter {
    pub fn new() -> Self {
        Self {
            written: Arc::new(Mutex::new(Vec::new())),
            opened_with: Arc::new(Mutex::new(None)),
            closed: Arc::new(Mutex::new(false)),
            fail_open: false,
            fail_on_write: None,
        }
    }

    pub fn failing_open() -> Self {
        Self {
            fail_open: true,
            ..Self::new()
        }
    }

    pub fn failing_on_write(n: usize) -> Self {
        Self {
            fail_on_write: Some(n),
            ..Self::new()
        }
    }
}

impl VideoWriter for StubWriter {
    fn open(
        &mut self,
        path: &Path,
        metadata: &VideoMetadata,
    ) -> Result<(), Box<dyn std::error::Error>> {
        if self.fail_open {
            return Err("cannot create output".into());
        }
        // Leave a file behind like a real encoder would
        std::fs::write(path, b"partial")?;
        *self.opened_with.lock().unwrap() = Some(metadata.clone());
        Ok(())
    }

    fn write(&mut self, frame: &Frame) -> Result<(), Box<dyn std::error::Error>> {
        let mut written = self.written.lock().unwrap();
        if Some(written.len()) == self.fail_on_write {
            return Err("disk full".into());
        }
        written.push(frame.clone());
        Ok(())
    }

    fn close(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        *self.closed.lock().unwrap() = true;
        Ok(())
    }
}

/// Captures image writes in memory.
#[derive(Clone, Default)]
pub struct StubImageWriter {
    pub written: Arc<Mutex<Vec<(std::path::PathBuf, Frame)>>>,
}

impl ImageWriter for StubImageWriter {
    fn write(&self, path: &Path, frame: &Frame) -> Result<(), Box<dyn std::error::Error>> {
        self.written
            .lock()
            .unwrap()
            .push((path.to_path_buf(), frame.clone()));
        Ok(())
    }
}
