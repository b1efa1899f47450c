use std::path::Path;

use ffmpeg_next::format::context::Input;

use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::video_reader::VideoReader;

use super::rgb_decoder::RgbDecoder;

/// Lazily decodes a video file into RGB frames via ffmpeg-next.
pub struct FfmpegReader {
    input: Option<Input>,
}

// Safety: the ffmpeg contexts are owned and only touched by one thread at a
// time; nothing hands out their raw pointers.
unsafe impl Send for FfmpegReader {}

impl FfmpegReader {
    pub fn new() -> Self {
        Self { input: None }
    }
}

impl Default for FfmpegReader {
    fn default() -> Self {
        Self::new()
    }
}

fn stream_fps(ictx: &Input, stream_index: usize) -> f64 {
    ictx.stream(stream_index)
        .map(|s| s.rate())
        .filter(|rate| rate.denominator() != 0)
        .map(|rate| rate.numerator() as f64 / rate.denominator() as f64)
        .unwrap_or(0.0)
}

impl VideoReader for FfmpegReader {
    fn open(&mut self, path: &Path) -> Result<VideoMetadata, Box<dyn std::error::Error>> {
        ffmpeg_next::init()?;

        let ictx = ffmpeg_next::format::input(path)?;
        let probe = RgbDecoder::for_input(&ictx)?;
        let stream_index = probe.stream_index();
        let total_frames = ictx
            .stream(stream_index)
            .map(|s| s.frames().max(0) as usize)
            .unwrap_or(0);

        let metadata = VideoMetadata {
            width: probe.width(),
            height: probe.height(),
            fps: stream_fps(&ictx, stream_index),
            total_frames,
            codec: probe.codec_name(),
            source_path: Some(path.to_path_buf()),
        };
        log::debug!(
            "Opened {}: {}x{} @ {:.2} fps, {} frames, codec {}",
            path.display(),
            metadata.width,
            metadata.height,
            metadata.fps,
            metadata.total_frames,
            metadata.codec
        );

        self.input = Some(ictx);
        Ok(metadata)
    }

    fn frames(
        &mut self,
    ) -> Box<dyn Iterator<Item = Result<Frame, Box<dyn std::error::Error>>> + '_> {
        let Some(ictx) = self.input.as_mut() else {
            return Box::new(std::iter::once(Err("FfmpegReader: not opened".into())));
        };
        match RgbDecoder::for_input(ictx) {
            Ok(decoder) => Box::new(DecodedFrames {
                ictx,
                decoder,
                next_index: 0,
                state: DecodeState::Reading,
            }),
            Err(e) => Box::new(std::iter::once(Err(e))),
        }
    }

    fn close(&mut self) {
        self.input = None;
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum DecodeState {
    Reading,
    Draining,
    Finished,
}

/// Pulls packets on demand so only one decoded frame is held at a time.
struct DecodedFrames<'a> {
    ictx: &'a mut Input,
    decoder: RgbDecoder,
    next_index: usize,
    state: DecodeState,
}

impl DecodedFrames<'_> {
    fn take_ready(&mut self) -> Option<Result<Frame, Box<dyn std::error::Error>>> {
        let frame = self.decoder.receive(self.next_index)?;
        self.next_index += 1;
        Some(frame)
    }
}

impl Iterator for DecodedFrames<'_> {
    type Item = Result<Frame, Box<dyn std::error::Error>>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.state {
                DecodeState::Finished => return None,
                DecodeState::Draining => {
                    let ready = self.take_ready();
                    if ready.is_none() {
                        self.state = DecodeState::Finished;
                    }
                    return ready;
                }
                DecodeState::Reading => {
                    if let Some(ready) = self.take_ready() {
                        return Some(ready);
                    }
                    let Some((stream, packet)) = self.ictx.packets().next() else {
                        self.decoder.send_eof();
                        self.state = DecodeState::Draining;
                        continue;
                    };
                    if stream.index() != self.decoder.stream_index() {
                        continue;
                    }
                    if let Err(e) = self.decoder.send_packet(&packet) {
                        log::warn!("Skipping undecodable packet: {e}");
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::video::domain::video_writer::VideoWriter;
    use crate::video::infrastructure::ffmpeg_writer::FfmpegWriter;
    use std::path::PathBuf;

    /// Writes `num_frames` frames of rising brightness.
    fn create_test_video(dir: &Path, num_frames: usize, width: u32, height: u32) -> PathBuf {
        let path = dir.join("test.mp4");
        let meta = VideoMetadata {
            width,
            height,
            fps: 30.0,
            total_frames: num_frames,
            codec: String::new(),
            source_path: None,
        };
        let mut writer = FfmpegWriter::new();
        writer.open(&path, &meta).unwrap();
        for i in 0..num_frames {
            let value = ((i * 40) % 256) as u8;
            let data = vec![value; (width * height * 3) as usize];
            writer.write(&Frame::new(data, width, height, 3, i)).unwrap();
        }
        writer.close().unwrap();
        path
    }

    #[test]
    fn test_open_returns_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let path = create_test_video(dir.path(), 5, 160, 120);

        let mut reader = FfmpegReader::new();
        let meta = reader.open(&path).unwrap();
        assert_eq!(meta.width, 160);
        assert_eq!(meta.height, 120);
        assert!(meta.fps > 0.0);
        assert_eq!(meta.source_path, Some(path));
    }

    #[test]
    fn test_open_nonexistent_fails() {
        let mut reader = FfmpegReader::new();
        assert!(reader.open(Path::new("/nonexistent/test.mp4")).is_err());
    }

    #[test]
    fn test_open_non_video_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.mp4");
        std::fs::write(&path, b"definitely not a video").unwrap();

        let mut reader = FfmpegReader::new();
        assert!(reader.open(&path).is_err());
    }

    #[test]
    fn test_frames_yield_every_frame_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = create_test_video(dir.path(), 5, 160, 120);

        let mut reader = FfmpegReader::new();
        reader.open(&path).unwrap();

        let frames: Vec<_> = reader.frames().map(|f| f.unwrap()).collect();
        assert_eq!(frames.len(), 5);
        for (i, frame) in frames.iter().enumerate() {
            assert_eq!(frame.index(), i);
            assert_eq!(frame.channels(), 3);
            assert_eq!(frame.data().len(), 160 * 120 * 3);
        }
    }

    #[test]
    fn test_frames_without_open_returns_error() {
        let mut reader = FfmpegReader::new();
        let result = reader.frames().next().unwrap();
        assert!(result.is_err());
    }

    #[test]
    fn test_close_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = create_test_video(dir.path(), 1, 160, 120);

        let mut reader = FfmpegReader::new();
        reader.open(&path).unwrap();
        reader.close();
        reader.close();
        assert!(reader.frames().next().unwrap().is_err());
    }
}
