use std::path::Path;

use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::video_reader::VideoReader;

use super::rgb_decoder::RgbDecoder;

/// Adapts a single image file to the [`VideoReader`] interface.
///
/// The image is a one-frame source with `fps=0` and `total_frames=1`, so
/// images and videos share one pipeline. Decoding goes through ffmpeg and
/// happens in `open`, which therefore fails on unreadable images.
pub struct ImageFileReader {
    frame: Option<Frame>,
}

impl ImageFileReader {
    pub fn new() -> Self {
        Self { frame: None }
    }
}

impl Default for ImageFileReader {
    fn default() -> Self {
        Self::new()
    }
}

fn decode_single_frame(path: &Path) -> Result<(Frame, String), Box<dyn std::error::Error>> {
    let mut ictx = ffmpeg_next::format::input(path)?;
    let mut decoder = RgbDecoder::for_input(&ictx).map_err(|_| "No image data found")?;
    let codec = decoder.codec_name();

    for (stream, packet) in ictx.packets() {
        if stream.index() != decoder.stream_index() {
            continue;
        }
        decoder.send_packet(&packet)?;
        if let Some(frame) = decoder.receive(0) {
            return Ok((frame?, codec));
        }
    }

    // Some decoders hold the only picture until flushed
    decoder.send_eof();
    let frame = decoder.receive(0).ok_or("Failed to decode image")??;
    Ok((frame, codec))
}

impl VideoReader for ImageFileReader {
    fn open(&mut self, path: &Path) -> Result<VideoMetadata, Box<dyn std::error::Error>> {
        ffmpeg_next::init()?;

        let (frame, codec) = decode_single_frame(path)?;
        let metadata = VideoMetadata {
            width: frame.width(),
            height: frame.height(),
            fps: 0.0,
            total_frames: 1,
            codec,
            source_path: Some(path.to_path_buf()),
        };
        self.frame = Some(frame);
        Ok(metadata)
    }

    fn frames(
        &mut self,
    ) -> Box<dyn Iterator<Item = Result<Frame, Box<dyn std::error::Error>>> + '_> {
        match self.frame.take() {
            Some(frame) => Box::new(std::iter::once(Ok(frame))),
            None => Box::new(std::iter::once(Err("ImageFileReader: not opened".into()))),
        }
    }

    fn close(&mut self) {
        self.frame = None;
    }
}
