use std::path::Path;

use ffmpeg_next::format::Pixel;
use ffmpeg_next::util::frame::video::Video as VideoFrame;

use crate::shared::constants::OUTPUT_FPS;
use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::video_writer::VideoWriter;

const STREAM_INDEX: usize = 0;

/// Encodes RGB frames with the MPEG-4 Part 2 encoder via ffmpeg-next.
///
/// The container is inferred from the output extension (`.mp4` → MP4).
pub struct FfmpegWriter {
    session: Option<EncodeSession>,
    frame_count: usize,
}

// Safety: the ffmpeg contexts are owned and only touched by one thread at a
// time; nothing hands out their raw pointers.
unsafe impl Send for FfmpegWriter {}

impl FfmpegWriter {
    pub fn new() -> Self {
        Self {
            session: None,
            frame_count: 0,
        }
    }

    #[cfg(test)]
    fn frames_written(&self) -> usize {
        self.frame_count
    }
}

impl Default for FfmpegWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// Integral frame rate for the encoder time base; non-positive rates fall
/// back to the default output rate.
fn integral_fps(fps: f64) -> i32 {
    match fps.round() as i32 {
        n if n > 0 => n,
        _ => OUTPUT_FPS as i32,
    }
}

/// Everything that exists between `open` and `close`.
struct EncodeSession {
    octx: ffmpeg_next::format::context::Output,
    encoder: ffmpeg_next::codec::encoder::video::Encoder,
    to_yuv: ffmpeg_next::software::scaling::Context,
    width: u32,
    height: u32,
    time_base: ffmpeg_next::Rational,
}

impl EncodeSession {
    fn start(path: &Path, metadata: &VideoMetadata) -> Result<Self, Box<dyn std::error::Error>> {
        let mut octx = ffmpeg_next::format::output(path)?;
        let global_header = octx
            .format()
            .flags()
            .contains(ffmpeg_next::format::Flags::GLOBAL_HEADER);

        let codec = ffmpeg_next::encoder::find(ffmpeg_next::codec::Id::MPEG4)
            .ok_or("MPEG4 encoder not found")?;
        let mut ost = octx.add_stream(Some(codec))?;

        let fps = integral_fps(metadata.fps);
        let time_base = ffmpeg_next::Rational(1, fps);
        let mut ctx = ffmpeg_next::codec::context::Context::new_with_codec(codec)
            .encoder()
            .video()?;
        ctx.set_width(metadata.width);
        ctx.set_height(metadata.height);
        ctx.set_format(Pixel::YUV420P);
        ctx.set_time_base(time_base);
        ctx.set_frame_rate(Some(ffmpeg_next::Rational(fps, 1)));
        if global_header {
            ctx.set_flags(ffmpeg_next::codec::Flags::GLOBAL_HEADER);
        }

        let encoder = ctx.open_with(ffmpeg_next::Dictionary::new())?;
        ost.set_parameters(&encoder);
        octx.write_header()?;

        let to_yuv = ffmpeg_next::software::scaling::Context::get(
            Pixel::RGB24,
            metadata.width,
            metadata.height,
            Pixel::YUV420P,
            metadata.width,
            metadata.height,
            ffmpeg_next::software::scaling::Flags::BILINEAR,
        )?;

        log::debug!(
            "Opened {} for writing: {}x{} @ {fps} fps, mpeg4",
            path.display(),
            metadata.width,
            metadata.height
        );

        Ok(Self {
            octx,
            encoder,
            to_yuv,
            width: metadata.width,
            height: metadata.height,
            time_base,
        })
    }

    fn encode(&mut self, frame: &Frame, pts: i64) -> Result<(), Box<dyn std::error::Error>> {
        if (frame.width(), frame.height(), frame.channels()) != (self.width, self.height, 3) {
            return Err(format!(
                "FfmpegWriter: expected {}x{} RGB frame, got {}x{}x{}",
                self.width,
                self.height,
                frame.width(),
                frame.height(),
                frame.channels()
            )
            .into());
        }

        let mut rgb = VideoFrame::new(Pixel::RGB24, self.width, self.height);
        let stride = rgb.stride(0);
        let row_len = self.width as usize * 3;
        // Destination rows may be padded past width * 3
        for (dst, src) in rgb
            .data_mut(0)
            .chunks_mut(stride)
            .zip(frame.data().chunks_exact(row_len))
        {
            dst[..row_len].copy_from_slice(src);
        }

        let mut yuv = VideoFrame::empty();
        self.to_yuv.run(&rgb, &mut yuv)?;
        yuv.set_pts(Some(pts));
        self.encoder.send_frame(&yuv)?;
        self.drain()
    }

    /// Moves every packet the encoder has ready into the container.
    fn drain(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        let stream_time_base = self
            .octx
            .stream(STREAM_INDEX)
            .ok_or("FfmpegWriter: output stream missing")?
            .time_base();

        let mut packet = ffmpeg_next::Packet::empty();
        while self.encoder.receive_packet(&mut packet).is_ok() {
            packet.set_stream(STREAM_INDEX);
            packet.rescale_ts(self.time_base, stream_time_base);
            packet.write_interleaved(&mut self.octx)?;
        }
        Ok(())
    }

    /// Flushes the encoder and writes the container trailer.
    fn finish(mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.encoder.send_eof()?;
        self.drain()?;
        self.octx.write_trailer()?;
        Ok(())
    }
}

impl VideoWriter for FfmpegWriter {
    fn open(
        &mut self,
        path: &Path,
        metadata: &VideoMetadata,
    ) -> Result<(), Box<dyn std::error::Error>> {
        ffmpeg_next::init()?;
        self.session = Some(EncodeSession::start(path, metadata)?);
        self.frame_count = 0;
        Ok(())
    }

    fn write(&mut self, frame: &Frame) -> Result<(), Box<dyn std::error::Error>> {
        let session = self.session.as_mut().ok_or("FfmpegWriter: not opened")?;
        session.encode(frame, self.frame_count as i64)?;
        self.frame_count += 1;
        Ok(())
    }

    fn close(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        match self.session.take() {
            Some(session) => session.finish(),
            None => Ok(()),
        }
    }
}
