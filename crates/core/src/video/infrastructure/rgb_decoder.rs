use ffmpeg_next::format::context::Input;
use ffmpeg_next::software::scaling;
use ffmpeg_next::util::frame::video::Video as VideoFrame;

use crate::shared::frame::Frame;

/// Decoder for the best video stream of an input, converting every decoded
/// picture to tightly packed RGB24.
///
/// Shared by the video and image readers; packet routing stays with the
/// caller.
pub(crate) struct RgbDecoder {
    decoder: ffmpeg_next::decoder::Video,
    scaler: scaling::Context,
    stream_index: usize,
    width: u32,
    height: u32,
}

impl RgbDecoder {
    pub(crate) fn for_input(ictx: &Input) -> Result<Self, Box<dyn std::error::Error>> {
        let stream = ictx
            .streams()
            .best(ffmpeg_next::media::Type::Video)
            .ok_or("No video stream found")?;
        let stream_index = stream.index();
        let decoder = ffmpeg_next::codec::context::Context::from_parameters(stream.parameters())?
            .decoder()
            .video()?;

        let (width, height) = (decoder.width(), decoder.height());
        let scaler = scaling::Context::get(
            decoder.format(),
            width,
            height,
            ffmpeg_next::format::Pixel::RGB24,
            width,
            height,
            scaling::Flags::BILINEAR,
        )?;

        Ok(Self {
            decoder,
            scaler,
            stream_index,
            width,
            height,
        })
    }

    pub(crate) fn stream_index(&self) -> usize {
        self.stream_index
    }

    pub(crate) fn width(&self) -> u32 {
        self.width
    }

    pub(crate) fn height(&self) -> u32 {
        self.height
    }

    pub(crate) fn codec_name(&self) -> String {
        self.decoder
            .codec()
            .map(|c| c.name().to_string())
            .unwrap_or_default()
    }

    pub(crate) fn send_packet(
        &mut self,
        packet: &ffmpeg_next::Packet,
    ) -> Result<(), ffmpeg_next::Error> {
        self.decoder.send_packet(packet)
    }

    /// Signals end of input so buffered pictures can be drained.
    pub(crate) fn send_eof(&mut self) {
        let _ = self.decoder.send_eof();
    }

    /// The next decoded picture as a frame numbered `index`, or `None` when
    /// the decoder needs more input.
    pub(crate) fn receive(
        &mut self,
        index: usize,
    ) -> Option<Result<Frame, Box<dyn std::error::Error>>> {
        let mut decoded = VideoFrame::empty();
        self.decoder.receive_frame(&mut decoded).ok()?;

        let mut rgb = VideoFrame::empty();
        if let Err(e) = self.scaler.run(&decoded, &mut rgb) {
            return Some(Err(Box::new(e)));
        }
        let pixels = packed_rows(&rgb, self.width, self.height);
        Some(Ok(Frame::new(pixels, self.width, self.height, 3, index)))
    }
}

/// Drops the per-row padding ffmpeg may add (stride > width * 3).
fn packed_rows(rgb: &VideoFrame, width: u32, height: u32) -> Vec<u8> {
    let stride = rgb.stride(0);
    let row_len = width as usize * 3;
    rgb.data(0)
        .chunks(stride)
        .take(height as usize)
        .flat_map(|row| &row[..row_len])
        .copied()
        .collect()
}
