use ndarray::{ArrayView3, ArrayViewMut3};

/// A single video/image frame: contiguous RGB bytes in row-major order.
///
/// Format conversion happens at I/O boundaries only; the domain layer
/// treats pixel data as opaque.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    channels: u8,
    index: usize,
}

impl Frame {
    pub fn new(data: Vec<u8>, width: u32, height: u32, channels: u8, index: usize) -> Self {
        debug_assert_eq!(
            data.len(),
            (width as usize) * (height as usize) * (channels as usize),
            "data length must equal width * height * channels"
        );
        Self {
            data,
            width,
            height,
            channels,
            index,
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn as_ndarray(&self) -> ArrayView3<'_, u8> {
        ArrayView3::from_shape(self.shape(), &self.data)
            .expect("Frame data length must match dimensions")
    }

    pub fn as_ndarray_mut(&mut self) -> ArrayViewMut3<'_, u8> {
        ArrayViewMut3::from_shape(self.shape(), &mut self.data)
            .expect("Frame data length must match dimensions")
    }

    /// Bilinear resize to exactly `width` × `height`, ignoring aspect ratio.
    ///
    /// A frame that already has the target size is returned unchanged so
    /// repeated passes never resample the same pixels.
    pub fn resized(self, width: u32, height: u32) -> Result<Frame, Box<dyn std::error::Error>> {
        if self.width == width && self.height == height {
            return Ok(self);
        }
        if self.channels != 3 {
            return Err(format!("Cannot resize {}-channel frame", self.channels).into());
        }

        let index = self.index;
        let img = image::RgbImage::from_raw(self.width, self.height, self.data)
            .ok_or("Frame data does not match its dimensions")?;
        let out = image::imageops::resize(&img, width, height, image::imageops::FilterType::Triangle);
        Ok(Frame::new(out.into_raw(), width, height, 3, index))
    }

    fn shape(&self) -> (usize, usize, usize) {
        (
            self.height as usize,
            self.width as usize,
            self.channels as usize,
        )
    }
}
