use image::{ImageBuffer, Rgb};
use imageproc::drawing::draw_filled_rect_mut;
use imageproc::rect::Rect;
use ndarray::s;

use crate::annotation::domain::frame_annotator::FrameAnnotator;
use crate::shared::bounding_box::BoundingBox;
use crate::shared::frame::Frame;

use super::bitmap_font::{draw_text, text_size};

pub const DEFAULT_ALPHA: f32 = 0.5;
pub const DEFAULT_LABEL: &str = "Threat";

/// Appearance of the threat highlight and its label.
#[derive(Clone, Debug, PartialEq)]
pub struct OverlayStyle {
    /// Fill color blended over the person box (RGB).
    pub color: [u8; 3],
    /// Weight of `color` in the blend, 0.0..=1.0.
    pub alpha: f32,
    pub label: String,
    /// Vertical gap between the label baseline and the top of the box.
    pub label_offset: i32,
    /// Background margin around the label text.
    pub label_padding: u32,
    pub label_scale: u32,
    pub label_background: [u8; 3],
    pub label_color: [u8; 3],
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self {
            color: [255, 0, 0],
            alpha: DEFAULT_ALPHA,
            label: DEFAULT_LABEL.to_string(),
            label_offset: 10,
            label_padding: 10,
            label_scale: 3,
            label_background: [255, 0, 255],
            label_color: [255, 255, 255],
        }
    }
}

/// Highlights a person with a translucent fill and a text tag above it.
pub struct OverlayAnnotator {
    style: OverlayStyle,
}

impl OverlayAnnotator {
    pub fn new(style: OverlayStyle) -> Self {
        Self { style }
    }

    /// Baseline-left origin of the label for `person`.
    pub fn label_anchor(&self, person: &BoundingBox) -> (i32, i32) {
        (person.x1, person.y1 - self.style.label_offset)
    }

    /// Blend `color` into every pixel of the inclusive box, clipped to the frame.
    fn blend_box(&self, frame: &mut Frame, person: &BoundingBox) {
        let max_x = frame.width() as i32 - 1;
        let max_y = frame.height() as i32 - 1;
        let x_lo = person.x1.max(0);
        let x_hi = person.x2.min(max_x);
        let y_lo = person.y1.max(0);
        let y_hi = person.y2.min(max_y);
        if x_lo > x_hi || y_lo > y_hi {
            return;
        }

        let alpha = self.style.alpha.clamp(0.0, 1.0);
        let mut pixels = frame.as_ndarray_mut();
        let mut region = pixels.slice_mut(s![
            y_lo as usize..=y_hi as usize,
            x_lo as usize..=x_hi as usize,
            ..
        ]);
        for (c, &color) in self.style.color.iter().enumerate() {
            let tint = alpha * color as f32;
            region
                .slice_mut(s![.., .., c])
                .mapv_inplace(|p| (tint + (1.0 - alpha) * p as f32).round() as u8);
        }
    }

    fn draw_label(
        &self,
        frame: &mut Frame,
        person: &BoundingBox,
    ) -> Result<(), Box<dyn std::error::Error>> {
        // A zero-sized label has nothing to draw and no valid background rect.
        if self.style.label.is_empty() || self.style.label_scale == 0 {
            return Ok(());
        }
        let (width, height) = (frame.width(), frame.height());
        let mut canvas = ImageBuffer::<Rgb<u8>, &mut [u8]>::from_raw(width, height, frame.data_mut())
            .ok_or("Frame data does not match its dimensions")?;

        let (ox, oy) = self.label_anchor(person);
        let (text_w, text_h) = text_size(&self.style.label, self.style.label_scale);
        let pad = self.style.label_padding;
        let background = Rect::at(ox - pad as i32, oy - text_h as i32 - pad as i32)
            .of_size(text_w + 2 * pad, text_h + 2 * pad);
        draw_filled_rect_mut(&mut canvas, background, Rgb(self.style.label_background));
        draw_text(
            &mut canvas,
            &self.style.label,
            (ox, oy),
            self.style.label_scale,
            Rgb(self.style.label_color),
        );
        Ok(())
    }
}

impl Default for OverlayAnnotator {
    fn default() -> Self {
        Self::new(OverlayStyle::default())
    }
}

impl FrameAnnotator for OverlayAnnotator {
    fn annotate(
        &self,
        frame: &mut Frame,
        person: &BoundingBox,
    ) -> Result<(), Box<dyn std::error::Error>> {
        if frame.channels() != 3 {
            return Err(format!("Cannot annotate {}-channel frame", frame.channels()).into());
        }
        self.blend_box(frame, person);
        self.draw_label(frame, person)
    }
}
