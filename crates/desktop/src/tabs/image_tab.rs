use std::path::PathBuf;

use iced::widget::{button, column, image, row, text};
use iced::{Alignment, ContentFit, Element, Length};

use super::{status_view, JobStatus};
use crate::app::Message;
use crate::workers::detection_worker::AnnotatedImage;

#[derive(Debug, Default)]
pub struct ImageTabState {
    pub input: Option<PathBuf>,
    pub status: JobStatus,
    pub result: Option<ImageResult>,
}

#[derive(Debug, Clone)]
pub struct ImageResult {
    pub handle: image::Handle,
    pub threats: usize,
}

impl From<AnnotatedImage> for ImageResult {
    fn from(annotated: AnnotatedImage) -> Self {
        Self {
            handle: image::Handle::from_rgba(annotated.width, annotated.height, annotated.rgba),
            threats: annotated.threats,
        }
    }
}

pub fn view(state: &ImageTabState, can_run: bool) -> Element<'_, Message> {
    let input_label = state
        .input
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "No image selected".to_string());

    let choose = row![
        button(text("Choose image..."))
            .on_press_maybe((!state.status.is_active()).then_some(Message::SelectImage)),
        text(input_label).size(13),
    ]
    .spacing(12)
    .align_y(Alignment::Center);

    let run = button(text("Detect threats"))
        .style(button::primary)
        .on_press_maybe((can_run && state.input.is_some()).then_some(Message::RunImage));

    let mut content = column![text("Image Detection").size(20), choose, run].spacing(16);

    if let Some(status) = status_view(&state.status) {
        content = content.push(status);
    }

    if let (JobStatus::Done, Some(result)) = (&state.status, &state.result) {
        let summary = match result.threats {
            0 => "No threats found".to_string(),
            1 => "1 threat found".to_string(),
            n => format!("{n} threats found"),
        };
        content = content.push(text(summary).size(13)).push(
            image(result.handle.clone())
                .width(Length::Fill)
                .content_fit(ContentFit::Contain),
        );
    }

    content.into()
}
