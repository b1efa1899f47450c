use std::path::PathBuf;

use iced::widget::{button, column, row, text};
use iced::{Alignment, Element};

use threatwatch_core::shared::constants::DEFAULT_VIDEO_OUTPUT;

use super::{status_view, JobStatus};
use crate::app::Message;

#[derive(Debug, Default)]
pub struct VideoTabState {
    pub input: Option<PathBuf>,
    pub status: JobStatus,
    /// Last finished run: where it was written and how many frames.
    pub output: Option<(PathBuf, usize)>,
}

impl VideoTabState {
    /// Annotated videos always go to `output.mp4` next to the input.
    pub fn output_path(&self) -> Option<PathBuf> {
        self.input
            .as_ref()
            .map(|input| input.with_file_name(DEFAULT_VIDEO_OUTPUT))
    }
}

pub fn view(state: &VideoTabState, can_run: bool) -> Element<'_, Message> {
    let input_label = state
        .input
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "No video selected".to_string());

    let choose = row![
        button(text("Choose video..."))
            .on_press_maybe((!state.status.is_active()).then_some(Message::SelectVideo)),
        text(input_label).size(13),
    ]
    .spacing(12)
    .align_y(Alignment::Center);

    let run = button(text("Detect threats"))
        .style(button::primary)
        .on_press_maybe((can_run && state.input.is_some()).then_some(Message::RunVideo));

    let mut content = column![text("Video Detection").size(20), choose, run].spacing(16);

    if let Some(status) = status_view(&state.status) {
        content = content.push(status);
    }

    if let (JobStatus::Done, Some((path, frames))) = (&state.status, &state.output) {
        content = content.push(
            row![
                text(format!("Wrote {frames} frames to {}", path.display())).size(13),
                button(text("Open")).on_press(Message::OpenVideoOutput),
            ]
            .spacing(12)
            .align_y(Alignment::Center),
        );
    }

    content.into()
}
