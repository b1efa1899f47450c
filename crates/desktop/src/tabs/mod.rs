pub mod image_tab;
pub mod video_tab;

use iced::widget::{column, progress_bar, text};
use iced::{Color, Element};

use crate::app::Message;

const ERROR_COLOR: Color = Color::from_rgb(0.8, 0.2, 0.2);

/// Where a tab's current job stands. Finished results live on the tab state.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum JobStatus {
    #[default]
    Idle,
    Downloading { downloaded: u64, total: u64 },
    Running { current: usize, total: usize },
    Done,
    Failed(String),
}

impl JobStatus {
    pub fn is_active(&self) -> bool {
        matches!(self, JobStatus::Downloading { .. } | JobStatus::Running { .. })
    }
}

/// Progress or error line under a tab's run button; `None` when there is
/// nothing to report.
pub fn status_view<'a>(status: &JobStatus) -> Option<Element<'a, Message>> {
    match *status {
        JobStatus::Idle | JobStatus::Done => None,
        JobStatus::Downloading { downloaded, total } => {
            let pct = percent(downloaded as f64, total as f64);
            Some(
                column![
                    text(format!("Downloading model... {pct:.0}%")).size(13),
                    progress_bar(0.0..=100.0, pct as f32),
                ]
                .spacing(6)
                .into(),
            )
        }
        JobStatus::Running { current, total } => {
            let label = if total > 0 {
                format!("Processing frame {current} of {total}")
            } else {
                format!("Processing frame {current}")
            };
            Some(
                column![
                    text(label).size(13),
                    progress_bar(0.0..=100.0, percent(current as f64, total as f64) as f32),
                ]
                .spacing(6)
                .into(),
            )
        }
        JobStatus::Failed(ref message) => Some(text(message.clone()).color(ERROR_COLOR).into()),
    }
}

fn percent(done: f64, total: f64) -> f64 {
    if total > 0.0 {
        (done / total * 100.0).min(100.0)
    } else {
        0.0
    }
}
