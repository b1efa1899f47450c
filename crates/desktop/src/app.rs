use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{Receiver, TryRecvError};
use iced::widget::{button, column, container, row, scrollable, text};
use iced::{Element, Length, Subscription, Task};

use threatwatch_core::shared::constants::{IMAGE_EXTENSIONS, VIDEO_EXTENSIONS};

use crate::settings::Settings;
use crate::tabs::image_tab::{self, ImageTabState};
use crate::tabs::video_tab::{self, VideoTabState};
use crate::tabs::JobStatus;
use crate::workers::detection_worker::{self, Job, WorkerMessage, FAILURE_MESSAGE};
use crate::workers::pipeline_cache::{CacheStatus, PipelineCache};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Video,
    Image,
}

impl Tab {
    const ALL: &[Tab] = &[Tab::Video, Tab::Image];

    fn label(self) -> &'static str {
        match self {
            Tab::Video => "Video Detection",
            Tab::Image => "Image Detection",
        }
    }
}

#[derive(Debug, Clone)]
pub enum Message {
    TabSelected(Tab),
    SelectVideo,
    VideoSelected(Option<PathBuf>),
    RunVideo,
    OpenVideoOutput,
    SelectImage,
    ImageSelected(Option<PathBuf>),
    RunImage,
    Tick,
}

/// A job in flight and the tab that started it.
struct RunningJob {
    tab: Tab,
    rx: Receiver<WorkerMessage>,
}

pub struct App {
    active_tab: Tab,
    settings: Settings,
    cache: Arc<PipelineCache>,
    video: VideoTabState,
    image: ImageTabState,
    job: Option<RunningJob>,
}

impl App {
    pub fn new() -> (Self, Task<Message>) {
        let settings = Settings::load();
        let cache = PipelineCache::new(&settings);
        (Self::with_cache(settings, cache), Task::none())
    }

    fn with_cache(settings: Settings, cache: Arc<PipelineCache>) -> Self {
        Self {
            active_tab: Tab::Video,
            settings,
            cache,
            video: VideoTabState::default(),
            image: ImageTabState::default(),
            job: None,
        }
    }

    pub fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::TabSelected(tab) => {
                self.active_tab = tab;
            }
            Message::SelectVideo => {
                return Task::perform(
                    pick_file("Select a video", "Videos", VIDEO_EXTENSIONS),
                    Message::VideoSelected,
                );
            }
            Message::VideoSelected(Some(path)) => {
                self.video = VideoTabState {
                    input: Some(path),
                    ..Default::default()
                };
            }
            Message::SelectImage => {
                return Task::perform(
                    pick_file("Select an image", "Images", IMAGE_EXTENSIONS),
                    Message::ImageSelected,
                );
            }
            Message::ImageSelected(Some(path)) => {
                self.image = ImageTabState {
                    input: Some(path),
                    ..Default::default()
                };
            }
            Message::VideoSelected(None) | Message::ImageSelected(None) => {}
            Message::RunVideo => {
                let output = self.video.output_path();
                if let (Some(input), Some(output)) = (self.video.input.clone(), output) {
                    self.start(Tab::Video, Job::Video { input, output });
                }
            }
            Message::RunImage => {
                if let Some(input) = self.image.input.clone() {
                    self.start(Tab::Image, Job::Image { input });
                }
            }
            Message::OpenVideoOutput => {
                if let Some((ref path, _)) = self.video.output {
                    if let Err(e) = open::that(path) {
                        log::warn!("Could not open {}: {e}", path.display());
                    }
                }
            }
            Message::Tick => self.poll_job(),
        }
        Task::none()
    }

    /// One job at a time: both tabs share the same loaded pipeline.
    fn can_run(&self) -> bool {
        self.job.is_none() && !matches!(self.cache.status(), CacheStatus::Failed(_))
    }

    fn start(&mut self, tab: Tab, job: Job) {
        if !self.can_run() {
            return;
        }
        log::info!("Starting {job:?}");
        let rx = detection_worker::spawn(job, self.settings.clone(), self.cache.clone());
        *self.status_mut(tab) = JobStatus::Running {
            current: 0,
            total: 0,
        };
        match tab {
            Tab::Video => self.video.output = None,
            Tab::Image => self.image.result = None,
        }
        self.job = Some(RunningJob { tab, rx });
    }

    fn poll_job(&mut self) {
        let Some(job) = self.job.take() else {
            return;
        };
        loop {
            match job.rx.try_recv() {
                Ok(message) => {
                    if self.apply(job.tab, message) {
                        return;
                    }
                }
                Err(TryRecvError::Empty) => {
                    self.job = Some(job);
                    return;
                }
                Err(TryRecvError::Disconnected) => {
                    log::error!("Detection worker exited without a result");
                    *self.status_mut(job.tab) = JobStatus::Failed(FAILURE_MESSAGE.to_string());
                    return;
                }
            }
        }
    }

    /// Folds one worker message into the tab state; returns true when the
    /// job is over.
    fn apply(&mut self, tab: Tab, message: WorkerMessage) -> bool {
        match message {
            WorkerMessage::DownloadProgress(downloaded, total) => {
                *self.status_mut(tab) = JobStatus::Downloading { downloaded, total };
                false
            }
            WorkerMessage::Progress(current, total) => {
                *self.status_mut(tab) = JobStatus::Running { current, total };
                false
            }
            WorkerMessage::VideoComplete { output, frames } => {
                self.video.output = Some((output, frames));
                self.video.status = JobStatus::Done;
                true
            }
            WorkerMessage::ImageComplete(annotated) => {
                self.image.result = Some(annotated.into());
                self.image.status = JobStatus::Done;
                true
            }
            WorkerMessage::Error(message) => {
                *self.status_mut(tab) = JobStatus::Failed(message);
                true
            }
        }
    }

    fn status_mut(&mut self, tab: Tab) -> &mut JobStatus {
        match tab {
            Tab::Video => &mut self.video.status,
            Tab::Image => &mut self.image.status,
        }
    }

    pub fn view(&self) -> Element<'_, Message> {
        let tab_bar = row(Tab::ALL
            .iter()
            .map(|&tab| {
                let btn = button(text(tab.label()).size(13))
                    .on_press(Message::TabSelected(tab))
                    .padding([6, 14]);
                if tab == self.active_tab {
                    btn.style(button::primary).into()
                } else {
                    btn.style(button::text).into()
                }
            })
            .collect::<Vec<_>>())
        .spacing(2);

        let can_run = self.can_run();
        let content: Element<'_, Message> = match self.active_tab {
            Tab::Video => video_tab::view(&self.video, can_run),
            Tab::Image => image_tab::view(&self.image, can_run),
        };

        let tab_content = container(scrollable(content).height(Length::Fill))
            .padding(16)
            .height(Length::Fill);

        let footer = container(text(model_status_label(&self.cache.status())).size(11))
            .width(Length::Fill)
            .padding([4, 16]);

        column![tab_bar, tab_content, footer]
            .height(Length::Fill)
            .into()
    }

    pub fn subscription(&self) -> Subscription<Message> {
        let loading = matches!(self.cache.status(), CacheStatus::Loading { .. });
        if self.job.is_some() || loading {
            iced::time::every(POLL_INTERVAL).map(|_| Message::Tick)
        } else {
            Subscription::none()
        }
    }
}

fn model_status_label(status: &CacheStatus) -> String {
    match *status {
        CacheStatus::Loading { downloaded, total } if total > 0 => {
            format!("Downloading detection model... {}%", downloaded * 100 / total)
        }
        CacheStatus::Loading { .. } => "Loading detection model...".to_string(),
        CacheStatus::Ready => "Detection model ready".to_string(),
        CacheStatus::Failed(_) => "Detection model unavailable".to_string(),
    }
}

async fn pick_file(
    title: &'static str,
    filter_name: &'static str,
    extensions: &'static [&'static str],
) -> Option<PathBuf> {
    rfd::AsyncFileDialog::new()
        .set_title(title)
        .add_filter(filter_name, extensions)
        .pick_file()
        .await
        .map(|h| h.path().to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workers::detection_worker::AnnotatedImage;
    use crate::workers::test_support::empty_pipeline;

    fn app() -> App {
        let cache = PipelineCache::spawn_with(|_| Ok(empty_pipeline()));
        App::with_cache(Settings::default(), cache)
    }

    #[test]
    fn test_starts_on_video_tab() {
        let app = app();
        assert_eq!(app.active_tab, Tab::Video);
        assert_eq!(Tab::ALL.len(), 2);
        assert_eq!(Tab::Image.label(), "Image Detection");
    }

    #[test]
    fn test_selecting_a_file_resets_tab_state() {
        let mut app = app();
        app.video.status = JobStatus::Failed("old".into());
        let _ = app.update(Message::VideoSelected(Some(PathBuf::from("/v/clip.mp4"))));
        assert_eq!(app.video.input, Some(PathBuf::from("/v/clip.mp4")));
        assert_eq!(app.video.status, JobStatus::Idle);

        let _ = app.update(Message::VideoSelected(None));
        assert_eq!(app.video.input, Some(PathBuf::from("/v/clip.mp4")));
    }

    #[test]
    fn test_run_without_input_does_nothing() {
        let mut app = app();
        let _ = app.update(Message::RunVideo);
        let _ = app.update(Message::RunImage);
        assert!(app.job.is_none());
    }

    #[test]
    fn test_progress_then_completion() {
        let mut app = app();
        assert!(!app.apply(Tab::Video, WorkerMessage::Progress(3, 10)));
        assert_eq!(app.video.status, JobStatus::Running { current: 3, total: 10 });

        assert!(app.apply(
            Tab::Video,
            WorkerMessage::VideoComplete {
                output: PathBuf::from("/v/output.mp4"),
                frames: 10,
            }
        ));
        assert_eq!(app.video.status, JobStatus::Done);
        assert_eq!(app.video.output, Some((PathBuf::from("/v/output.mp4"), 10)));
    }

    #[test]
    fn test_error_goes_to_the_tab_that_ran_the_job() {
        let mut app = app();
        assert!(app.apply(Tab::Image, WorkerMessage::Error("Detection failed.".into())));
        assert_eq!(app.image.status, JobStatus::Failed("Detection failed.".into()));
        assert_eq!(app.video.status, JobStatus::Idle);
    }

    #[test]
    fn test_image_completion_stores_result() {
        let mut app = app();
        let done = app.apply(
            Tab::Image,
            WorkerMessage::ImageComplete(AnnotatedImage {
                width: 1,
                height: 1,
                rgba: vec![255, 0, 0, 255],
                threats: 2,
            }),
        );
        assert!(done);
        assert_eq!(app.image.result.as_ref().map(|r| r.threats), Some(2));
    }

    #[test]
    fn test_vanished_worker_fails_the_job() {
        let mut app = app();
        let (tx, rx) = crossbeam_channel::unbounded();
        tx.send(WorkerMessage::Progress(1, 4)).unwrap();
        drop(tx);
        app.job = Some(RunningJob { tab: Tab::Video, rx });

        let _ = app.update(Message::Tick);
        assert!(app.job.is_none());
        assert_eq!(app.video.status, JobStatus::Failed(FAILURE_MESSAGE.to_string()));
        assert!(app.can_run());
    }

    #[test]
    fn test_quiet_worker_keeps_the_job_running() {
        let mut app = app();
        let (_tx, rx) = crossbeam_channel::unbounded();
        app.job = Some(RunningJob { tab: Tab::Image, rx });

        let _ = app.update(Message::Tick);
        assert!(app.job.is_some());
    }

    #[test]
    fn test_image_job_runs_to_failure_for_missing_file() {
        let mut app = app();
        let _ = app.update(Message::ImageSelected(Some(PathBuf::from(
            "/nonexistent/scene.png",
        ))));
        let _ = app.update(Message::RunImage);
        assert!(app.job.is_some());
        assert!(!app.can_run());

        for _ in 0..200 {
            let _ = app.update(Message::Tick);
            if app.job.is_none() {
                break;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        assert!(app.job.is_none());
        assert!(matches!(app.image.status, JobStatus::Failed(_)));
    }
}
