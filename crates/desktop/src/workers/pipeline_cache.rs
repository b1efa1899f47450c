use std::path::PathBuf;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

use threatwatch_core::annotation::infrastructure::overlay_annotator::OverlayAnnotator;
use threatwatch_core::detection::infrastructure::model_resolver::{self, ModelSource, ProgressFn};
use threatwatch_core::detection::infrastructure::onnx_yolo_detector::{
    OnnxYoloDetector, DEFAULT_MIN_SCORE,
};
use threatwatch_core::pipeline::frame_pipeline::FramePipeline;
use threatwatch_core::shared::constants::{BUNDLED_MODEL_DIR, MODEL_NAME};

use crate::settings::Settings;

/// The one loaded pipeline, locked by whichever job is running.
pub type SharedPipeline = Arc<Mutex<FramePipeline>>;

#[derive(Debug, Clone, PartialEq)]
pub enum CacheStatus {
    Loading { downloaded: u64, total: u64 },
    Ready,
    Failed(String),
}

/// Builds the frame pipeline once in the background at start-up; both tabs
/// share the result.
pub struct PipelineCache {
    result: Mutex<Option<Result<SharedPipeline, String>>>,
    ready: Condvar,
    progress: Mutex<(u64, u64)>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl PipelineCache {
    /// Resolves the model named in `settings` and loads it on a background thread.
    pub fn new(settings: &Settings) -> Arc<Self> {
        let settings = settings.clone();
        Self::spawn_with(move |progress| build_pipeline(&settings, progress))
    }

    pub fn spawn_with<F>(build: F) -> Arc<Self>
    where
        F: FnOnce(ProgressFn) -> Result<FramePipeline, String> + Send + 'static,
    {
        let cache = Arc::new(Self {
            result: Mutex::new(None),
            ready: Condvar::new(),
            progress: Mutex::new((0, 0)),
        });

        let worker_cache = cache.clone();
        thread::spawn(move || {
            let progress_cache = worker_cache.clone();
            let progress: ProgressFn = Box::new(move |downloaded, total| {
                *lock(&progress_cache.progress) = (downloaded, total);
            });
            let result = build(progress).map(|pipeline| Arc::new(Mutex::new(pipeline)));
            match &result {
                Ok(_) => log::info!("Detection pipeline ready"),
                Err(e) => log::error!("Could not load detection pipeline: {e}"),
            }
            *lock(&worker_cache.result) = Some(result);
            worker_cache.ready.notify_all();
        });

        cache
    }

    pub fn status(&self) -> CacheStatus {
        match &*lock(&self.result) {
            Some(Ok(_)) => CacheStatus::Ready,
            Some(Err(e)) => CacheStatus::Failed(e.clone()),
            None => {
                let (downloaded, total) = *lock(&self.progress);
                CacheStatus::Loading { downloaded, total }
            }
        }
    }

    /// Blocks until the pipeline is built, forwarding download progress.
    pub fn wait(&self, on_progress: &dyn Fn(u64, u64)) -> Result<SharedPipeline, String> {
        let mut guard = lock(&self.result);
        loop {
            if let Some(ref result) = *guard {
                return result.clone();
            }
            if let Ok(progress) = self.progress.try_lock() {
                let (downloaded, total) = *progress;
                if total > 0 {
                    on_progress(downloaded, total);
                }
            }
            let (next, _) = self
                .ready
                .wait_timeout(guard, Duration::from_millis(100))
                .unwrap_or_else(PoisonError::into_inner);
            guard = next;
        }
    }
}

fn build_pipeline(settings: &Settings, progress: ProgressFn) -> Result<FramePipeline, String> {
    let source = ModelSource {
        explicit: settings.model_path.clone(),
        bundled_dir: Some(PathBuf::from(BUNDLED_MODEL_DIR)),
        url: settings.model_url.clone(),
    };
    let model_path =
        model_resolver::resolve(MODEL_NAME, &source, Some(progress)).map_err(|e| e.to_string())?;
    let detector =
        OnnxYoloDetector::new(&model_path, DEFAULT_MIN_SCORE).map_err(|e| e.to_string())?;

    Ok(FramePipeline::new(
        Box::new(detector),
        Box::new(OverlayAnnotator::new(settings.overlay_style())),
        settings.policy(),
    ))
}
