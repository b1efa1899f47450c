use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};

use threatwatch_core::annotation::infrastructure::overlay_annotator::{
    OverlayAnnotator, OverlayStyle,
};
use threatwatch_core::detection::infrastructure::model_resolver::{self, ModelSource};
use threatwatch_core::detection::infrastructure::onnx_yolo_detector::{
    OnnxYoloDetector, DEFAULT_MIN_SCORE,
};
use threatwatch_core::pipeline::detect_threats_in_image_use_case::DetectThreatsInImageUseCase;
use threatwatch_core::pipeline::detect_threats_in_video_use_case::DetectThreatsInVideoUseCase;
use threatwatch_core::pipeline::frame_pipeline::FramePipeline;
use threatwatch_core::pipeline::infrastructure::sequential_pipeline_executor::SequentialPipelineExecutor;
use threatwatch_core::pipeline::infrastructure::threaded_pipeline_executor::ThreadedPipelineExecutor;
use threatwatch_core::pipeline::pipeline_executor::PipelineExecutor;
use threatwatch_core::pipeline::pipeline_logger::StdoutPipelineLogger;
use threatwatch_core::shared::constants::{
    BUNDLED_MODEL_DIR, DEFAULT_VIDEO_OUTPUT, IMAGE_EXTENSIONS, MODEL_NAME,
};
use threatwatch_core::threat::domain::threat_policy::ThreatPolicy;
use threatwatch_core::video::infrastructure::ffmpeg_reader::FfmpegReader;
use threatwatch_core::video::infrastructure::ffmpeg_writer::FfmpegWriter;
use threatwatch_core::video::infrastructure::image_file_reader::ImageFileReader;
use threatwatch_core::video::infrastructure::image_file_writer::ImageFileWriter;

/// Highlights people standing near firearms in videos and images.
#[derive(Parser, Debug)]
#[command(name = "threatwatch", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Path to the ONNX detection model (skips the cache lookup).
    #[arg(long, global = true)]
    model: Option<PathBuf>,

    /// Where to download the model from when no local copy exists.
    #[arg(long, global = true)]
    model_url: Option<String>,

    /// Weapons must score above this confidence (0.0-1.0).
    #[arg(long, global = true, default_value = "0.4")]
    weapon_confidence: f32,

    /// Pixels added around each person before checking for nearby weapons.
    #[arg(long, global = true, default_value = "50")]
    extension: i32,

    /// Opacity of the red highlight (0.0-1.0).
    #[arg(long, global = true, default_value = "0.5")]
    alpha: f32,

    /// Highlight each person once per frame, however many weapons are near.
    #[arg(long, global = true)]
    dedupe: bool,

    /// Decode and encode on background threads.
    #[arg(long, global = true)]
    threaded: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Annotate every frame of a video.
    Video {
        input: PathBuf,

        /// Annotated video, overwritten if it exists.
        #[arg(short, long, default_value = DEFAULT_VIDEO_OUTPUT)]
        output: PathBuf,
    },
    /// Annotate a single image.
    Image { input: PathBuf, output: PathBuf },
}

impl Command {
    fn input(&self) -> &Path {
        match self {
            Command::Video { input, .. } | Command::Image { input, .. } => input,
        }
    }
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    validate(&cli)?;

    let mut pipeline = build_pipeline(&cli)?;

    match &cli.command {
        Command::Video { input, output } => {
            let executor: Box<dyn PipelineExecutor> = if cli.threaded {
                Box::new(ThreadedPipelineExecutor::new())
            } else {
                Box::new(SequentialPipelineExecutor::new())
            };
            let mut use_case = DetectThreatsInVideoUseCase::new(
                Box::new(FfmpegReader::new()),
                Box::new(FfmpegWriter::new()),
                executor,
                Box::new(StdoutPipelineLogger::default()),
            );
            use_case.execute(&mut pipeline, input, output)?;
            log::info!("Output written to {}", output.display());
        }
        Command::Image { input, output } => {
            let mut use_case = DetectThreatsInImageUseCase::new(
                Box::new(ImageFileReader::new()),
                Box::new(ImageFileWriter::new()),
                Box::new(StdoutPipelineLogger::default()),
            );
            use_case.execute(&mut pipeline, input, Some(output))?;
        }
    }

    Ok(())
}

fn build_pipeline(cli: &Cli) -> Result<FramePipeline, Box<dyn std::error::Error>> {
    log::info!("Resolving model: {MODEL_NAME}");
    let source = ModelSource {
        explicit: cli.model.clone(),
        bundled_dir: Some(PathBuf::from(BUNDLED_MODEL_DIR)),
        url: cli.model_url.clone(),
    };
    let model_path = model_resolver::resolve(MODEL_NAME, &source, Some(Box::new(download_progress)))?;

    let detector = OnnxYoloDetector::new(&model_path, DEFAULT_MIN_SCORE)?;
    let annotator = OverlayAnnotator::new(OverlayStyle {
        alpha: cli.alpha,
        ..OverlayStyle::default()
    });
    Ok(FramePipeline::new(
        Box::new(detector),
        Box::new(annotator),
        policy(cli),
    ))
}

fn policy(cli: &Cli) -> ThreatPolicy {
    ThreatPolicy {
        weapon_confidence: cli.weapon_confidence,
        extension: cli.extension,
        dedupe: cli.dedupe,
    }
}

fn validate(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    let input = cli.command.input();
    if !input.exists() {
        return Err(format!("Input file not found: {}", input.display()).into());
    }
    if !(0.0..=1.0).contains(&cli.weapon_confidence) {
        return Err(format!(
            "Weapon confidence must be between 0.0 and 1.0, got {}",
            cli.weapon_confidence
        )
        .into());
    }
    if cli.extension < 0 {
        return Err(format!("Extension must not be negative, got {}", cli.extension).into());
    }
    if !(0.0..=1.0).contains(&cli.alpha) {
        return Err(format!("Alpha must be between 0.0 and 1.0, got {}", cli.alpha).into());
    }
    if let Some(ref model) = cli.model {
        if !model.is_file() {
            return Err(format!("Model file not found: {}", model.display()).into());
        }
    }
    if let Command::Image { output, .. } = &cli.command {
        if !is_image(output) {
            return Err(format!(
                "Unsupported image output '{}', expected one of: {}",
                output.display(),
                IMAGE_EXTENSIONS.join(", ")
            )
            .into());
        }
    }
    Ok(())
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

fn download_progress(downloaded: u64, total: u64) {
    if total > 0 {
        let pct = (downloaded as f64 / total as f64 * 100.0) as u32;
        eprint!("\rDownloading detection model... {pct}%");
    } else {
        eprint!("\rDownloading detection model... {downloaded} bytes");
    }
}
