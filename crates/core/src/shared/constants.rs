/// Default model file name, looked up in the cache and bundled directories.
pub const MODEL_NAME: &str = "gun.onnx";

/// Directory checked for bundled weights, relative to the working directory.
pub const BUNDLED_MODEL_DIR: &str = "yolo-weights";

/// Model class order: index 0 is a gun, index 1 a person.
pub const CLASS_NAMES: &[&str] = &["gun", "person"];

/// Every frame is resized to this square resolution before detection.
pub const FRAME_SIZE: u32 = 640;

pub const OUTPUT_FPS: f64 = 30.0;

/// Annotated videos land here unless told otherwise; overwritten per run.
pub const DEFAULT_VIDEO_OUTPUT: &str = "output.mp4";

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff", "tif", "webp"];

pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "avi", "mov", "mkv", "webm"];
