use std::path::PathBuf;

use thiserror::Error;

/// Error type returned across the infrastructure trait seams.
pub type BoxError = Box<dyn std::error::Error>;

/// Why a detection run stopped.
///
/// A frame with no detections is never an error; every variant here aborts
/// the run that produced it.
#[derive(Error, Debug)]
pub enum ProcessingError {
    #[error("failed to open {path}: {source}")]
    MediaOpen {
        path: PathBuf,
        #[source]
        source: BoxError,
    },
    #[error("{0} contains no frames")]
    EmptyMedia(PathBuf),
    #[error("failed to decode frame: {source}")]
    Decode {
        #[source]
        source: BoxError,
    },
    #[error("inference failed on frame {index}: {source}")]
    Inference {
        index: usize,
        #[source]
        source: BoxError,
    },
    #[error("annotation failed on frame {index}: {source}")]
    Annotation {
        index: usize,
        #[source]
        source: BoxError,
    },
    #[error("failed to write output: {source}")]
    Output {
        #[source]
        source: BoxError,
    },
}
