use std::path::PathBuf;
use thiserror::Error;

use crate::camera::CameraError;

/// Error kinds surfaced by the recorder core.
///
/// Configuration errors are fatal at startup. Per-tick operational errors
/// (capture, recording start/stop, storage) are surfaced to the caller of
/// `tick()`; the outer loop logs them and proceeds to the next scheduled tick.
#[derive(Debug, Error)]
pub enum RecorderError {
    #[error("camera setup failed: {0}")]
    Setup(#[source] CameraError),

    #[error("still capture failed: {0}")]
    Capture(#[source] CameraError),

    #[error("recording start failed: {0}")]
    RecordingStart(#[source] CameraError),

    #[error("recording stop failed: {0}")]
    RecordingStop(#[source] CameraError),

    #[error("storage operation failed on {path}: {source}")]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration: {0}")]
    Configuration(String),

    #[error("still image decode failed: {0}")]
    Decode(#[from] image::ImageError),
}

pub type Result<T> = std::result::Result<T, RecorderError>;
