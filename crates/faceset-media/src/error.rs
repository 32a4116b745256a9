//! Error types for media operations.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur during extraction.
///
/// Detection misses, end-of-stream and low crop yield are deliberately NOT
/// errors; they are normal control flow and surface as outcomes instead.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("Failed to open video: {0}")]
    VideoOpen(PathBuf),

    #[error("Invalid video file: {0}")]
    InvalidVideo(String),

    #[error("Face detection failed: {0}")]
    DetectionFailed(String),

    #[error("Encoding failed: {0}")]
    EncodeFailed(String),

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("OpenCV error: {0}")]
    OpenCv(#[from] opencv::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl MediaError {
    /// Create a detection failure error.
    pub fn detection_failed(message: impl Into<String>) -> Self {
        Self::DetectionFailed(message.into())
    }

    /// Create an encoding failure error.
    pub fn encode_failed(message: impl Into<String>) -> Self {
        Self::EncodeFailed(message.into())
    }

    /// Create a model not found error.
    pub fn model_not_found(path: impl Into<String>) -> Self {
        Self::ModelNotFound(path.into())
    }

    /// Create an invalid video error.
    pub fn invalid_video(message: impl Into<String>) -> Self {
        Self::InvalidVideo(message.into())
    }
}
