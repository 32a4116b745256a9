//! Structured per-video logging.
//!
//! Provides consistent, structured logging for batch processing with
//! contextual information (video filename, operation).

use tracing::{error, info, warn, Span};

/// Video logger for structured logging with consistent formatting.
#[derive(Debug, Clone)]
pub struct VideoLogger {
    video: String,
    operation: String,
}

impl VideoLogger {
    /// Create a new logger for one video and operation (e.g. `"extract"`).
    pub fn new(video: &str, operation: &str) -> Self {
        Self {
            video: video.to_string(),
            operation: operation.to_string(),
        }
    }

    /// Log the start of processing.
    pub fn log_start(&self, message: &str) {
        info!(
            video = %self.video,
            operation = %self.operation,
            "Extracting: {}", message
        );
    }

    /// Log a progress update.
    pub fn log_progress(&self, message: &str) {
        info!(
            video = %self.video,
            operation = %self.operation,
            "Progress: {}", message
        );
    }

    /// Log a warning.
    pub fn log_warning(&self, message: &str) {
        warn!(
            video = %self.video,
            operation = %self.operation,
            "Warning: {}", message
        );
    }

    /// Log an error.
    pub fn log_error(&self, message: &str) {
        error!(
            video = %self.video,
            operation = %self.operation,
            "Error: {}", message
        );
    }

    /// Log completion.
    pub fn log_completion(&self, message: &str) {
        info!(
            video = %self.video,
            operation = %self.operation,
            "Done: {}", message
        );
    }

    /// Get the video filename.
    pub fn video(&self) -> &str {
        &self.video
    }

    /// Create a tracing span for this video.
    pub fn create_span(&self) -> Span {
        tracing::info_span!(
            "video",
            video = %self.video,
            operation = %self.operation
        )
    }
}
