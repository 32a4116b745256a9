//! Video information read from the decoder.

use opencv::prelude::{VideoCaptureTrait, VideoCaptureTraitConst};
use opencv::videoio::{
    self, VideoCapture, CAP_PROP_FPS, CAP_PROP_FRAME_COUNT, CAP_PROP_FRAME_HEIGHT,
    CAP_PROP_FRAME_WIDTH,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{MediaError, MediaResult};

/// Frame rate assumed when the container does not report one.
pub const DEFAULT_FPS: f64 = 30.0;

/// Video file information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoInfo {
    /// Duration in seconds (0.0 when the frame count is unknown)
    pub duration: f64,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Native frame rate (fps)
    pub fps: f64,
    /// Total frame count as reported by the container (0 when unknown)
    pub frame_count: i64,
}

impl VideoInfo {
    /// Read properties from an open capture.
    pub fn from_capture(capture: &VideoCapture) -> MediaResult<Self> {
        let mut fps = capture.get(CAP_PROP_FPS)?;
        if !fps.is_finite() || fps <= 0.0 {
            fps = DEFAULT_FPS;
        }

        let frame_count = capture.get(CAP_PROP_FRAME_COUNT)?.max(0.0) as i64;
        let width = capture.get(CAP_PROP_FRAME_WIDTH)?.max(0.0) as u32;
        let height = capture.get(CAP_PROP_FRAME_HEIGHT)?.max(0.0) as u32;

        let duration = if frame_count > 0 {
            frame_count as f64 / fps
        } else {
            0.0
        };

        Ok(Self {
            duration,
            width,
            height,
            fps,
            frame_count,
        })
    }
}

/// Probe a video file for information.
pub fn probe_video(path: impl AsRef<Path>) -> MediaResult<VideoInfo> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(MediaError::FileNotFound(path.to_path_buf()));
    }

    let path_str = path
        .to_str()
        .ok_or_else(|| MediaError::invalid_video(format!("Non-UTF8 path: {}", path.display())))?;

    let mut capture = VideoCapture::from_file(path_str, videoio::CAP_ANY)?;
    if !capture.is_opened()? {
        return Err(MediaError::VideoOpen(path.to_path_buf()));
    }

    let info = VideoInfo::from_capture(&capture);
    capture.release()?;
    info
}
