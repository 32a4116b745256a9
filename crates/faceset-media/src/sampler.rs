//! Frame sampling.
//!
//! Produces a short, fixed-rate sequence of frames from the head of a video:
//! the default plan is 5 samples per second over the first 5 seconds. Target
//! frame indices are derived from elapsed time rather than a frame-index
//! modulus, so native rates below the sample rate degrade to every-frame
//! sampling instead of dividing by zero.
//!
//! Each accepted frame is written to the per-video work directory as
//! `<stem><frame-index>.jpg` before being handed to the detector stage. The
//! checkpoint lets a crashed run be inspected and is regenerated (same
//! filenames) on re-run.

use opencv::core::{Mat, Vector};
use opencv::imgcodecs;
use opencv::prelude::{MatTraitConst, VideoCaptureTrait, VideoCaptureTraitConst};
use opencv::videoio::{self, VideoCapture};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{MediaError, MediaResult};
use crate::probe::VideoInfo;

/// Compute the target frame indices for one video.
///
/// Returns `floor(min(duration, capture_seconds) * sample_fps)` indices,
/// evenly spaced at `native_fps / sample_fps` frames, deduplicated. An
/// unknown duration (`<= 0`) is treated as at least `capture_seconds` long;
/// decoding stops at end-of-stream anyway.
pub fn sample_plan(
    native_fps: f64,
    duration_seconds: f64,
    sample_fps: f64,
    capture_seconds: f64,
) -> Vec<i64> {
    if sample_fps <= 0.0 || capture_seconds <= 0.0 {
        return Vec::new();
    }
    let fps = if native_fps.is_finite() && native_fps > 0.0 {
        native_fps
    } else {
        crate::probe::DEFAULT_FPS
    };

    let span = if duration_seconds > 0.0 {
        duration_seconds.min(capture_seconds)
    } else {
        capture_seconds
    };

    let samples = (span * sample_fps).floor() as usize;
    let stride = fps / sample_fps;

    let mut plan: Vec<i64> = (0..samples)
        .map(|k| (k as f64 * stride).round() as i64)
        .collect();
    plan.dedup();
    plan
}

/// One decoded frame selected by the plan.
pub struct SampledFrame {
    /// BGR pixel data
    pub mat: Mat,
    /// Index of the frame in the source stream
    pub frame_index: i64,
    /// Path of the on-disk checkpoint image
    pub checkpoint: PathBuf,
}

/// Sequential frame sampler over one video.
///
/// Non-restartable: frames are consumed in stream order and the sampler
/// terminates at end-of-stream, on a read failure, or once the plan is
/// exhausted. All of these count as normal completion.
pub struct FrameSampler {
    capture: VideoCapture,
    info: VideoInfo,
    plan: Vec<i64>,
    next_target: usize,
    frame_index: i64,
    work_dir: PathBuf,
    stem: String,
}

impl FrameSampler {
    /// Open a video and prepare the sampling plan.
    pub fn open(
        video_path: &Path,
        work_dir: &Path,
        sample_fps: f64,
        capture_seconds: f64,
    ) -> MediaResult<Self> {
        let path_str = video_path.to_str().ok_or_else(|| {
            MediaError::invalid_video(format!("Non-UTF8 path: {}", video_path.display()))
        })?;

        let capture = VideoCapture::from_file(path_str, videoio::CAP_ANY)?;
        if !capture.is_opened()? {
            return Err(MediaError::VideoOpen(video_path.to_path_buf()));
        }

        let info = VideoInfo::from_capture(&capture)?;
        let plan = sample_plan(info.fps, info.duration, sample_fps, capture_seconds);

        let stem = video_path
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| {
                MediaError::invalid_video(format!("No file stem: {}", video_path.display()))
            })?
            .to_string();

        debug!(
            video = %video_path.display(),
            fps = info.fps,
            duration = info.duration,
            planned = plan.len(),
            "Sampler opened"
        );

        Ok(Self {
            capture,
            info,
            plan,
            next_target: 0,
            frame_index: 0,
            work_dir: work_dir.to_path_buf(),
            stem,
        })
    }

    /// Properties of the underlying video.
    pub fn info(&self) -> &VideoInfo {
        &self.info
    }

    /// Number of frames the plan will try to sample.
    pub fn planned(&self) -> usize {
        self.plan.len()
    }

    /// Decode forward to the next planned frame.
    ///
    /// Returns `Ok(None)` when the plan is exhausted or the decoder reports
    /// end-of-stream.
    pub fn next_frame(&mut self) -> MediaResult<Option<SampledFrame>> {
        loop {
            let Some(&target) = self.plan.get(self.next_target) else {
                return Ok(None);
            };

            let mut frame = Mat::default();
            if !self.capture.read(&mut frame)? || frame.empty() {
                // End of stream before the plan ran out; normal completion.
                return Ok(None);
            }
            let index = self.frame_index;
            self.frame_index += 1;

            if index < target {
                continue;
            }
            self.next_target += 1;

            let checkpoint = self.work_dir.join(format!("{}{}.jpg", self.stem, index));
            let checkpoint_str = checkpoint.to_str().ok_or_else(|| {
                MediaError::invalid_video(format!("Non-UTF8 path: {}", checkpoint.display()))
            })?;
            imgcodecs::imwrite(checkpoint_str, &frame, &Vector::<i32>::new())?;

            return Ok(Some(SampledFrame {
                mat: frame,
                frame_index: index,
                checkpoint,
            }));
        }
    }
}
