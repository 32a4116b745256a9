//! Per-video extraction pipeline.
//!
//! Sample → detect → crop → gate → assemble, for one video at a time. Each
//! video owns its frames, crops and work directory; nothing is shared, so
//! the batch layer can run any number of pipelines concurrently.

use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::assembler::{output_file_name, SequenceAssembler};
use crate::cropper::FaceCropper;
use crate::detector::{FaceDetector, SelectionStrategy, YuNetDetector};
use crate::error::{MediaError, MediaResult};
use crate::sampler::FrameSampler;

/// Tunables for one extraction run.
///
/// The defaults reproduce the dataset-prep constants: 5 samples per second
/// over the first 5 seconds, 128×128 crops with 10% padding and a 0.5 blur,
/// a gate of more than 10 crops, and 1 fps flipbook output.
#[derive(Debug, Clone)]
pub struct ExtractionConfig {
    /// Samples per second of source video
    pub sample_fps: f64,
    /// How far into the video to sample
    pub capture_seconds: f64,
    /// Side length of the square output crops
    pub crop_size: u32,
    /// Gaussian blur sigma applied after the resize
    pub blur_sigma: f32,
    /// Fraction of box height added as margin on each side
    pub padding_ratio: f64,
    /// Minimum crop count (exclusive) required to emit an output video
    pub min_sequence_len: usize,
    /// Playback rate of the output video
    pub output_fps: f64,
    /// Which face wins when a frame contains several
    pub selection: SelectionStrategy,
    /// Explicit YuNet model path; conventional locations are searched when
    /// unset
    pub model_path: Option<PathBuf>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            sample_fps: 5.0,
            capture_seconds: 5.0,
            crop_size: 128,
            blur_sigma: 0.5,
            padding_ratio: 0.1,
            min_sequence_len: 10,
            output_fps: 1.0,
            selection: SelectionStrategy::default(),
            model_path: None,
        }
    }
}

/// What one pipeline run produced.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOutcome {
    /// Number of face crops written to the work directory
    pub crops: usize,
    /// Path of the output video, when the quality gate passed
    pub output: Option<PathBuf>,
}

/// The per-video pipeline.
pub struct VideoPipeline {
    config: ExtractionConfig,
}

impl VideoPipeline {
    pub fn new(config: ExtractionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    /// Work directory for a video: a sibling directory named after its stem.
    pub fn work_dir_for(video_path: &Path) -> MediaResult<PathBuf> {
        let stem = video_stem(video_path)?;
        let parent = video_path
            .parent()
            .ok_or_else(|| MediaError::invalid_video("Video path has no parent".to_string()))?;
        Ok(parent.join(stem))
    }

    /// Run the full pipeline for one video, writing the output (if the gate
    /// passes) into `out_dir`.
    pub fn process(&self, video_path: &Path, out_dir: &Path) -> MediaResult<PipelineOutcome> {
        let stem = video_stem(video_path)?;
        let work_dir = Self::work_dir_for(video_path)?;
        std::fs::create_dir_all(&work_dir)?;

        let mut sampler = FrameSampler::open(
            video_path,
            &work_dir,
            self.config.sample_fps,
            self.config.capture_seconds,
        )?;

        let info = sampler.info().clone();
        let mut detector =
            YuNetDetector::new(self.config.model_path.as_deref(), info.width, info.height)?;

        let crops = self.collect_crops(&mut sampler, &mut detector, &work_dir)?;

        let assembler =
            SequenceAssembler::new(self.config.min_sequence_len, self.config.output_fps);
        if !assembler.should_emit(crops.len()) {
            debug!(
                video = %video_path.display(),
                crops = crops.len(),
                "Below quality gate; no output"
            );
            return Ok(PipelineOutcome {
                crops: crops.len(),
                output: None,
            });
        }

        let output = out_dir.join(output_file_name(&stem));
        assembler.assemble(&crops, &output)?;

        Ok(PipelineOutcome {
            crops: crops.len(),
            output: Some(output),
        })
    }

    /// Sample frames and write one crop per frame with a detected face.
    ///
    /// Crops are numbered `0.png`, `1.png`, … in sampling order; that order
    /// becomes playback order. Frames with no face are skipped silently and
    /// a failed inference on one frame does not end the video.
    fn collect_crops(
        &self,
        sampler: &mut FrameSampler,
        detector: &mut dyn FaceDetector,
        work_dir: &Path,
    ) -> MediaResult<Vec<PathBuf>> {
        let cropper = FaceCropper::new(
            self.config.crop_size,
            self.config.blur_sigma,
            self.config.padding_ratio,
        );

        let mut crops = Vec::new();
        while let Some(frame) = sampler.next_frame()? {
            let detections = match detector.detect(&frame.mat) {
                Ok(d) => d,
                Err(e) => {
                    warn!(
                        frame = frame.frame_index,
                        "Detection failed on frame: {}", e
                    );
                    continue;
                }
            };

            let Some(picked) = self.config.selection.select(&detections) else {
                continue;
            };

            let crop_path = work_dir.join(format!("{}.png", crops.len()));
            cropper.process(&frame.mat, &picked.face, &crop_path)?;
            crops.push(crop_path);
        }

        Ok(crops)
    }
}

fn video_stem(video_path: &Path) -> MediaResult<String> {
    video_path
        .file_stem()
        .and_then(|s| s.to_str())
        .map(str::to_string)
        .ok_or_else(|| {
            MediaError::invalid_video(format!("No file stem: {}", video_path.display()))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_matches_dataset_constants() {
        let config = ExtractionConfig::default();
        assert_eq!(config.sample_fps, 5.0);
        assert_eq!(config.capture_seconds, 5.0);
        assert_eq!(config.crop_size, 128);
        assert_eq!(config.blur_sigma, 0.5);
        assert_eq!(config.padding_ratio, 0.1);
        assert_eq!(config.min_sequence_len, 10);
        assert_eq!(config.output_fps, 1.0);
        assert_eq!(config.selection, SelectionStrategy::FirstDetected);
        assert!(config.model_path.is_none());
    }

    #[test]
    fn test_work_dir_is_sibling_named_after_stem() {
        let dir = VideoPipeline::work_dir_for(Path::new("/data/videos/abc.mp4")).unwrap();
        assert_eq!(dir, PathBuf::from("/data/videos/abc"));
    }

    #[test]
    fn test_video_stem_rejects_bare_root() {
        assert!(video_stem(Path::new("/")).is_err());
    }
}
