//! Worker configuration.
//!
//! Everything the original scripts hard-coded is an environment variable
//! here, with the original constants as defaults.

use std::path::PathBuf;

use faceset_media::{ExtractionConfig, SelectionStrategy};
use faceset_models::{Label, LabelSource, MissingLabelPolicy};

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Directory of `.mp4` files to process
    pub input_dir: PathBuf,
    /// How video labels are resolved
    pub label_source: LabelSource,
    /// Metadata table path (dataset mode); defaults to
    /// `<input_dir>/metadata.json`
    pub metadata_file: Option<PathBuf>,
    /// What to do when a video has no metadata entry
    pub missing_label: MissingLabelPolicy,
    /// Maximum videos processed concurrently
    pub max_concurrent_videos: usize,
    /// Per-video pipeline tunables
    pub extraction: ExtractionConfig,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("."),
            label_source: LabelSource::FolderClass(Label::Real),
            metadata_file: None,
            missing_label: MissingLabelPolicy::default(),
            max_concurrent_videos: 2,
            extraction: ExtractionConfig::default(),
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = ExtractionConfig::default();

        let label_source = match std::env::var("FACESET_LABEL_MODE")
            .map(|s| s.to_lowercase())
            .as_deref()
        {
            Ok("dataset") => LabelSource::Metadata,
            _ => {
                let label = std::env::var("FACESET_FOLDER_LABEL")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(Label::Real);
                LabelSource::FolderClass(label)
            }
        };

        Self {
            input_dir: std::env::var("FACESET_INPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(".")),
            label_source,
            metadata_file: std::env::var("FACESET_METADATA_FILE").ok().map(PathBuf::from),
            missing_label: std::env::var("FACESET_MISSING_LABEL")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or_default(),
            max_concurrent_videos: std::env::var("FACESET_MAX_CONCURRENT")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|&n| n > 0)
                .unwrap_or(2),
            extraction: ExtractionConfig {
                sample_fps: env_parse("FACESET_SAMPLE_FPS", defaults.sample_fps),
                capture_seconds: env_parse("FACESET_CAPTURE_SECONDS", defaults.capture_seconds),
                crop_size: env_parse("FACESET_CROP_SIZE", defaults.crop_size),
                blur_sigma: env_parse("FACESET_BLUR_SIGMA", defaults.blur_sigma),
                padding_ratio: env_parse("FACESET_PADDING_RATIO", defaults.padding_ratio),
                min_sequence_len: env_parse("FACESET_MIN_SEQUENCE", defaults.min_sequence_len),
                output_fps: env_parse("FACESET_OUTPUT_FPS", defaults.output_fps),
                selection: std::env::var("FACESET_FACE_SELECTION")
                    .ok()
                    .and_then(|s| s.parse::<SelectionStrategy>().ok())
                    .unwrap_or_default(),
                model_path: std::env::var("FACESET_YUNET_MODEL").ok().map(PathBuf::from),
            },
        }
    }

    /// Metadata table path, defaulting to `metadata.json` in the input
    /// directory.
    pub fn metadata_path(&self) -> PathBuf {
        self.metadata_file
            .clone()
            .unwrap_or_else(|| self.input_dir.join("metadata.json"))
    }
}

fn env_parse<T: std::str::FromStr>(var: &str, default: T) -> T {
    std::env::var(var)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = WorkerConfig::default();
        assert_eq!(config.input_dir, PathBuf::from("."));
        assert_eq!(config.label_source, LabelSource::FolderClass(Label::Real));
        assert_eq!(config.missing_label, MissingLabelPolicy::Skip);
        assert_eq!(config.max_concurrent_videos, 2);
        assert_eq!(config.extraction.min_sequence_len, 10);
    }

    #[test]
    fn test_metadata_path_default() {
        let config = WorkerConfig {
            input_dir: PathBuf::from("/data/videos"),
            ..Default::default()
        };
        assert_eq!(
            config.metadata_path(),
            PathBuf::from("/data/videos/metadata.json")
        );

        let config = WorkerConfig {
            metadata_file: Some(PathBuf::from("/elsewhere/meta.json")),
            ..config
        };
        assert_eq!(config.metadata_path(), PathBuf::from("/elsewhere/meta.json"));
    }
}
