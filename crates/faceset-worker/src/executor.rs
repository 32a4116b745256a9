//! Batch executor.
//!
//! Fans the per-video pipeline out across the input directory with bounded
//! concurrency. Each video is independent and its pipeline owns all of its
//! state; the only shared data is the read-only metadata table. A per-video
//! failure is recorded and never aborts the batch.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::Semaphore;
use tracing::{info, warn};

use faceset_media::{PipelineOutcome, VideoPipeline};
use faceset_models::{
    Label, LabelSource, MetadataTable, MissingLabelPolicy, RunSummary, VideoOutcome,
};

use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::logging::VideoLogger;

/// Filename of the end-of-run report, written into the input directory.
pub const REPORT_FILE_NAME: &str = "extraction_report.json";

/// What to do with one video after label resolution.
#[derive(Debug, Clone, Copy, PartialEq)]
enum LabelDecision {
    Assign(Label),
    Skip,
}

/// Resolve the label for one video.
///
/// A metadata miss is decided by the policy: `Skip` records the video as
/// skipped without decoding it, `Fail` makes the miss a per-video error.
fn resolve_label(
    source: &LabelSource,
    table: Option<&MetadataTable>,
    file_name: &str,
    policy: MissingLabelPolicy,
) -> WorkerResult<LabelDecision> {
    match source {
        LabelSource::FolderClass(label) => Ok(LabelDecision::Assign(*label)),
        LabelSource::Metadata => match table.and_then(|t| t.label_for(file_name)) {
            Some(label) => Ok(LabelDecision::Assign(label)),
            None => match policy {
                MissingLabelPolicy::Skip => Ok(LabelDecision::Skip),
                MissingLabelPolicy::Fail => Err(WorkerError::missing_label(file_name)),
            },
        },
    }
}

/// List the `.mp4` files in a directory, sorted for deterministic run order.
pub fn scan_videos(dir: &Path) -> WorkerResult<Vec<PathBuf>> {
    let mut videos: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .map_or(false, |ext| ext.eq_ignore_ascii_case("mp4"))
        })
        .collect();
    videos.sort();
    Ok(videos)
}

/// Runs the whole batch.
pub struct BatchExecutor {
    config: WorkerConfig,
}

impl BatchExecutor {
    pub fn new(config: WorkerConfig) -> Self {
        Self { config }
    }

    /// Process every video in the input directory and return the summary.
    ///
    /// The summary is also written to `extraction_report.json` in the input
    /// directory.
    pub async fn run(&self) -> WorkerResult<RunSummary> {
        if !self.config.input_dir.is_dir() {
            return Err(WorkerError::config_error(format!(
                "Input dir does not exist: {}",
                self.config.input_dir.display()
            )));
        }

        let mut summary = RunSummary::new();
        info!(
            run_id = %summary.run_id,
            input = %self.config.input_dir.display(),
            max_concurrent = self.config.max_concurrent_videos,
            "Starting extraction batch"
        );

        let videos = scan_videos(&self.config.input_dir)?;
        if videos.is_empty() {
            warn!(
                "No .mp4 files in {}",
                self.config.input_dir.display()
            );
        } else {
            info!("Found {} videos", videos.len());
        }

        // Dataset mode: load the table once; workers only read it.
        let table = match &self.config.label_source {
            LabelSource::Metadata => {
                let path = self.config.metadata_path();
                let table = MetadataTable::load(&path)?;
                info!(
                    metadata = %path.display(),
                    records = table.len(),
                    "Metadata table loaded"
                );
                Some(Arc::new(table))
            }
            LabelSource::FolderClass(label) => {
                info!(label = %label, "Folder-class mode");
                None
            }
        };

        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent_videos));
        let mut handles = Vec::with_capacity(videos.len());

        for path in videos {
            let Some(file_name) = path.file_name().and_then(|s| s.to_str()).map(str::to_string)
            else {
                warn!("Skipping non-UTF8 filename: {}", path.display());
                continue;
            };
            let logger = VideoLogger::new(&file_name, "extract");

            let label = match resolve_label(
                &self.config.label_source,
                table.as_deref(),
                &file_name,
                self.config.missing_label,
            ) {
                Ok(LabelDecision::Assign(label)) => label,
                Ok(LabelDecision::Skip) => {
                    logger.log_warning("no metadata entry; skipping");
                    summary.push(file_name, VideoOutcome::SkippedNoLabel);
                    continue;
                }
                Err(e) => {
                    logger.log_error(&e.to_string());
                    summary.push(
                        file_name,
                        VideoOutcome::Failed {
                            message: e.to_string(),
                        },
                    );
                    continue;
                }
            };

            let out_dir = self
                .config
                .input_dir
                .join(self.config.label_source.dir_name(label));
            let pipeline = VideoPipeline::new(self.config.extraction.clone());

            let Ok(permit) = Arc::clone(&semaphore).acquire_owned().await else {
                break;
            };

            let task_name = file_name.clone();
            let handle = tokio::task::spawn_blocking(move || {
                let _permit = permit;
                logger.log_start("sampling frames");
                match pipeline.process(&path, &out_dir) {
                    Ok(PipelineOutcome {
                        crops,
                        output: Some(output),
                    }) => {
                        logger.log_completion(&format!("{} crops -> {}", crops, output.display()));
                        VideoOutcome::Extracted { crops, output }
                    }
                    Ok(PipelineOutcome {
                        crops,
                        output: None,
                    }) => {
                        logger.log_warning(&format!("{} crops; below quality gate", crops));
                        VideoOutcome::SkippedLowYield { crops }
                    }
                    Err(e) => {
                        logger.log_error(&e.to_string());
                        VideoOutcome::Failed {
                            message: e.to_string(),
                        }
                    }
                }
            });
            handles.push((task_name, handle));
        }

        for (file_name, handle) in handles {
            let outcome = match handle.await {
                Ok(outcome) => outcome,
                Err(e) => VideoOutcome::Failed {
                    message: format!("Worker task panicked: {}", e),
                },
            };
            summary.push(file_name, outcome);
        }

        summary.finish();
        self.write_report(&summary).await?;

        info!(
            total = summary.total(),
            extracted = summary.extracted(),
            skipped_low_yield = summary.skipped_low_yield(),
            skipped_no_label = summary.skipped_no_label(),
            failed = summary.failed(),
            "All done"
        );
        Ok(summary)
    }

    async fn write_report(&self, summary: &RunSummary) -> WorkerResult<()> {
        let path = self.config.input_dir.join(REPORT_FILE_NAME);
        let data = serde_json::to_vec_pretty(summary)?;
        tokio::fs::write(&path, data).await?;
        info!(report = %path.display(), "Run report written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use faceset_models::VideoRecord;

    #[test]
    fn test_scan_videos_filters_and_sorts() {
        let dir = tempfile::TempDir::new().unwrap();
        for name in ["b.mp4", "a.mp4", "notes.txt", "c.MP4"] {
            std::fs::write(dir.path().join(name), b"").unwrap();
        }
        std::fs::create_dir(dir.path().join("extracted_REAL")).unwrap();

        let videos = scan_videos(dir.path()).unwrap();
        let names: Vec<_> = videos
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap())
            .collect();
        assert_eq!(names, vec!["a.mp4", "b.mp4", "c.MP4"]);
    }

    #[test]
    fn test_resolve_label_folder_mode_ignores_table() {
        let source = LabelSource::FolderClass(Label::Fake);
        let decision =
            resolve_label(&source, None, "anything.mp4", MissingLabelPolicy::Fail).unwrap();
        assert_eq!(decision, LabelDecision::Assign(Label::Fake));
    }

    #[test]
    fn test_resolve_label_dataset_mode() {
        let mut table = MetadataTable::default();
        table.insert(
            "v1.mp4",
            VideoRecord {
                label: Label::Fake,
                split: None,
                original: None,
            },
        );

        let decision = resolve_label(
            &LabelSource::Metadata,
            Some(&table),
            "v1.mp4",
            MissingLabelPolicy::Skip,
        )
        .unwrap();
        assert_eq!(decision, LabelDecision::Assign(Label::Fake));

        // Miss with Skip policy
        let decision = resolve_label(
            &LabelSource::Metadata,
            Some(&table),
            "v2.mp4",
            MissingLabelPolicy::Skip,
        )
        .unwrap();
        assert_eq!(decision, LabelDecision::Skip);

        // Miss with Fail policy
        let err = resolve_label(
            &LabelSource::Metadata,
            Some(&table),
            "v2.mp4",
            MissingLabelPolicy::Fail,
        )
        .unwrap_err();
        assert!(matches!(err, WorkerError::MissingLabel(_)));
    }

    #[test]
    fn test_dataset_routing_directory() {
        // Metadata {"v1.mp4": FAKE} routes into extracted_FAKE, named
        // v1_extracted.avi.
        let source = LabelSource::Metadata;
        let out_dir = Path::new("/data").join(source.dir_name(Label::Fake));
        assert_eq!(out_dir, PathBuf::from("/data/extracted_FAKE"));
        assert_eq!(
            out_dir.join(faceset_media::assembler::output_file_name("v1")),
            PathBuf::from("/data/extracted_FAKE/v1_extracted.avi")
        );
    }

    #[tokio::test]
    async fn test_run_empty_directory_writes_report() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = WorkerConfig {
            input_dir: dir.path().to_path_buf(),
            ..Default::default()
        };

        let summary = BatchExecutor::new(config).run().await.unwrap();
        assert_eq!(summary.total(), 0);
        assert!(summary.finished_at.is_some());

        let report = dir.path().join(REPORT_FILE_NAME);
        assert!(report.exists());
        let parsed: RunSummary =
            serde_json::from_slice(&std::fs::read(report).unwrap()).unwrap();
        assert_eq!(parsed.run_id, summary.run_id);
    }

    #[tokio::test]
    async fn test_run_missing_input_dir_is_config_error() {
        let config = WorkerConfig {
            input_dir: PathBuf::from("/definitely/not/here"),
            ..Default::default()
        };
        let err = BatchExecutor::new(config).run().await.unwrap_err();
        assert!(matches!(err, WorkerError::ConfigError(_)));
    }

    #[tokio::test]
    async fn test_run_dataset_mode_requires_metadata() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = WorkerConfig {
            input_dir: dir.path().to_path_buf(),
            label_source: LabelSource::Metadata,
            ..Default::default()
        };

        let err = BatchExecutor::new(config).run().await.unwrap_err();
        assert!(matches!(err, WorkerError::Metadata(_)));
    }
}
