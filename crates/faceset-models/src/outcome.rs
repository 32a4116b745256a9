//! Per-video outcomes and the end-of-run summary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use uuid::Uuid;

/// Terminal outcome of one video's extraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum VideoOutcome {
    /// An output video was written
    Extracted { crops: usize, output: PathBuf },
    /// Fewer crops than the quality gate requires; nothing written
    SkippedLowYield { crops: usize },
    /// Dataset mode: the video has no entry in the metadata table
    SkippedNoLabel,
    /// The pipeline failed for this video; the batch continued
    Failed { message: String },
}

impl VideoOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            VideoOutcome::Extracted { .. } => "extracted",
            VideoOutcome::SkippedLowYield { .. } => "skipped_low_yield",
            VideoOutcome::SkippedNoLabel => "skipped_no_label",
            VideoOutcome::Failed { .. } => "failed",
        }
    }

    pub fn is_extracted(&self) -> bool {
        matches!(self, VideoOutcome::Extracted { .. })
    }
}

impl fmt::Display for VideoOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One video's entry in the run report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoReport {
    /// Source video filename (e.g. `"abcdef.mp4"`)
    pub video: String,
    #[serde(flatten)]
    pub outcome: VideoOutcome,
}

/// Accounting for a whole batch run, written as `extraction_report.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    pub videos: Vec<VideoReport>,
}

impl RunSummary {
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4().to_string(),
            started_at: Utc::now(),
            finished_at: None,
            videos: Vec::new(),
        }
    }

    pub fn push(&mut self, video: impl Into<String>, outcome: VideoOutcome) {
        self.videos.push(VideoReport {
            video: video.into(),
            outcome,
        });
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    pub fn total(&self) -> usize {
        self.videos.len()
    }

    pub fn extracted(&self) -> usize {
        self.count(|o| matches!(o, VideoOutcome::Extracted { .. }))
    }

    pub fn skipped_low_yield(&self) -> usize {
        self.count(|o| matches!(o, VideoOutcome::SkippedLowYield { .. }))
    }

    pub fn skipped_no_label(&self) -> usize {
        self.count(|o| matches!(o, VideoOutcome::SkippedNoLabel))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, VideoOutcome::Failed { .. }))
    }

    fn count(&self, pred: impl Fn(&VideoOutcome) -> bool) -> usize {
        self.videos.iter().filter(|r| pred(&r.outcome)).count()
    }
}

impl Default for RunSummary {
    fn default() -> Self {
        Self::new()
    }
}
