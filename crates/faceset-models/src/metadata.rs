//! The per-dataset metadata table.
//!
//! Dataset mode reads a `metadata.json` next to the videos, mapping each
//! video filename to a record carrying its class label:
//!
//! ```json
//! { "abcdef.mp4": { "label": "FAKE", "split": "train", "original": "ghijkl.mp4" } }
//! ```
//!
//! The table is loaded once before the batch and only read afterwards, so it
//! can be shared freely across workers.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

use crate::label::Label;

/// Result type for metadata operations.
pub type MetadataResult<T> = Result<T, MetadataError>;

/// Errors loading or querying the metadata table.
#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("Metadata file not found: {0}")]
    FileNotFound(std::path::PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),
}

/// One row of the metadata table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoRecord {
    /// Dataset class of the video
    pub label: Label,
    /// Dataset split (e.g. `"train"`), when present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub split: Option<String>,
    /// Filename of the source video a fake was derived from, when present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original: Option<String>,
}

/// Read-only lookup table: video filename → record.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetadataTable {
    records: HashMap<String, VideoRecord>,
}

impl MetadataTable {
    /// Load the table from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> MetadataResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(MetadataError::FileNotFound(path.to_path_buf()));
        }
        let data = std::fs::read(path)?;
        let table = serde_json::from_slice(&data)?;
        Ok(table)
    }

    /// Look up the record for a video filename (e.g. `"abcdef.mp4"`).
    pub fn get(&self, file_name: &str) -> Option<&VideoRecord> {
        self.records.get(file_name)
    }

    /// Look up just the label for a video filename.
    pub fn label_for(&self, file_name: &str) -> Option<Label> {
        self.records.get(file_name).map(|r| r.label)
    }

    /// Number of records in the table.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Insert a record (used by tests and tooling).
    pub fn insert(&mut self, file_name: impl Into<String>, record: VideoRecord) {
        self.records.insert(file_name.into(), record);
    }
}

/// What to do when a video has no entry in the metadata table.
///
/// The source behavior was an uncaught lookup fault; the policy makes the
/// decision explicit per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingLabelPolicy {
    /// Log, record the video as skipped, continue the batch
    #[default]
    Skip,
    /// Treat the miss as a fatal per-video error
    Fail,
}

impl MissingLabelPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            MissingLabelPolicy::Skip => "skip",
            MissingLabelPolicy::Fail => "fail",
        }
    }
}

impl FromStr for MissingLabelPolicy {
    type Err = MissingLabelPolicyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "skip" => Ok(MissingLabelPolicy::Skip),
            "fail" => Ok(MissingLabelPolicy::Fail),
            _ => Err(MissingLabelPolicyParseError(s.to_string())),
        }
    }
}

#[derive(Debug, Error)]
#[error("Unknown missing-label policy: {0}")]
pub struct MissingLabelPolicyParseError(String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_dfdc_shaped_metadata() {
        let json = r#"{
            "aaqaifqrwn.mp4": {"label": "FAKE", "split": "train", "original": "kbvibjhfzo.mp4"},
            "kbvibjhfzo.mp4": {"label": "REAL", "split": "train"}
        }"#;
        let table: MetadataTable = serde_json::from_str(json).unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(table.label_for("aaqaifqrwn.mp4"), Some(Label::Fake));
        assert_eq!(table.label_for("kbvibjhfzo.mp4"), Some(Label::Real));
        assert_eq!(table.label_for("missing.mp4"), None);
        assert_eq!(
            table.get("aaqaifqrwn.mp4").unwrap().original.as_deref(),
            Some("kbvibjhfzo.mp4")
        );
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("metadata.json");
        std::fs::write(&path, r#"{"v1.mp4": {"label": "FAKE"}}"#).unwrap();

        let table = MetadataTable::load(&path).unwrap();
        assert_eq!(table.label_for("v1.mp4"), Some(Label::Fake));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let err = MetadataTable::load(dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(err, MetadataError::FileNotFound(_)));
    }

    #[test]
    fn test_missing_label_policy_parse() {
        assert_eq!(
            "skip".parse::<MissingLabelPolicy>().unwrap(),
            MissingLabelPolicy::Skip
        );
        assert_eq!(
            "FAIL".parse::<MissingLabelPolicy>().unwrap(),
            MissingLabelPolicy::Fail
        );
        assert!("abort".parse::<MissingLabelPolicy>().is_err());
    }
}
