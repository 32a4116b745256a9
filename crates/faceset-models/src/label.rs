//! Dataset labels and label-resolution modes.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Dataset class assigned to a video.
///
/// Serialized in the metadata table's upper-case form (`"REAL"` / `"FAKE"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Label {
    /// Unmanipulated footage
    Real,
    /// Manipulated (deepfaked) footage
    Fake,
}

impl Label {
    pub const ALL: &'static [Label] = &[Label::Real, Label::Fake];

    pub fn as_str(&self) -> &'static str {
        match self {
            Label::Real => "REAL",
            Label::Fake => "FAKE",
        }
    }

    /// Name of the output subdirectory for this label in dataset mode.
    pub fn dir_name(&self) -> String {
        format!("extracted_{}", self.as_str())
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Label {
    type Err = LabelParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "REAL" => Ok(Label::Real),
            "FAKE" => Ok(Label::Fake),
            _ => Err(LabelParseError(s.to_string())),
        }
    }
}

#[derive(Debug, Error)]
#[error("Unknown label: {0}")]
pub struct LabelParseError(String);

/// How the label for a given video is resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LabelSource {
    /// Every video in the input directory belongs to one class; outputs go
    /// to a single `extracted/` directory.
    FolderClass(Label),
    /// Per-video lookup in the metadata table; outputs go to
    /// `extracted_REAL/` or `extracted_FAKE/`.
    Metadata,
}

impl LabelSource {
    /// Name of the output subdirectory for a resolved label.
    pub fn dir_name(&self, label: Label) -> String {
        match self {
            LabelSource::FolderClass(_) => "extracted".to_string(),
            LabelSource::Metadata => label.dir_name(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_serde_uppercase() {
        assert_eq!(serde_json::to_string(&Label::Real).unwrap(), "\"REAL\"");
        assert_eq!(serde_json::to_string(&Label::Fake).unwrap(), "\"FAKE\"");
        let label: Label = serde_json::from_str("\"FAKE\"").unwrap();
        assert_eq!(label, Label::Fake);
    }

    #[test]
    fn test_label_from_str_case_insensitive() {
        assert_eq!("real".parse::<Label>().unwrap(), Label::Real);
        assert_eq!("FAKE".parse::<Label>().unwrap(), Label::Fake);
        assert!("unknown".parse::<Label>().is_err());
    }

    #[test]
    fn test_dir_names() {
        assert_eq!(Label::Real.dir_name(), "extracted_REAL");
        assert_eq!(Label::Fake.dir_name(), "extracted_FAKE");

        let folder = LabelSource::FolderClass(Label::Real);
        assert_eq!(folder.dir_name(Label::Real), "extracted");
        assert_eq!(LabelSource::Metadata.dir_name(Label::Fake), "extracted_FAKE");
    }
}
