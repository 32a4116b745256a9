//! Face detection.
//!
//! YuNet is a lightweight CNN face detector exposed through OpenCV's
//! `FaceDetectorYN` API. It is wrapped behind the [`FaceDetector`] trait so
//! the detection backend stays swappable, and which detected face wins is an
//! explicit [`SelectionStrategy`] rather than "whatever the detector
//! returned first".

use opencv::core::{Mat, Ptr, Size};
use opencv::imgproc;
use opencv::objdetect::FaceDetectorYN;
use opencv::prelude::{FaceDetectorYNTrait, MatTraitConst};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;
use tracing::{debug, warn};

use crate::error::{MediaError, MediaResult};
use crate::models::FaceBox;

/// Score threshold for face detection. Faces in this dataset are the primary
/// subject, so the threshold sits well above YuNet's small-face regime.
const SCORE_THRESHOLD: f32 = 0.6;

/// NMS threshold for face detection
const NMS_THRESHOLD: f32 = 0.3;

/// Top K faces to keep per frame
const TOP_K: i32 = 5;

/// Conventional model locations, checked when no explicit path is configured.
const YUNET_MODEL_PATHS: &[&str] = &[
    "./models/face_detection_yunet_2023mar.onnx",
    "./models/face_detection_yunet_2023mar_int8.onnx",
    "/usr/share/opencv/models/face_detection_yunet_2023mar.onnx",
];

/// One detected face.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Detection {
    pub face: FaceBox,
    pub confidence: f64,
}

/// Domain interface for face detection.
///
/// Implementations may be stateful, hence `&mut self`.
pub trait FaceDetector: Send {
    /// Detect faces in one BGR frame. An empty result is an expected
    /// outcome, not an error.
    fn detect(&mut self, frame: &Mat) -> MediaResult<Vec<Detection>>;
}

/// Which detected face to crop when a frame contains more than one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionStrategy {
    /// First box the detector reported (source parity)
    #[default]
    FirstDetected,
    /// Largest box by area
    LargestBox,
    /// Highest detection confidence
    HighestConfidence,
}

impl SelectionStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            SelectionStrategy::FirstDetected => "first",
            SelectionStrategy::LargestBox => "largest",
            SelectionStrategy::HighestConfidence => "confident",
        }
    }

    /// Pick the winning detection, if any.
    pub fn select<'a>(&self, detections: &'a [Detection]) -> Option<&'a Detection> {
        match self {
            SelectionStrategy::FirstDetected => detections.first(),
            SelectionStrategy::LargestBox => detections
                .iter()
                .max_by(|a, b| a.face.area().total_cmp(&b.face.area())),
            SelectionStrategy::HighestConfidence => detections
                .iter()
                .max_by(|a, b| a.confidence.total_cmp(&b.confidence)),
        }
    }
}

impl FromStr for SelectionStrategy {
    type Err = SelectionStrategyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "first" => Ok(SelectionStrategy::FirstDetected),
            "largest" => Ok(SelectionStrategy::LargestBox),
            "confident" => Ok(SelectionStrategy::HighestConfidence),
            _ => Err(SelectionStrategyParseError(s.to_string())),
        }
    }
}

#[derive(Debug, Error)]
#[error("Unknown face selection strategy: {0}")]
pub struct SelectionStrategyParseError(String);

/// Find a YuNet model file: the configured path if given, else the
/// conventional locations.
pub fn find_model_path(configured: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = configured {
        return path.exists().then(|| path.to_path_buf());
    }
    YUNET_MODEL_PATHS
        .iter()
        .map(PathBuf::from)
        .find(|p| p.exists())
}

/// YuNet face detector using OpenCV.
pub struct YuNetDetector {
    detector: Ptr<FaceDetectorYN>,
    /// Input size for the network (width, height)
    input_size: (i32, i32),
}

impl YuNetDetector {
    /// Create a detector for frames of the given dimensions.
    ///
    /// `model_path` overrides the conventional model locations.
    pub fn new(
        model_path: Option<&Path>,
        frame_width: u32,
        frame_height: u32,
    ) -> MediaResult<Self> {
        let model = find_model_path(model_path).ok_or_else(|| {
            MediaError::model_not_found(
                "No YuNet model found; set FACESET_YUNET_MODEL or place the \
                 ONNX file under ./models/",
            )
        })?;
        let model_str = model.to_str().ok_or_else(|| {
            MediaError::model_not_found(format!("Non-UTF8 model path: {}", model.display()))
        })?;

        let (input_width, input_height) = Self::calculate_input_size(frame_width, frame_height);

        debug!(
            model = %model.display(),
            frame = format!("{}x{}", frame_width, frame_height),
            input = format!("{}x{}", input_width, input_height),
            "Creating YuNet detector"
        );

        let detector = Self::create_with_backend_fallback(model_str, input_width, input_height)?;

        Ok(Self {
            detector,
            input_size: (input_width, input_height),
        })
    }

    /// Network input size: the frame scaled to fit 640×640, rounded to
    /// multiples of 32 for CNN feature map alignment.
    fn calculate_input_size(frame_width: u32, frame_height: u32) -> (i32, i32) {
        const TARGET: f64 = 640.0;
        const ALIGNMENT: i32 = 32;

        let scale = (frame_width as f64 / TARGET)
            .max(frame_height as f64 / TARGET)
            .max(1.0);

        let mut input_width = (frame_width as f64 / scale).round() as i32;
        let mut input_height = (frame_height as f64 / scale).round() as i32;

        input_width = ((input_width + ALIGNMENT / 2) / ALIGNMENT) * ALIGNMENT;
        input_height = ((input_height + ALIGNMENT / 2) / ALIGNMENT) * ALIGNMENT;

        (input_width.clamp(96, 640), input_height.clamp(96, 640))
    }

    /// OpenCV DNN supports several backends; some builds reject the default
    /// one, so try the plain OpenCV backend before giving up.
    fn create_with_backend_fallback(
        model_path: &str,
        input_width: i32,
        input_height: i32,
    ) -> MediaResult<Ptr<FaceDetectorYN>> {
        use opencv::dnn::{DNN_BACKEND_DEFAULT, DNN_BACKEND_OPENCV, DNN_TARGET_CPU};

        let backends = [
            (DNN_BACKEND_DEFAULT, DNN_TARGET_CPU, "default"),
            (DNN_BACKEND_OPENCV, DNN_TARGET_CPU, "opencv"),
        ];

        let mut last_error = String::new();
        for (backend_id, target_id, backend_name) in backends {
            match FaceDetectorYN::create(
                model_path,
                "",
                Size::new(input_width, input_height),
                SCORE_THRESHOLD,
                NMS_THRESHOLD,
                TOP_K,
                backend_id,
                target_id,
            ) {
                Ok(detector) => {
                    debug!("YuNet created with {} backend", backend_name);
                    return Ok(detector);
                }
                Err(e) => {
                    warn!("YuNet {} backend failed: {}", backend_name, e);
                    last_error = e.to_string();
                }
            }
        }

        Err(MediaError::detection_failed(format!(
            "Failed to create YuNet detector with any backend: {}",
            last_error
        )))
    }

    /// Parse YuNet's output matrix.
    ///
    /// One row per face:
    /// `[x, y, w, h, landmarks x10, score]`; coordinates are in network
    /// input space and get scaled back to frame space here.
    fn parse_detections(
        &self,
        faces: &Mat,
        frame_width: f64,
        frame_height: f64,
    ) -> MediaResult<Vec<Detection>> {
        let num_faces = faces.rows();
        if num_faces <= 0 {
            return Ok(Vec::new());
        }
        if faces.cols() < 15 {
            warn!(
                "YuNet output has unexpected format: {} columns (expected 15)",
                faces.cols()
            );
            return Ok(Vec::new());
        }

        let scale_x = frame_width / self.input_size.0 as f64;
        let scale_y = frame_height / self.input_size.1 as f64;

        let mut results = Vec::with_capacity(num_faces as usize);
        for i in 0..num_faces {
            let Ok(&x) = faces.at_2d::<f32>(i, 0) else {
                continue;
            };
            let Ok(&y) = faces.at_2d::<f32>(i, 1) else {
                continue;
            };
            let Ok(&w) = faces.at_2d::<f32>(i, 2) else {
                continue;
            };
            let Ok(&h) = faces.at_2d::<f32>(i, 3) else {
                continue;
            };
            let Ok(&score) = faces.at_2d::<f32>(i, 14) else {
                continue;
            };

            let x = x as f64 * scale_x;
            let y = y as f64 * scale_y;
            let w = w as f64 * scale_x;
            let h = h as f64 * scale_y;

            if w <= 0.0 || h <= 0.0 || (score as f64) < SCORE_THRESHOLD as f64 {
                continue;
            }

            // Clamp to frame bounds; YuNet can report boxes nudging past the edge.
            let x1 = x.max(0.0);
            let y1 = y.max(0.0);
            let x2 = (x + w).min(frame_width);
            let y2 = (y + h).min(frame_height);
            if x2 <= x1 || y2 <= y1 {
                continue;
            }

            results.push(Detection {
                face: FaceBox::new(x1, y1, x2 - x1, y2 - y1),
                confidence: score as f64,
            });
        }

        debug!(
            "YuNet detected {} faces (from {} candidates)",
            results.len(),
            num_faces
        );
        Ok(results)
    }
}

impl FaceDetector for YuNetDetector {
    fn detect(&mut self, frame: &Mat) -> MediaResult<Vec<Detection>> {
        if frame.empty() {
            return Ok(Vec::new());
        }

        let frame_width = frame.cols();
        let frame_height = frame.rows();
        if frame_width <= 0 || frame_height <= 0 {
            return Ok(Vec::new());
        }

        // Resize to the network input size; coordinates are scaled back
        // after detection.
        let mut resized = Mat::default();
        imgproc::resize(
            frame,
            &mut resized,
            Size::new(self.input_size.0, self.input_size.1),
            0.0,
            0.0,
            imgproc::INTER_LINEAR,
        )?;

        self.detector
            .set_input_size(Size::new(self.input_size.0, self.input_size.1))?;

        let mut faces = Mat::default();
        if let Err(e) = self.detector.detect(&resized, &mut faces) {
            // A failed inference on one frame is recoverable; the sampler
            // keeps feeding frames.
            warn!("YuNet detection error: {}", e);
            return Ok(Vec::new());
        }

        self.parse_detections(&faces, frame_width as f64, frame_height as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn det(x: f64, y: f64, w: f64, h: f64, confidence: f64) -> Detection {
        Detection {
            face: FaceBox::new(x, y, w, h),
            confidence,
        }
    }

    #[test]
    fn test_selection_first() {
        let detections = vec![
            det(0.0, 0.0, 10.0, 10.0, 0.7),
            det(50.0, 50.0, 40.0, 40.0, 0.95),
        ];
        let picked = SelectionStrategy::FirstDetected.select(&detections).unwrap();
        assert_eq!(picked.face.x, 0.0);
    }

    #[test]
    fn test_selection_largest() {
        let detections = vec![
            det(0.0, 0.0, 10.0, 10.0, 0.99),
            det(50.0, 50.0, 40.0, 40.0, 0.61),
            det(5.0, 5.0, 20.0, 20.0, 0.8),
        ];
        let picked = SelectionStrategy::LargestBox.select(&detections).unwrap();
        assert_eq!(picked.face.width, 40.0);
    }

    #[test]
    fn test_selection_highest_confidence() {
        let detections = vec![
            det(0.0, 0.0, 10.0, 10.0, 0.7),
            det(50.0, 50.0, 40.0, 40.0, 0.95),
            det(5.0, 5.0, 20.0, 20.0, 0.8),
        ];
        let picked = SelectionStrategy::HighestConfidence
            .select(&detections)
            .unwrap();
        assert_eq!(picked.confidence, 0.95);
    }

    #[test]
    fn test_selection_empty() {
        for strategy in [
            SelectionStrategy::FirstDetected,
            SelectionStrategy::LargestBox,
            SelectionStrategy::HighestConfidence,
        ] {
            assert!(strategy.select(&[]).is_none());
        }
    }

    #[test]
    fn test_strategy_parse_roundtrip() {
        for strategy in [
            SelectionStrategy::FirstDetected,
            SelectionStrategy::LargestBox,
            SelectionStrategy::HighestConfidence,
        ] {
            assert_eq!(strategy.as_str().parse::<SelectionStrategy>().unwrap(), strategy);
        }
    }

    #[test]
    fn test_strategy_parse() {
        assert_eq!(
            "first".parse::<SelectionStrategy>().unwrap(),
            SelectionStrategy::FirstDetected
        );
        assert_eq!(
            "LARGEST".parse::<SelectionStrategy>().unwrap(),
            SelectionStrategy::LargestBox
        );
        assert_eq!(
            "confident".parse::<SelectionStrategy>().unwrap(),
            SelectionStrategy::HighestConfidence
        );
        assert!("best".parse::<SelectionStrategy>().is_err());
    }

    #[test]
    fn test_input_size_alignment() {
        let (w, h) = YuNetDetector::calculate_input_size(1920, 1080);
        assert_eq!(w % 32, 0);
        assert_eq!(h % 32, 0);
        assert!(w <= 640 && h <= 640);

        // Small frames are not upscaled past their own size by the scale
        // factor, only aligned.
        let (w, h) = YuNetDetector::calculate_input_size(320, 240);
        assert_eq!(w % 32, 0);
        assert_eq!(h % 32, 0);
    }

    #[test]
    fn test_find_model_path_configured_missing() {
        let missing = Path::new("/definitely/not/here.onnx");
        assert!(find_model_path(Some(missing)).is_none());
    }

    #[test]
    fn test_find_model_path_configured_exists() {
        let dir = tempfile::TempDir::new().unwrap();
        let model = dir.path().join("yunet.onnx");
        std::fs::write(&model, b"stub").unwrap();
        assert_eq!(find_model_path(Some(&model)), Some(model));
    }
}
