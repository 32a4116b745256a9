//! Sequence assembly.
//!
//! Re-encodes a video's crop sequence into a raw AVI "flipbook": one face
//! per second, easy to scrub through when auditing a dataset. Videos that
//! yielded too few crops are dropped by the quality gate and produce no
//! output at all.

use opencv::core::{Mat, Size};
use opencv::imgcodecs;
use opencv::prelude::{MatTraitConst, VideoWriterTrait, VideoWriterTraitConst};
use opencv::videoio::VideoWriter;
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{MediaError, MediaResult};

/// Fourcc 0 selects the uncompressed raw codec.
const RAW_FOURCC: i32 = 0;

/// Output filename for a source video stem.
pub fn output_file_name(stem: &str) -> String {
    format!("{}_extracted.avi", stem)
}

/// Gate and encode crop sequences.
#[derive(Debug, Clone)]
pub struct SequenceAssembler {
    /// Minimum number of crops required before an output is written
    pub min_sequence_len: usize,
    /// Playback rate of the output video
    pub output_fps: f64,
}

impl SequenceAssembler {
    pub fn new(min_sequence_len: usize, output_fps: f64) -> Self {
        Self {
            min_sequence_len,
            output_fps,
        }
    }

    /// Quality gate: only sequences strictly longer than
    /// `min_sequence_len` are promoted to an output video.
    pub fn should_emit(&self, crops: usize) -> bool {
        crops > self.min_sequence_len
    }

    /// Encode `crops` (in order) into `output_path`.
    ///
    /// Frame geometry is taken from the first crop; the resize stage
    /// guarantees all crops share it.
    pub fn assemble(&self, crops: &[PathBuf], output_path: &Path) -> MediaResult<()> {
        if crops.is_empty() {
            return Err(MediaError::encode_failed("Empty crop sequence"));
        }

        // Decode in parallel; the write below preserves sequence order.
        let frames: Vec<Mat> = crops
            .par_iter()
            .map(|path| {
                let path_str = path.to_str().ok_or_else(|| {
                    MediaError::invalid_video(format!("Non-UTF8 path: {}", path.display()))
                })?;
                let mat = imgcodecs::imread(path_str, imgcodecs::IMREAD_COLOR)?;
                if mat.empty() {
                    return Err(MediaError::FileNotFound(path.clone()));
                }
                Ok(mat)
            })
            .collect::<MediaResult<Vec<_>>>()?;

        let first = &frames[0];
        let size = Size::new(first.cols(), first.rows());

        if let Some(parent) = output_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let output_str = output_path.to_str().ok_or_else(|| {
            MediaError::invalid_video(format!("Non-UTF8 path: {}", output_path.display()))
        })?;

        let mut writer = VideoWriter::new(output_str, RAW_FOURCC, self.output_fps, size, true)?;
        if !writer.is_opened()? {
            return Err(MediaError::encode_failed(format!(
                "VideoWriter refused {}",
                output_path.display()
            )));
        }

        for frame in &frames {
            writer.write(frame)?;
        }
        writer.release()?;

        debug!(
            output = %output_path.display(),
            frames = frames.len(),
            fps = self.output_fps,
            "Sequence encoded"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gate_is_strict() {
        let assembler = SequenceAssembler::new(10, 1.0);
        assert!(!assembler.should_emit(0));
        assert!(!assembler.should_emit(9));
        assert!(!assembler.should_emit(10));
        assert!(assembler.should_emit(11));
    }

    #[test]
    fn test_output_file_name() {
        assert_eq!(output_file_name("v1"), "v1_extracted.avi");
        assert_eq!(output_file_name("clip.part"), "clip.part_extracted.avi");
    }

    #[test]
    fn test_assemble_rejects_empty_sequence() {
        let assembler = SequenceAssembler::new(10, 1.0);
        let err = assembler
            .assemble(&[], Path::new("/tmp/never-written.avi"))
            .unwrap_err();
        assert!(matches!(err, MediaError::EncodeFailed(_)));
    }
}
