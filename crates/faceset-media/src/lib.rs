//! Face-sequence extraction pipeline.
//!
//! This crate provides:
//! - Video probing through OpenCV `videoio`
//! - Time-derived frame sampling with on-disk frame checkpoints
//! - YuNet face detection behind a pluggable detector trait
//! - Crop padding, resizing and blurring
//! - Quality-gated assembly of crop sequences into raw AVI output

pub mod assembler;
pub mod cropper;
pub mod detector;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod probe;
pub mod sampler;

pub use assembler::SequenceAssembler;
pub use cropper::FaceCropper;
pub use detector::{Detection, FaceDetector, SelectionStrategy, YuNetDetector};
pub use error::{MediaError, MediaResult};
pub use models::FaceBox;
pub use pipeline::{ExtractionConfig, PipelineOutcome, VideoPipeline};
pub use probe::{probe_video, VideoInfo};
pub use sampler::{sample_plan, FrameSampler, SampledFrame};
