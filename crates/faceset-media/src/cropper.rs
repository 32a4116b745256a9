//! Face crop post-processing.
//!
//! Crops the selected face out of a sampled frame with a margin of
//! `padding_ratio * box height` on all sides, stretches it to a fixed square
//! resolution (no letterboxing), smooths it with a small Gaussian blur and
//! writes it as a sequentially numbered PNG.

use image::imageops::{self, FilterType};
use image::RgbImage;
use opencv::core::{AlgorithmHint, Mat, Rect};
use opencv::imgproc;
use opencv::prelude::MatTraitConst;
use std::path::Path;

use crate::error::{MediaError, MediaResult};
use crate::models::FaceBox;

/// Compute the integer crop rectangle for a face.
///
/// The box is expanded by `padding_ratio * height` on all sides; if the
/// padded rectangle leaves the frame, the unpadded box is used instead.
/// (The detector already clamps boxes to the frame, so the fallback always
/// fits.)
pub fn padded_crop_rect(
    face: &FaceBox,
    frame_width: i32,
    frame_height: i32,
    padding_ratio: f64,
) -> Rect {
    let pad = (face.height * padding_ratio).trunc();
    let padded = face.pad(pad);

    let chosen = if padded.fits(frame_width, frame_height) {
        padded
    } else {
        *face
    };

    let x = (chosen.x.floor() as i32).clamp(0, frame_width.saturating_sub(1));
    let y = (chosen.y.floor() as i32).clamp(0, frame_height.saturating_sub(1));
    let width = (chosen.width.round() as i32).clamp(1, frame_width - x);
    let height = (chosen.height.round() as i32).clamp(1, frame_height - y);

    Rect::new(x, y, width, height)
}

/// Resize to `crop_size` × `crop_size` (non-aspect-preserving stretch), then
/// blur. Order matters: the blur radius is calibrated for the output
/// resolution.
pub fn postprocess(crop: RgbImage, crop_size: u32, blur_sigma: f32) -> RgbImage {
    let resized = imageops::resize(&crop, crop_size, crop_size, FilterType::Triangle);
    imageops::blur(&resized, blur_sigma)
}

/// Turns detected faces into fixed-size crop images on disk.
#[derive(Debug, Clone)]
pub struct FaceCropper {
    pub crop_size: u32,
    pub blur_sigma: f32,
    pub padding_ratio: f64,
}

impl FaceCropper {
    pub fn new(crop_size: u32, blur_sigma: f32, padding_ratio: f64) -> Self {
        Self {
            crop_size,
            blur_sigma,
            padding_ratio,
        }
    }

    /// Crop `face` out of `frame` and write the processed image to
    /// `out_path`.
    pub fn process(&self, frame: &Mat, face: &FaceBox, out_path: &Path) -> MediaResult<()> {
        if frame.cols() <= 0 || frame.rows() <= 0 {
            return Err(MediaError::invalid_video("Empty frame".to_string()));
        }
        let rect = padded_crop_rect(face, frame.cols(), frame.rows(), self.padding_ratio);

        let roi = Mat::roi(frame, rect)?;
        let crop = roi.try_clone()?;

        let mut rgb = Mat::default();
        imgproc::cvt_color(
            &crop,
            &mut rgb,
            imgproc::COLOR_BGR2RGB,
            0,
            AlgorithmHint::ALGO_HINT_DEFAULT,
        )?;

        if !rgb.is_continuous() {
            return Err(MediaError::invalid_video(
                "Crop buffer is not continuous".to_string(),
            ));
        }

        let buffer = rgb.data_bytes()?.to_vec();
        let img = RgbImage::from_raw(rect.width as u32, rect.height as u32, buffer)
            .ok_or_else(|| MediaError::invalid_video("Crop buffer size mismatch".to_string()))?;

        let processed = postprocess(img, self.crop_size, self.blur_sigma);
        processed.save(out_path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_padded_rect_interior_face() {
        // 100px-tall face well inside a 1000x1000 frame: pad = 10px each side
        let face = FaceBox::new(200.0, 300.0, 80.0, 100.0);
        let rect = padded_crop_rect(&face, 1000, 1000, 0.1);
        assert_eq!(rect.x, 190);
        assert_eq!(rect.y, 290);
        assert_eq!(rect.width, 100);
        assert_eq!(rect.height, 120);
    }

    #[test]
    fn test_padded_rect_falls_back_near_edge() {
        // Face touching the top-left corner: padding would go negative,
        // so the unpadded box is used.
        let face = FaceBox::new(0.0, 0.0, 50.0, 60.0);
        let rect = padded_crop_rect(&face, 1000, 1000, 0.1);
        assert_eq!(rect.x, 0);
        assert_eq!(rect.y, 0);
        assert_eq!(rect.width, 50);
        assert_eq!(rect.height, 60);
    }

    #[test]
    fn test_padded_rect_falls_back_near_bottom_right() {
        let face = FaceBox::new(950.0, 940.0, 50.0, 60.0);
        let rect = padded_crop_rect(&face, 1000, 1000, 0.1);
        assert_eq!(rect.x, 950);
        assert_eq!(rect.y, 940);
        assert_eq!(rect.width, 50);
        assert_eq!(rect.height, 60);
    }

    #[test]
    fn test_padded_rect_zero_ratio() {
        let face = FaceBox::new(10.0, 10.0, 20.0, 20.0);
        let rect = padded_crop_rect(&face, 100, 100, 0.0);
        assert_eq!((rect.x, rect.y, rect.width, rect.height), (10, 10, 20, 20));
    }

    #[test]
    fn test_postprocess_dimensions() {
        let crop = RgbImage::new(37, 61);
        let out = postprocess(crop, 128, 0.5);
        assert_eq!(out.dimensions(), (128, 128));

        // Output size is fixed regardless of whether the input is larger
        let crop = RgbImage::new(500, 220);
        let out = postprocess(crop, 128, 0.5);
        assert_eq!(out.dimensions(), (128, 128));
    }
}
