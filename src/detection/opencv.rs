//! OpenCV-backed detector, camera and preview window.

use std::path::Path;

use anyhow::{Context, bail};
use image::{DynamicImage, RgbImage};
use opencv::{
    core::{self, Mat, Rect, Size, Vector},
    highgui, imgproc, objdetect,
    prelude::*,
    videoio,
};

use crate::config::DetectionParams;
use crate::detection::{FrameSource, ObjectDetector, Preview, PreviewControl, PreviewWait};
use crate::error::PipelineError;
use crate::models::BoundingBox;

/// Trained Haar cascade loaded through `objdetect`.
pub struct CascadeDetector {
    classifier: objdetect::CascadeClassifier,
    params: DetectionParams,
}

impl CascadeDetector {
    pub fn load(path: &Path, params: DetectionParams) -> anyhow::Result<Self> {
        if !path.exists() {
            bail!("Trained classifier not found: {}", path.display());
        }
        let classifier = objdetect::CascadeClassifier::new(
            path.to_str().context("Cascade path is invalid")?,
        )
        .context("Failed to load cascade")?;
        if classifier.empty()? {
            bail!("Cascade {} could not be parsed", path.display());
        }
        Ok(Self { classifier, params })
    }
}

impl ObjectDetector for CascadeDetector {
    fn detect(&mut self, image: &DynamicImage) -> anyhow::Result<Vec<BoundingBox>> {
        let gray = image.to_luma8();
        let (width, height) = gray.dimensions();
        let gray_mat = Mat::new_rows_cols_with_data(height as i32, width as i32, gray.as_raw())
            .context("Failed to wrap frame for OpenCV")?;

        let mut rects = Vector::<Rect>::new();
        let min = self.params.min_size as i32;
        self.classifier.detect_multi_scale(
            &*gray_mat,
            &mut rects,
            self.params.scale_factor,
            self.params.min_neighbors,
            0,
            Size::new(min, min),
            Size::default(),
        )?;

        Ok(rects
            .iter()
            .filter(|r| r.x >= 0 && r.y >= 0 && r.width > 0 && r.height > 0)
            .map(|r| BoundingBox::new(r.x as u32, r.y as u32, r.width as u32, r.height as u32))
            .collect())
    }
}

/// Convert a BGR frame into an RGB image.
fn mat_to_image(frame: &Mat) -> anyhow::Result<DynamicImage> {
    let mut rgb = Mat::default();
    imgproc::cvt_color(
        frame,
        &mut rgb,
        imgproc::COLOR_BGR2RGB,
        0,
        core::AlgorithmHint::ALGO_HINT_DEFAULT,
    )
    .context("Failed to convert frame to RGB")?;
    let rgb = if rgb.is_continuous() { rgb } else { rgb.try_clone()? };
    let bytes = rgb.data_bytes()?.to_vec();
    let image = RgbImage::from_raw(rgb.cols() as u32, rgb.rows() as u32, bytes)
        .context("Frame buffer has unexpected size")?;
    Ok(DynamicImage::ImageRgb8(image))
}

fn image_to_mat(image: &RgbImage) -> anyhow::Result<Mat> {
    let (width, height) = image.dimensions();
    let rgb = Mat::new_rows_cols_with_data(height as i32, (width * 3) as i32, image.as_raw())?
        .reshape(3, height as i32)?
        .try_clone()?;
    let mut bgr = Mat::default();
    imgproc::cvt_color(
        &rgb,
        &mut bgr,
        imgproc::COLOR_RGB2BGR,
        0,
        core::AlgorithmHint::ALGO_HINT_DEFAULT,
    )?;
    Ok(bgr)
}

/// Local camera read through `videoio`.
pub struct Camera {
    capture: videoio::VideoCapture,
    frame: Mat,
}

impl Camera {
    pub fn open(index: i32) -> anyhow::Result<Self> {
        let unavailable = || PipelineError::CameraUnavailable {
            source: format!("#{}", index),
        };
        let capture =
            videoio::VideoCapture::new(index, videoio::CAP_ANY).map_err(|_| unavailable())?;
        if !capture.is_opened().unwrap_or(false) {
            return Err(unavailable().into());
        }
        Ok(Self {
            capture,
            frame: Mat::default(),
        })
    }
}

impl FrameSource for Camera {
    fn read_frame(&mut self) -> anyhow::Result<Option<DynamicImage>> {
        if !self.capture.read(&mut self.frame)? || self.frame.empty() {
            return Ok(None);
        }
        Ok(Some(mat_to_image(&self.frame)?))
    }
}

impl Drop for Camera {
    fn drop(&mut self) {
        let _ = self.capture.release();
    }
}

/// `highgui` window; `q` quits a stream, any key dismisses a still image.
pub struct HighguiPreview {
    window: String,
}

impl HighguiPreview {
    pub fn new(window: impl Into<String>) -> anyhow::Result<Self> {
        let window = window.into();
        highgui::named_window(&window, highgui::WINDOW_AUTOSIZE)?;
        Ok(Self { window })
    }
}

impl Preview for HighguiPreview {
    fn show(&mut self, frame: &RgbImage, wait: PreviewWait) -> anyhow::Result<PreviewControl> {
        let bgr = image_to_mat(frame)?;
        highgui::imshow(&self.window, &bgr)?;
        let key = match wait {
            PreviewWait::UntilKey => highgui::wait_key(0)?,
            PreviewWait::Poll => highgui::wait_key(1)?,
        };
        if wait == PreviewWait::Poll && (key & 0xFF) == 'q' as i32 {
            return Ok(PreviewControl::Quit);
        }
        Ok(PreviewControl::Continue)
    }
}

impl Drop for HighguiPreview {
    fn drop(&mut self) {
        let _ = highgui::destroy_window(&self.window);
    }
}
