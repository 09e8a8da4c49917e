pub mod dedup;
pub mod report;
pub mod source;

#[cfg(feature = "opencv")]
pub mod opencv;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Context;
use image::{DynamicImage, RgbImage};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::dataset;
use crate::models::{BoundingBox, ReportEntry};
use crate::render;

pub use dedup::NoveltyFilter;
pub use report::DetectionReport;
pub use source::{ImageInput, LoadedImage};

/// Runs a trained classifier over one image.
pub trait ObjectDetector {
    fn detect(&mut self, image: &DynamicImage) -> anyhow::Result<Vec<BoundingBox>>;
}

/// A sequence of frames, e.g. a camera. `None` means the stream ended.
pub trait FrameSource {
    fn read_frame(&mut self) -> anyhow::Result<Option<DynamicImage>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreviewWait {
    /// Block until the operator presses a key (static images).
    UntilKey,
    /// Poll the keyboard once and move on (streams).
    Poll,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreviewControl {
    Continue,
    Quit,
}

/// Shows annotated frames to the operator and reports the quit key.
pub trait Preview {
    fn show(&mut self, frame: &RgbImage, wait: PreviewWait) -> anyhow::Result<PreviewControl>;
}

/// Preview that displays nothing and never asks to quit.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPreview;

impl Preview for NoPreview {
    fn show(&mut self, _frame: &RgbImage, _wait: PreviewWait) -> anyhow::Result<PreviewControl> {
        Ok(PreviewControl::Continue)
    }
}

/// Boxes found on one stream frame.
pub struct FrameDetections {
    pub index: u64,
    pub frame: DynamicImage,
    pub boxes: Vec<BoundingBox>,
}

/// Lazily pulls frames from a source and runs the detector on each.
pub struct DetectionStream<'a, D: ObjectDetector, S: FrameSource> {
    detector: &'a mut D,
    source: S,
    index: u64,
    done: bool,
}

impl<D: ObjectDetector, S: FrameSource> Iterator for DetectionStream<'_, D, S> {
    type Item = anyhow::Result<FrameDetections>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let frame = match self.source.read_frame() {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                self.done = true;
                return None;
            }
            Err(e) => {
                self.done = true;
                return Some(Err(e));
            }
        };
        self.index += 1;
        match self.detector.detect(&frame) {
            Ok(boxes) => Some(Ok(FrameDetections {
                index: self.index,
                frame,
                boxes,
            })),
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

/// Totals for a finished stream session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamSummary {
    pub frames: u64,
    pub detections: usize,
    pub novel: usize,
    pub saved_frames: Vec<PathBuf>,
    pub quit_by_operator: bool,
}

/// Applies a detector to images, directories and streams, optionally
/// saving annotated copies and appending to a report.
pub struct DetectorRunner<D: ObjectDetector> {
    detector: D,
    output_dir: Option<PathBuf>,
    report: Option<DetectionReport>,
    dedup_threshold: u32,
    verbose: bool,
}

impl<D: ObjectDetector> DetectorRunner<D> {
    pub fn new(detector: D) -> Self {
        Self {
            detector,
            output_dir: None,
            report: None,
            dedup_threshold: 30,
            verbose: false,
        }
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Save annotated images and stream frames into `dir`.
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    pub fn with_report(mut self, report: DetectionReport) -> Self {
        self.report = Some(report);
        self
    }

    pub fn with_dedup_threshold(mut self, threshold: u32) -> Self {
        self.dedup_threshold = threshold;
        self
    }

    pub fn detector_mut(&mut self) -> &mut D {
        &mut self.detector
    }

    /// Detect on a local image or a URL.
    pub fn detect_image(&mut self, input: &ImageInput) -> anyhow::Result<Vec<BoundingBox>> {
        self.detect_image_with(input, &mut NoPreview)
    }

    /// Like `detect_image`, then show the result and wait for a key.
    pub fn detect_image_with<P: Preview + ?Sized>(
        &mut self,
        input: &ImageInput,
        preview: &mut P,
    ) -> anyhow::Result<Vec<BoundingBox>> {
        let loaded = input.load()?;
        let boxes = self.detector.detect(&loaded.image)?;
        info!("{}: {} object(s) detected", loaded.name, boxes.len());
        if self.verbose {
            for (i, b) in boxes.iter().enumerate() {
                println!("  [{}] x={} y={} w={} h={}", i + 1, b.x, b.y, b.width, b.height);
            }
        }

        let annotated = render::annotate_detections(&loaded.image.to_rgb8(), &boxes);
        record(
            self.output_dir.as_deref(),
            self.report.as_mut(),
            &loaded.name,
            &annotated,
            &boxes,
            None,
        )?;
        preview.show(&annotated, PreviewWait::UntilKey)?;
        Ok(boxes)
    }

    /// Detect on every image directly inside `dir`, keyed by file name.
    ///
    /// Images that fail to load or detect are logged and left out.
    pub fn detect_directory(
        &mut self,
        dir: &Path,
    ) -> anyhow::Result<BTreeMap<String, Vec<BoundingBox>>> {
        self.detect_directory_with(dir, &mut NoPreview)
    }

    pub fn detect_directory_with<P: Preview + ?Sized>(
        &mut self,
        dir: &Path,
        preview: &mut P,
    ) -> anyhow::Result<BTreeMap<String, Vec<BoundingBox>>> {
        let images = dataset::list_images(dir)?;
        let mut results = BTreeMap::new();
        if images.is_empty() {
            warn!("No images found in {}", dir.display());
            return Ok(results);
        }

        for path in images {
            info!("Processing {}", path.display());
            let name = dataset::display_name(&path);
            match self.detect_image_with(&ImageInput::Path(path.clone()), preview) {
                Ok(boxes) => {
                    results.insert(name, boxes);
                }
                Err(e) => warn!("Skipping {}: {:#}", path.display(), e),
            }
        }
        Ok(results)
    }

    /// Frames from `source` with their detections, pulled on demand.
    pub fn detect_stream<S: FrameSource>(&mut self, source: S) -> DetectionStream<'_, D, S> {
        DetectionStream {
            detector: &mut self.detector,
            source,
            index: 0,
            done: false,
        }
    }

    /// Drive a stream until it ends or the operator quits.
    ///
    /// Detections whose center is close to an already recorded one are not
    /// counted again; frames that contain new objects are saved and logged.
    pub fn run_stream<S: FrameSource, P: Preview + ?Sized>(
        &mut self,
        source: S,
        preview: &mut P,
    ) -> anyhow::Result<StreamSummary> {
        let mut novelty = NoveltyFilter::new(self.dedup_threshold);
        let mut summary = StreamSummary::default();

        let stream = DetectionStream {
            detector: &mut self.detector,
            source,
            index: 0,
            done: false,
        };
        for item in stream {
            let FrameDetections { index, frame, boxes } = item?;
            summary.frames = index;
            summary.detections += boxes.len();

            let novel: Vec<BoundingBox> = boxes.iter().filter(|b| novelty.observe(b)).copied().collect();
            let annotated = render::annotate_detections(&frame.to_rgb8(), &boxes);

            if !novel.is_empty() {
                debug!("Frame {}: {} new object(s)", index, novel.len());
                summary.novel += novel.len();
                let name = format!("deteccao_{}.png", Uuid::new_v4());
                let saved = record(
                    self.output_dir.as_deref(),
                    self.report.as_mut(),
                    &name,
                    &annotated,
                    &novel,
                    Some(report::now()),
                )?;
                summary.saved_frames.extend(saved);
            }

            if preview.show(&annotated, PreviewWait::Poll)? == PreviewControl::Quit {
                summary.quit_by_operator = true;
                break;
            }
        }

        info!(
            "Stream finished after {} frame(s): {} detection(s), {} distinct object(s)",
            summary.frames, summary.detections, summary.novel
        );
        Ok(summary)
    }
}

/// Save the annotated image and append a report entry when configured.
fn record(
    output_dir: Option<&Path>,
    report: Option<&mut DetectionReport>,
    name: &str,
    annotated: &RgbImage,
    boxes: &[BoundingBox],
    timestamp: Option<time::OffsetDateTime>,
) -> anyhow::Result<Option<PathBuf>> {
    let mut saved = None;
    if let Some(dir) = output_dir {
        std::fs::create_dir_all(dir)?;
        let out = dir.join(output_file_name(name));
        annotated
            .save(&out)
            .with_context(|| format!("Failed to save {:?}", out))?;
        debug!("Saved {}", out.display());
        saved = Some(out);
    }

    if let Some(report) = report {
        let mut entry = ReportEntry::new(name, boxes.to_vec());
        if let Some(ts) = timestamp {
            entry = entry.with_timestamp(ts);
        }
        report.append(&entry)?;
    }
    Ok(saved)
}

/// Output file name for an annotated copy; keeps a known image extension.
fn output_file_name(name: &str) -> String {
    if dataset::is_image_file(Path::new(name)) {
        name.to_string()
    } else {
        format!("{}.png", name)
    }
}
