use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::Context;
use image::ImageReader;
use tracing::{info, warn};

use crate::annotation::AnnotationStore;
use crate::error::PipelineError;
use crate::models::{Annotation, BoundingBox};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IssueReason {
    MalformedLine(String),
    InvalidImage(String),
    OutOfBounds {
        bbox: BoundingBox,
        width: u32,
        height: u32,
    },
}

impl fmt::Display for IssueReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IssueReason::MalformedLine(reason) => write!(f, "invalid format: {}", reason),
            IssueReason::InvalidImage(reason) => write!(f, "image not readable: {}", reason),
            IssueReason::OutOfBounds { bbox, width, height } => {
                write!(f, "box {} outside image {}x{}", bbox, width, height)
            }
        }
    }
}

/// A problem found on one line of the annotation file (1-based).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    pub line: usize,
    pub reason: IssueReason,
}

#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<ValidationIssue>,
    pub lines_checked: usize,
}

impl ValidationResult {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    /// Turn a failed validation into `ValidationFailed` so callers halt.
    pub fn into_result(self) -> anyhow::Result<Self> {
        if self.is_ok() {
            Ok(self)
        } else {
            Err(PipelineError::ValidationFailed {
                errors: self.errors.len(),
            }
            .into())
        }
    }
}

/// Reads an image's dimensions from its header, sniffing the format from the
/// contents the same way the annotator decodes it.
pub fn image_file_dimensions(path: &Path) -> anyhow::Result<(u32, u32)> {
    let invalid = |reason: String| PipelineError::InvalidImage {
        path: path.to_path_buf(),
        reason,
    };
    let dims = ImageReader::open(path)
        .map_err(|e| invalid(e.to_string()))?
        .with_guessed_format()
        .map_err(|e| invalid(e.to_string()))?
        .into_dimensions()
        .map_err(|e| invalid(e.to_string()))?;
    Ok(dims)
}

/// Validate the store against the real image files.
pub fn validate(store: &AnnotationStore) -> anyhow::Result<ValidationResult> {
    validate_with(store, image_file_dimensions)
}

/// Validate the store using `dimensions_of` to look up image dimensions.
///
/// Relative image paths are resolved against the store's directory, the same
/// way the sample packer resolves them.
pub fn validate_with<F>(store: &AnnotationStore, mut dimensions_of: F) -> anyhow::Result<ValidationResult>
where
    F: FnMut(&Path) -> anyhow::Result<(u32, u32)>,
{
    info!("Validating annotations in {}", store.path().display());

    let file = File::open(store.path())
        .with_context(|| format!("Failed to open annotation file {:?}", store.path()))?;
    let base_dir = store.dir();

    let mut result = ValidationResult::default();
    for (idx, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let line_no = idx + 1;
        result.lines_checked += 1;

        let annotation = match Annotation::parse_line(&line) {
            Ok(annotation) => annotation,
            Err(reason) => {
                warn!("Line {}: invalid format: {}", line_no, reason);
                result.errors.push(ValidationIssue {
                    line: line_no,
                    reason: IssueReason::MalformedLine(reason),
                });
                continue;
            }
        };

        let image_path = base_dir.join(&annotation.image_path);
        let (width, height) = match dimensions_of(&image_path) {
            Ok(dims) => dims,
            Err(e) => {
                warn!("Line {}: image not found: {}", line_no, annotation.image_path);
                result.errors.push(ValidationIssue {
                    line: line_no,
                    reason: IssueReason::InvalidImage(e.to_string()),
                });
                continue;
            }
        };

        for bbox in &annotation.boxes {
            if !bbox.fits_within(width, height) {
                warn!(
                    "Line {}: box out of bounds: {} {}",
                    line_no, annotation.image_path, bbox
                );
                result.errors.push(ValidationIssue {
                    line: line_no,
                    reason: IssueReason::OutOfBounds {
                        bbox: *bbox,
                        width,
                        height,
                    },
                });
            }
        }
    }

    if result.is_ok() {
        info!("All {} annotation(s) are valid", result.lines_checked);
    } else {
        warn!("{} error(s) found", result.errors.len());
    }
    Ok(result)
}
