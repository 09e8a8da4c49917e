use std::fmt;
use std::path::PathBuf;
use std::process::ExitStatus;

use crate::models::BoundingBox;

/// Failure kinds the pipeline distinguishes.
///
/// These travel inside `anyhow::Error`; callers that need to react to a
/// specific kind use `err.downcast_ref::<PipelineError>()`.
#[derive(Debug)]
pub enum PipelineError {
    /// Image file could not be opened or decoded.
    InvalidImage { path: PathBuf, reason: String },
    /// Box extends past the right or bottom edge of its image.
    OutOfBoundsBox {
        bbox: BoundingBox,
        width: u32,
        height: u32,
    },
    /// Line of the annotation file does not follow the format.
    MalformedAnnotationLine { line: usize, reason: String },
    /// Not enough annotated images to pack samples.
    InsufficientSamples { found: usize, required: usize },
    /// Sample packer exited with a failure status.
    PackingFailed { status: Option<ExitStatus> },
    /// Cascade trainer exited with a failure status.
    TrainingFailed { status: Option<ExitStatus> },
    /// Remote image could not be fetched.
    DownloadFailed { url: String, reason: String },
    /// Camera or stream could not be opened.
    CameraUnavailable { source: String },
    /// The annotation file has validation errors.
    ValidationFailed { errors: usize },
}

fn describe_status(status: &Option<ExitStatus>) -> String {
    match status {
        Some(status) => match status.code() {
            Some(code) => format!("exit code {}", code),
            None => "terminated by signal".to_string(),
        },
        None => "could not be started".to_string(),
    }
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::InvalidImage { path, reason } => {
                write!(f, "Could not open image {}: {}", path.display(), reason)
            }
            PipelineError::OutOfBoundsBox { bbox, width, height } => write!(
                f,
                "Bounding box {} exceeds image bounds {}x{}",
                bbox, width, height
            ),
            PipelineError::MalformedAnnotationLine { line, reason } => {
                write!(f, "Malformed annotation on line {}: {}", line, reason)
            }
            PipelineError::InsufficientSamples { found, required } => write!(
                f,
                "At least {} samples are required for training, found {}",
                required, found
            ),
            PipelineError::PackingFailed { status } => {
                write!(f, "Sample packing failed ({})", describe_status(status))
            }
            PipelineError::TrainingFailed { status } => {
                write!(f, "Cascade training failed ({})", describe_status(status))
            }
            PipelineError::DownloadFailed { url, reason } => {
                write!(f, "Failed to download {}: {}", url, reason)
            }
            PipelineError::CameraUnavailable { source } => {
                write!(f, "Could not open camera {}", source)
            }
            PipelineError::ValidationFailed { errors } => {
                write!(f, "Annotation validation found {} error(s)", errors)
            }
        }
    }
}

impl std::error::Error for PipelineError {}

/// Pull the typed kind out of an `anyhow` chain, if there is one.
pub fn kind_of(err: &anyhow::Error) -> Option<&PipelineError> {
    err.chain().find_map(|e| e.downcast_ref::<PipelineError>())
}
