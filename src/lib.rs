pub mod annotation;
pub mod config;
pub mod dataset;
pub mod detection;
pub mod error;
pub mod menu;
pub mod models;
pub mod negatives;
pub mod pipeline;
pub mod render;
pub mod training;

pub use annotation::{AnnotationSession, AnnotationStore, SessionOutcome, ValidationResult};
pub use config::{DetectionParams, PipelineConfig, ProjectLayout, ToolPaths, TrainingParams};
pub use detection::{DetectorRunner, FrameSource, ObjectDetector, Preview};
pub use error::PipelineError;
pub use models::{Annotation, BoundingBox, ReportEntry};
pub use negatives::{NegativeListBuilder, NegativeManifest};
pub use pipeline::{Pipeline, PipelineContext, PipelineStage};
pub use training::{CascadeTrainer, OpenCvTools};

#[cfg(feature = "gui")]
pub mod gui;
