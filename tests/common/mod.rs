mod fixtures;
pub use fixtures::*;

// Re-export commonly used types from cascadelab for tests
pub use cascadelab::annotation::{
    AnnotationQueue, AnnotationSession, AnnotationStore, DragState, IssueReason, PointerPos,
    SessionOutcome, SessionState, ValidationIssue, ValidationResult,
};
pub use cascadelab::config::{PipelineConfig, ProjectLayout, TrainingParams};
pub use cascadelab::detection::{
    DetectionReport, DetectorRunner, FrameSource, ImageInput, ObjectDetector, Preview,
    PreviewControl, PreviewWait,
};
pub use cascadelab::error::{PipelineError, kind_of};
pub use cascadelab::models::{Annotation, BoundingBox, ReportEntry};
pub use cascadelab::training::{CascadeTrainer, PackRequest, TrainRequest};
