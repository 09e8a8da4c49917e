pub mod queue;
pub mod session;
pub mod store;
pub mod validator;

pub use queue::AnnotationQueue;
pub use session::{AnnotationSession, DragState, PointerPos, SessionOutcome, SessionState};
pub use store::{AnnotationStore, AnnotationWriter};
pub use validator::{IssueReason, ValidationIssue, ValidationResult, validate, validate_with};

use crate::models::Annotation;

/// Tally of an annotation run over a directory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnnotationSummary {
    pub annotated: usize,
    pub skipped: usize,
    pub dropped_boxes: usize,
}

impl AnnotationSummary {
    /// Count one outcome and hand back the annotation to persist, if any.
    pub fn record(&mut self, outcome: SessionOutcome) -> Option<Annotation> {
        match outcome {
            SessionOutcome::Confirmed {
                annotation,
                dropped,
            } => {
                self.dropped_boxes += dropped.len();
                match annotation {
                    Some(annotation) => {
                        self.annotated += 1;
                        Some(annotation)
                    }
                    None => {
                        self.skipped += 1;
                        None
                    }
                }
            }
            SessionOutcome::Skipped { .. } => {
                self.skipped += 1;
                None
            }
        }
    }
}

/// Append each confirmed annotation to `writer` as its outcome arrives.
///
/// Lines already written stay on disk if a later write fails.
pub fn write_outcomes<I>(outcomes: I, writer: &mut AnnotationWriter) -> anyhow::Result<AnnotationSummary>
where
    I: IntoIterator<Item = SessionOutcome>,
{
    let mut summary = AnnotationSummary::default();
    for outcome in outcomes {
        if let Some(annotation) = summary.record(outcome) {
            writer.append(&annotation)?;
        }
    }
    Ok(summary)
}
