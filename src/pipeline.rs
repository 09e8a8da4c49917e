use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, info};

use crate::annotation::{self, AnnotationStore};
use crate::config::PipelineConfig;
use crate::negatives::NegativeListBuilder;
use crate::training::{self, CascadeTrainer};

/// State shared by the stages of one training run.
///
/// Later stages read what earlier stages left here.
pub struct PipelineContext {
    pub config: PipelineConfig,
    pub trainer: Box<dyn CascadeTrainer>,
    pub verbose: bool,
    /// Set by the pack stage.
    pub sample_count: Option<usize>,
    /// Set by the train stage.
    pub cascade_path: Option<PathBuf>,
}

impl PipelineContext {
    pub fn new(config: PipelineConfig, trainer: Box<dyn CascadeTrainer>) -> Self {
        Self {
            config,
            trainer,
            verbose: false,
            sample_count: None,
            cascade_path: None,
        }
    }

    pub fn store(&self) -> AnnotationStore {
        AnnotationStore::new(self.config.layout.positives_file())
    }
}

/// One step of the training run.
pub trait PipelineStage {
    fn run(&self, context: &mut PipelineContext) -> Result<()>;

    /// Human-readable name for this stage (used in progress output)
    fn name(&self) -> &str;
}

/// Collects the positive annotations through the annotator window.
#[cfg(feature = "gui")]
pub struct AnnotateStage {
    /// Overrides the layout's positives directory.
    pub positives_dir: Option<PathBuf>,
}

#[cfg(feature = "gui")]
impl PipelineStage for AnnotateStage {
    fn run(&self, context: &mut PipelineContext) -> Result<()> {
        let dir = self
            .positives_dir
            .clone()
            .unwrap_or_else(|| context.config.layout.positives_dir());
        let summary = crate::gui::annotate_directory(&dir, &context.store())?;
        info!(
            "Annotated {} image(s), skipped {}, dropped {} box(es)",
            summary.annotated, summary.skipped, summary.dropped_boxes
        );
        Ok(())
    }

    fn name(&self) -> &str {
        "Annotate"
    }
}

pub struct NegativesStage;

impl PipelineStage for NegativesStage {
    fn run(&self, context: &mut PipelineContext) -> Result<()> {
        let layout = &context.config.layout;
        NegativeListBuilder::new(layout.negatives_dir()).build_into(&layout.negatives_file())?;
        Ok(())
    }

    fn name(&self) -> &str {
        "Negatives"
    }
}

/// Halts the run when the annotation file has any issue.
pub struct ValidateStage;

impl PipelineStage for ValidateStage {
    fn run(&self, context: &mut PipelineContext) -> Result<()> {
        let result = annotation::validate(&context.store())?;
        if context.verbose {
            for issue in &result.errors {
                println!("  line {}: {}", issue.line, issue.reason);
            }
        }
        result.into_result()?;
        Ok(())
    }

    fn name(&self) -> &str {
        "Validate"
    }
}

pub struct PackStage;

impl PipelineStage for PackStage {
    fn run(&self, context: &mut PipelineContext) -> Result<()> {
        let count = training::pack_samples(
            context.trainer.as_ref(),
            &context.store(),
            &context.config.training,
            &context.config.layout.vec_file(),
        )?;
        context.sample_count = Some(count);
        Ok(())
    }

    fn name(&self) -> &str {
        "Pack"
    }
}

pub struct TrainStage;

impl PipelineStage for TrainStage {
    fn run(&self, context: &mut PipelineContext) -> Result<()> {
        let sample_count = match context.sample_count {
            Some(count) => count,
            None => context.store().count_samples()?,
        };
        let layout = &context.config.layout;
        let cascade = training::train_cascade(
            context.trainer.as_ref(),
            &layout.vec_file(),
            &layout.negatives_file(),
            sample_count,
            &context.config.training,
            &layout.cascade_dir(),
        )?;
        context.cascade_path = Some(cascade);
        Ok(())
    }

    fn name(&self) -> &str {
        "Train"
    }
}

/// Composable training run
pub struct Pipeline {
    stages: Vec<Arc<dyn PipelineStage>>,
    verbose: bool,
}

impl Pipeline {
    pub fn new() -> Self {
        Self {
            stages: Vec::new(),
            verbose: false,
        }
    }

    /// Stages used by `train`: negatives, validate, pack, train.
    pub fn training() -> Self {
        Self::new()
            .add_stage_boxed(Box::new(NegativesStage))
            .add_stage_boxed(Box::new(ValidateStage))
            .add_stage_boxed(Box::new(PackStage))
            .add_stage_boxed(Box::new(TrainStage))
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn add_stage(mut self, stage: Arc<dyn PipelineStage>) -> Self {
        self.stages.push(stage);
        self
    }

    pub fn add_stage_boxed(mut self, stage: Box<dyn PipelineStage>) -> Self {
        self.stages.push(Arc::from(stage));
        self
    }

    /// Put `stage` in front of the others.
    pub fn prepend_stage_boxed(mut self, stage: Box<dyn PipelineStage>) -> Self {
        self.stages.insert(0, Arc::from(stage));
        self
    }

    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Run every stage in order, stopping at the first failure.
    pub fn run(&self, context: &mut PipelineContext) -> Result<()> {
        context.verbose = self.verbose;
        for (idx, stage) in self.stages.iter().enumerate() {
            info!(
                "Running stage {}/{}: {}",
                idx + 1,
                self.stages.len(),
                stage.name()
            );
            stage
                .run(context)
                .map_err(|e| e.context(format!("Stage '{}' failed", stage.name())))?;
            debug!("  done: {}", stage.name());
        }
        Ok(())
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}
