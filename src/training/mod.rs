pub mod opencv_tools;

use std::path::{Path, PathBuf};

use tracing::info;

use crate::annotation::AnnotationStore;
use crate::config::TrainingParams;
use crate::dataset;
use crate::error::PipelineError;

pub use opencv_tools::OpenCvTools;

/// Arguments for packing positives into a `.vec` file.
#[derive(Debug, Clone, PartialEq)]
pub struct PackRequest {
    /// Annotation file name, relative to `working_dir`.
    pub info_file: String,
    pub working_dir: PathBuf,
    pub sample_count: usize,
    pub width: u32,
    pub height: u32,
    pub vec_path: PathBuf,
}

/// Arguments for training the cascade.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainRequest {
    pub data_dir: PathBuf,
    pub vec_path: String,
    pub background_path: String,
    pub num_positive: usize,
    pub num_negative: u32,
    pub num_stages: u32,
    pub width: u32,
    pub height: u32,
    pub min_hit_rate: f64,
    pub max_false_alarm_rate: f64,
}

/// Something that can run the sample packer and the cascade trainer.
///
/// Both calls block until the tool is done. Implementations return
/// `PackingFailed` / `TrainingFailed` when the tool reports failure.
pub trait CascadeTrainer {
    fn pack(&self, request: &PackRequest) -> anyhow::Result<()>;

    /// Returns the path of the produced classifier.
    fn train(&self, request: &TrainRequest) -> anyhow::Result<PathBuf>;
}

/// Pack the annotated positives into `vec_path`.
///
/// Returns the number of samples packed.
pub fn pack_samples<T: CascadeTrainer + ?Sized>(
    trainer: &T,
    store: &AnnotationStore,
    params: &TrainingParams,
    vec_path: &Path,
) -> anyhow::Result<usize> {
    let sample_count = store.count_samples()?;
    if sample_count < params.min_samples {
        return Err(PipelineError::InsufficientSamples {
            found: sample_count,
            required: params.min_samples,
        }
        .into());
    }

    if let Some(parent) = vec_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let request = PackRequest {
        info_file: store.file_name(),
        working_dir: std::path::absolute(store.dir())?,
        sample_count,
        width: params.sample_width,
        height: params.sample_height,
        vec_path: std::path::absolute(vec_path)?,
    };
    trainer.pack(&request)?;

    info!("Packed {} sample(s) into {}", sample_count, vec_path.display());
    Ok(sample_count)
}

/// Train the cascade from a packed `.vec` and the negative manifest.
pub fn train_cascade<T: CascadeTrainer + ?Sized>(
    trainer: &T,
    vec_path: &Path,
    negatives_file: &Path,
    sample_count: usize,
    params: &TrainingParams,
    cascade_dir: &Path,
) -> anyhow::Result<PathBuf> {
    std::fs::create_dir_all(cascade_dir)?;

    let request = TrainRequest {
        data_dir: cascade_dir.to_path_buf(),
        vec_path: dataset::absolute_slash_path(vec_path)?,
        background_path: dataset::absolute_slash_path(negatives_file)?,
        num_positive: params.num_positive(sample_count),
        num_negative: params.num_negative,
        num_stages: params.num_stages,
        width: params.sample_width,
        height: params.sample_height,
        min_hit_rate: params.min_hit_rate,
        max_false_alarm_rate: params.max_false_alarm_rate,
    };
    let cascade = trainer.train(&request)?;

    info!("Haar cascade trained: {}", cascade.display());
    Ok(cascade)
}
