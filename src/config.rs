use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

/// Where every artifact of a project lives, relative to `root`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectLayout {
    pub root: PathBuf,
    pub positives_dir: PathBuf,
    pub negatives_dir: PathBuf,
    pub annotations_dir: PathBuf,
    pub vec_dir: PathBuf,
    pub cascade_dir: PathBuf,
    pub results_dir: PathBuf,
}

impl Default for ProjectLayout {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            positives_dir: PathBuf::from("dataset/positives"),
            negatives_dir: PathBuf::from("dataset/negatives"),
            annotations_dir: PathBuf::from("annotations"),
            vec_dir: PathBuf::from("vec"),
            cascade_dir: PathBuf::from("cascade"),
            results_dir: PathBuf::from("resultados"),
        }
    }
}

impl ProjectLayout {
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }

    fn resolve(&self, rel: &Path) -> PathBuf {
        self.root.join(rel)
    }

    pub fn positives_dir(&self) -> PathBuf {
        self.resolve(&self.positives_dir)
    }

    pub fn negatives_dir(&self) -> PathBuf {
        self.resolve(&self.negatives_dir)
    }

    pub fn annotations_dir(&self) -> PathBuf {
        self.resolve(&self.annotations_dir)
    }

    pub fn positives_file(&self) -> PathBuf {
        self.annotations_dir().join("positives.txt")
    }

    pub fn negatives_file(&self) -> PathBuf {
        self.annotations_dir().join("negatives.txt")
    }

    pub fn vec_file(&self) -> PathBuf {
        self.resolve(&self.vec_dir).join("positives.vec")
    }

    pub fn cascade_dir(&self) -> PathBuf {
        self.resolve(&self.cascade_dir)
    }

    pub fn cascade_file(&self) -> PathBuf {
        self.cascade_dir().join("cascade.xml")
    }

    pub fn results_dir(&self) -> PathBuf {
        self.resolve(&self.results_dir)
    }

    pub fn report_file(&self) -> PathBuf {
        self.results_dir().join("relatorio.txt")
    }
}

/// Parameters handed to the external packer and trainer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingParams {
    pub sample_width: u32,
    pub sample_height: u32,
    pub num_negative: u32,
    pub num_stages: u32,
    pub min_hit_rate: f64,
    pub max_false_alarm_rate: f64,
    /// Subtracted from the sample count to get `-numPos`; the trainer consumes
    /// a few extra positives per stage beyond the requested number.
    pub positive_margin: usize,
    pub min_samples: usize,
}

impl Default for TrainingParams {
    fn default() -> Self {
        Self {
            sample_width: 50,
            sample_height: 50,
            num_negative: 200,
            num_stages: 10,
            min_hit_rate: 0.995,
            max_false_alarm_rate: 0.5,
            positive_margin: 1,
            min_samples: 5,
        }
    }
}

impl TrainingParams {
    /// `-numPos` for a given number of packed samples, never below one.
    pub fn num_positive(&self, sample_count: usize) -> usize {
        sample_count.saturating_sub(self.positive_margin).max(1)
    }
}

/// Parameters for running a trained cascade.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionParams {
    pub scale_factor: f64,
    pub min_neighbors: i32,
    pub min_size: u32,
    /// Max per-axis center distance (pixels) for two stream detections to be
    /// considered the same object.
    pub dedup_threshold: u32,
    pub camera_index: i32,
}

impl Default for DetectionParams {
    fn default() -> Self {
        Self {
            scale_factor: 1.1,
            min_neighbors: 5,
            min_size: 50,
            dedup_threshold: 30,
            camera_index: 0,
        }
    }
}

/// Locations of the OpenCV command-line tools.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolPaths {
    pub createsamples: PathBuf,
    pub traincascade: PathBuf,
}

impl Default for ToolPaths {
    fn default() -> Self {
        Self {
            createsamples: PathBuf::from("opencv_createsamples"),
            traincascade: PathBuf::from("opencv_traincascade"),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub layout: ProjectLayout,
    pub training: TrainingParams,
    pub detection: DetectionParams,
    pub tools: ToolPaths,
}

impl PipelineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a JSON config file; missing fields fall back to defaults.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {:?}", path))?;
        let config = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse config {:?}", path))?;
        Ok(config)
    }

    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.layout = self.layout.with_root(root);
        self
    }

    pub fn with_training(mut self, training: TrainingParams) -> Self {
        self.training = training;
        self
    }

    pub fn with_detection(mut self, detection: DetectionParams) -> Self {
        self.detection = detection;
        self
    }

    pub fn with_tools(mut self, tools: ToolPaths) -> Self {
        self.tools = tools;
        self
    }
}
