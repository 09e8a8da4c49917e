use std::path::PathBuf;
use std::process::Command;

use anyhow::Context;
use tracing::{info, warn};

use crate::config::ToolPaths;
use crate::error::PipelineError;
use crate::training::{CascadeTrainer, PackRequest, TrainRequest};

/// Runs `opencv_createsamples` and `opencv_traincascade` as child processes.
#[derive(Debug, Clone)]
pub struct OpenCvTools {
    createsamples: PathBuf,
    traincascade: PathBuf,
}

impl OpenCvTools {
    pub fn new(tools: &ToolPaths) -> Self {
        Self {
            createsamples: tools.createsamples.clone(),
            traincascade: tools.traincascade.clone(),
        }
    }

    pub fn pack_command(&self, request: &PackRequest) -> Command {
        let mut cmd = Command::new(&self.createsamples);
        cmd.arg("-info")
            .arg(&request.info_file)
            .arg("-num")
            .arg(request.sample_count.to_string())
            .arg("-w")
            .arg(request.width.to_string())
            .arg("-h")
            .arg(request.height.to_string())
            .arg("-vec")
            .arg(&request.vec_path)
            .current_dir(&request.working_dir);
        cmd
    }

    pub fn train_command(&self, request: &TrainRequest) -> Command {
        let mut cmd = Command::new(&self.traincascade);
        cmd.arg("-data")
            .arg(&request.data_dir)
            .arg("-vec")
            .arg(&request.vec_path)
            .arg("-bg")
            .arg(&request.background_path)
            .arg("-numPos")
            .arg(request.num_positive.to_string())
            .arg("-numNeg")
            .arg(request.num_negative.to_string())
            .arg("-numStages")
            .arg(request.num_stages.to_string())
            .arg("-w")
            .arg(request.width.to_string())
            .arg("-h")
            .arg(request.height.to_string())
            .arg("-maxFalseAlarmRate")
            .arg(request.max_false_alarm_rate.to_string())
            .arg("-minHitRate")
            .arg(request.min_hit_rate.to_string());
        cmd
    }
}

fn render_command(cmd: &Command) -> String {
    let mut parts = vec![cmd.get_program().to_string_lossy().to_string()];
    parts.extend(cmd.get_args().map(|a| a.to_string_lossy().to_string()));
    parts.join(" ")
}

impl CascadeTrainer for OpenCvTools {
    fn pack(&self, request: &PackRequest) -> anyhow::Result<()> {
        let mut cmd = self.pack_command(request);
        info!("Running: {}", render_command(&cmd));

        let status = match cmd.status() {
            Ok(status) => status,
            Err(e) => {
                warn!("Could not start {}: {}", self.createsamples.display(), e);
                return Err(anyhow::Error::from(PipelineError::PackingFailed { status: None }))
                    .with_context(|| format!("{} could not be started", self.createsamples.display()));
            }
        };
        if !status.success() {
            return Err(PipelineError::PackingFailed {
                status: Some(status),
            }
            .into());
        }
        Ok(())
    }

    fn train(&self, request: &TrainRequest) -> anyhow::Result<PathBuf> {
        let mut cmd = self.train_command(request);
        info!("Running: {}", render_command(&cmd));

        let status = match cmd.status() {
            Ok(status) => status,
            Err(e) => {
                warn!("Could not start {}: {}", self.traincascade.display(), e);
                return Err(anyhow::Error::from(PipelineError::TrainingFailed { status: None }))
                    .with_context(|| format!("{} could not be started", self.traincascade.display()));
            }
        };
        if !status.success() {
            return Err(PipelineError::TrainingFailed {
                status: Some(status),
            }
            .into());
        }

        let cascade = request.data_dir.join("cascade.xml");
        if !cascade.is_file() {
            return Err(anyhow::Error::from(PipelineError::TrainingFailed {
                status: Some(status),
            }))
            .with_context(|| format!("Trainer exited without writing {}", cascade.display()));
        }
        Ok(cascade)
    }
}
