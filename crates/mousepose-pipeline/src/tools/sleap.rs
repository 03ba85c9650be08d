//! SLEAP command-line tools.

use std::path::Path;
use std::process::Command;

use anyhow::{Context, Result};
use mousepose_core::ToolsConfig;

use super::command::run_checked;
use super::{PredictionExporter, TrackJob, Tracker, TrainJob, Trainer};

/// Training, inference and export through `sleap-train`, `sleap-track`
/// and `sleap-convert`.
#[derive(Debug, Clone)]
pub struct SleapCli {
    train: String,
    track: String,
    convert: String,
}

impl SleapCli {
    pub fn from_config(tools: &ToolsConfig) -> Self {
        Self {
            train: tools.sleap_train.clone(),
            track: tools.sleap_track.clone(),
            convert: tools.sleap_convert.clone(),
        }
    }

    pub fn train_command(&self, job: &TrainJob<'_>) -> Command {
        let mut command = Command::new(&self.train);
        command
            .arg(job.profile)
            .arg(job.labels)
            .arg("--output_prefix")
            .arg(job.output_prefix);
        command
    }

    /// Single-animal inference without identity tracking.
    pub fn track_command(&self, job: &TrackJob<'_>) -> Command {
        let mut command = Command::new(&self.track);
        command
            .arg(job.video)
            .arg("--model")
            .arg(job.model)
            .args(["--tracking.tracker", "none"])
            .arg("-o")
            .arg(job.output)
            .args(["--verbosity", "json", "--no-empty-frames"]);
        command
    }

    pub fn convert_command(&self, predictions: &Path, output: &Path) -> Command {
        let mut command = Command::new(&self.convert);
        command
            .args(["--format", "analysis", "-o"])
            .arg(output)
            .arg(predictions);
        command
    }
}

impl Default for SleapCli {
    fn default() -> Self {
        Self::from_config(&ToolsConfig::default())
    }
}

impl Trainer for SleapCli {
    fn train(&self, job: &TrainJob<'_>) -> Result<()> {
        run_checked(self.train_command(job))
            .with_context(|| format!("training on {}", job.labels.display()))
    }
}

impl Tracker for SleapCli {
    fn track(&self, job: &TrackJob<'_>) -> Result<()> {
        run_checked(self.track_command(job))
            .with_context(|| format!("tracking {}", job.video.display()))
    }
}

impl PredictionExporter for SleapCli {
    fn export_analysis(&self, predictions: &Path, output: &Path) -> Result<()> {
        run_checked(self.convert_command(predictions, output))
            .with_context(|| format!("exporting {}", predictions.display()))
    }
}
