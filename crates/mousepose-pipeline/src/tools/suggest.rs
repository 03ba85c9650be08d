//! Frame suggestion for annotation.

use std::path::Path;

use anyhow::{Context, Result};
use mousepose_core::{CommandSpec, SuggestionParams};

use super::command::{ToolError, command_from_spec, program_name, run_capture};
use super::{FrameSuggester, VideoProbe};

/// Evenly spaced frame indices: `per_video` frames at a fixed stride,
/// fewer when the video is shorter than that.
pub fn stride_frames(frames: u64, per_video: usize) -> Vec<usize> {
    if frames == 0 || per_video == 0 {
        return Vec::new();
    }
    let frames = frames as usize;
    let step = (frames / per_video).max(1);
    (0..frames).step_by(step).take(per_video).collect()
}

/// Stride sampling over the probed frame count.
pub struct StrideSuggester {
    probe: Box<dyn VideoProbe>,
}

impl StrideSuggester {
    pub fn new(probe: Box<dyn VideoProbe>) -> Self {
        Self { probe }
    }
}

impl FrameSuggester for StrideSuggester {
    fn suggest(&self, video: &Path, params: &SuggestionParams) -> Result<Vec<usize>> {
        let info = self.probe.probe(video)?;
        Ok(stride_frames(info.frames, params.per_video))
    }
}

/// Delegates to an external command printing a JSON array of frame indices.
///
/// Placeholders: `{video}`, `{per_video}`, `{scale}`, `{sample_method}`,
/// `{feature_type}`, `{n_clusters}`, `{per_cluster}`, `{n_components}` and
/// `{brisk_threshold}`.
#[derive(Debug, Clone)]
pub struct CommandSuggester {
    spec: CommandSpec,
}

impl CommandSuggester {
    pub fn new(spec: CommandSpec) -> Self {
        Self { spec }
    }
}

impl FrameSuggester for CommandSuggester {
    fn suggest(&self, video: &Path, params: &SuggestionParams) -> Result<Vec<usize>> {
        let command = command_from_spec(
            &self.spec,
            &[
                ("video", video.display().to_string()),
                ("per_video", params.per_video.to_string()),
                ("scale", params.scale.to_string()),
                ("sample_method", params.sample_method.as_str().to_string()),
                ("feature_type", params.feature_type.as_str().to_string()),
                ("n_clusters", params.n_clusters.to_string()),
                ("per_cluster", params.per_cluster.to_string()),
                ("n_components", params.n_components.to_string()),
                ("brisk_threshold", params.brisk_threshold.to_string()),
            ],
        );
        let program = program_name(&command);
        let stdout = run_capture(command)
            .with_context(|| format!("suggesting frames for {}", video.display()))?;
        let mut frames: Vec<usize> =
            serde_json::from_str(stdout.trim()).map_err(|err| ToolError::InvalidOutput {
                program,
                message: err.to_string(),
            })?;
        frames.sort_unstable();
        frames.dedup();
        Ok(frames)
    }
}
