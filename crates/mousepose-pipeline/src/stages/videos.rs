//! Video processing: check, probe and convert each camera's recording.

use anyhow::{Result, bail};

use super::Step;
use crate::run::{PipelineRun, StageReport, Unit};

/// Verify every camera video and transcode it when the session asks for a
/// different output container.
pub fn step_videos(run: &PipelineRun) -> Result<StageReport> {
    run.run_units(Step::Videos, run.camera_units(), |unit| process_video(run, unit))
}

fn process_video(run: &PipelineRun, unit: &Unit) -> Result<String> {
    let (session, Some(camera)) = (unit.session.as_str(), unit.camera.as_deref()) else {
        bail!("video processing needs a camera");
    };
    let config = run.paths.load_session_config(session)?;
    let video = run.paths.video_path_for(&config, session, camera);
    if !video.is_file() {
        bail!("video not found: {}", video.display());
    }

    let info = run.tools.probe.probe(&video)?;
    if info.frames == 0 {
        bail!("{} has no frames", video.display());
    }
    let mut notes = format!("{} frames, {}x{}", info.frames, info.width, info.height);
    if let Some(fps) = info.fps {
        notes.push_str(&format!(" @ {fps:.2} fps"));
    }

    if config.needs_conversion() {
        let output = run.paths.output_video_path_for(&config, session, camera);
        run.tools.converter.convert(&video, &output)?;
        notes.push_str(&format!(", converted to {}", config.output_video_format));
    }
    Ok(notes)
}
