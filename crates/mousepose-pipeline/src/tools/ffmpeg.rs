//! Video probing and transcoding with ffprobe/ffmpeg.

use std::path::Path;
use std::process::Command;

use anyhow::{Context, Result};
use serde::Deserialize;

use super::command::{ToolError, run_capture, run_checked};
use super::{VideoConverter, VideoInfo, VideoProbe};

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    nb_frames: Option<String>,
    nb_read_packets: Option<String>,
}

/// Parse `ffprobe -of json` output for the first video stream.
///
/// The frame count prefers `nb_read_packets` (exact, requires
/// `-count_packets`) over the container's `nb_frames`.
pub fn parse_ffprobe_json(json: &str) -> Result<VideoInfo, String> {
    let output: ProbeOutput = serde_json::from_str(json).map_err(|e| e.to_string())?;
    let stream = output
        .streams
        .into_iter()
        .next()
        .ok_or_else(|| "no video stream".to_string())?;
    let frames = stream
        .nb_read_packets
        .as_deref()
        .or(stream.nb_frames.as_deref())
        .and_then(|n| n.trim().parse::<u64>().ok())
        .ok_or_else(|| "frame count unavailable".to_string())?;
    Ok(VideoInfo {
        frames,
        width: stream.width.unwrap_or(0),
        height: stream.height.unwrap_or(0),
        fps: stream.r_frame_rate.as_deref().and_then(parse_rate),
    })
}

/// `"30000/1001"` or `"30"` to frames per second.
fn parse_rate(rate: &str) -> Option<f64> {
    match rate.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.trim().parse().ok()?;
            let den: f64 = den.trim().parse().ok()?;
            (den != 0.0).then(|| num / den)
        }
        None => rate.trim().parse().ok(),
    }
}

/// Probes videos with `ffprobe`.
#[derive(Debug, Clone)]
pub struct FfprobeProbe {
    program: String,
}

impl FfprobeProbe {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn probe_command(&self, video: &Path) -> Command {
        let mut command = Command::new(&self.program);
        command
            .args(["-v", "error", "-select_streams", "v:0", "-count_packets"])
            .args([
                "-show_entries",
                "stream=width,height,r_frame_rate,nb_frames,nb_read_packets",
            ])
            .args(["-of", "json"])
            .arg(video);
        command
    }
}

impl VideoProbe for FfprobeProbe {
    fn probe(&self, video: &Path) -> Result<VideoInfo> {
        let stdout = run_capture(self.probe_command(video))
            .with_context(|| format!("probing {}", video.display()))?;
        let info = parse_ffprobe_json(&stdout)
            .map_err(|message| ToolError::InvalidOutput {
                program: self.program.clone(),
                message,
            })
            .with_context(|| format!("probing {}", video.display()))?;
        Ok(info)
    }
}

/// Transcodes videos with `ffmpeg`, letting it infer the codec from the
/// output extension.
#[derive(Debug, Clone)]
pub struct FfmpegConverter {
    program: String,
}

impl FfmpegConverter {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn convert_command(&self, input: &Path, output: &Path) -> Command {
        let mut command = Command::new(&self.program);
        command
            .args(["-y", "-loglevel", "error", "-i"])
            .arg(input)
            .arg(output);
        command
    }
}

impl VideoConverter for FfmpegConverter {
    fn convert(&self, input: &Path, output: &Path) -> Result<()> {
        run_checked(self.convert_command(input, output))
            .with_context(|| format!("converting {}", input.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::command::render;

    #[test]
    fn parses_counted_packets() {
        let json = r#"{
            "programs": [],
            "streams": [{
                "width": 1280,
                "height": 1024,
                "r_frame_rate": "30000/1001",
                "nb_frames": "1200",
                "nb_read_packets": "1198"
            }]
        }"#;
        let info = parse_ffprobe_json(json).unwrap();
        assert_eq!(info.frames, 1198);
        assert_eq!((info.width, info.height), (1280, 1024));
        let fps = info.fps.unwrap();
        assert!((fps - 29.97).abs() < 1e-2);
    }

    #[test]
    fn falls_back_to_container_frame_count() {
        let json = r#"{"streams": [{"width": 640, "height": 480, "nb_frames": "300"}]}"#;
        let info = parse_ffprobe_json(json).unwrap();
        assert_eq!(info.frames, 300);
        assert_eq!(info.fps, None);
    }

    #[test]
    fn missing_stream_or_count_is_rejected() {
        assert!(parse_ffprobe_json(r#"{"streams": []}"#).is_err());
        assert!(parse_ffprobe_json(r#"{"streams": [{"width": 1}]}"#).is_err());
        assert!(parse_ffprobe_json("not json").is_err());
    }

    #[test]
    fn frame_rates() {
        assert_eq!(parse_rate("30/1"), Some(30.0));
        assert_eq!(parse_rate("25"), Some(25.0));
        assert_eq!(parse_rate("0/0"), None);
    }

    #[test]
    fn ffmpeg_overwrites_output() {
        let converter = FfmpegConverter::new("ffmpeg");
        let command = converter.convert_command(Path::new("in.avi"), Path::new("out.mp4"));
        assert_eq!(render(&command), "ffmpeg -y -loglevel error -i in.avi out.mp4");
    }
}
