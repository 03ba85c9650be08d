//! External capabilities used by the stages.
//!
//! Every heavy step (training, tracking, triangulation, angle geometry, frame
//! selection, video probing and transcoding, plot rendering) sits behind a
//! small trait. The default implementations shell out to the usual tools;
//! tests swap in doubles that return canned artifacts.

use std::path::Path;

use anyhow::Result;
use mousepose_core::{
    SessionConfig, SuggestionParams, ToolsConfig, TrackArray, TrackStore, default_track_store,
};
use ndarray::ArrayD;
use serde::{Deserialize, Serialize};

pub mod anipose;
pub mod command;
pub mod ffmpeg;
pub mod sleap;
pub mod suggest;
pub mod svg;

pub use anipose::{CommandAngleCalculator, CommandTriangulator};
pub use command::ToolError;
pub use ffmpeg::{FfmpegConverter, FfprobeProbe};
pub use sleap::SleapCli;
pub use suggest::{CommandSuggester, StrideSuggester};
pub use svg::SvgPlotter;

// ─────────────────────────────────────────────────────────────────────────────
// Jobs
// ─────────────────────────────────────────────────────────────────────────────

/// Inputs of one training run.
#[derive(Debug, Clone, Copy)]
pub struct TrainJob<'a> {
    /// Training profile name (e.g. `single_instance.json`).
    pub profile: &'a str,
    pub labels: &'a Path,
    pub output_prefix: &'a Path,
}

/// Inputs of one inference run.
#[derive(Debug, Clone, Copy)]
pub struct TrackJob<'a> {
    pub video: &'a Path,
    pub model: &'a Path,
    pub output: &'a Path,
}

/// Inputs of one session's triangulation.
#[derive(Debug, Clone, Copy)]
pub struct TriangulationJob<'a> {
    pub session: &'a str,
    pub tracks: &'a TrackArray,
    pub config: &'a SessionConfig,
    pub config_path: &'a Path,
    /// Where command-based triangulators stage the 2D tracks.
    pub tracks_path: &'a Path,
    /// Where command-based triangulators expect their raw output.
    pub output_path: &'a Path,
}

/// Inputs of one session's angle computation.
#[derive(Debug, Clone, Copy)]
pub struct AngleJob<'a> {
    pub session: &'a str,
    pub config_path: &'a Path,
    pub points_csv: &'a Path,
    pub output: &'a Path,
}

/// Basic stream properties of a video.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VideoInfo {
    pub frames: u64,
    pub width: u32,
    pub height: u32,
    pub fps: Option<f64>,
}

/// One line of a [`Figure`].
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub name: String,
    /// `(x, y)` samples; a `NaN` y breaks the line.
    pub points: Vec<(f64, f64)>,
}

/// A single-axes line chart.
#[derive(Debug, Clone, PartialEq)]
pub struct Figure {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    /// Size in inches.
    pub width: f64,
    pub height: f64,
    /// Legend font size in points.
    pub legend_font_size: f64,
    pub series: Vec<Series>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Capabilities
// ─────────────────────────────────────────────────────────────────────────────

/// Trains a pose model from an annotation project.
pub trait Trainer {
    fn train(&self, job: &TrainJob<'_>) -> Result<()>;
}

/// Runs a trained model over a video.
pub trait Tracker {
    fn track(&self, job: &TrackJob<'_>) -> Result<()>;
}

/// Exports predictions to an analysis file holding a `tracks` array.
pub trait PredictionExporter {
    fn export_analysis(&self, predictions: &Path, output: &Path) -> Result<()>;
}

/// Multi-view triangulation of a session's 2D tracks.
pub trait Triangulator {
    fn triangulate(&self, job: &TriangulationJob<'_>) -> Result<ArrayD<f64>>;
}

/// Computes joint angles from a 3D point table, writing an angle CSV.
pub trait AngleCalculator {
    fn compute_angles(&self, job: &AngleJob<'_>) -> Result<()>;
}

/// Picks the frames of a video worth labeling.
pub trait FrameSuggester {
    fn suggest(&self, video: &Path, params: &SuggestionParams) -> Result<Vec<usize>>;
}

pub trait VideoProbe {
    fn probe(&self, video: &Path) -> Result<VideoInfo>;
}

pub trait VideoConverter {
    fn convert(&self, input: &Path, output: &Path) -> Result<()>;
}

/// Renders a figure to a file.
pub trait Plotter {
    fn plot(&self, figure: &Figure, output: &Path) -> Result<()>;
}

// ─────────────────────────────────────────────────────────────────────────────
// Toolbox
// ─────────────────────────────────────────────────────────────────────────────

/// The capability implementations used by a run.
///
/// Fields are public so individual tools can be replaced after construction.
pub struct Toolbox {
    pub trainer: Box<dyn Trainer>,
    pub tracker: Box<dyn Tracker>,
    pub exporter: Box<dyn PredictionExporter>,
    pub track_store: Box<dyn TrackStore>,
    pub triangulator: Box<dyn Triangulator>,
    pub angles: Box<dyn AngleCalculator>,
    pub suggester: Box<dyn FrameSuggester>,
    pub probe: Box<dyn VideoProbe>,
    pub converter: Box<dyn VideoConverter>,
    pub plotter: Box<dyn Plotter>,
}

impl Toolbox {
    /// Command-line backed tools as configured.
    pub fn from_config(tools: &ToolsConfig) -> Self {
        let sleap = SleapCli::from_config(tools);
        let probe = FfprobeProbe::new(&tools.ffprobe);
        let suggester: Box<dyn FrameSuggester> = match &tools.suggest {
            Some(spec) => Box::new(CommandSuggester::new(spec.clone())),
            None => Box::new(StrideSuggester::new(Box::new(probe.clone()))),
        };
        Self {
            trainer: Box::new(sleap.clone()),
            tracker: Box::new(sleap.clone()),
            exporter: Box::new(sleap),
            track_store: default_track_store(),
            triangulator: Box::new(CommandTriangulator::new(tools.triangulate.clone())),
            angles: Box::new(CommandAngleCalculator::new(tools.angles.clone())),
            suggester,
            probe: Box::new(probe),
            converter: Box::new(FfmpegConverter::new(&tools.ffmpeg)),
            plotter: Box::new(SvgPlotter::default()),
        }
    }
}

impl Default for Toolbox {
    fn default() -> Self {
        Self::from_config(&ToolsConfig::default())
    }
}
