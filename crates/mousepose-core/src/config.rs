//! Pipeline and per-session configuration.
//!
//! Two TOML files drive a run:
//!
//! - `pipeline.toml` ([`PipelineConfig`]): where sessions live, which sessions
//!   and cameras to process, external tool commands and analysis policy.
//! - `{base}/{session}/config.toml` ([`SessionConfig`]): video location and
//!   format plus the labeling body parts. The same file is handed to the
//!   external triangulation and angle tools, so keys this crate does not know
//!   about are preserved.

use std::collections::BTreeSet;
use std::fs;
use std::ops::Range;
use std::path::{Path, PathBuf};

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// File name of the per-session configuration.
pub const SESSION_CONFIG_FILE: &str = "config.toml";

/// Joint-angle columns kept in the combined table and plotted.
pub const DEFAULT_ANGLE_COLUMNS: [&str; 6] = [
    "left_elbow_angle",
    "right_elbow_angle",
    "left_knee_angle",
    "right_knee_angle",
    "left_ankle_angle",
    "right_ankle_angle",
];

// ─────────────────────────────────────────────────────────────────────────────
// Session configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Per-session configuration (`config.toml`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Directory holding `{session}_{camera}.{video_format}` files.
    pub video_dir: PathBuf,
    /// Extension of the raw videos (without the dot).
    pub video_format: String,
    /// Extension of the processed videos written next to the annotations.
    pub output_video_format: String,
    /// Labeling section shared with anipose.
    pub labeling: LabelingConfig,
    /// Keys consumed only by external tools (calibration, filters, angles).
    #[serde(flatten)]
    pub extra: toml::Table,
}

/// `[labeling]` section of a session config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelingConfig {
    /// Ordered body-part names; the order defines the 3D point columns.
    pub bodyparts: Vec<String>,
    #[serde(flatten)]
    pub extra: toml::Table,
}

impl SessionConfig {
    /// Template written by project setup when a session has no config yet.
    pub fn template(video_dir: impl Into<PathBuf>, bodyparts: Vec<String>) -> Self {
        Self {
            video_dir: video_dir.into(),
            video_format: "mp4".to_string(),
            output_video_format: "mp4".to_string(),
            labeling: LabelingConfig {
                bodyparts,
                extra: toml::Table::new(),
            },
            extra: toml::Table::new(),
        }
    }

    /// Read and parse a session config.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read and
    /// [`ConfigError::Parse`] if it is not a valid session config.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Serialize and write the config to `path`.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let text = toml::to_string_pretty(self)?;
        fs::write(path, text).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Number of labeled body parts.
    pub fn body_part_count(&self) -> usize {
        self.labeling.bodyparts.len()
    }

    /// Whether processed videos use a different container than the raw ones.
    pub fn needs_conversion(&self) -> bool {
        !self
            .video_format
            .eq_ignore_ascii_case(&self.output_video_format)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Pipeline configuration
// ─────────────────────────────────────────────────────────────────────────────

/// What a stage does when one of its sessions (or cameras) fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Record the failure and continue with the remaining units.
    #[default]
    Isolate,
    /// Abort the stage, and with it the run, on the first failure.
    FailFast,
}

/// Half-open row window `[start, end)` of the angle table to plot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlotWindow {
    pub start: usize,
    pub end: usize,
}

impl Default for PlotWindow {
    fn default() -> Self {
        Self {
            start: 400,
            end: 500,
        }
    }
}

impl PlotWindow {
    /// Clamp the window to a table with `rows` rows.
    ///
    /// Returns the usable range and whether it had to be shrunk.
    pub fn clamp(&self, rows: usize) -> (Range<usize>, bool) {
        let start = self.start.min(rows);
        let end = self.end.min(rows).max(start);
        (start..end, start != self.start || end != self.end)
    }
}

/// Analysis policy: which angles to keep and how to plot them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Angle columns selected from the angle table.
    pub angle_columns: Vec<String>,
    /// Rows of the angle table shown in the plot.
    pub plot_window: PlotWindow,
    /// Figure width in inches.
    pub plot_width: f64,
    /// Figure height in inches.
    pub plot_height: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            angle_columns: DEFAULT_ANGLE_COLUMNS.iter().map(|s| s.to_string()).collect(),
            plot_window: PlotWindow::default(),
            plot_width: 10.0,
            plot_height: 6.0,
        }
    }
}

/// An external command line with `{placeholder}` arguments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandSpec {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>, args: &[&str]) -> Self {
        Self {
            program: program.into(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }

    /// Substitute `{name}` placeholders in every argument.
    ///
    /// Placeholders without a matching variable are left untouched.
    pub fn render_args(&self, vars: &[(&str, String)]) -> Vec<String> {
        self.args
            .iter()
            .map(|arg| {
                vars.iter().fold(arg.clone(), |acc, (name, value)| {
                    acc.replace(&format!("{{{name}}}"), value)
                })
            })
            .collect()
    }
}

/// Programs and command templates for the external tools.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub sleap_train: String,
    pub sleap_track: String,
    pub sleap_convert: String,
    /// Training profile handed to `sleap-train`.
    pub training_profile: String,
    pub ffprobe: String,
    pub ffmpeg: String,
    /// Triangulation command; placeholders `{session}`, `{tracks}`, `{config}`, `{output}`.
    pub triangulate: CommandSpec,
    /// Angle command; placeholders `{session}`, `{config}`, `{points}`, `{output}`.
    pub angles: CommandSpec,
    /// Optional frame-suggestion command printing a JSON array of frame indices.
    pub suggest: Option<CommandSpec>,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            sleap_train: "sleap-train".to_string(),
            sleap_track: "sleap-track".to_string(),
            sleap_convert: "sleap-convert".to_string(),
            training_profile: "single_instance.json".to_string(),
            ffprobe: "ffprobe".to_string(),
            ffmpeg: "ffmpeg".to_string(),
            triangulate: CommandSpec::new(
                "anipose-triangulate",
                &["{tracks}", "{config}", "{output}"],
            ),
            angles: CommandSpec::new("anipose-angles", &["{config}", "{points}", "{output}"]),
            suggest: None,
        }
    }
}

/// Top-level pipeline configuration (`pipeline.toml`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Directory containing every session folder.
    pub base_dir: PathBuf,
    #[serde(default)]
    pub sessions: Vec<String>,
    #[serde(default)]
    pub cameras: Vec<String>,
    #[serde(default)]
    pub failure_policy: FailurePolicy,
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub tools: ToolsConfig,
}

impl PipelineConfig {
    /// Configuration with defaults for everything but the base directory.
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            sessions: Vec::new(),
            cameras: Vec::new(),
            failure_policy: FailurePolicy::default(),
            analysis: AnalysisConfig::default(),
            tools: ToolsConfig::default(),
        }
    }

    pub fn with_sessions<S: Into<String>>(mut self, sessions: impl IntoIterator<Item = S>) -> Self {
        self.sessions = sessions.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_cameras<S: Into<String>>(mut self, cameras: impl IntoIterator<Item = S>) -> Self {
        self.cameras = cameras.into_iter().map(Into::into).collect();
        self
    }

    /// Load a pipeline config. A relative `base_dir` is resolved against the
    /// directory containing the config file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::PipelineNotFound`] if `path` does not exist,
    /// a parse error, or [`ConfigError::Invalid`] if validation fails.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::PipelineNotFound(path.to_path_buf()));
        }
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_toml_str(&text).map_err(|err| match err {
            ConfigError::Parse { source, .. } => ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })?;
        if config.base_dir.is_relative() {
            if let Some(parent) = path.parent() {
                let rebased = parent.join(&config.base_dir);
                debug!(
                    "base_dir {} is relative, using {}",
                    config.base_dir.display(),
                    rebased.display()
                );
                config.base_dir = rebased;
            }
        }
        Ok(config)
    }

    /// Parse and validate a pipeline config from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: PathBuf::from("<inline>"),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check invariants that serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_unique("session", &self.sessions)?;
        check_unique("camera", &self.cameras)?;
        if self.analysis.angle_columns.is_empty() {
            return Err(ConfigError::Invalid(
                "analysis.angle_columns must not be empty".to_string(),
            ));
        }
        let window = self.analysis.plot_window;
        if window.start >= window.end {
            return Err(ConfigError::Invalid(format!(
                "analysis.plot_window start ({}) must be below end ({})",
                window.start, window.end
            )));
        }
        if !(self.analysis.plot_width > 0.0 && self.analysis.plot_height > 0.0) {
            return Err(ConfigError::Invalid(
                "analysis plot size must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

fn check_unique(kind: &str, names: &[String]) -> Result<(), ConfigError> {
    let mut seen = BTreeSet::new();
    for name in names {
        if name.trim().is_empty() {
            return Err(ConfigError::Invalid(format!("empty {kind} name")));
        }
        if !seen.insert(name.as_str()) {
            return Err(ConfigError::Invalid(format!("duplicate {kind} `{name}`")));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SESSION_TOML: &str = r#"
video_dir = "/data/videos"
video_format = "avi"
output_video_format = "mp4"

[labeling]
bodyparts = ["nose", "neck", "hip"]
scheme = [["nose", "neck"], ["neck", "hip"]]

[triangulation]
cam_regex = "cam_([a-z])"
"#;

    #[test]
    fn session_config_keeps_unknown_keys() {
        let config: SessionConfig = toml::from_str(SESSION_TOML).unwrap();
        assert_eq!(config.video_format, "avi");
        assert_eq!(config.body_part_count(), 3);
        assert!(config.needs_conversion());
        assert!(config.extra.contains_key("triangulation"));
        assert!(config.labeling.extra.contains_key("scheme"));

        let text = toml::to_string(&config).unwrap();
        let back: SessionConfig = toml::from_str(&text).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn pipeline_config_defaults() {
        let config = PipelineConfig::from_toml_str(
            r#"
base_dir = "/data/projects"
sessions = ["s1", "s2"]
cameras = ["cam_a", "cam_b"]
"#,
        )
        .unwrap();
        assert_eq!(config.failure_policy, FailurePolicy::Isolate);
        assert_eq!(config.analysis.angle_columns.len(), 6);
        assert_eq!(config.analysis.plot_window, PlotWindow { start: 400, end: 500 });
        assert_eq!(config.tools.training_profile, "single_instance.json");
        assert!(config.tools.suggest.is_none());
    }

    #[test]
    fn pipeline_config_overrides() {
        let config = PipelineConfig::from_toml_str(
            r#"
base_dir = "/data/projects"
sessions = ["s1"]
failure_policy = "fail_fast"

[analysis]
angle_columns = ["left_knee_angle"]
plot_window = { start = 0, end = 50 }

[tools.suggest]
program = "python"
args = ["suggest.py", "{video}"]
"#,
        )
        .unwrap();
        assert_eq!(config.failure_policy, FailurePolicy::FailFast);
        assert_eq!(config.analysis.angle_columns, vec!["left_knee_angle"]);
        assert_eq!(config.analysis.plot_width, 10.0);
        assert_eq!(config.tools.suggest.unwrap().program, "python");
    }

    #[test]
    fn pipeline_config_rejects_duplicates_and_bad_window() {
        let dup = PipelineConfig::from_toml_str(
            "base_dir = \"/x\"\nsessions = [\"s1\", \"s1\"]\n",
        );
        assert!(matches!(dup, Err(ConfigError::Invalid(_))));

        let window = PipelineConfig::from_toml_str(
            "base_dir = \"/x\"\n[analysis]\nplot_window = { start = 10, end = 10 }\n",
        );
        assert!(matches!(window, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn pipeline_config_resolves_relative_base_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pipeline.toml");
        fs::write(&path, "base_dir = \"projects\"\nsessions = [\"s1\"]\n").unwrap();
        let config = PipelineConfig::from_file(&path).unwrap();
        assert_eq!(config.base_dir, dir.path().join("projects"));

        let missing = PipelineConfig::from_file(&dir.path().join("nope.toml"));
        assert!(matches!(missing, Err(ConfigError::PipelineNotFound(_))));
    }

    #[test]
    fn plot_window_clamps() {
        let window = PlotWindow::default();
        assert_eq!(window.clamp(1000), (400..500, false));
        assert_eq!(window.clamp(450), (400..450, true));
        assert_eq!(window.clamp(100), (100..100, true));
    }

    #[test]
    fn command_spec_renders_placeholders() {
        let spec = CommandSpec::new("tri", &["--in={tracks}", "{config}", "{unknown}"]);
        let args = spec.render_args(&[
            ("tracks", "/a/t.npy".to_string()),
            ("config", "/a/config.toml".to_string()),
        ]);
        assert_eq!(args, vec!["--in=/a/t.npy", "/a/config.toml", "{unknown}"]);
    }
}
