//! Core data model for the `mousepose` pipeline.
//!
//! This crate owns everything the pipeline stages exchange through the file
//! system:
//!
//! - configuration (`pipeline.toml` and per-session `config.toml`),
//! - the deterministic session layout ([`PathResolver`]),
//! - numeric tables with pandas-compatible CSV I/O ([`Table`]),
//! - `.npy` arrays and the 3D point → table hand-off ([`points_to_table`]),
//! - 2D keypoint tracks ([`TrackArray`], [`TrackStore`]),
//! - skeleton templates and annotation projects.
//!
//! No external tools are invoked here; see `mousepose-pipeline` for that.
//!
//! # Example
//!
//! ```no_run
//! use mousepose_core::{PathResolver, points_to_table, read_array};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let paths = PathResolver::new("/data/complete-projects");
//! let config = paths.load_session_config("m01_day1")?;
//! let points = read_array(&paths.points_3d_path("m01_day1"))?;
//! let table = points_to_table(&points, &config.labeling.bodyparts)?;
//! table.write_csv(&paths.points_csv_path("m01_day1"))?;
//! # Ok(())
//! # }
//! ```

/// Pipeline and session configuration.
pub mod config;
/// Error types.
pub mod error;
/// Annotation projects and frame-suggestion parameters.
pub mod labels;
/// Session file-system layout.
pub mod paths;
/// `.npy` I/O and the point table hand-off.
pub mod points;
/// Skeleton templates.
pub mod skeleton;
/// Numeric tables and CSV.
pub mod table;
/// 2D keypoint tracks.
pub mod tracks;

pub use config::{
    AnalysisConfig, CommandSpec, DEFAULT_ANGLE_COLUMNS, FailurePolicy, LabelingConfig,
    PipelineConfig, PlotWindow, SESSION_CONFIG_FILE, SessionConfig, ToolsConfig,
};
pub use error::{ArrayError, ConfigError, LabelError, TableError, TrackError};
pub use labels::{
    FeatureType, Instance, LabelProject, LabeledFrame, Point2, SLEAP_LABELS_VERSION, SampleMethod,
    SuggestionParams, VideoRef,
};
pub use paths::PathResolver;
pub use points::{FRAME_COLUMN, point_columns, points_to_table, read_array, write_array};
pub use skeleton::Skeleton;
pub use table::{Column, Table};
#[cfg(feature = "hdf5")]
pub use tracks::Hdf5TrackStore;
pub use tracks::{
    TRACKS_DATASET, TrackArray, TrackStore, UnavailableTrackStore, default_track_store,
};

/// Re-exported so callers can name array types without a direct dependency.
pub use ndarray;
