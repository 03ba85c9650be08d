//! Error types for configuration, tables, arrays and label projects.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while locating, reading or validating configuration files.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found for session {session}: {}", .path.display())]
    NotFound { session: String, path: PathBuf },
    #[error("pipeline config not found: {}", .0.display())]
    PipelineNotFound(PathBuf),
    #[error("failed to access {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse {}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("failed to serialize config")]
    Serialize(#[from] toml::ser::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Errors raised by [`Table`](crate::Table) operations and CSV I/O.
#[derive(Debug, Error)]
pub enum TableError {
    #[error("csv error in {}", .path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("failed to write {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("column `{0}` not found")]
    MissingColumn(String),
    #[error("duplicate column `{0}`")]
    DuplicateColumn(String),
    #[error("column `{column}` has {found} rows, expected {expected}")]
    RaggedColumn {
        column: String,
        expected: usize,
        found: usize,
    },
    #[error("row count mismatch: left table has {left} rows, right table has {right}")]
    RowCountMismatch { left: usize, right: usize },
    #[error("invalid number `{value}` in column `{column}` at row {row}")]
    Parse {
        column: String,
        row: usize,
        value: String,
    },
}

/// Errors raised while reading, writing or reshaping numeric arrays.
#[derive(Debug, Error)]
pub enum ArrayError {
    #[error("failed to read array from {}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: ndarray_npy::ReadNpyError,
    },
    #[error("failed to write array to {}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: ndarray_npy::WriteNpyError,
    },
    #[error("no body parts configured")]
    NoBodyParts,
    #[error(
        "array with {elements} elements cannot be split into frames of {body_parts} body parts x 3"
    )]
    Indivisible { elements: usize, body_parts: usize },
    #[error("expected array shape {expected:?}, found {found:?}")]
    Shape {
        expected: Vec<usize>,
        found: Vec<usize>,
    },
    #[error(transparent)]
    Table(#[from] TableError),
}

/// Errors raised while loading or assembling 2D keypoint tracks.
#[derive(Debug, Error)]
pub enum TrackError {
    #[error(
        "cannot read {}: HDF5 support is not compiled in (rebuild with `--features hdf5`)",
        .path.display()
    )]
    Hdf5Unavailable { path: PathBuf },
    #[error("track file not found: {}", .path.display())]
    NotFound { path: PathBuf },
    #[error("analysis tracks in {} have shape {shape:?}, expected (tracks, 2, nodes, frames)", .path.display())]
    AnalysisShape { path: PathBuf, shape: Vec<usize> },
    #[error("track array has shape {0:?}, expected (cameras, frames, nodes, 2)")]
    Shape(Vec<usize>),
    #[error("camera {camera} has (frames, nodes) = {found:?}, expected {expected:?}")]
    CameraMismatch {
        camera: usize,
        expected: (usize, usize),
        found: (usize, usize),
    },
    #[error("no camera tracks to stack")]
    Empty,
    #[cfg(feature = "hdf5")]
    #[error("HDF5 error in {}", .path.display())]
    Hdf5 {
        path: PathBuf,
        #[source]
        source: hdf5::Error,
    },
}

/// Errors raised by skeleton and label-project files.
#[derive(Debug, Error)]
pub enum LabelError {
    #[error("failed to access {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid JSON in {}", .path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("bundled skeleton is invalid")]
    Bundled(#[source] serde_json::Error),
    #[error("skeleton has no nodes")]
    EmptySkeleton,
    #[error("skeleton edge references unknown node `{0}`")]
    UnknownNode(String),
    #[error("label file references node {index}, but only {nodes} nodes are listed")]
    NodeIndex { index: usize, nodes: usize },
    #[error("label file has no skeleton")]
    NoSkeleton,
}
