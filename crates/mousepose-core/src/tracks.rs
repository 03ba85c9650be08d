//! 2D keypoint tracks produced by pose estimation.
//!
//! SLEAP analysis files store `tracks` as `(n_tracks, 2, n_nodes, n_frames)`.
//! The pipeline works with a single animal, so the first track is kept and
//! transposed to `(frames, nodes, 2)`. Per-camera tracks of a session are then
//! stacked into a [`TrackArray`] of shape `(cameras, frames, nodes, 2)`, which
//! is what the session's pose-estimation file holds.

use std::path::Path;

use ndarray::{Array3, Array4, ArrayView4, Axis};

use crate::error::TrackError;

/// Name of the dataset holding the tracks in HDF5 files.
pub const TRACKS_DATASET: &str = "tracks";

/// All cameras' 2D tracks of one session: `(cameras, frames, nodes, 2)`.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackArray {
    data: Array4<f64>,
}

impl TrackArray {
    pub fn new(data: Array4<f64>) -> Result<Self, TrackError> {
        if data.shape()[3] != 2 {
            return Err(TrackError::Shape(data.shape().to_vec()));
        }
        Ok(Self { data })
    }

    /// Stack per-camera `(frames, nodes, 2)` arrays along a new camera axis.
    ///
    /// Every camera must report the same number of frames and nodes.
    pub fn stack(cameras: &[Array3<f64>]) -> Result<Self, TrackError> {
        let first = cameras.first().ok_or(TrackError::Empty)?;
        let expected = (first.shape()[0], first.shape()[1]);
        for (camera, tracks) in cameras.iter().enumerate() {
            let found = (tracks.shape()[0], tracks.shape()[1]);
            if found != expected || tracks.shape()[2] != 2 {
                return Err(TrackError::CameraMismatch {
                    camera,
                    expected,
                    found,
                });
            }
        }
        let views: Vec<_> = cameras.iter().map(|c| c.view()).collect();
        let data = ndarray::stack(Axis(0), &views)
            .map_err(|_| TrackError::Shape(first.shape().to_vec()))?;
        Self::new(data)
    }

    /// Convert a SLEAP analysis `tracks` array to `(frames, nodes, 2)`,
    /// keeping the first track.
    pub fn from_analysis(raw: ArrayView4<'_, f64>, path: &Path) -> Result<Array3<f64>, TrackError> {
        let shape = raw.shape();
        if shape[0] == 0 || shape[1] != 2 {
            return Err(TrackError::AnalysisShape {
                path: path.to_path_buf(),
                shape: shape.to_vec(),
            });
        }
        let first = raw.index_axis(Axis(0), 0);
        Ok(first.permuted_axes([2, 1, 0]).as_standard_layout().into_owned())
    }

    pub fn n_cameras(&self) -> usize {
        self.data.shape()[0]
    }

    pub fn n_frames(&self) -> usize {
        self.data.shape()[1]
    }

    pub fn n_nodes(&self) -> usize {
        self.data.shape()[2]
    }

    pub fn data(&self) -> &Array4<f64> {
        &self.data
    }
}

/// Storage backend for track files.
pub trait TrackStore {
    /// Read one camera's analysis file as `(frames, nodes, 2)`.
    fn read_camera_tracks(&self, path: &Path) -> Result<Array3<f64>, TrackError>;

    /// Read a session's stacked tracks.
    fn read_tracks(&self, path: &Path) -> Result<TrackArray, TrackError>;

    /// Write a session's stacked tracks.
    fn write_tracks(&self, path: &Path, tracks: &TrackArray) -> Result<(), TrackError>;
}

/// Store used when the crate is built without HDF5 support; every call fails
/// with [`TrackError::Hdf5Unavailable`].
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableTrackStore;

impl TrackStore for UnavailableTrackStore {
    fn read_camera_tracks(&self, path: &Path) -> Result<Array3<f64>, TrackError> {
        Err(TrackError::Hdf5Unavailable {
            path: path.to_path_buf(),
        })
    }

    fn read_tracks(&self, path: &Path) -> Result<TrackArray, TrackError> {
        Err(TrackError::Hdf5Unavailable {
            path: path.to_path_buf(),
        })
    }

    fn write_tracks(&self, path: &Path, _tracks: &TrackArray) -> Result<(), TrackError> {
        Err(TrackError::Hdf5Unavailable {
            path: path.to_path_buf(),
        })
    }
}

#[cfg(feature = "hdf5")]
pub use hdf5_store::Hdf5TrackStore;

#[cfg(feature = "hdf5")]
mod hdf5_store {
    use std::path::Path;

    use ndarray::{Array3, Array4, Ix4};

    use super::{TRACKS_DATASET, TrackArray, TrackStore};
    use crate::error::TrackError;

    /// HDF5-backed store reading and writing the `tracks` dataset.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct Hdf5TrackStore;

    fn h5_err(path: &Path) -> impl Fn(hdf5::Error) -> TrackError + '_ {
        move |source| TrackError::Hdf5 {
            path: path.to_path_buf(),
            source,
        }
    }

    fn read_raw(path: &Path) -> Result<Array4<f64>, TrackError> {
        if !path.exists() {
            return Err(TrackError::NotFound {
                path: path.to_path_buf(),
            });
        }
        let file = hdf5::File::open(path).map_err(h5_err(path))?;
        let dataset = file.dataset(TRACKS_DATASET).map_err(h5_err(path))?;
        dataset.read::<f64, Ix4>().map_err(h5_err(path))
    }

    impl TrackStore for Hdf5TrackStore {
        fn read_camera_tracks(&self, path: &Path) -> Result<Array3<f64>, TrackError> {
            let raw = read_raw(path)?;
            TrackArray::from_analysis(raw.view(), path)
        }

        fn read_tracks(&self, path: &Path) -> Result<TrackArray, TrackError> {
            TrackArray::new(read_raw(path)?)
        }

        fn write_tracks(&self, path: &Path, tracks: &TrackArray) -> Result<(), TrackError> {
            let file = hdf5::File::create(path).map_err(h5_err(path))?;
            file.new_dataset_builder()
                .with_data(tracks.data())
                .create(TRACKS_DATASET)
                .map_err(h5_err(path))?;
            Ok(())
        }
    }

}

/// Track store matching the enabled features.
pub fn default_track_store() -> Box<dyn TrackStore> {
    #[cfg(feature = "hdf5")]
    {
        Box::new(Hdf5TrackStore)
    }
    #[cfg(not(feature = "hdf5"))]
    {
        Box::new(UnavailableTrackStore)
    }
}
