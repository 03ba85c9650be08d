//! Deterministic file-system layout of sessions and their artifacts.
//!
//! Every path is composed from the base directory, the session id, the camera
//! id and (for videos) the session config. Nothing here globs or searches.
//!
//! ```text
//! {base}/{session}/config.toml
//! {base}/{session}/{session}_pose_estimation.h5
//! {base}/{session}/{session}_3d_points.npy
//! {base}/{session}/{session}_3d_points.csv
//! {base}/{session}/{session}_angles.csv
//! {base}/{session}/{session}_3dpts_angles.csv
//! {base}/{session}/{session}_angles.svg
//! {base}/{session}_annotations/{session}_{camera}_annotations/{session}_{camera}.json
//! {video_dir}/{session}_{camera}.{video_format}
//! ```

use std::path::{Path, PathBuf};

use crate::config::{SESSION_CONFIG_FILE, SessionConfig};
use crate::error::ConfigError;

/// Resolves artifact locations below a base directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathResolver {
    base_dir: PathBuf,
}

impl PathResolver {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Session directories and config
    // ─────────────────────────────────────────────────────────────────────────

    pub fn session_dir(&self, session: &str) -> PathBuf {
        self.base_dir.join(session)
    }

    pub fn config_path(&self, session: &str) -> PathBuf {
        self.session_dir(session).join(SESSION_CONFIG_FILE)
    }

    /// Load the session's `config.toml`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NotFound`] when the file is absent.
    pub fn load_session_config(&self, session: &str) -> Result<SessionConfig, ConfigError> {
        let path = self.config_path(session);
        if !path.exists() {
            return Err(ConfigError::NotFound {
                session: session.to_string(),
                path,
            });
        }
        SessionConfig::from_file(&path)
    }

    pub fn camera_dir(&self, session: &str, camera: &str) -> PathBuf {
        self.session_dir(session).join(camera)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Videos
    // ─────────────────────────────────────────────────────────────────────────

    /// Raw video of one camera; reads the session config.
    pub fn video_path(&self, session: &str, camera: &str) -> Result<PathBuf, ConfigError> {
        let config = self.load_session_config(session)?;
        Ok(self.video_path_for(&config, session, camera))
    }

    /// Raw video of one camera for an already loaded config.
    pub fn video_path_for(&self, config: &SessionConfig, session: &str, camera: &str) -> PathBuf {
        config
            .video_dir
            .join(format!("{session}_{camera}.{}", config.video_format))
    }

    /// Processed video written next to the annotations; reads the session config.
    pub fn output_video_path(&self, session: &str, camera: &str) -> Result<PathBuf, ConfigError> {
        let config = self.load_session_config(session)?;
        Ok(self.output_video_path_for(&config, session, camera))
    }

    pub fn output_video_path_for(
        &self,
        config: &SessionConfig,
        session: &str,
        camera: &str,
    ) -> PathBuf {
        self.annotation_file(
            session,
            camera,
            &format!("_annotations.{}", config.output_video_format),
        )
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Annotations and SLEAP artifacts (per camera)
    // ─────────────────────────────────────────────────────────────────────────

    pub fn annotation_root(&self, session: &str) -> PathBuf {
        self.base_dir.join(format!("{session}_annotations"))
    }

    pub fn annotation_dir(&self, session: &str, camera: &str) -> PathBuf {
        self.annotation_root(session)
            .join(format!("{session}_{camera}_annotations"))
    }

    /// SLEAP labels JSON seeded by the annotation stage and read by training.
    pub fn labels_path(&self, session: &str, camera: &str) -> PathBuf {
        self.annotation_file(session, camera, ".json")
    }

    /// Output prefix handed to the trainer.
    pub fn model_prefix(&self, session: &str, camera: &str) -> PathBuf {
        self.annotation_file(session, camera, "_model")
    }

    /// Model config produced by training and consumed by tracking.
    pub fn model_config_path(&self, session: &str, camera: &str) -> PathBuf {
        self.annotation_file(session, camera, "_model.json")
    }

    pub fn prediction_path(&self, session: &str, camera: &str) -> PathBuf {
        self.annotation_file(session, camera, "_prediction.slp")
    }

    /// Analysis HDF5 exported from the predictions.
    pub fn analysis_path(&self, session: &str, camera: &str) -> PathBuf {
        self.annotation_file(session, camera, "_analysis.h5")
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Session artifacts
    // ─────────────────────────────────────────────────────────────────────────

    /// All cameras' 2D tracks of a session (`tracks` dataset).
    pub fn pose_estimation_path(&self, session: &str) -> PathBuf {
        self.session_file(session, "pose_estimation.h5")
    }

    /// 2D tracks handed to the triangulation command.
    pub fn tracks_2d_path(&self, session: &str) -> PathBuf {
        self.session_file(session, "tracks_2d.npy")
    }

    /// Raw output of the triangulation command.
    pub fn triangulated_path(&self, session: &str) -> PathBuf {
        self.session_file(session, "triangulated.npy")
    }

    pub fn points_3d_path(&self, session: &str) -> PathBuf {
        self.session_file(session, "3d_points.npy")
    }

    /// 3D points as a table, the input of the angle computation.
    pub fn points_csv_path(&self, session: &str) -> PathBuf {
        self.session_file(session, "3d_points.csv")
    }

    pub fn angles_path(&self, session: &str) -> PathBuf {
        self.session_file(session, "angles.csv")
    }

    pub fn combined_path(&self, session: &str) -> PathBuf {
        self.session_file(session, "3dpts_angles.csv")
    }

    pub fn plot_path(&self, session: &str) -> PathBuf {
        self.session_file(session, "angles.svg")
    }

    fn session_file(&self, session: &str, suffix: &str) -> PathBuf {
        self.session_dir(session).join(format!("{session}_{suffix}"))
    }

    fn annotation_file(&self, session: &str, camera: &str, suffix: &str) -> PathBuf {
        self.annotation_dir(session, camera)
            .join(format!("{session}_{camera}{suffix}"))
    }
}
