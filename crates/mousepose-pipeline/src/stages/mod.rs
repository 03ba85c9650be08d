//! Pipeline stages.
//!
//! Each stage is a step function over a [`PipelineRun`](crate::run::PipelineRun)
//! that loops over the configured sessions (and cameras) and returns a
//! [`StageReport`](crate::run::StageReport).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub mod angles;
pub mod annotations;
pub mod pose;
pub mod setup;
pub mod triangulation;
pub mod videos;
pub mod visualize;

pub use angles::{combine_points_and_angles, step_angles};
pub use annotations::step_annotations;
pub use pose::step_pose;
pub use setup::step_setup;
pub use triangulation::step_triangulation;
pub use videos::step_videos;
pub use visualize::{angle_figure, step_visualize};

/// A named pipeline stage.
///
/// Variants are declared in pipeline order, so sorting steps yields the
/// order in which they run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Setup,
    Videos,
    Annotations,
    Pose,
    Triangulation,
    Angles,
    Visualize,
}

impl Step {
    /// Every step in pipeline order.
    pub const ALL: [Step; 7] = [
        Step::Setup,
        Step::Videos,
        Step::Annotations,
        Step::Pose,
        Step::Triangulation,
        Step::Angles,
        Step::Visualize,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Step::Setup => "setup",
            Step::Videos => "videos",
            Step::Annotations => "annotations",
            Step::Pose => "pose",
            Step::Triangulation => "triangulation",
            Step::Angles => "angles",
            Step::Visualize => "visualize",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Unrecognized step name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown step `{0}`")]
pub struct UnknownStep(pub String);

impl FromStr for Step {
    type Err = UnknownStep;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        Step::ALL
            .into_iter()
            .find(|step| step.name().eq_ignore_ascii_case(name))
            .ok_or_else(|| UnknownStep(s.to_string()))
    }
}
