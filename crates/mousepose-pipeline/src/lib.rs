//! Stage orchestration for the mousepose pipeline.
//!
//! A run walks the configured sessions through up to seven steps:
//!
//! | Step | Unit | Produces |
//! |---|---|---|
//! | `setup` | session | session, camera and annotation folders; template `config.toml` |
//! | `videos` | session/camera | probed (and converted) videos |
//! | `annotations` | session/camera | label project with suggested frames |
//! | `pose` | session/camera, then session | SLEAP model, predictions, `{s}_pose_estimation.h5` |
//! | `triangulation` | session | `{s}_3d_points.npy` |
//! | `angles` | session | `{s}_3d_points.csv`, `{s}_angles.csv`, `{s}_3dpts_angles.csv` |
//! | `visualize` | session | `{s}_angles.svg` |
//!
//! External tools sit behind the traits in [`tools`] and are collected in a
//! [`Toolbox`]; swap members to run the pipeline against test doubles.
//!
//! ```no_run
//! use mousepose_core::PipelineConfig;
//! use mousepose_pipeline::{PipelineRun, run_steps};
//!
//! # fn main() -> anyhow::Result<()> {
//! let config = PipelineConfig::from_file("pipeline.toml".as_ref())?;
//! let mut run = PipelineRun::new(config)?;
//! let report = run_steps(&mut run, &["triangulation", "angles"])?;
//! println!("{}", report.to_json()?);
//! # Ok(())
//! # }
//! ```

pub mod driver;
pub mod run;
pub mod stages;
pub mod tools;

pub use driver::{ALL_STEPS, StepExecutor, StepPlan, plan_steps, run_steps};
pub use run::{PipelineReport, PipelineRun, StageReport, Unit, UnitOutcome};
pub use stages::{Step, UnknownStep};
pub use tools::{ToolError, Toolbox};
