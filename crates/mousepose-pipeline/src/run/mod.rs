//! Run container and outcome records.

pub mod pipeline_run;
pub mod types;

pub use pipeline_run::PipelineRun;
pub use types::{PipelineReport, StageReport, Unit, UnitOutcome, current_timestamp};
