//! Step selection and dispatch.
//!
//! Requested step names are resolved into a [`StepPlan`]: `all` expands to
//! every step, duplicates collapse, and the result is put in pipeline order.
//! Unknown names are reported and skipped. The plan is then executed one
//! step at a time through a [`StepExecutor`].

use std::collections::BTreeSet;

use anyhow::{Context, Result};
use log::{info, warn};

use crate::run::{PipelineReport, PipelineRun, StageReport};
use crate::stages::{
    Step, step_angles, step_annotations, step_pose, step_setup, step_triangulation, step_videos,
    step_visualize,
};

/// Keyword selecting every step.
pub const ALL_STEPS: &str = "all";

/// Runs a single pipeline step.
pub trait StepExecutor {
    fn execute(&mut self, step: Step) -> Result<StageReport>;
}

impl StepExecutor for PipelineRun {
    fn execute(&mut self, step: Step) -> Result<StageReport> {
        match step {
            Step::Setup => step_setup(self),
            Step::Videos => step_videos(self),
            Step::Annotations => step_annotations(self),
            Step::Pose => step_pose(self),
            Step::Triangulation => step_triangulation(self),
            Step::Angles => step_angles(self),
            Step::Visualize => step_visualize(self),
        }
    }
}

/// Resolved step selection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StepPlan {
    /// Steps to run, in pipeline order, each once.
    pub steps: Vec<Step>,
    /// Names that matched no step, in request order.
    pub unknown: Vec<String>,
}

pub fn plan_steps<S: AsRef<str>>(requested: &[S]) -> StepPlan {
    let mut steps = BTreeSet::new();
    let mut unknown = Vec::new();
    for name in requested {
        let name = name.as_ref();
        if name.trim().eq_ignore_ascii_case(ALL_STEPS) {
            steps.extend(Step::ALL);
            continue;
        }
        match name.parse::<Step>() {
            Ok(step) => {
                steps.insert(step);
            }
            Err(_) => unknown.push(name.to_string()),
        }
    }
    StepPlan {
        steps: steps.into_iter().collect(),
        unknown,
    }
}

/// Run the requested steps and collect their reports.
///
/// A step that returns an error aborts the run; earlier steps are not
/// rolled back.
pub fn run_steps<E, S>(executor: &mut E, requested: &[S]) -> Result<PipelineReport>
where
    E: StepExecutor + ?Sized,
    S: AsRef<str>,
{
    let plan = plan_steps(requested);
    for name in &plan.unknown {
        warn!("unknown step `{name}` skipped");
    }
    if plan.steps.is_empty() {
        warn!("no steps to run");
    }

    let mut report = PipelineReport::new();
    report.skipped_steps = plan.unknown;
    for step in plan.steps {
        info!("=== {step} ===");
        let stage = executor
            .execute(step)
            .with_context(|| format!("step `{step}` aborted"))?;
        info!(
            "{step}: {} succeeded, {} failed",
            stage.succeeded(),
            stage.failed()
        );
        report.stages.push(stage);
    }
    report.finished_at = crate::run::current_timestamp();
    Ok(report)
}
