//! The run container shared by every stage.
//!
//! A [`PipelineRun`] holds the validated configuration, the path resolver
//! and the tool implementations. Stage functions borrow it and record one
//! outcome per unit; how a unit failure propagates is decided here.

use anyhow::{Context, Result};
use log::{error, info};
use mousepose_core::{FailurePolicy, PathResolver, PipelineConfig};

use super::types::{StageReport, Unit, UnitOutcome};
use crate::stages::Step;
use crate::tools::Toolbox;

/// Configuration, layout and tools of one pipeline invocation.
pub struct PipelineRun {
    pub config: PipelineConfig,
    pub paths: PathResolver,
    pub tools: Toolbox,
}

impl PipelineRun {
    /// Run with the command-line tools named in the configuration.
    pub fn new(config: PipelineConfig) -> Result<Self> {
        let tools = Toolbox::from_config(&config.tools);
        Self::with_tools(config, tools)
    }

    pub fn with_tools(config: PipelineConfig, tools: Toolbox) -> Result<Self> {
        config.validate().context("invalid pipeline configuration")?;
        let paths = PathResolver::new(&config.base_dir);
        Ok(Self {
            config,
            paths,
            tools,
        })
    }

    /// One unit per session, in configuration order.
    pub fn session_units(&self) -> Vec<Unit> {
        self.config.sessions.iter().map(Unit::session).collect()
    }

    /// One unit per (session, camera), session-major.
    pub fn camera_units(&self) -> Vec<Unit> {
        self.config
            .sessions
            .iter()
            .flat_map(|s| self.config.cameras.iter().map(move |c| Unit::camera(s, c)))
            .collect()
    }

    /// Run one unit and record its outcome.
    ///
    /// Returns whether the unit succeeded. Under [`FailurePolicy::FailFast`]
    /// a failure is recorded and then returned as an error.
    pub fn attempt<F>(&self, report: &mut StageReport, unit: Unit, work: F) -> Result<bool>
    where
        F: FnOnce(&Unit) -> Result<String>,
    {
        match work(&unit) {
            Ok(notes) => {
                info!("[{}] {unit}: done{}", report.step, notes_suffix(&notes));
                let outcome = if notes.is_empty() {
                    UnitOutcome::success(unit)
                } else {
                    UnitOutcome::success_with_notes(unit, notes)
                };
                report.push(outcome);
                Ok(true)
            }
            Err(err) => {
                error!("[{}] {unit}: {err:#}", report.step);
                report.push(UnitOutcome::failure(unit.clone(), format!("{err:#}")));
                match self.config.failure_policy {
                    FailurePolicy::Isolate => Ok(false),
                    FailurePolicy::FailFast => {
                        Err(err.context(format!("{} failed for {unit}", report.step)))
                    }
                }
            }
        }
    }

    /// Run `work` for every unit in order and collect the outcomes.
    pub fn run_units<F>(&self, step: Step, units: Vec<Unit>, mut work: F) -> Result<StageReport>
    where
        F: FnMut(&Unit) -> Result<String>,
    {
        let mut report = StageReport::begin(step);
        for unit in units {
            self.attempt(&mut report, unit, &mut work)?;
        }
        Ok(report.finish())
    }
}

fn notes_suffix(notes: &str) -> String {
    if notes.is_empty() {
        String::new()
    } else {
        format!(" ({notes})")
    }
}

#[cfg(test)]
mod tests {
    use anyhow::bail;

    use super::*;

    fn config(policy: FailurePolicy) -> PipelineConfig {
        let mut config = PipelineConfig::new("/tmp/mousepose-unused")
            .with_sessions(["s1", "s2", "s3"])
            .with_cameras(["cam_a", "cam_b"]);
        config.failure_policy = policy;
        config
    }

    fn failing_s2(unit: &Unit) -> Result<String> {
        if unit.session == "s2" {
            bail!("tool exited with status 1");
        }
        Ok(format!("{} ok", unit.session))
    }

    #[test]
    fn units_are_session_major() {
        let run = PipelineRun::new(config(FailurePolicy::Isolate)).unwrap();
        let units: Vec<String> = run.camera_units().iter().map(ToString::to_string).collect();
        assert_eq!(
            units,
            ["s1/cam_a", "s1/cam_b", "s2/cam_a", "s2/cam_b", "s3/cam_a", "s3/cam_b"]
        );
        assert_eq!(run.session_units().len(), 3);
    }

    #[test]
    fn isolate_keeps_going_after_a_failure() {
        let run = PipelineRun::new(config(FailurePolicy::Isolate)).unwrap();
        let report = run
            .run_units(Step::Angles, run.session_units(), failing_s2)
            .unwrap();
        assert_eq!(report.outcomes.len(), 3);
        assert_eq!(report.failed(), 1);
        assert!(report.unit_succeeded(&Unit::session("s3")));
        let failure = &report.outcomes[1];
        assert_eq!(failure.notes.as_deref(), Some("tool exited with status 1"));
    }

    #[test]
    fn fail_fast_stops_at_first_failure() {
        let run = PipelineRun::new(config(FailurePolicy::FailFast)).unwrap();
        let mut report = StageReport::begin(Step::Angles);
        let mut seen = Vec::new();
        let mut result = Ok(true);
        for unit in run.session_units() {
            seen.push(unit.session.clone());
            result = run.attempt(&mut report, unit, failing_s2);
            if result.is_err() {
                break;
            }
        }
        let err = result.unwrap_err();
        assert_eq!(seen, ["s1", "s2"]);
        assert_eq!(report.failed(), 1);
        assert!(format!("{err:#}").contains("angles failed for s2"));
    }

    #[test]
    fn invalid_configuration_is_rejected() {
        let config = PipelineConfig::new("/tmp").with_sessions(["s1", "s1"]);
        assert!(PipelineRun::new(config).is_err());
    }
}
