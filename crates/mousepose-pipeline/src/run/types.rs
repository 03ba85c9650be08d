//! Outcome records produced by stages and the driver.
//!
//! Each stage processes a list of units (a session, or a session/camera pair)
//! and records one [`UnitOutcome`] per unit in a [`StageReport`]. The driver
//! collects stage reports into a [`PipelineReport`].

use std::fmt;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use crate::stages::Step;

/// One iteration of a stage loop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
    pub session: String,
    pub camera: Option<String>,
    /// Sub-task label for per-session follow-ups (e.g. track assembly).
    pub task: Option<String>,
}

impl Unit {
    pub fn session(session: impl Into<String>) -> Self {
        Self {
            session: session.into(),
            camera: None,
            task: None,
        }
    }

    pub fn camera(session: impl Into<String>, camera: impl Into<String>) -> Self {
        Self {
            session: session.into(),
            camera: Some(camera.into()),
            task: None,
        }
    }

    pub fn with_task(mut self, task: impl Into<String>) -> Self {
        self.task = Some(task.into());
        self
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.session)?;
        if let Some(camera) = &self.camera {
            write!(f, "/{camera}")?;
        }
        if let Some(task) = &self.task {
            write!(f, " [{task}]")?;
        }
        Ok(())
    }
}

/// Result of one unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitOutcome {
    /// Unix timestamp when the unit finished (seconds since epoch).
    pub timestamp: u64,

    pub unit: Unit,

    pub success: bool,

    /// Summary on success, error chain on failure.
    pub notes: Option<String>,
}

impl UnitOutcome {
    pub fn success(unit: Unit) -> Self {
        Self {
            timestamp: current_timestamp(),
            unit,
            success: true,
            notes: None,
        }
    }

    pub fn success_with_notes(unit: Unit, notes: impl Into<String>) -> Self {
        Self {
            timestamp: current_timestamp(),
            unit,
            success: true,
            notes: Some(notes.into()),
        }
    }

    pub fn failure(unit: Unit, error: impl Into<String>) -> Self {
        Self {
            timestamp: current_timestamp(),
            unit,
            success: false,
            notes: Some(error.into()),
        }
    }
}

/// Per-unit results of one stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageReport {
    pub step: Step,
    pub started_at: u64,
    pub finished_at: u64,
    pub outcomes: Vec<UnitOutcome>,
}

impl StageReport {
    pub fn begin(step: Step) -> Self {
        let now = current_timestamp();
        Self {
            step,
            started_at: now,
            finished_at: now,
            outcomes: Vec::new(),
        }
    }

    pub fn push(&mut self, outcome: UnitOutcome) {
        self.finished_at = outcome.timestamp.max(self.finished_at);
        self.outcomes.push(outcome);
    }

    pub fn finish(mut self) -> Self {
        self.finished_at = current_timestamp();
        self
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.success).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }

    /// Whether the given unit of this stage succeeded.
    pub fn unit_succeeded(&self, unit: &Unit) -> bool {
        self.outcomes.iter().any(|o| o.success && &o.unit == unit)
    }
}

/// Everything a driver run produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineReport {
    pub started_at: u64,
    pub finished_at: u64,
    pub stages: Vec<StageReport>,
    /// Requested step names that were not recognized.
    pub skipped_steps: Vec<String>,
}

impl PipelineReport {
    pub fn new() -> Self {
        let now = current_timestamp();
        Self {
            started_at: now,
            finished_at: now,
            stages: Vec::new(),
            skipped_steps: Vec::new(),
        }
    }

    /// Steps in the order they ran.
    pub fn steps(&self) -> Vec<Step> {
        self.stages.iter().map(|s| s.step).collect()
    }

    /// Failed units across all stages.
    pub fn failures(&self) -> impl Iterator<Item = (Step, &UnitOutcome)> {
        self.stages
            .iter()
            .flat_map(|s| s.outcomes.iter().filter(|o| !o.success).map(move |o| (s.step, o)))
    }

    pub fn is_success(&self) -> bool {
        self.stages.iter().all(StageReport::is_success)
    }

    /// Serialize to pretty JSON.
    pub fn to_json(&self) -> anyhow::Result<String> {
        serde_json::to_string_pretty(self).map_err(Into::into)
    }
}

impl Default for PipelineReport {
    fn default() -> Self {
        Self::new()
    }
}

/// Get the current Unix timestamp in seconds.
pub fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map_or(0, |d| d.as_secs())
}
