use crate::models::DownloadState;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Phases of one generation request.
///
/// ```text
/// Idle → Configuring → Confirming → Downloading → Packaging → Completed
/// any non-terminal phase → Error → Configuring (reset)
/// Completed → Configuring (next request)
/// ```
///
/// There are no back-edges: edits while confirming go through overrides, and
/// starting over requires a finished or failed request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    #[default]
    Idle,
    Configuring,
    Confirming,
    Downloading,
    Packaging,
    Completed,
    Error,
}

impl Phase {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Error)
    }

    pub fn can_transition_to(self, next: Phase) -> bool {
        use Phase::*;
        match (self, next) {
            (Idle | Completed, Configuring) => true,
            (Configuring, Confirming) => true,
            (Confirming, Downloading) => true,
            (Downloading, Packaging) => true,
            (Packaging, Completed) => true,
            (Error, Configuring) => true,
            (from, Error) => !from.is_terminal(),
            _ => false,
        }
    }

    /// The step a phase works on, if any.
    pub fn step(self) -> Option<Step> {
        match self {
            Self::Configuring | Self::Confirming => Some(Step::Configure),
            Self::Downloading => Some(Step::Download),
            Self::Packaging => Some(Step::Package),
            Self::Idle | Self::Completed | Self::Error => None,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Configuring => "configuring",
            Self::Confirming => "confirming",
            Self::Downloading => "downloading",
            Self::Packaging => "packaging",
            Self::Completed => "completed",
            Self::Error => "error",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Configure,
    Download,
    Package,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
    Error,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Steps {
    pub configure: StepStatus,
    pub download: StepStatus,
    pub package: StepStatus,
}

impl Steps {
    pub fn get(&self, step: Step) -> StepStatus {
        match step {
            Step::Configure => self.configure,
            Step::Download => self.download,
            Step::Package => self.package,
        }
    }

    pub fn set(&mut self, step: Step, status: StepStatus) {
        match step {
            Step::Configure => self.configure = status,
            Step::Download => self.download = status,
            Step::Package => self.package = status,
        }
    }
}

/// Which fetch failures abort the pipeline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequiredPolicy {
    /// Any failed asset aborts.
    AllItems,
    /// Only failures of assets marked required abort.
    #[default]
    RequiredOnly,
    /// Package whatever arrived.
    BestEffort,
}

impl FromStr for RequiredPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "all_items" | "all" => Ok(Self::AllItems),
            "required_only" | "required" => Ok(Self::RequiredOnly),
            "best_effort" => Ok(Self::BestEffort),
            other => Err(format!("unknown required-asset policy: {}", other)),
        }
    }
}

/// Finished archive as far as observers care.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactInfo {
    pub file_name: String,
    pub size_bytes: usize,
    pub entry_count: usize,
}

/// Progress record of the current generation request.
///
/// Wrapped by [`StateManager`](crate::state::StateManager); never mutated
/// directly outside of its `update` closure.
#[derive(Debug, Clone, Default)]
pub struct GenerationState {
    pub phase: Phase,
    pub steps: Steps,

    /// Phase that was active when the request failed.
    pub failed_phase: Option<Phase>,
    pub error: Option<String>,

    // Download progress
    pub downloads: IndexMap<String, DownloadState>,
    pub completed_assets: usize,
    pub total_assets: usize,
    pub failed_assets: Vec<String>,

    // Results
    pub warnings: Vec<String>,
    pub artifact: Option<ArtifactInfo>,
}

impl GenerationState {
    pub fn overall_percent(&self) -> f64 {
        if self.total_assets == 0 {
            return 0.0;
        }
        self.completed_assets as f64 / self.total_assets as f64 * 100.0
    }

    /// Clear per-request results, keeping nothing but the phase.
    pub fn clear_results(&mut self) {
        let phase = self.phase;
        *self = Self {
            phase,
            ..Self::default()
        };
    }
}
