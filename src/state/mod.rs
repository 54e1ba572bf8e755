// State management module
//
// This module provides the StateManager which wraps GenerationState with thread-safe
// access using Arc<RwLock<T>> and emits change events for progress displays.

use crate::models::{ArtifactInfo, DownloadState, GenerationState, Phase, Step, StepStatus};
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::broadcast;

/// Change events emitted when state is modified
///
/// These events notify interested parties (the CLI progress printer, a future
/// GUI) about state changes without requiring them to poll the state.
#[derive(Clone, Debug, PartialEq)]
pub enum StateChange {
    /// The request moved to another phase
    PhaseChanged { from: Phase, to: Phase },

    /// A step record changed status
    StepUpdated { step: Step, status: StepStatus },

    /// A download published a new snapshot
    AssetProgress(DownloadState),

    /// Settled downloads out of the manifest total
    OverallProgress { completed: usize, total: usize },

    /// A non-fatal problem was recorded
    WarningRaised { message: String },

    /// The archive has been written
    ArtifactReady { file_name: String, size_bytes: usize },

    /// The request failed in `phase`
    Failed { phase: Phase, message: String },

    /// State has been reset
    StateReset,
}

/// Thread-safe state manager with event emission
///
/// - [`read()`](Self::read) for reading state under a short-lived lock
/// - [`update()`](Self::update) for mutations with automatic event emission
/// - [`subscribe()`](Self::subscribe) for listening to state changes
///
/// Cloning shares the underlying state and channel.
#[derive(Clone)]
pub struct StateManager {
    state: Arc<RwLock<GenerationState>>,

    /// Multiple subscribers can listen for state changes
    state_tx: broadcast::Sender<StateChange>,
}

impl StateManager {
    /// Create a new StateManager with default state and a 256-event buffer
    pub fn new() -> Self {
        let (state_tx, _) = broadcast::channel(256);
        Self {
            state: Arc::new(RwLock::new(GenerationState::default())),
            state_tx,
        }
    }

    /// Clone of the current state
    pub fn snapshot(&self) -> GenerationState {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Execute a function with read access to the state
    ///
    /// # Example
    /// ```ignore
    /// let phase = state_manager.read(|state| state.phase);
    /// ```
    pub fn read<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&GenerationState) -> R,
    {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        f(&state)
    }

    /// Update the state and emit change events
    ///
    /// Captures the old state, applies `update_fn`, diffs the two and
    /// broadcasts one event per detected change.
    ///
    /// # Returns
    /// The emitted events, in emission order
    pub fn update<F>(&self, update_fn: F) -> Vec<StateChange>
    where
        F: FnOnce(&mut GenerationState),
    {
        let changes = {
            let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
            let old_state = state.clone();
            update_fn(&mut state);
            detect_changes(&old_state, &state)
        };

        for change in &changes {
            self.emit(change.clone());
        }

        changes
    }

    /// Subscribe to state change events
    pub fn subscribe(&self) -> broadcast::Receiver<StateChange> {
        self.state_tx.subscribe()
    }

    fn emit(&self, change: StateChange) {
        // No subscribers is fine
        let _ = self.state_tx.send(change);
    }

    // Convenience methods for common state updates

    pub fn set_phase(&self, phase: Phase) -> Vec<StateChange> {
        self.update(|state| state.phase = phase)
    }

    pub fn set_step(&self, step: Step, status: StepStatus) -> Vec<StateChange> {
        self.update(|state| state.steps.set(step, status))
    }

    /// Prepare for a new download run over `total` assets
    pub fn begin_downloads(&self, total: usize) -> Vec<StateChange> {
        self.update(|state| {
            state.downloads.clear();
            state.failed_assets.clear();
            state.completed_assets = 0;
            state.total_assets = total;
        })
    }

    /// Store a download snapshot
    ///
    /// Emitted explicitly: snapshots arrive per chunk and diffing the whole
    /// download map for each one is wasted work.
    pub fn record_download(&self, snapshot: DownloadState) -> StateChange {
        {
            let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
            state
                .downloads
                .insert(snapshot.asset_id.clone(), snapshot.clone());
        }
        let change = StateChange::AssetProgress(snapshot);
        self.emit(change.clone());
        change
    }

    pub fn set_overall_progress(&self, completed: usize, total: usize) -> Vec<StateChange> {
        self.update(|state| {
            state.completed_assets = completed;
            state.total_assets = total;
        })
    }

    pub fn add_warning(&self, message: impl Into<String>) -> Vec<StateChange> {
        let message = message.into();
        self.update(|state| state.warnings.push(message))
    }

    pub fn set_artifact(&self, artifact: ArtifactInfo) -> Vec<StateChange> {
        self.update(|state| state.artifact = Some(artifact))
    }

    /// Move to [`Phase::Error`], remembering where the failure happened
    ///
    /// Completed work (downloads, warnings) stays in place until [`reset`](Self::reset).
    pub fn fail(&self, message: impl Into<String>, failed_assets: Vec<String>) -> Vec<StateChange> {
        let message = message.into();
        self.update(|state| {
            let phase = state.phase;
            if let Some(step) = phase.step() {
                state.steps.set(step, StepStatus::Error);
            }
            state.failed_phase = Some(phase);
            state.error = Some(message);
            state.failed_assets = failed_assets;
            state.phase = Phase::Error;
        })
    }

    /// Clear the failure and return to [`Phase::Configuring`]
    pub fn reset(&self) -> Vec<StateChange> {
        let mut changes = self.update(|state| {
            state.clear_results();
            state.phase = Phase::Configuring;
        });

        self.emit(StateChange::StateReset);
        changes.push(StateChange::StateReset);

        changes
    }
}

impl Default for StateManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Detect what changed between two states and generate events
fn detect_changes(old: &GenerationState, new: &GenerationState) -> Vec<StateChange> {
    let mut changes = Vec::new();

    if old.phase != new.phase {
        changes.push(StateChange::PhaseChanged {
            from: old.phase,
            to: new.phase,
        });
    }

    for step in [Step::Configure, Step::Download, Step::Package] {
        let status = new.steps.get(step);
        if old.steps.get(step) != status {
            changes.push(StateChange::StepUpdated { step, status });
        }
    }

    if old.completed_assets != new.completed_assets || old.total_assets != new.total_assets {
        changes.push(StateChange::OverallProgress {
            completed: new.completed_assets,
            total: new.total_assets,
        });
    }

    if new.warnings.len() > old.warnings.len() && new.warnings.starts_with(&old.warnings) {
        for message in &new.warnings[old.warnings.len()..] {
            changes.push(StateChange::WarningRaised {
                message: message.clone(),
            });
        }
    }

    if old.artifact != new.artifact {
        if let Some(artifact) = &new.artifact {
            changes.push(StateChange::ArtifactReady {
                file_name: artifact.file_name.clone(),
                size_bytes: artifact.size_bytes,
            });
        }
    }

    if old.error != new.error {
        if let Some(message) = &new.error {
            changes.push(StateChange::Failed {
                phase: new.failed_phase.unwrap_or(old.phase),
                message: message.clone(),
            });
        }
    }

    changes
}
