//! Sequences one generation request through its phases.
//!
//! ```text
//! configure()            → Configuring → Confirming
//! apply_override()       (stays in Confirming)
//! confirm_and_download() → Downloading
//! package()              → Packaging → Completed
//! reset()                Error → Configuring
//! ```
//!
//! Phases only move forward. Cancelling any download aborts the request
//! whatever the [`RequiredPolicy`]; partial buffers are dropped and the caller
//! restarts through [`Orchestrator::reset`].
//!
//! Progress is published through the shared [`StateManager`]; subscribe to it
//! before starting a phase to follow downloads as they happen.

use crate::models::{
    ArtifactInfo, AssetDescriptor, ConfigDocument, DocumentError, DownloadState,
    GenerationOptions, HardwareProfile, Phase, RequiredPolicy, Step, StepStatus,
};
use crate::services::archive::{ArchiveAssembler, AssembledArchive, PackagingError};
use crate::services::fetch::{
    AssetFetcher, AssetTransport, FetchControl, FetchError, FetchOutcome, ProgressObserver,
};
use crate::services::manifest::ManifestBuilder;
use crate::services::synthesis::{ConfigSynthesizer, PlatformIdentity, Synthesis, SynthesisError};
use crate::services::validation::{self, ValidationError, ValidationReport};
use crate::state::StateManager;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OrchestratorError {
    #[error(transparent)]
    Synthesis(#[from] SynthesisError),

    #[error(transparent)]
    Packaging(#[from] PackagingError),

    #[error("{} download(s) failed during {phase}: {}", .failed.len(), .failed.join(", "))]
    DownloadsFailed { phase: Phase, failed: Vec<String> },

    #[error("{} download(s) cancelled during {phase}: {}", .cancelled.len(), .cancelled.join(", "))]
    DownloadsCancelled { phase: Phase, cancelled: Vec<String> },

    #[error("Cannot move from {from} to {to}")]
    InvalidTransition { from: Phase, to: Phase },

    #[error("No configuration has been generated for this request")]
    MissingDocument,

    #[error("Override rejected: {0}")]
    Override(#[from] DocumentError),

    #[error("Generated configuration is invalid: {}", format_errors(.errors))]
    InvalidDocument { errors: Vec<ValidationError> },
}

fn format_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Everything produced for the current request.
struct Request {
    profile: HardwareProfile,
    options: GenerationOptions,
    synthesis: Synthesis,
    report: ValidationReport,
    manifest: Vec<AssetDescriptor>,
    outcome: Option<FetchOutcome>,
}

/// Forwards fetch progress into the state record.
struct StateProgress<'a> {
    state: &'a StateManager,
}

impl ProgressObserver for StateProgress<'_> {
    fn on_asset(&self, state: &DownloadState) {
        self.state.record_download(state.clone());
    }

    fn on_overall(&self, completed: usize, total: usize) {
        self.state.set_overall_progress(completed, total);
    }
}

pub struct Orchestrator<T: AssetTransport> {
    state: StateManager,
    manifest_builder: ManifestBuilder,
    fetcher: AssetFetcher<T>,
    assembler: ArchiveAssembler,
    policy: RequiredPolicy,
    control: FetchControl,
    request: Option<Request>,
}

impl<T: AssetTransport> Orchestrator<T> {
    pub fn new(state: StateManager, manifest_builder: ManifestBuilder, fetcher: AssetFetcher<T>) -> Self {
        Self {
            state,
            manifest_builder,
            fetcher,
            assembler: ArchiveAssembler::new(),
            policy: RequiredPolicy::default(),
            control: FetchControl::new(),
            request: None,
        }
    }

    pub fn with_policy(mut self, policy: RequiredPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn state(&self) -> &StateManager {
        &self.state
    }

    pub fn phase(&self) -> Phase {
        self.state.read(|s| s.phase)
    }

    /// Cancellation handles for the current request's downloads.
    ///
    /// Replaced by every [`configure`](Self::configure); clone it afterwards
    /// to cancel from another task.
    pub fn control(&self) -> FetchControl {
        self.control.clone()
    }

    /// Cancel one download of the current request.
    ///
    /// Returns `false` without touching any token when `asset_id` is not in
    /// the manifest.
    pub fn cancel(&self, asset_id: &str) -> bool {
        let known = self
            .manifest()
            .is_some_and(|manifest| manifest.iter().any(|a| a.id == asset_id));
        if !known {
            tracing::warn!("Ignoring cancel for unknown asset {}", asset_id);
            return false;
        }
        self.control.cancel(asset_id);
        true
    }

    pub fn cancel_all(&self) {
        self.control.cancel_all();
    }

    pub fn document(&self) -> Option<&ConfigDocument> {
        self.request.as_ref().map(|r| &r.synthesis.document)
    }

    pub fn identity(&self) -> Option<&PlatformIdentity> {
        self.request.as_ref().map(|r| &r.synthesis.identity)
    }

    pub fn manifest(&self) -> Option<&[AssetDescriptor]> {
        self.request.as_ref().map(|r| r.manifest.as_slice())
    }

    pub fn report(&self) -> Option<&ValidationReport> {
        self.request.as_ref().map(|r| &r.report)
    }

    pub fn outcome(&self) -> Option<&FetchOutcome> {
        self.request.as_ref().and_then(|r| r.outcome.as_ref())
    }

    /// Synthesize and validate a configuration, then build its manifest.
    ///
    /// Allowed from `Idle`, `Completed` and `Configuring` (after
    /// [`reset`](Self::reset)). A failed request must be reset first.
    pub fn configure(
        &mut self,
        profile: HardwareProfile,
        options: GenerationOptions,
    ) -> Result<ValidationReport, OrchestratorError> {
        match self.phase() {
            Phase::Configuring => {}
            Phase::Error => {
                return Err(OrchestratorError::InvalidTransition {
                    from: Phase::Error,
                    to: Phase::Configuring,
                });
            }
            _ => self.transition(Phase::Configuring)?,
        }
        self.state.update(|s| {
            s.clear_results();
            s.steps.configure = StepStatus::InProgress;
        });
        self.control = FetchControl::new();
        self.request = None;

        let synthesis = match ConfigSynthesizer::for_options(&options).synthesize(&profile, &options) {
            Ok(synthesis) => synthesis,
            Err(e) => return Err(self.fail(e.into(), Vec::new())),
        };

        let report = validation::validate(&synthesis.document).with_warnings(synthesis.warnings.clone());
        if !report.is_valid {
            let error = OrchestratorError::InvalidDocument {
                errors: report.errors.clone(),
            };
            return Err(self.fail(error, Vec::new()));
        }

        let manifest = self.manifest_builder.build(&synthesis.document, &options);
        tracing::info!(
            "Configuration ready: {} assets in manifest, {} warning(s)",
            manifest.len(),
            report.warnings.len()
        );

        for warning in &report.warnings {
            self.state.add_warning(warning.to_string());
        }
        self.state.set_overall_progress(0, manifest.len());
        self.transition(Phase::Confirming)?;

        self.request = Some(Request {
            profile,
            options,
            synthesis,
            report: report.clone(),
            manifest,
            outcome: None,
        });

        Ok(report)
    }

    /// Merge `overlay` onto the pending document and rebuild the manifest.
    ///
    /// A rejected override leaves the previous document in place and the
    /// request in `Confirming`.
    pub fn apply_override(&mut self, overlay: plist::Value) -> Result<ValidationReport, OrchestratorError> {
        let from = self.phase();
        if from != Phase::Confirming {
            return Err(OrchestratorError::InvalidTransition {
                from,
                to: Phase::Confirming,
            });
        }
        let request = self.request.as_mut().ok_or(OrchestratorError::MissingDocument)?;

        let document = request.synthesis.document.with_override(overlay)?;
        let report = validation::validate(&document).with_warnings(request.synthesis.warnings.clone());
        if !report.is_valid {
            tracing::warn!("Override produced an invalid configuration, keeping the previous one");
            return Err(OrchestratorError::InvalidDocument {
                errors: report.errors,
            });
        }

        request.manifest = self.manifest_builder.build(&document, &request.options);
        request.synthesis.document = document;
        request.report = report.clone();
        let total = request.manifest.len();

        tracing::info!("Override applied, manifest now has {} assets", total);
        self.state.set_overall_progress(0, total);

        Ok(report)
    }

    /// Fetch every manifest entry and apply the required-asset policy.
    pub async fn confirm_and_download(&mut self) -> Result<&FetchOutcome, OrchestratorError> {
        if self.request.is_none() {
            return Err(OrchestratorError::MissingDocument);
        }
        self.transition(Phase::Downloading)?;
        self.state.update(|s| {
            s.steps.configure = StepStatus::Completed;
            s.steps.download = StepStatus::InProgress;
        });

        let Some(request) = self.request.as_mut() else {
            return Err(OrchestratorError::MissingDocument);
        };
        self.state.begin_downloads(request.manifest.len());

        let observer = StateProgress { state: &self.state };
        let outcome = self
            .fetcher
            .fetch(&request.manifest, &self.control, &observer)
            .await;

        let cancelled = cancelled_in_order(&request.manifest, &outcome);
        let blocking = blocking_failures(self.policy, &request.manifest, &outcome);
        let skipped: Vec<String> = outcome
            .failures
            .keys()
            .filter(|id| !blocking.contains(id) && !cancelled.contains(id))
            .cloned()
            .collect();
        request.outcome = Some(outcome);

        if !cancelled.is_empty() {
            let error = OrchestratorError::DownloadsCancelled {
                phase: Phase::Downloading,
                cancelled: cancelled.clone(),
            };
            return Err(self.fail(error, cancelled));
        }

        if !blocking.is_empty() {
            let error = OrchestratorError::DownloadsFailed {
                phase: Phase::Downloading,
                failed: blocking.clone(),
            };
            return Err(self.fail(error, blocking));
        }

        if !skipped.is_empty() {
            tracing::warn!("Continuing without {} asset(s): {}", skipped.len(), skipped.join(", "));
            self.state.add_warning(format!(
                "Packaged without {} asset(s) that failed to download: {}",
                skipped.len(),
                skipped.join(", ")
            ));
        }
        self.state.set_step(Step::Download, StepStatus::Completed);

        self.outcome().ok_or(OrchestratorError::MissingDocument)
    }

    /// Write the archive from the downloaded assets.
    pub fn package(&mut self) -> Result<AssembledArchive, OrchestratorError> {
        let from = self.phase();
        if self.outcome().is_none() {
            return Err(OrchestratorError::InvalidTransition {
                from,
                to: Phase::Packaging,
            });
        }
        self.transition(Phase::Packaging)?;
        self.state.set_step(Step::Package, StepStatus::InProgress);

        let Some(request) = self.request.as_ref() else {
            return Err(OrchestratorError::MissingDocument);
        };
        let Some(outcome) = request.outcome.as_ref() else {
            return Err(OrchestratorError::MissingDocument);
        };

        let assembled = self.assembler.assemble(
            &request.synthesis.document,
            &request.profile,
            &outcome.assets,
            &request.options,
        );
        let archive = match assembled {
            Ok(archive) => archive,
            Err(e) => return Err(self.fail(e.into(), Vec::new())),
        };

        for warning in &archive.warnings {
            self.state.add_warning(warning.to_string());
        }
        self.state.set_artifact(ArtifactInfo {
            file_name: archive.file_name.clone(),
            size_bytes: archive.bytes.len(),
            entry_count: archive.entries.len(),
        });
        self.state.set_step(Step::Package, StepStatus::Completed);
        self.transition(Phase::Completed)?;

        tracing::info!("Generation completed: {}", archive.file_name);
        Ok(archive)
    }

    /// Run every phase back to back.
    pub async fn run(
        &mut self,
        profile: HardwareProfile,
        options: GenerationOptions,
    ) -> Result<AssembledArchive, OrchestratorError> {
        self.configure(profile, options)?;
        self.confirm_and_download().await?;
        self.package()
    }

    /// Leave `Error` for `Configuring`, discarding the failed request.
    pub fn reset(&mut self) -> Result<(), OrchestratorError> {
        let from = self.phase();
        if from != Phase::Error {
            return Err(OrchestratorError::InvalidTransition {
                from,
                to: Phase::Configuring,
            });
        }
        tracing::info!("Resetting after failure");
        self.state.reset();
        self.control = FetchControl::new();
        self.request = None;
        Ok(())
    }

    fn transition(&self, next: Phase) -> Result<(), OrchestratorError> {
        let from = self.phase();
        if !from.can_transition_to(next) {
            tracing::warn!("Rejected phase change {} -> {}", from, next);
            return Err(OrchestratorError::InvalidTransition { from, to: next });
        }
        tracing::debug!("Phase {} -> {}", from, next);
        self.state.set_phase(next);
        Ok(())
    }

    fn fail(&self, error: OrchestratorError, failed_assets: Vec<String>) -> OrchestratorError {
        tracing::error!("Generation failed in {}: {}", self.phase(), error);
        self.state.fail(error.to_string(), failed_assets);
        error
    }
}

/// Cancelled ids in manifest order.
fn cancelled_in_order(manifest: &[AssetDescriptor], outcome: &FetchOutcome) -> Vec<String> {
    let cancelled = outcome.cancelled_ids();
    manifest
        .iter()
        .filter(|a| cancelled.contains(&a.id.as_str()))
        .map(|a| a.id.clone())
        .collect()
}

/// Failed ids that abort the request under `policy`, in manifest order.
///
/// Cancellations are not counted here; they abort under every policy.
fn blocking_failures(
    policy: RequiredPolicy,
    manifest: &[AssetDescriptor],
    outcome: &FetchOutcome,
) -> Vec<String> {
    manifest
        .iter()
        .filter(|a| {
            outcome
                .failures
                .get(&a.id)
                .is_some_and(|e| *e != FetchError::Cancelled)
        })
        .filter(|a| match policy {
            RequiredPolicy::AllItems => true,
            RequiredPolicy::RequiredOnly => a.required,
            RequiredPolicy::BestEffort => false,
        })
        .map(|a| a.id.clone())
        .collect()
}
