//! Integration tests for StateManager with state change events
//!
//! These tests verify that the StateManager correctly:
//! - Emits state change events on mutations
//! - Supports multiple subscribers
//! - Handles concurrent access from multiple tasks
//! - Records failures and recovers through reset

use efiforge::models::{ArtifactInfo, DownloadState, Phase, Step, StepStatus};
use efiforge::{StateChange, StateManager};
use std::sync::Arc;
use tokio::time::{Duration, timeout};

async fn next_event(rx: &mut tokio::sync::broadcast::Receiver<StateChange>) -> StateChange {
    timeout(Duration::from_millis(100), rx.recv())
        .await
        .expect("Timeout waiting for event")
        .expect("Channel closed")
}

#[tokio::test]
async fn test_phase_change_emitted() {
    let state = Arc::new(StateManager::new());
    let mut rx = state.subscribe();

    state.set_phase(Phase::Configuring);

    let event = next_event(&mut rx).await;
    assert_eq!(
        event,
        StateChange::PhaseChanged {
            from: Phase::Idle,
            to: Phase::Configuring
        }
    );
}

#[tokio::test]
async fn test_multiple_subscribers_receive_events() {
    let state = Arc::new(StateManager::new());
    let mut rx1 = state.subscribe();
    let mut rx2 = state.subscribe();
    let mut rx3 = state.subscribe();

    state.add_warning("Unknown CPU generation Foo Lake, using SMBIOS iMac19,1");

    for rx in [&mut rx1, &mut rx2, &mut rx3] {
        let event = next_event(rx).await;
        assert!(matches!(event, StateChange::WarningRaised { .. }));
    }
}

#[tokio::test]
async fn test_no_event_without_change() {
    let state = StateManager::new();
    let mut rx = state.subscribe();

    let changes = state.update(|s| s.phase = Phase::Idle);

    assert!(changes.is_empty());
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn test_download_progress_events() {
    let state = StateManager::new();
    state.begin_downloads(2);
    let mut rx = state.subscribe();

    let mut snapshot = DownloadState::pending("kext:Lilu.kext", 1000);
    snapshot.start(Some(2000));
    snapshot.record_chunk(500, Duration::from_millis(250));
    state.record_download(snapshot.clone());
    state.set_overall_progress(1, 2);

    assert_eq!(next_event(&mut rx).await, StateChange::AssetProgress(snapshot));
    assert_eq!(
        next_event(&mut rx).await,
        StateChange::OverallProgress {
            completed: 1,
            total: 2
        }
    );

    let current = state.snapshot();
    assert_eq!(current.downloads["kext:Lilu.kext"].downloaded_bytes, 500);
    assert_eq!(current.overall_percent(), 50.0);
}

#[tokio::test]
async fn test_generation_workflow_events() {
    let state = StateManager::new();
    let mut rx = state.subscribe();

    state.set_phase(Phase::Configuring);
    state.set_step(Step::Configure, StepStatus::InProgress);
    state.set_phase(Phase::Confirming);
    state.set_phase(Phase::Downloading);
    state.set_phase(Phase::Packaging);
    state.set_artifact(ArtifactInfo {
        file_name: "OpenCore-EFI-Intel.zip".to_string(),
        size_bytes: 2048,
        entry_count: 12,
    });
    state.set_phase(Phase::Completed);

    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }

    assert_eq!(events.len(), 7);
    assert_eq!(
        events[1],
        StateChange::StepUpdated {
            step: Step::Configure,
            status: StepStatus::InProgress
        }
    );
    assert_eq!(
        events[5],
        StateChange::ArtifactReady {
            file_name: "OpenCore-EFI-Intel.zip".to_string(),
            size_bytes: 2048
        }
    );
    assert_eq!(
        events[6],
        StateChange::PhaseChanged {
            from: Phase::Packaging,
            to: Phase::Completed
        }
    );
}

#[tokio::test]
async fn test_concurrent_state_access() {
    let state = Arc::new(StateManager::new());
    state.begin_downloads(10);

    // Each task records its own asset
    let mut handles = vec![];
    for i in 0..10 {
        let state_clone = state.clone();
        let handle = tokio::spawn(async move {
            let mut snapshot = DownloadState::pending(format!("kext:Kext{}.kext", i), 100);
            snapshot.complete();
            state_clone.record_download(snapshot);
        });
        handles.push(handle);
    }

    for handle in handles {
        handle.await.unwrap();
    }

    let downloads = state.read(|s| s.downloads.len());
    assert_eq!(downloads, 10);
}

#[tokio::test]
async fn test_fail_and_reset() {
    let state = StateManager::new();
    state.set_phase(Phase::Configuring);
    state.set_phase(Phase::Confirming);
    state.set_phase(Phase::Downloading);
    state.add_warning("Packaged without 1 asset(s)");
    let mut rx = state.subscribe();

    state.fail("1 download(s) failed", vec!["core:OpenCore.efi".to_string()]);

    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    assert!(events.contains(&StateChange::Failed {
        phase: Phase::Downloading,
        message: "1 download(s) failed".to_string(),
    }));
    assert!(events.contains(&StateChange::StepUpdated {
        step: Step::Download,
        status: StepStatus::Error,
    }));

    let failed = state.snapshot();
    assert_eq!(failed.phase, Phase::Error);
    assert_eq!(failed.failed_phase, Some(Phase::Downloading));
    assert_eq!(failed.warnings.len(), 1);

    let changes = state.reset();
    assert_eq!(changes.last(), Some(&StateChange::StateReset));

    let reset = state.snapshot();
    assert_eq!(reset.phase, Phase::Configuring);
    assert!(reset.error.is_none());
    assert!(reset.failed_phase.is_none());
    assert!(reset.warnings.is_empty());
    assert!(reset.failed_assets.is_empty());
}

#[tokio::test]
async fn test_clones_share_state() {
    let state = StateManager::new();
    let clone = state.clone();
    let mut rx = state.subscribe();

    clone.set_phase(Phase::Configuring);

    assert_eq!(state.read(|s| s.phase), Phase::Configuring);
    assert!(matches!(
        next_event(&mut rx).await,
        StateChange::PhaseChanged { .. }
    ));
}
