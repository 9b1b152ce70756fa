//! Background tasks used by the UI for refreshing the dock inventory and
//! running updates without blocking the UI thread.
//!
//! Workers communicate through the channels owned by `GuiState`; they only
//! take the state lock briefly to publish results, never while blocking on
//! an external command.

use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use crate::dock;
use crate::errors::UpdateError;
use crate::managers::{CancelToken, SystemRunner};
use crate::orchestrator::{RunTimeout, perform_updates};
use crate::types::{ProgressUpdate, RunEvent, RunOutcome, TaskKind};

use super::GuiState;

/// Spawn a background task to re-read the pinned apps from the dock plist.
pub fn spawn_refresh_apps(state_arc: Arc<Mutex<GuiState>>) {
    let tx = { state_arc.lock().unwrap().progress_tx.clone() };
    thread::spawn(move || {
        let _ = tx.send(ProgressUpdate {
            kind: TaskKind::RefreshApps,
            message: "Refreshing app list...".into(),
            finished: false,
            error: None,
        });
        log::info!("refreshing dock inventory");

        match dock::list_entries() {
            Ok(apps) => {
                let count = apps.len();
                {
                    let mut s = state_arc.lock().unwrap();
                    s.apps = apps;
                }
                log::info!("found {count} non-native app(s) in the dock");
                let _ = tx.send(ProgressUpdate {
                    kind: TaskKind::RefreshApps,
                    message: format!("Found {count} non-native apps"),
                    finished: true,
                    error: None,
                });
            }
            Err(e) => {
                log::error!("{e}");
                let _ = tx.send(ProgressUpdate {
                    kind: TaskKind::RefreshApps,
                    message: "Refresh failed.".into(),
                    finished: true,
                    error: Some(e.to_string()),
                });
            }
        }
    });
}

/// Spawn an update run for the given app names.
///
/// Claims the single run slot first; the slot is released when the worker
/// finishes, whatever the terminal state. The run-wide timeout timer is
/// armed here and retired on every exit path.
pub fn spawn_update_run(state_arc: Arc<Mutex<GuiState>>, names: Vec<String>) {
    if names.is_empty() {
        state_arc.lock().unwrap().status = "No apps to update".into();
        return;
    }

    let (credential, run_tx, orchestrator, budget_secs, policy) = {
        let s = state_arc.lock().unwrap();
        (
            s.credential.clone(),
            s.run_tx.clone(),
            s.orchestrator.clone(),
            s.config.run_timeout_secs,
            s.config.failure_policy,
        )
    };

    let Some(credential) = credential.filter(|c| !c.is_empty()) else {
        log::error!("{}", UpdateError::MissingCredential);
        state_arc.lock().unwrap().status = "Please set sudo credentials first".into();
        return;
    };

    let Some(guard) = orchestrator.try_begin() else {
        log::warn!("an update run is already active, ignoring trigger");
        return;
    };

    let cancel = CancelToken::default();
    {
        let mut s = state_arc.lock().unwrap();
        s.cancel = Some(cancel.clone());
        s.task_running = true;
        s.current_task = TaskKind::UpdateRun;
        s.status = "Updating apps...".into();
    }

    let timer = RunTimeout::arm(Duration::from_secs(budget_secs), cancel.clone());
    thread::spawn(move || {
        let runner = SystemRunner;
        let result = perform_updates(names, &credential, &runner, policy, &cancel, &run_tx);
        timer.disarm();
        if let Err(e) = result {
            // Precondition failure: no run started, but the UI still needs
            // its one Finished event to re-enable controls.
            let _ = run_tx.send(RunEvent::Finished(RunOutcome::Failed(e.to_string())));
        }
        drop(guard);
    });
}

/// Request cancellation of the active run. No-op when nothing is running.
pub fn force_stop(state_arc: &Arc<Mutex<GuiState>>) {
    let cancel = { state_arc.lock().unwrap().cancel.clone() };
    if let Some(cancel) = cancel {
        log::warn!("force stop requested");
        cancel.cancel();
    }
}
