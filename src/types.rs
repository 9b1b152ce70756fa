//! Core data types shared across the application.

use std::path::PathBuf;

/// Application pinned to the Dock, as discovered on the last refresh.
///
/// The inventory is rebuilt wholesale on every refresh; `selected` is
/// advisory UI state, only consulted when building an update request.
#[derive(Clone, Debug)]
pub struct AppEntry {
    pub name: String,
    pub path: PathBuf,
    pub version: String,
    pub selected: bool,
}

/// Kind of background task currently running.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TaskKind {
    Idle,
    RefreshApps,
    UpdateRun,
}

/// Progress update message sent from the inventory-refresh task to the UI.
#[derive(Clone, Debug)]
pub struct ProgressUpdate {
    pub kind: TaskKind,
    pub message: String,
    pub finished: bool,
    pub error: Option<String>,
}

/// Terminal state of an update run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RunOutcome {
    /// All available managers were attempted and at least one applied updates.
    Completed,
    Failed(String),
    Cancelled,
    TimedOut,
}

/// Message posted from the update worker back to the UI thread.
///
/// Exactly one `Finished` is emitted per run, whatever the terminal state.
#[derive(Clone, Debug)]
pub enum RunEvent {
    Progress(String),
    Finished(RunOutcome),
}
