//! Egui-based UI for the Dock App Updater.
//!
//! This module defines the application state, the eframe App implementation,
//! and wires UI actions to background tasks defined in ui::tasks. Worker
//! threads never touch egui state directly; everything arrives over the
//! progress, run-event, and log-mirror channels drained here.

use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use eframe::{App, egui};

use crate::config::Config;
use crate::credentials;
use crate::logger::{FileLogger, LogLine};
use crate::managers::CancelToken;
use crate::orchestrator::Orchestrator;
use crate::style::set_appkit_style;
use crate::types::{AppEntry, ProgressUpdate, RunEvent, RunOutcome, TaskKind};

pub mod panels;
pub mod tasks;

/// Countdown after a successful run before the app closes itself.
const AUTO_CLOSE_DELAY: Duration = Duration::from_secs(10);

/// Shared UI state synchronized across the UI thread and worker threads.
pub struct GuiState {
    pub apps: Vec<AppEntry>,
    pub credential: Option<String>,
    pub config: Config,
    pub logger: Arc<FileLogger>,

    // worker -> UI channels
    pub progress_tx: Sender<ProgressUpdate>,
    pub progress_rx: Receiver<ProgressUpdate>,
    pub run_tx: Sender<RunEvent>,
    pub run_rx: Receiver<RunEvent>,
    pub log_rx: Receiver<LogLine>,

    pub current_task: TaskKind,
    pub status: String,
    pub task_running: bool,

    // one-active-run guard and the active run's cancel token
    pub orchestrator: Orchestrator,
    pub cancel: Option<CancelToken>,

    pub close_deadline: Option<Instant>,

    // widget state
    pub log_lines: Vec<LogLine>,
    pub confirm_clear_file: bool,
    pub credential_input: String,
    pub log_path_input: String,
}

impl GuiState {
    pub fn new(config: Config, logger: Arc<FileLogger>, log_rx: Receiver<LogLine>) -> Self {
        let (progress_tx, progress_rx) = mpsc::channel();
        let (run_tx, run_rx) = mpsc::channel();

        let (credential, status) = match credentials::load() {
            Ok(Some(secret)) => {
                log::info!("sudo credentials loaded from keychain");
                (Some(secret), "Sudo credentials loaded from keychain".into())
            }
            Ok(None) => (
                None,
                "No sudo credentials found. Set them below to enable updates.".into(),
            ),
            Err(e) => {
                // Store unavailable is tolerated as an absent credential.
                log::warn!("{e}");
                (None, "Credential store unavailable".into())
            }
        };

        let log_path_input = logger.path().display().to_string();
        Self {
            apps: Vec::new(),
            credential,
            config,
            logger,
            progress_tx,
            progress_rx,
            run_tx,
            run_rx,
            log_rx,
            current_task: TaskKind::Idle,
            status,
            task_running: false,
            orchestrator: Orchestrator::default(),
            cancel: None,
            close_deadline: None,
            log_lines: Vec::new(),
            confirm_clear_file: false,
            credential_input: String::new(),
            log_path_input,
        }
    }
}

/// Main eframe application that renders and controls the UI.
pub struct DockUpdaterApp {
    pub state: Arc<Mutex<GuiState>>,
}

impl DockUpdaterApp {
    /// Start with a fresh state and immediately trigger an inventory refresh.
    pub fn new(config: Config, logger: Arc<FileLogger>, log_rx: Receiver<LogLine>) -> Self {
        let state = Arc::new(Mutex::new(GuiState::new(config, logger, log_rx)));
        tasks::spawn_refresh_apps(state.clone());
        Self { state }
    }

    /// Drain worker channels into the state. Returns true when a completed
    /// run wants the inventory re-read (spawned after the lock is released).
    fn drain_messages(&self, ctx: &egui::Context) -> bool {
        let mut needs_refresh = false;
        let mut s = self.state.lock().unwrap();

        while let Ok(line) = s.log_rx.try_recv() {
            s.log_lines.push(line);
        }

        while let Ok(update) = s.progress_rx.try_recv() {
            s.current_task = if update.finished {
                TaskKind::Idle
            } else {
                update.kind.clone()
            };
            s.task_running = !update.finished;
            s.status = match update.error {
                Some(err) => format!("Refresh failed: {err}"),
                None => update.message,
            };
        }

        while let Ok(event) = s.run_rx.try_recv() {
            match event {
                RunEvent::Progress(message) => s.status = message,
                RunEvent::Finished(outcome) => {
                    // Terminal: re-enable controls exactly once.
                    s.task_running = false;
                    s.current_task = TaskKind::Idle;
                    s.cancel = None;
                    match outcome {
                        RunOutcome::Completed => {
                            s.status = "Updates completed successfully!".into();
                            if s.config.auto_close_after_update {
                                s.close_deadline = Some(Instant::now() + AUTO_CLOSE_DELAY);
                            }
                            needs_refresh = true;
                        }
                        RunOutcome::Failed(reason) => {
                            s.status = format!("Update failed: {reason}");
                        }
                        RunOutcome::Cancelled => s.status = "Update run stopped.".into(),
                        RunOutcome::TimedOut => {
                            s.status = format!(
                                "Update run exceeded its {}s budget and was stopped.",
                                s.config.run_timeout_secs
                            );
                        }
                    }
                }
            }
        }

        // Auto-close countdown: any click, key press, or focus event cancels.
        let interacted = ctx.input(|i| {
            i.pointer.any_down()
                || i.events.iter().any(|e| {
                    matches!(
                        e,
                        egui::Event::Key { .. } | egui::Event::WindowFocused(true)
                    )
                })
        });
        if let Some(deadline) = s.close_deadline {
            if interacted {
                s.close_deadline = None;
                log::info!("auto-close cancelled by user interaction");
                s.status = "Auto-close cancelled.".into();
            } else if Instant::now() >= deadline {
                log::info!("closing after successful update run");
                ctx.send_viewport_cmd(egui::ViewportCommand::Close);
            } else {
                let remaining = (deadline - Instant::now()).as_secs() + 1;
                s.status = format!(
                    "Updates complete. Closing in {remaining}s unless you interact with the window."
                );
            }
        }

        needs_refresh
    }
}

impl App for DockUpdaterApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        #[cfg(target_os = "macos")]
        {
            use std::sync::Once;
            static SET_ICON_ONCE: Once = Once::new();
            SET_ICON_ONCE.call_once(|| {
                crate::osx::try_set_dock_icon_from_icns();
            });
        }
        set_appkit_style(ctx);

        if self.drain_messages(ctx) {
            tasks::spawn_refresh_apps(self.state.clone());
        }

        panels::top::show(ctx, &self.state);
        panels::bottom::show(ctx, &self.state);
        panels::side::show(ctx, &self.state);
        panels::central::show(ctx, &self.state);

        // keep countdown and progress updates smooth
        ctx.request_repaint_after(Duration::from_millis(100));
    }
}
