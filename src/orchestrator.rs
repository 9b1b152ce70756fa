//! Update orchestration: credential gating, manager detection, sequential
//! invocation, and the run lifecycle (completion, failure, force-stop,
//! timeout).
//!
//! The orchestrator runs entirely on a background worker thread and talks to
//! the UI only through `RunEvent` messages. At most one run may be active at
//! a time; `Orchestrator::try_begin` enforces that with an explicit guard
//! rather than relying on disabled controls alone.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::thread;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::errors::UpdateError;
use crate::managers::{CancelToken, CommandRunner, ManagerKind, StepError};
use crate::types::{RunEvent, RunOutcome};

/// Default wall-clock budget for one run, in seconds.
pub const DEFAULT_RUN_TIMEOUT_SECS: u64 = 300;

/// What a step failure does to the rest of the run.
///
/// `AbortRun` matches the historical behavior: the first failing manager
/// collapses the whole run to `Failed`. `IsolatePerManager` records the
/// failure and still attempts the remaining managers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    #[default]
    AbortRun,
    IsolatePerManager,
}

/// Per-manager result recorded on the run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ManagerOutcome {
    /// Updates applied (brew, port, npm).
    Succeeded,
    /// Ran to completion but only reported, never mutated (pip3).
    Reported,
    Failed(String),
}

/// Transient record of one update run, from trigger to terminal state.
#[derive(Debug)]
pub struct UpdateRun {
    pub requested: Vec<String>,
    pub outcomes: Vec<(ManagerKind, ManagerOutcome)>,
    pub started_at: Instant,
    pub cancelled: bool,
    pub timed_out: bool,
    pub outcome: RunOutcome,
}

impl UpdateRun {
    fn new(requested: Vec<String>) -> Self {
        Self {
            requested,
            outcomes: Vec::new(),
            started_at: Instant::now(),
            cancelled: false,
            timed_out: false,
            outcome: RunOutcome::Failed(String::new()),
        }
    }
}

/// Guard-issuing handle enforcing the one-active-run invariant.
#[derive(Clone, Default)]
pub struct Orchestrator {
    active: Arc<AtomicBool>,
}

impl Orchestrator {
    /// Claim the single run slot. Returns `None` while another run is active.
    pub fn try_begin(&self) -> Option<RunGuard> {
        self.active
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| RunGuard {
                active: self.active.clone(),
            })
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}

/// Releases the run slot on drop, so every exit path frees it exactly once.
pub struct RunGuard {
    active: Arc<AtomicBool>,
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.active.store(false, Ordering::SeqCst);
    }
}

/// One-shot run-wide timeout. On expiry it force-cancels the run through the
/// shared cancel token; disarming retires the timer thread.
pub struct RunTimeout {
    disarmed: Arc<AtomicBool>,
}

impl RunTimeout {
    const TICK: Duration = Duration::from_millis(25);

    pub fn arm(budget: Duration, cancel: CancelToken) -> Self {
        let disarmed = Arc::new(AtomicBool::new(false));
        let flag = disarmed.clone();
        thread::spawn(move || {
            let deadline = Instant::now() + budget;
            loop {
                if flag.load(Ordering::SeqCst) {
                    return;
                }
                let now = Instant::now();
                if now >= deadline {
                    break;
                }
                thread::sleep(Self::TICK.min(deadline - now));
            }
            if !flag.load(Ordering::SeqCst) {
                log::warn!("update run exceeded its {}s budget", budget.as_secs());
                cancel.cancel_timed_out();
            }
        });
        Self { disarmed }
    }

    pub fn disarm(&self) {
        self.disarmed.store(true, Ordering::SeqCst);
    }
}

impl Drop for RunTimeout {
    fn drop(&mut self) {
        self.disarm();
    }
}

/// Probe and invoke the recognized package managers in priority order.
///
/// Precondition: a non-empty credential. An empty one fails immediately with
/// `MissingCredential` and performs no invocation; the run never starts.
///
/// Emits `Progress` events while working and, once a run has started,
/// exactly one `Finished` event. Caller obligation: at most one run at a time (take a
/// `RunGuard` first) and keep the triggering controls disabled meanwhile.
pub fn perform_updates(
    requested: Vec<String>,
    credential: &str,
    runner: &dyn CommandRunner,
    policy: FailurePolicy,
    cancel: &CancelToken,
    events: &Sender<RunEvent>,
) -> Result<UpdateRun, UpdateError> {
    if credential.is_empty() {
        return Err(UpdateError::MissingCredential);
    }

    let mut run = UpdateRun::new(requested);
    log::info!(
        "starting update run for {} app(s): {}",
        run.requested.len(),
        run.requested.join(", ")
    );

    let mut any_applied = false;

    'managers: for manager in ManagerKind::PRIORITY_ORDER {
        if cancel.is_cancelled() {
            break;
        }
        if !runner.probe(manager.executable()) {
            log::debug!("{manager} not found on the search path, skipping");
            continue;
        }
        let _ = events.send(RunEvent::Progress(format!("Updating {manager} packages...")));
        log::info!("updating {manager} packages");

        for step in manager.steps() {
            let secret = step.privileged.then_some(credential);
            match runner.run(step, secret, cancel) {
                Ok(output) => {
                    if manager == ManagerKind::Pip3 && !output.stdout.trim().is_empty() {
                        log::info!(
                            "outdated Python packages (not auto-upgraded):\n{}",
                            output.stdout.trim()
                        );
                    }
                }
                Err(StepError::Cancelled) => break 'managers,
                Err(StepError::Failed(message)) => {
                    let error = UpdateError::ManagerInvocation { manager, message };
                    log::error!("{error}");
                    run.outcomes.push((
                        manager,
                        ManagerOutcome::Failed(error.to_string()),
                    ));
                    match policy {
                        FailurePolicy::AbortRun => {
                            return Ok(finish(run, RunOutcome::Failed(error.to_string()), events));
                        }
                        FailurePolicy::IsolatePerManager => continue 'managers,
                    }
                }
            }
        }

        if manager.applies_updates() {
            any_applied = true;
            run.outcomes.push((manager, ManagerOutcome::Succeeded));
        } else {
            run.outcomes.push((manager, ManagerOutcome::Reported));
        }
        log::info!("{manager} finished");
    }

    let outcome = if cancel.is_cancelled() {
        run.cancelled = true;
        run.timed_out = cancel.is_timed_out();
        if run.timed_out {
            RunOutcome::TimedOut
        } else {
            RunOutcome::Cancelled
        }
    } else if any_applied {
        RunOutcome::Completed
    } else {
        // Also reached when only pip3 is present: it reports but never
        // applies, so the run has nothing to show for itself.
        RunOutcome::Failed(UpdateError::NoManagersFound.to_string())
    };

    Ok(finish(run, outcome, events))
}

fn finish(mut run: UpdateRun, outcome: RunOutcome, events: &Sender<RunEvent>) -> UpdateRun {
    match &outcome {
        RunOutcome::Completed => log::info!(
            "update run completed in {:.1}s",
            run.started_at.elapsed().as_secs_f64()
        ),
        RunOutcome::Failed(reason) => log::error!("update run failed: {reason}"),
        RunOutcome::Cancelled => log::warn!("update run cancelled by user"),
        RunOutcome::TimedOut => log::warn!("update run timed out"),
    }
    run.outcome = outcome.clone();
    let _ = events.send(RunEvent::Finished(outcome));
    run
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::mpsc;

    use super::*;
    use crate::managers::{CommandOutput, CommandStep};

    /// Records every probe and invocation; configurable presence, failures,
    /// and per-step delay for cancellation tests.
    struct StubRunner {
        present: Vec<&'static str>,
        fail_step: Option<(&'static str, &'static str)>,
        delay: Duration,
        calls: Mutex<Vec<String>>,
    }

    impl StubRunner {
        fn with_present(present: &[&'static str]) -> Self {
            Self {
                present: present.to_vec(),
                fail_step: None,
                delay: Duration::ZERO,
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn invocations(&self) -> Vec<String> {
            self.calls()
                .into_iter()
                .filter(|c| !c.starts_with("which "))
                .collect()
        }
    }

    impl CommandRunner for StubRunner {
        fn probe(&self, executable: &str) -> bool {
            self.calls
                .lock()
                .unwrap()
                .push(format!("which {executable}"));
            self.present.contains(&executable)
        }

        fn run(
            &self,
            step: &CommandStep,
            credential: Option<&str>,
            cancel: &CancelToken,
        ) -> Result<CommandOutput, StepError> {
            assert_eq!(
                credential.is_some(),
                step.privileged,
                "credential must be supplied to privileged steps only"
            );
            self.calls
                .lock()
                .unwrap()
                .push(format!("{} {}", step.program, step.args.join(" ")));

            let deadline = Instant::now() + self.delay;
            while Instant::now() < deadline {
                if cancel.is_cancelled() {
                    return Err(StepError::Cancelled);
                }
                thread::sleep(Duration::from_millis(2));
            }
            if cancel.is_cancelled() {
                return Err(StepError::Cancelled);
            }

            if let Some((program, first_arg)) = self.fail_step
                && program == step.program
                && step.args.first() == Some(&first_arg)
            {
                return Err(StepError::Failed("boom".into()));
            }
            Ok(CommandOutput {
                stdout: format!("{} ok\n", step.program),
            })
        }
    }

    fn names() -> Vec<String> {
        vec!["Google Chrome".into(), "Slack".into()]
    }

    fn run_with(
        runner: &StubRunner,
        credential: &str,
        policy: FailurePolicy,
    ) -> (Result<UpdateRun, UpdateError>, Vec<RunEvent>) {
        let cancel = CancelToken::default();
        let (tx, rx) = mpsc::channel();
        let result = perform_updates(names(), credential, runner, policy, &cancel, &tx);
        drop(tx);
        (result, rx.iter().collect())
    }

    fn finished_events(events: &[RunEvent]) -> Vec<RunOutcome> {
        events
            .iter()
            .filter_map(|e| match e {
                RunEvent::Finished(outcome) => Some(outcome.clone()),
                RunEvent::Progress(_) => None,
            })
            .collect()
    }

    #[test]
    fn empty_credential_invokes_nothing() {
        let runner = StubRunner::with_present(&["brew", "port", "pip3", "npm"]);
        let (result, events) = run_with(&runner, "", FailurePolicy::AbortRun);
        assert_eq!(result.unwrap_err(), UpdateError::MissingCredential);
        assert!(runner.calls().is_empty());
        assert!(events.is_empty());
    }

    #[test]
    fn managers_run_in_priority_order_with_exact_subcommands() {
        let runner = StubRunner::with_present(&["brew", "port", "pip3", "npm"]);
        let (result, events) = run_with(&runner, "hunter2", FailurePolicy::AbortRun);

        let run = result.unwrap();
        assert_eq!(run.outcome, RunOutcome::Completed);
        assert_eq!(
            runner.calls(),
            [
                "which brew",
                "brew update",
                "brew upgrade",
                "brew upgrade --cask",
                "which port",
                "port selfupdate",
                "port upgrade outdated",
                "which pip3",
                "pip3 list --outdated --format=freeze",
                "which npm",
                "npm update -g",
            ]
        );
        assert_eq!(finished_events(&events), [RunOutcome::Completed]);
        assert_eq!(
            run.outcomes,
            [
                (ManagerKind::Homebrew, ManagerOutcome::Succeeded),
                (ManagerKind::MacPorts, ManagerOutcome::Succeeded),
                (ManagerKind::Pip3, ManagerOutcome::Reported),
                (ManagerKind::Npm, ManagerOutcome::Succeeded),
            ]
        );
    }

    #[test]
    fn no_managers_available_fails_without_invocations() {
        let runner = StubRunner::with_present(&[]);
        let (result, events) = run_with(&runner, "hunter2", FailurePolicy::AbortRun);

        let run = result.unwrap();
        assert_eq!(
            run.outcome,
            RunOutcome::Failed("no supported package managers found".into())
        );
        assert_eq!(
            runner.calls(),
            ["which brew", "which port", "which pip3", "which npm"]
        );
        assert!(runner.invocations().is_empty());
        assert_eq!(finished_events(&events).len(), 1);
    }

    #[test]
    fn pip3_alone_reports_but_cannot_complete_a_run() {
        let runner = StubRunner::with_present(&["pip3"]);
        let (result, _) = run_with(&runner, "hunter2", FailurePolicy::AbortRun);

        let run = result.unwrap();
        assert_eq!(
            runner.invocations(),
            ["pip3 list --outdated --format=freeze"]
        );
        assert_eq!(
            run.outcome,
            RunOutcome::Failed("no supported package managers found".into())
        );
    }

    #[test]
    fn abort_run_policy_stops_at_first_failing_manager() {
        let mut runner = StubRunner::with_present(&["brew", "npm"]);
        runner.fail_step = Some(("brew", "upgrade"));
        let (result, events) = run_with(&runner, "hunter2", FailurePolicy::AbortRun);

        let run = result.unwrap();
        assert_eq!(
            runner.invocations(),
            ["brew update", "brew upgrade"],
            "remaining brew steps and later managers must not run"
        );
        assert!(matches!(run.outcome, RunOutcome::Failed(ref r)
            if r.contains("Homebrew invocation failed")));
        assert_eq!(finished_events(&events).len(), 1);
    }

    #[test]
    fn isolate_policy_attempts_remaining_managers() {
        let mut runner = StubRunner::with_present(&["brew", "npm"]);
        runner.fail_step = Some(("brew", "update"));
        let (result, _) = run_with(&runner, "hunter2", FailurePolicy::IsolatePerManager);

        let run = result.unwrap();
        assert_eq!(runner.invocations(), ["brew update", "npm update -g"]);
        assert_eq!(run.outcome, RunOutcome::Completed);
        assert!(matches!(
            run.outcomes[0],
            (ManagerKind::Homebrew, ManagerOutcome::Failed(_))
        ));
    }

    #[test]
    fn force_stop_cancels_with_exactly_one_finished_event() {
        let runner = Arc::new(StubRunner {
            present: vec!["brew", "port", "pip3", "npm"],
            fail_step: None,
            delay: Duration::from_millis(200),
            calls: Mutex::new(Vec::new()),
        });
        let cancel = CancelToken::default();
        let (tx, rx) = mpsc::channel();

        let worker = {
            let runner = runner.clone();
            let cancel = cancel.clone();
            thread::spawn(move || {
                perform_updates(
                    names(),
                    "hunter2",
                    runner.as_ref(),
                    FailurePolicy::AbortRun,
                    &cancel,
                    &tx,
                )
            })
        };

        // Wait for the first progress message, then stop the run.
        let first = rx.recv().unwrap();
        assert!(matches!(first, RunEvent::Progress(_)));
        cancel.cancel();

        let run = worker.join().unwrap().unwrap();
        assert_eq!(run.outcome, RunOutcome::Cancelled);
        assert!(run.cancelled);
        assert!(!run.timed_out);

        let rest: Vec<RunEvent> = rx.iter().collect();
        assert_eq!(finished_events(&rest), [RunOutcome::Cancelled]);
    }

    #[test]
    fn exceeding_the_budget_times_the_run_out() {
        let runner = StubRunner {
            present: vec!["brew"],
            fail_step: None,
            delay: Duration::from_millis(300),
            calls: Mutex::new(Vec::new()),
        };
        let cancel = CancelToken::default();
        let timer = RunTimeout::arm(Duration::from_millis(40), cancel.clone());
        let (tx, _rx) = mpsc::channel();

        let run = perform_updates(
            names(),
            "hunter2",
            &runner,
            FailurePolicy::AbortRun,
            &cancel,
            &tx,
        )
        .unwrap();
        timer.disarm();

        assert_eq!(run.outcome, RunOutcome::TimedOut);
        assert!(run.cancelled && run.timed_out);
    }

    #[test]
    fn disarmed_timer_never_fires() {
        let cancel = CancelToken::default();
        let timer = RunTimeout::arm(Duration::from_millis(30), cancel.clone());
        timer.disarm();
        thread::sleep(Duration::from_millis(80));
        assert!(!cancel.is_cancelled());
    }

    #[test]
    fn single_run_guard_is_exclusive_until_dropped() {
        let orchestrator = Orchestrator::default();
        let guard = orchestrator.try_begin().expect("slot free");
        assert!(orchestrator.is_active());
        assert!(orchestrator.try_begin().is_none());
        drop(guard);
        assert!(!orchestrator.is_active());
        assert!(orchestrator.try_begin().is_some());
    }
}
