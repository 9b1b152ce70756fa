//! Package-manager integrations and the process-execution seam.
//!
//! Four host package managers are recognized, always probed and invoked in
//! the same fixed priority order. pip3 is read-only by policy: its outdated
//! list is reported but never auto-applied, so a broken Python upgrade can
//! never take the host environment down with it.

use std::fmt;
use std::io::{Read, Write};
use std::process::{Command, Stdio};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// The recognized package managers, in invocation priority order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ManagerKind {
    Homebrew,
    MacPorts,
    Pip3,
    Npm,
}

impl ManagerKind {
    /// Probe and invocation order. Significant: pip3 sits before npm so its
    /// outdated report lands in the log even when npm later fails.
    pub const PRIORITY_ORDER: [ManagerKind; 4] = [
        ManagerKind::Homebrew,
        ManagerKind::MacPorts,
        ManagerKind::Pip3,
        ManagerKind::Npm,
    ];

    /// Executable resolved on the search path by the presence probe.
    pub fn executable(self) -> &'static str {
        match self {
            ManagerKind::Homebrew => "brew",
            ManagerKind::MacPorts => "port",
            ManagerKind::Pip3 => "pip3",
            ManagerKind::Npm => "npm",
        }
    }

    /// Update subcommands, run in order. A step failure aborts the remaining
    /// steps of the same manager.
    pub fn steps(self) -> &'static [CommandStep] {
        match self {
            ManagerKind::Homebrew => const {
                &[
                    CommandStep::new("brew", &["update"]),
                    CommandStep::new("brew", &["upgrade"]),
                    CommandStep::new("brew", &["upgrade", "--cask"]),
                ]
            },
            ManagerKind::MacPorts => const {
                &[
                    CommandStep::privileged("port", &["selfupdate"]),
                    CommandStep::privileged("port", &["upgrade", "outdated"]),
                ]
            },
            ManagerKind::Pip3 => const {
                &[CommandStep::new(
                    "pip3",
                    &["list", "--outdated", "--format=freeze"],
                )]
            },
            ManagerKind::Npm => const { &[CommandStep::new("npm", &["update", "-g"])] },
        }
    }

    /// Whether a successful invocation actually mutates host packages.
    /// pip3 only reports, so it never counts towards a completed run.
    pub fn applies_updates(self) -> bool {
        !matches!(self, ManagerKind::Pip3)
    }
}

impl fmt::Display for ManagerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ManagerKind::Homebrew => "Homebrew",
            ManagerKind::MacPorts => "MacPorts",
            ManagerKind::Pip3 => "pip3",
            ManagerKind::Npm => "npm",
        };
        f.write_str(name)
    }
}

/// One external command invocation. Privileged steps are wrapped in
/// `sudo -S` with the cached credential piped to stdin.
#[derive(Clone, Copy, Debug)]
pub struct CommandStep {
    pub program: &'static str,
    pub args: &'static [&'static str],
    pub privileged: bool,
}

impl CommandStep {
    const fn new(program: &'static str, args: &'static [&'static str]) -> Self {
        Self {
            program,
            args,
            privileged: false,
        }
    }

    const fn privileged(program: &'static str, args: &'static [&'static str]) -> Self {
        Self {
            program,
            args,
            privileged: true,
        }
    }
}

/// Cooperative cancellation shared between the UI thread, the timeout timer,
/// and the update worker. Cancellation takes effect between command
/// boundaries; an in-flight child is killed by the runner's wait loop.
#[derive(Clone, Default)]
pub struct CancelToken {
    inner: Arc<CancelInner>,
}

#[derive(Default)]
struct CancelInner {
    cancelled: AtomicBool,
    timed_out: AtomicBool,
}

impl CancelToken {
    /// User-triggered force stop.
    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);
    }

    /// Cancellation requested by the run-wide timeout timer.
    pub fn cancel_timed_out(&self) {
        self.inner.timed_out.store(true, Ordering::SeqCst);
        self.inner.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    pub fn is_timed_out(&self) -> bool {
        self.inner.timed_out.load(Ordering::SeqCst)
    }
}

#[derive(Clone, Debug, Default)]
pub struct CommandOutput {
    pub stdout: String,
}

/// Why a single step did not succeed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StepError {
    /// The cancel token fired while the command was pending or in flight.
    Cancelled,
    /// Spawn failure or non-zero exit, with the captured error text.
    Failed(String),
}

/// Seam between the orchestrator and the host. The production impl shells
/// out; tests substitute a stub that records calls.
pub trait CommandRunner: Send + Sync {
    /// Presence check: is `executable` resolvable on the search path?
    fn probe(&self, executable: &str) -> bool;

    /// Run one step to completion, blocking. Must honor `cancel` by killing
    /// the child and reporting `StepError::Cancelled`.
    fn run(
        &self,
        step: &CommandStep,
        credential: Option<&str>,
        cancel: &CancelToken,
    ) -> Result<CommandOutput, StepError>;
}

/// Blocking `std::process` runner used outside of tests.
pub struct SystemRunner;

impl SystemRunner {
    const POLL_INTERVAL: Duration = Duration::from_millis(50);
}

impl CommandRunner for SystemRunner {
    fn probe(&self, executable: &str) -> bool {
        Command::new("/usr/bin/which")
            .arg(executable)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    }

    fn run(
        &self,
        step: &CommandStep,
        credential: Option<&str>,
        cancel: &CancelToken,
    ) -> Result<CommandOutput, StepError> {
        let mut cmd = if step.privileged {
            let mut c = Command::new("sudo");
            c.arg("-S").arg(step.program).args(step.args);
            c
        } else {
            let mut c = Command::new(step.program);
            c.args(step.args);
            c
        };
        cmd.stdin(if step.privileged {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

        let mut child = cmd
            .spawn()
            .map_err(|e| StepError::Failed(format!("failed to spawn {}: {e}", step.program)))?;

        if step.privileged
            && let Some(secret) = credential
            && let Some(mut stdin) = child.stdin.take()
        {
            // Best effort; sudo may have a cached ticket and never read it.
            let _ = writeln!(stdin, "{secret}");
        }

        // Drain pipes on helper threads so a chatty command cannot fill a
        // pipe buffer and deadlock the wait loop below.
        let stdout_pipe = child.stdout.take();
        let stdout_thread = thread::spawn(move || read_all(stdout_pipe));
        let stderr_pipe = child.stderr.take();
        let stderr_thread = thread::spawn(move || read_all(stderr_pipe));

        let status = loop {
            if cancel.is_cancelled() {
                let _ = child.kill();
                let _ = child.wait();
                let _ = stdout_thread.join();
                let _ = stderr_thread.join();
                return Err(StepError::Cancelled);
            }
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => thread::sleep(Self::POLL_INTERVAL),
                Err(e) => {
                    let _ = child.kill();
                    return Err(StepError::Failed(format!(
                        "failed to wait for {}: {e}",
                        step.program
                    )));
                }
            }
        };

        let stdout = stdout_thread.join().unwrap_or_default();
        let stderr = stderr_thread.join().unwrap_or_default();

        if status.success() {
            Ok(CommandOutput { stdout })
        } else {
            Err(StepError::Failed(format!(
                "`{} {}` exited with {}: {}",
                step.program,
                step.args.join(" "),
                status,
                stderr.trim()
            )))
        }
    }
}

fn read_all<R: Read>(pipe: Option<R>) -> String {
    let mut buf = String::new();
    if let Some(mut pipe) = pipe {
        let _ = pipe.read_to_string(&mut buf);
    }
    buf
}
