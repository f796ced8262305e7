//! command_executor.rs - Runs external actions on the host or inside the target root.
//!
//! Every phase of the installer funnels its external commands through
//! [`Executor`]. The executor wraps chroot invocations, records each run in the
//! durable [`InstallLog`] before returning, and turns a non-zero exit into an
//! [`InstallerError::CommandFailed`] carrying the captured output. No retries
//! happen here; a phase that wants one does it itself.
//!
//! Process spawning sits behind the [`Runner`] trait so the executor can be
//! driven by [`SystemRunner`] for real installs and by [`RecordingRunner`] for
//! `--dry-run` previews and tests.

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::{Arc, Mutex};
use strum::Display;
use tracing::{debug, info, warn};

use crate::error::{InstallerError, Result};
use crate::install_log::{InstallLog, LogTag};
use crate::process_guard::{self, CommandProcessGroup};

/// Jail-entry command for the secondary root
pub const CHROOT_COMMAND: &str = "arch-chroot";

/// Where an action runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum ExecContext {
    /// Directly on the live system
    Host,
    /// Inside the target root via `arch-chroot`
    Chroot,
}

/// A fully-resolved external action
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    /// Fed to the child's stdin. Never logged.
    pub stdin: Option<String>,
}

impl Invocation {
    pub fn new<S: AsRef<str>>(program: &str, args: &[S]) -> Self {
        Self {
            program: program.to_string(),
            args: args.iter().map(|a| a.as_ref().to_string()).collect(),
            stdin: None,
        }
    }

    pub fn with_stdin(mut self, input: impl Into<String>) -> Self {
        self.stdin = Some(input.into());
        self
    }

    /// Re-root the invocation inside `root` using the jail-entry command.
    pub fn in_chroot(self, root: &Path) -> Self {
        let mut args = Vec::with_capacity(self.args.len() + 2);
        args.push(root.display().to_string());
        args.push(self.program);
        args.extend(self.args);
        Self {
            program: CHROOT_COMMAND.to_string(),
            args,
            stdin: self.stdin,
        }
    }

    /// Shell-like rendering for logs and error messages
    pub fn command_line(&self) -> String {
        let mut parts = vec![self.program.clone()];
        for arg in &self.args {
            if arg.is_empty() || arg.contains(|c: char| c.is_whitespace() || c == '\'' || c == '"') {
                parts.push(format!("{:?}", arg));
            } else {
                parts.push(arg.clone());
            }
        }
        parts.join(" ")
    }
}

/// What a runner observed for one invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawOutput {
    pub success: bool,
    /// Exit condition as text, e.g. `exit status: 1`
    pub status: String,
    /// stdout followed by stderr
    pub output: String,
}

impl RawOutput {
    pub fn ok(output: impl Into<String>) -> Self {
        Self {
            success: true,
            status: "exit status: 0".to_string(),
            output: output.into(),
        }
    }
}

/// Spawns external actions and captures their output
pub trait Runner: Send {
    fn run(&mut self, invocation: &Invocation) -> io::Result<RawOutput>;

    /// False for runners that only record what would have happened
    fn is_live(&self) -> bool {
        true
    }
}

/// Runs actions as real child processes.
///
/// Each child gets its own process group and a parent-death signal, and is
/// tracked in the global child registry while it runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl Runner for SystemRunner {
    fn run(&mut self, invocation: &Invocation) -> io::Result<RawOutput> {
        let stdin = if invocation.stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        };
        let mut child = Command::new(&invocation.program)
            .args(&invocation.args)
            .stdin(stdin)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .in_new_process_group()
            .spawn()?;
        let pid = child.id();
        process_guard::register_child(pid);

        if let (Some(input), Some(mut pipe)) = (&invocation.stdin, child.stdin.take()) {
            // A child that exits early closes the pipe; its exit status reports the failure.
            if let Err(e) = pipe.write_all(input.as_bytes()) {
                debug!("stdin write to {} failed: {}", invocation.program, e);
            }
        }

        let output = child.wait_with_output();
        process_guard::unregister_child(pid);
        let output = output?;

        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        text.push_str(&String::from_utf8_lossy(&output.stderr));
        Ok(RawOutput {
            success: output.status.success(),
            status: output.status.to_string(),
            output: text,
        })
    }
}

/// Records invocations instead of executing them.
///
/// Used for `--dry-run` and as a test double. Clones share the same record.
/// Invocations whose command line contains a registered failure pattern
/// report `exit status: 1`; response patterns supply canned output.
#[derive(Debug, Clone, Default)]
pub struct RecordingRunner {
    calls: Arc<Mutex<Vec<Invocation>>>,
    failures: Vec<String>,
    responses: Vec<(String, String)>,
}

impl RecordingRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every invocation whose command line contains `pattern`
    pub fn fail_on(mut self, pattern: impl Into<String>) -> Self {
        self.failures.push(pattern.into());
        self
    }

    /// Answer invocations containing `pattern` with `output`
    pub fn respond_to(mut self, pattern: impl Into<String>, output: impl Into<String>) -> Self {
        self.responses.push((pattern.into(), output.into()));
        self
    }

    pub fn calls(&self) -> Vec<Invocation> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn command_lines(&self) -> Vec<String> {
        self.calls().iter().map(Invocation::command_line).collect()
    }
}

impl Runner for RecordingRunner {
    fn run(&mut self, invocation: &Invocation) -> io::Result<RawOutput> {
        let line = invocation.command_line();
        info!("[dry-run] {}", line);
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(invocation.clone());
        }

        if let Some(pattern) = self.failures.iter().find(|p| line.contains(p.as_str())) {
            return Ok(RawOutput {
                success: false,
                status: "exit status: 1".to_string(),
                output: format!("scripted failure ({})", pattern),
            });
        }
        let output = self
            .responses
            .iter()
            .find(|(p, _)| line.contains(p.as_str()))
            .map(|(_, out)| out.clone())
            .unwrap_or_default();
        Ok(RawOutput::ok(output))
    }

    fn is_live(&self) -> bool {
        false
    }
}

/// Runs actions, logs them, and maps failures into [`InstallerError`]
pub struct Executor<R: Runner> {
    runner: R,
    log: InstallLog,
    target_root: PathBuf,
}

impl<R: Runner> Executor<R> {
    pub fn new(runner: R, log: InstallLog, target_root: impl Into<PathBuf>) -> Self {
        Self {
            runner,
            log,
            target_root: target_root.into(),
        }
    }

    /// Root that chroot invocations enter
    pub fn target_root(&self) -> &Path {
        &self.target_root
    }

    pub fn log_mut(&mut self) -> &mut InstallLog {
        &mut self.log
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Whether actions really execute
    pub fn is_live(&self) -> bool {
        self.runner.is_live()
    }

    /// Run `program args...` and return its captured output.
    pub fn run<S: AsRef<str>>(&mut self, ctx: ExecContext, program: &str, args: &[S]) -> Result<String> {
        self.execute(ctx, Invocation::new(program, args))
    }

    /// Run a compound shell command as a single action.
    pub fn shell(&mut self, ctx: ExecContext, script: &str) -> Result<String> {
        self.execute(ctx, Invocation::new("bash", &["-c", script]))
    }

    /// Run `program args...` with `input` on stdin. The input is never logged.
    pub fn run_with_input<S: AsRef<str>>(
        &mut self,
        ctx: ExecContext,
        program: &str,
        args: &[S],
        input: &str,
    ) -> Result<String> {
        self.execute(ctx, Invocation::new(program, args).with_stdin(input))
    }

    fn execute(&mut self, ctx: ExecContext, invocation: Invocation) -> Result<String> {
        let invocation = match ctx {
            ExecContext::Host => invocation,
            ExecContext::Chroot => invocation.in_chroot(&self.target_root),
        };
        let line = invocation.command_line();
        self.log.record(LogTag::Run, &format!("[{}] {}", ctx, line));
        debug!("Executing [{}] {}", ctx, line);

        match self.runner.run(&invocation) {
            Ok(raw) => {
                self.log.output(&raw.output);
                if raw.success {
                    Ok(raw.output)
                } else {
                    warn!("Command failed ({}): {}", raw.status, line);
                    Err(InstallerError::command_failed(line, raw.status, raw.output.trim()))
                }
            }
            Err(e) => {
                self.log.output(&e.to_string());
                warn!("Command could not be started: {}: {}", line, e);
                Err(InstallerError::command_failed(line, "failed to start", e.to_string()))
            }
        }
    }
}
