//! Installer
//!
//! Binds a frozen [`InstallConfig`] to the standard phase list and runs it on a
//! background thread. The outcome is reported only through the progress
//! channel. After a failed phase the target is released (mounts, LUKS); after
//! a full run the durable log is copied into the installed system.

pub mod cleanup;
pub mod luks;
pub mod phases;
pub mod pipeline;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{info, warn};

use crate::command_executor::{ExecContext, Executor, Runner};
use crate::config::InstallConfig;
use crate::error::{InstallerError, Result};
use crate::install_log::{DEFAULT_LOG_PATH, InstallLog, LogTag};
use crate::progress::{self, ProgressReceiver, ProgressSender};
use pipeline::{PhaseJournal, PipelineOutcome};

/// Mount point of the target system on the live medium
pub const DEFAULT_TARGET_ROOT: &str = "/mnt";

/// State threaded through every phase
pub struct PhaseContext<R: Runner> {
    pub cfg: Arc<InstallConfig>,
    pub exec: Executor<R>,
    progress: ProgressSender,
}

impl<R: Runner> PhaseContext<R> {
    pub fn new(cfg: Arc<InstallConfig>, exec: Executor<R>, progress: ProgressSender) -> Self {
        Self { cfg, exec, progress }
    }

    /// Show a line on the display and write it to the durable log
    pub fn say(&mut self, line: &str) {
        self.exec.log_mut().output(line);
        self.progress.log(line);
    }

    /// Absolute host path of `path` inside the target root
    pub fn target_path(&self, path: &str) -> PathBuf {
        self.exec.target_root().join(path.trim_start_matches('/'))
    }

    /// Run on the host and surface the last output line on the display
    pub fn host<S: AsRef<str>>(&mut self, program: &str, args: &[S]) -> Result<String> {
        let out = self.exec.run(ExecContext::Host, program, args)?;
        if let Some(last) = out.lines().rev().find(|l| !l.trim().is_empty()) {
            self.progress.log(last.trim().to_string());
        }
        Ok(out)
    }

    pub fn chroot<S: AsRef<str>>(&mut self, program: &str, args: &[S]) -> Result<String> {
        self.exec.run(ExecContext::Chroot, program, args)
    }

    pub fn chroot_shell(&mut self, script: &str) -> Result<String> {
        self.exec.shell(ExecContext::Chroot, script)
    }

    /// `pacman -S --noconfirm <packages>` inside the target
    pub fn pacman_install<S: AsRef<str>>(&mut self, packages: &[S]) -> Result<String> {
        let mut args = vec!["-S".to_string(), "--noconfirm".to_string()];
        args.extend(packages.iter().map(|p| p.as_ref().to_string()));
        self.chroot("pacman", &args)
    }

    /// Write a file inside the target, creating parent directories
    pub fn write_target_file(&mut self, path: &str, contents: impl AsRef<[u8]>) -> Result<()> {
        let full = self.target_path(path);
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&full, contents)
            .map_err(|e| InstallerError::general(format!("write {}: {}", full.display(), e)))?;
        self.exec.log_mut().line(&format!("wrote {}", path));
        Ok(())
    }

    /// Rewrite a file inside the target through `edit`.
    ///
    /// A missing file is an error on a live run. A dry run never populated
    /// the target, so the edit is only recorded there.
    pub fn edit_target_file(&mut self, path: &str, edit: impl FnOnce(String) -> String) -> Result<()> {
        let full = self.target_path(path);
        if !full.exists() && !self.exec.is_live() {
            self.exec.log_mut().line(&format!("would edit {}", path));
            return Ok(());
        }
        let content = fs::read_to_string(&full)
            .map_err(|e| InstallerError::general(format!("read {}: {}", full.display(), e)))?;
        let updated = edit(content);
        fs::write(&full, updated)
            .map_err(|e| InstallerError::general(format!("write {}: {}", full.display(), e)))?;
        self.exec.log_mut().line(&format!("edited {}", path));
        Ok(())
    }
}

impl<R: Runner> PhaseJournal for PhaseContext<R> {
    fn journal(&mut self, tag: LogTag, message: &str) {
        self.exec.log_mut().record(tag, message);
    }

    /// Copy the durable log into the installed system
    fn finish(&mut self) {
        let root = self.exec.target_root().to_path_buf();
        if let Err(e) = self.exec.log_mut().copy_into(&root) {
            warn!("Could not copy install log into target: {}", e);
        }
    }
}

/// A configured installation run
pub struct Installer<R: Runner> {
    cfg: Arc<InstallConfig>,
    runner: R,
    target_root: PathBuf,
    log_path: PathBuf,
}

impl<R: Runner + 'static> Installer<R> {
    pub fn new(cfg: Arc<InstallConfig>, runner: R) -> Self {
        Self {
            cfg,
            runner,
            target_root: PathBuf::from(DEFAULT_TARGET_ROOT),
            log_path: PathBuf::from(DEFAULT_LOG_PATH),
        }
    }

    pub fn with_target_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.target_root = root.into();
        self
    }

    pub fn with_log_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_path = path.into();
        self
    }

    pub fn target_root(&self) -> &Path {
        &self.target_root
    }

    /// Run every phase to completion or first failure.
    ///
    /// `progress` is dropped on return, closing the channel.
    pub fn run(self, progress: ProgressSender) {
        let log = InstallLog::open(&self.log_path, &self.cfg);
        let exec = Executor::new(self.runner, log, &self.target_root);
        let mut ctx = PhaseContext::new(Arc::clone(&self.cfg), exec, progress.clone());

        match phases::standard_pipeline::<R>().run(&mut ctx, &progress) {
            PipelineOutcome::Completed => info!("Installation finished"),
            PipelineOutcome::Failed { name, error, .. } => {
                warn!("Installation halted in {}: {}", name, error);
                cleanup::release_target(&mut ctx.exec, self.cfg.encrypt);
            }
        }
    }

    /// Start the run on its own thread and hand back the reading end.
    pub fn spawn(self) -> Result<(ProgressReceiver, JoinHandle<()>)> {
        let (tx, rx) = progress::channel();
        let handle = thread::Builder::new()
            .name("installer".to_string())
            .spawn(move || self.run(tx))?;
        Ok((rx, handle))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command_executor::RecordingRunner;
    use crate::config::BlockDevice;
    use crate::install_log::InstallLog;
    use tempfile::tempdir;

    fn context(root: &Path, runner: RecordingRunner) -> (PhaseContext<RecordingRunner>, ProgressReceiver) {
        let (tx, rx) = progress::channel();
        let mut cfg = InstallConfig::with_defaults("4G");
        cfg.device = Some(BlockDevice::new("sda"));
        let exec = Executor::new(runner, InstallLog::disabled(), root);
        (PhaseContext::new(Arc::new(cfg), exec, tx), rx)
    }

    #[test]
    fn test_target_path_is_rooted() {
        let dir = tempdir().unwrap();
        let (ctx, _rx) = context(dir.path(), RecordingRunner::new());
        assert_eq!(ctx.target_path("/etc/hostname"), dir.path().join("etc/hostname"));
    }

    #[test]
    fn test_write_and_edit_target_file() {
        let dir = tempdir().unwrap();
        let (mut ctx, _rx) = context(dir.path(), RecordingRunner::new());

        ctx.write_target_file("/etc/hostname", "arch\n").unwrap();
        ctx.edit_target_file("/etc/hostname", |s| s.replace("arch", "pilot"))
            .unwrap();
        assert_eq!(fs::read_to_string(dir.path().join("etc/hostname")).unwrap(), "pilot\n");
    }

    #[test]
    fn test_edit_missing_file_is_recorded_on_dry_run() {
        let dir = tempdir().unwrap();
        let (mut ctx, _rx) = context(dir.path(), RecordingRunner::new());
        assert!(ctx.edit_target_file("/etc/mkinitcpio.conf", |s| s).is_ok());
    }

    #[test]
    fn test_say_reaches_display() {
        let dir = tempdir().unwrap();
        let (mut ctx, rx) = context(dir.path(), RecordingRunner::new());
        ctx.say("Enabling NTP...");
        let update = rx.recv().unwrap();
        assert_eq!(update.log_line.as_deref(), Some("Enabling NTP..."));
    }

    #[test]
    fn test_host_output_tail_is_forwarded() {
        let dir = tempdir().unwrap();
        let runner = RecordingRunner::new().respond_to("pacstrap", "a\nb\nlast line\n\n");
        let (mut ctx, rx) = context(dir.path(), runner);
        ctx.host("pacstrap", &["/mnt", "base"]).unwrap();
        assert_eq!(rx.recv().unwrap().log_line.as_deref(), Some("last line"));
    }
}
