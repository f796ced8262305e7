//! Best-effort release of the target after a failure or an abort.
//!
//! Every step is attempted regardless of earlier results and every error is
//! swallowed: cleanup must never mask the failure that triggered it.

use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::command_executor::{ExecContext, Executor, Runner};
use crate::config::LUKS_MAPPER_NAME;
use crate::install_log::InstallLog;

/// Mount points below the target root, deepest first
const NESTED_MOUNTS: [&str; 4] = ["boot", "home", "snapshots", "var/log"];

/// Unmount order for a target rooted at `root`
pub fn unmount_order(root: &Path) -> Vec<PathBuf> {
    let mut targets: Vec<PathBuf> = NESTED_MOUNTS.iter().map(|m| root.join(m)).collect();
    targets.push(root.to_path_buf());
    targets
}

/// Lazily unmount the target and close the LUKS mapping if one was opened
pub fn release_target<R: Runner>(exec: &mut Executor<R>, encrypted: bool) {
    info!("Releasing target mounts");
    for target in unmount_order(exec.target_root()) {
        let target = target.display().to_string();
        if let Err(e) = exec.run(ExecContext::Host, "umount", &["-l", target.as_str()]) {
            debug!("umount {} ignored: {}", target, e);
        }
    }
    if encrypted {
        if let Err(e) = exec.run(ExecContext::Host, "cryptsetup", &["close", LUKS_MAPPER_NAME]) {
            debug!("cryptsetup close ignored: {}", e);
        }
    }
}

/// Build a signal-time hook that releases the target with its own executor.
///
/// The hook does not write to the durable log; the pipeline thread owns it.
pub fn abort_hook<R>(runner: R, target_root: PathBuf, encrypted: bool) -> impl Fn() + Send + 'static
where
    R: Runner + Clone + 'static,
{
    move || {
        let mut exec = Executor::new(runner.clone(), InstallLog::disabled(), target_root.clone());
        release_target(&mut exec, encrypted);
    }
}
