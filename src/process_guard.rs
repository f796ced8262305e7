//! Child process lifecycle and abort handling
//!
//! External actions run in their own process group with a parent-death
//! signal, and their PIDs are tracked here while they run. When the installer
//! is interrupted (SIGINT, SIGTERM, SIGHUP) the signal thread:
//!
//! 1. sends SIGTERM to every tracked process group, then SIGKILL after a grace period
//! 2. runs the registered abort hooks (unmounting the target, closing LUKS)
//! 3. exits with `128 + signal`
//!
//! A half-finished `sgdisk` or `pacstrap` must never outlive the installer.

use nix::libc;
use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, OnceLock};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

static CHILD_REGISTRY: OnceLock<Arc<Mutex<ChildRegistry>>> = OnceLock::new();

type AbortHook = Box<dyn Fn() + Send>;

static ABORT_HOOKS: OnceLock<Mutex<Vec<AbortHook>>> = OnceLock::new();

/// PIDs of running external actions
#[derive(Debug, Default)]
pub struct ChildRegistry {
    pids: HashSet<u32>,
    /// Set once termination has started so a second signal does not repeat it
    terminating: bool,
}

impl ChildRegistry {
    /// The process-wide registry
    pub fn global() -> Arc<Mutex<ChildRegistry>> {
        CHILD_REGISTRY
            .get_or_init(|| Arc::new(Mutex::new(ChildRegistry::default())))
            .clone()
    }

    pub fn register(&mut self, pid: u32) {
        self.pids.insert(pid);
        debug!("Tracking child PID {}", pid);
    }

    pub fn unregister(&mut self, pid: u32) {
        self.pids.remove(&pid);
        debug!("Child PID {} finished", pid);
    }

    pub fn count(&self) -> usize {
        self.pids.len()
    }

    /// SIGTERM every tracked process group, wait up to `grace`, then SIGKILL
    /// whatever is left.
    pub fn terminate_all(&mut self, grace: Duration) {
        if self.terminating {
            return;
        }
        self.terminating = true;
        if self.pids.is_empty() {
            return;
        }

        let pids: Vec<u32> = self.pids.iter().copied().collect();
        info!("Terminating {} running command(s)", pids.len());
        for &pid in &pids {
            signal_group_or_process(pid, Signal::SIGTERM);
        }

        let start = Instant::now();
        while start.elapsed() < grace {
            if pids.iter().all(|&pid| !is_process_alive(pid)) {
                self.pids.clear();
                return;
            }
            std::thread::sleep(Duration::from_millis(100));
        }

        for &pid in pids.iter().filter(|&&pid| is_process_alive(pid)) {
            warn!("PID {} ignored SIGTERM, sending SIGKILL", pid);
            signal_group_or_process(pid, Signal::SIGKILL);
        }
        self.pids.clear();
    }
}

/// Track a spawned child in the global registry
pub fn register_child(pid: u32) {
    if let Ok(mut registry) = ChildRegistry::global().lock() {
        registry.register(pid);
    }
}

/// Stop tracking a child that has exited
pub fn unregister_child(pid: u32) {
    if let Ok(mut registry) = ChildRegistry::global().lock() {
        registry.unregister(pid);
    }
}

/// Register work to run after children are terminated on an interrupting signal.
///
/// Hooks run once, in registration order. They must swallow their own errors.
pub fn on_abort(hook: impl Fn() + Send + 'static) {
    let hooks = ABORT_HOOKS.get_or_init(|| Mutex::new(Vec::new()));
    if let Ok(mut hooks) = hooks.lock() {
        hooks.push(Box::new(hook));
    }
}

/// Drop all registered abort hooks
pub fn clear_abort_hooks() {
    if let Some(hooks) = ABORT_HOOKS.get() {
        if let Ok(mut hooks) = hooks.lock() {
            hooks.clear();
        }
    }
}

/// Run and consume the registered abort hooks
pub fn run_abort_hooks() {
    let Some(hooks) = ABORT_HOOKS.get() else {
        return;
    };
    let pending = match hooks.lock() {
        Ok(mut hooks) => std::mem::take(&mut *hooks),
        Err(_) => return,
    };
    for hook in pending {
        hook();
    }
}

fn signal_group_or_process(pid: u32, sig: Signal) {
    // Negative PID addresses the whole process group
    if signal::kill(Pid::from_raw(-(pid as i32)), sig).is_err() {
        if let Err(e) = signal::kill(Pid::from_raw(pid as i32), sig) {
            debug!("{} to PID {} failed: {}", sig, pid, e);
        }
    }
}

/// Alive and not a zombie
fn is_process_alive(pid: u32) -> bool {
    if signal::kill(Pid::from_raw(pid as i32), None).is_err() {
        return false;
    }
    // Field 3 of /proc/<pid>/stat is the state letter
    match std::fs::read_to_string(format!("/proc/{}/stat", pid)) {
        Ok(stat) => stat
            .split_whitespace()
            .nth(2)
            .is_none_or(|state| !matches!(state, "Z" | "X")),
        Err(_) => true,
    }
}

/// Terminates tracked children when dropped
pub struct ProcessGuard {
    registry: Arc<Mutex<ChildRegistry>>,
}

impl ProcessGuard {
    pub fn new() -> Self {
        Self {
            registry: ChildRegistry::global(),
        }
    }
}

impl Default for ProcessGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ProcessGuard {
    fn drop(&mut self) {
        if let Ok(mut registry) = self.registry.lock() {
            registry.terminate_all(Duration::from_secs(5));
        }
    }
}

/// Install the SIGINT/SIGTERM/SIGHUP handler thread. Call once at startup.
pub fn init_signal_handlers() -> std::io::Result<()> {
    use signal_hook::consts::signal::{SIGHUP, SIGINT, SIGTERM};
    use signal_hook::iterator::Signals;

    let mut signals = Signals::new([SIGINT, SIGTERM, SIGHUP])?;
    std::thread::spawn(move || {
        if let Some(sig) = signals.forever().next() {
            let name = match sig {
                SIGINT => "SIGINT",
                SIGTERM => "SIGTERM",
                _ => "SIGHUP",
            };
            warn!("Received {}, aborting installation", name);

            if let Ok(mut registry) = ChildRegistry::global().lock() {
                registry.terminate_all(Duration::from_secs(3));
            }
            run_abort_hooks();
            let _ = crossterm::terminal::disable_raw_mode();
            let _ = crossterm::execute!(std::io::stdout(), crossterm::terminal::LeaveAlternateScreen);

            std::process::exit(128 + sig);
        }
    });
    Ok(())
}

/// Process-group setup for `std::process::Command`
pub trait CommandProcessGroup {
    /// Run the command as leader of a new process group that receives
    /// SIGTERM if the installer dies.
    fn in_new_process_group(&mut self) -> &mut Self;
}

impl CommandProcessGroup for std::process::Command {
    fn in_new_process_group(&mut self) -> &mut Self {
        use std::os::unix::process::CommandExt;
        // SAFETY: the closure only calls async-signal-safe setpgid and prctl.
        unsafe {
            self.pre_exec(|| {
                nix::unistd::setpgid(Pid::from_raw(0), Pid::from_raw(0))
                    .map_err(std::io::Error::other)?;
                if libc::prctl(libc::PR_SET_PDEATHSIG, libc::SIGTERM) == -1 {
                    return Err(std::io::Error::last_os_error());
                }
                Ok(())
            });
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::process::Command;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn wait_for_exit(child: &mut std::process::Child, timeout: Duration) -> bool {
        let start = Instant::now();
        while start.elapsed() < timeout {
            if let Ok(Some(_)) = child.try_wait() {
                return true;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        false
    }

    #[test]
    fn test_register_unregister() {
        let mut registry = ChildRegistry::default();
        registry.register(1234);
        registry.register(5678);
        assert_eq!(registry.count(), 2);
        registry.unregister(1234);
        assert_eq!(registry.count(), 1);
    }

    #[test]
    fn test_terminate_all_kills_process_group() {
        let mut child = Command::new("sh")
            .args(["-c", "sleep 60"])
            .in_new_process_group()
            .spawn()
            .unwrap();

        let mut registry = ChildRegistry::default();
        registry.register(child.id());
        registry.terminate_all(Duration::from_millis(500));

        assert!(wait_for_exit(&mut child, Duration::from_secs(3)));
        assert_eq!(registry.count(), 0);
    }

    #[test]
    fn test_terminate_all_runs_once() {
        let mut registry = ChildRegistry::default();
        registry.register(999_999);
        registry.terminate_all(Duration::from_millis(10));
        assert!(registry.terminating);

        registry.register(999_998);
        registry.terminate_all(Duration::from_millis(10));
        assert_eq!(registry.count(), 1);
    }

    #[test]
    fn test_nonexistent_pid_is_not_alive() {
        assert!(!is_process_alive(999_999));
    }

    #[test]
    fn test_abort_hooks_run_once() {
        static CALLS: AtomicUsize = AtomicUsize::new(0);
        on_abort(|| {
            CALLS.fetch_add(1, Ordering::SeqCst);
        });
        run_abort_hooks();
        run_abort_hooks();
        assert_eq!(CALLS.load(Ordering::SeqCst), 1);
    }
}
