// Pipeline integration tests for archpilot
//
// These drive the full phase list on a background thread with a recording
// runner and a scratch target root:
// - progress events arrive in phase order with rising fractions
// - the final event reports the outcome exactly once
// - failures halt the run and release the target
// - the durable log ends up inside the installed system

use std::path::Path;
use std::sync::Arc;

use archpilot::command_executor::RecordingRunner;
use archpilot::config::{BlockDevice, InstallConfig};
use archpilot::install_log::TARGET_LOG_PATH;
use archpilot::installer::cleanup;
use archpilot::installer::Installer;
use archpilot::process_guard;
use archpilot::progress::PhaseUpdate;
use archpilot::types::DesktopEnvironment;
use tempfile::tempdir;

// ============================================================================
// Helpers
// ============================================================================

fn base_config() -> InstallConfig {
    let mut cfg = InstallConfig::with_defaults("4G");
    cfg.device = Some(BlockDevice::new("sda"));
    cfg.hostname = "forge".into();
    cfg.timezone = "UTC".into();
    cfg.username = "alice".into();
    cfg.user_password = "hunter22".into();
    cfg.root_password = "toor1234".into();
    cfg
}

/// Run the pipeline to completion and return every event it sent
fn run(cfg: InstallConfig, runner: RecordingRunner, root: &Path) -> Vec<PhaseUpdate> {
    let installer = Installer::new(Arc::new(cfg), runner)
        .with_target_root(root)
        .with_log_path(root.with_extension("log"));
    let (rx, handle) = installer.spawn().expect("spawn installer thread");
    let updates: Vec<PhaseUpdate> = rx.collect();
    handle.join().expect("installer thread");
    updates
}

fn started(updates: &[PhaseUpdate]) -> Vec<&PhaseUpdate> {
    updates
        .iter()
        .filter(|u| u.phase.is_some() && u.error.is_none())
        .collect()
}

// ============================================================================
// Successful runs
// ============================================================================

#[test]
fn test_minimal_run_completes_in_order() {
    let dir = tempdir().unwrap();
    let root = dir.path().join("target");
    let runner = RecordingRunner::new();
    let updates = run(base_config(), runner.clone(), &root);

    let names: Vec<&str> = started(&updates).iter().map(|u| u.description.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "Preparing system",
            "Partitioning disk",
            "Configuring btrfs subvolumes",
            "Installing base system",
            "Configuring system",
            "Setting up ZRAM swap",
            "Installing bootloader",
            "Enabling services",
            "Installing software",
        ]
    );

    let last = updates.last().unwrap();
    assert!(last.done);
    assert!(last.error.is_none());
    assert_eq!(updates.iter().filter(|u| u.is_terminal()).count(), 1);

    let lines = runner.command_lines();
    assert!(lines.iter().any(|l| l == "sgdisk --zap-all /dev/sda"));
    assert!(lines.iter().any(|l| l.starts_with("pacstrap ")));
    assert!(!lines.iter().any(|l| l.contains("cryptsetup")));
}

#[test]
fn test_fractions_rise_from_zero_below_one() {
    let dir = tempdir().unwrap();
    let updates = run(base_config(), RecordingRunner::new(), &dir.path().join("target"));

    let fractions: Vec<f64> = started(&updates).iter().filter_map(|u| u.fraction).collect();
    assert_eq!(fractions.first(), Some(&0.0));
    assert!(fractions.windows(2).all(|w| w[0] < w[1]));
    assert!(fractions.iter().all(|f| *f < 1.0));
}

#[test]
fn test_full_run_writes_target_files_and_copies_log() {
    let dir = tempdir().unwrap();
    let root = dir.path().join("target");
    let mut cfg = base_config();
    cfg.sshd = true;
    cfg.ssh_pubkey = "ssh-ed25519 AAAAC3NzaC1lZDI1NTE5AAAAIHk alice@laptop".into();
    cfg.docker = true;
    cfg.docker_group = true;
    cfg.desktop = DesktopEnvironment::Kde;

    let runner = RecordingRunner::new();
    let updates = run(cfg, runner.clone(), &root);
    assert!(updates.last().unwrap().done);

    let names: Vec<&str> = started(&updates).iter().map(|u| u.description.as_str()).collect();
    assert!(names.contains(&"Configuring SSH server"));
    assert!(names.contains(&"Installing Docker"));
    assert!(names.contains(&"Installing desktop environment"));

    assert_eq!(std::fs::read_to_string(root.join("etc/hostname")).unwrap(), "forge\n");
    let keys = std::fs::read_to_string(root.join("home/alice/.ssh/authorized_keys")).unwrap();
    assert!(keys.starts_with("ssh-ed25519 "));

    let copied = std::fs::read_to_string(root.join(TARGET_LOG_PATH)).unwrap();
    assert!(copied.contains("device=/dev/sda"));

    let lines = runner.command_lines();
    assert!(lines.iter().any(|l| l.ends_with("systemctl enable sddm")));
    assert!(lines.iter().any(|l| l.ends_with("usermod -aG docker alice")));
}

#[test]
fn test_log_is_in_target_before_done_is_reported() {
    let dir = tempdir().unwrap();
    let root = dir.path().join("target");
    let installer = Installer::new(Arc::new(base_config()), RecordingRunner::new())
        .with_target_root(&root)
        .with_log_path(root.with_extension("log"));
    let (rx, handle) = installer.spawn().expect("spawn installer thread");

    let mut saw_done = false;
    for update in rx {
        if update.done {
            saw_done = true;
            assert!(root.join(TARGET_LOG_PATH).exists());
        }
    }
    handle.join().expect("installer thread");
    assert!(saw_done);
}

#[test]
fn test_secrets_never_reach_argv() {
    let dir = tempdir().unwrap();
    let mut cfg = base_config();
    cfg.encrypt = true;
    cfg.luks_passphrase = "correct horse battery".into();

    let runner = RecordingRunner::new();
    let updates = run(cfg, runner.clone(), &dir.path().join("target"));
    assert!(updates.last().unwrap().done);

    for line in runner.command_lines() {
        assert!(!line.contains("correct horse battery"), "passphrase in argv: {}", line);
        assert!(!line.contains("hunter22"), "password in argv: {}", line);
        assert!(!line.contains("toor1234"), "password in argv: {}", line);
    }
}

// ============================================================================
// Failures and cleanup
// ============================================================================

#[test]
fn test_failure_halts_and_releases_target() {
    let dir = tempdir().unwrap();
    let root = dir.path().join("target");
    let mut cfg = base_config();
    cfg.encrypt = true;
    cfg.luks_passphrase = "correct horse battery".into();

    let runner = RecordingRunner::new().fail_on("mkfs.btrfs");
    let updates = run(cfg, runner.clone(), &root);

    let last = updates.last().unwrap();
    assert_eq!(last.description, "Setting up LUKS encryption");
    assert!(last.error.as_deref().unwrap().contains("mkfs.btrfs"));
    assert!(!updates.iter().any(|u| u.done));

    let lines = runner.command_lines();
    assert!(!lines.iter().any(|l| l.starts_with("pacstrap")));
    let root_mount = format!("umount -l {}", root.display());
    assert!(lines.iter().any(|l| *l == root_mount));
    assert_eq!(lines.last().map(String::as_str), Some("cryptsetup close cryptroot"));
}

#[test]
fn test_abort_hooks_release_target() {
    process_guard::clear_abort_hooks();
    let runner = RecordingRunner::new();
    process_guard::on_abort(cleanup::abort_hook(runner.clone(), "/mnt".into(), true));

    process_guard::run_abort_hooks();
    let lines = runner.command_lines();
    assert_eq!(lines.first().map(String::as_str), Some("umount -l /mnt/boot"));
    assert!(lines.contains(&"umount -l /mnt".to_string()));
    assert_eq!(lines.last().map(String::as_str), Some("cryptsetup close cryptroot"));

    // Hooks are consumed
    process_guard::run_abort_hooks();
    assert_eq!(runner.command_lines().len(), lines.len());
}
