//! LUKS2 container setup and the boot configuration an encrypted root needs.

use super::PhaseContext;
use super::phases::ROOT_LABEL;
use crate::command_executor::{ExecContext, Runner};
use crate::config::{LUKS_MAPPER_DEVICE, LUKS_MAPPER_NAME};
use crate::error::{InstallerError, Result};

const STOCK_HOOKS: &str =
    "HOOKS=(base udev autodetect modconf kms keyboard keymap consolefont block filesystems fsck)";
const ENCRYPT_HOOKS: &str =
    "HOOKS=(base udev autodetect modconf kms keyboard keymap consolefont block encrypt filesystems fsck)";

/// Format the root partition as LUKS2, open it, and put btrfs on the mapping.
///
/// GRUB can only unlock pbkdf2 key slots, so argon2 is not used. The
/// passphrase goes through stdin.
pub fn setup<R: Runner>(ctx: &mut PhaseContext<R>) -> Result<()> {
    let cfg = ctx.cfg.clone();
    let root_part = cfg.target_device()?.root_partition();
    let input = format!("{}\n", cfg.luks_passphrase);

    ctx.say("Formatting LUKS2 partition (pbkdf2 for GRUB compatibility)...");
    ctx.exec.run_with_input(
        ExecContext::Host,
        "cryptsetup",
        &["luksFormat", "--batch-mode", "--type", "luks2", "--pbkdf", "pbkdf2", &root_part],
        &input,
    )?;

    ctx.say(&format!("Opening LUKS device as {}...", LUKS_MAPPER_NAME));
    ctx.exec.run_with_input(
        ExecContext::Host,
        "cryptsetup",
        &["open", root_part.as_str(), LUKS_MAPPER_NAME],
        &input,
    )?;

    ctx.say(&format!("Formatting {} as btrfs...", LUKS_MAPPER_DEVICE));
    ctx.host("mkfs.btrfs", &["-f", "-L", ROOT_LABEL, LUKS_MAPPER_DEVICE])?;
    Ok(())
}

/// Add the `encrypt` hook and the btrfs binary to an mkinitcpio.conf
pub fn patch_mkinitcpio(content: &str) -> String {
    content
        .replacen("BINARIES=()", "BINARIES=(btrfs)", 1)
        .replacen(STOCK_HOOKS, ENCRYPT_HOOKS, 1)
}

/// Point the kernel command line at the LUKS container and let GRUB unlock it
pub fn patch_grub_default(content: &str, uuid: &str) -> String {
    let cmdline = format!(
        "GRUB_CMDLINE_LINUX=\"cryptdevice=UUID={}:{} root={}\"",
        uuid, LUKS_MAPPER_NAME, LUKS_MAPPER_DEVICE
    );
    content
        .replacen("GRUB_CMDLINE_LINUX=\"\"", &cmdline, 1)
        .replacen("#GRUB_ENABLE_CRYPTODISK=y", "GRUB_ENABLE_CRYPTODISK=y", 1)
}

/// Runs inside the bootloader phase, before `grub-install`.
pub fn configure_boot<R: Runner>(ctx: &mut PhaseContext<R>) -> Result<()> {
    let root_part = ctx.cfg.target_device()?.root_partition();

    ctx.say("Getting UUID of encrypted partition...");
    let uuid = ctx
        .exec
        .run(ExecContext::Host, "blkid", &["-s", "UUID", "-o", "value", &root_part])?
        .trim()
        .to_string();
    if uuid.is_empty() && ctx.exec.is_live() {
        return Err(InstallerError::general(format!("blkid reported no UUID for {}", root_part)));
    }

    ctx.say("Configuring mkinitcpio for encryption...");
    ctx.edit_target_file("/etc/mkinitcpio.conf", |c| patch_mkinitcpio(&c))?;

    ctx.say("Regenerating initramfs...");
    ctx.chroot("mkinitcpio", &["-P"])?;

    ctx.say("Configuring GRUB for encrypted root...");
    ctx.edit_target_file("/etc/default/grub", |c| patch_grub_default(&c, &uuid))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command_executor::{Executor, RecordingRunner};
    use crate::config::{BlockDevice, InstallConfig};
    use crate::install_log::InstallLog;
    use crate::progress;
    use std::fs;
    use std::sync::Arc;
    use tempfile::tempdir;

    fn encrypted_config() -> InstallConfig {
        let mut cfg = InstallConfig::with_defaults("4G");
        cfg.device = Some(BlockDevice::new("sda"));
        cfg.encrypt = true;
        cfg.luks_passphrase = "correct horse".into();
        cfg
    }

    #[test]
    fn test_passphrase_only_on_stdin() {
        let dir = tempdir().unwrap();
        let runner = RecordingRunner::new();
        let (tx, _rx) = progress::channel();
        let exec = Executor::new(runner.clone(), InstallLog::disabled(), dir.path());
        let mut ctx = PhaseContext::new(Arc::new(encrypted_config()), exec, tx);

        setup(&mut ctx).unwrap();

        let calls = runner.calls();
        assert_eq!(calls.len(), 3);
        assert!(calls[0].args.contains(&"luksFormat".to_string()));
        assert!(calls[0].args.contains(&"/dev/sda2".to_string()));
        assert_eq!(calls[0].stdin.as_deref(), Some("correct horse\n"));
        assert_eq!(calls[1].args, vec!["open", "/dev/sda2", "cryptroot"]);
        assert_eq!(calls[2].command_line(), "mkfs.btrfs -f -L ArchRoot /dev/mapper/cryptroot");
        assert!(runner.command_lines().iter().all(|l| !l.contains("correct horse")));
    }

    #[test]
    fn test_patch_mkinitcpio() {
        let stock = format!("MODULES=()\nBINARIES=()\nFILES=()\n{}\n", STOCK_HOOKS);
        let patched = patch_mkinitcpio(&stock);
        assert!(patched.contains("BINARIES=(btrfs)"));
        assert!(patched.contains("block encrypt filesystems"));
    }

    #[test]
    fn test_patch_grub_default() {
        let stock = "GRUB_DEFAULT=0\nGRUB_CMDLINE_LINUX=\"\"\n#GRUB_ENABLE_CRYPTODISK=y\n";
        let patched = patch_grub_default(stock, "abcd-1234");
        assert!(patched.contains(
            "GRUB_CMDLINE_LINUX=\"cryptdevice=UUID=abcd-1234:cryptroot root=/dev/mapper/cryptroot\""
        ));
        assert!(patched.contains("\nGRUB_ENABLE_CRYPTODISK=y\n"));
    }

    #[test]
    fn test_configure_boot_edits_target_files() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("etc/default")).unwrap();
        fs::write(dir.path().join("etc/mkinitcpio.conf"), format!("BINARIES=()\n{}\n", STOCK_HOOKS)).unwrap();
        fs::write(dir.path().join("etc/default/grub"), "GRUB_CMDLINE_LINUX=\"\"\n").unwrap();

        let runner = RecordingRunner::new().respond_to("blkid", "feed-beef\n");
        let (tx, _rx) = progress::channel();
        let exec = Executor::new(runner.clone(), InstallLog::disabled(), dir.path());
        let mut ctx = PhaseContext::new(Arc::new(encrypted_config()), exec, tx);

        configure_boot(&mut ctx).unwrap();

        let grub = fs::read_to_string(dir.path().join("etc/default/grub")).unwrap();
        assert!(grub.contains("cryptdevice=UUID=feed-beef:cryptroot"));
        let mkinit = fs::read_to_string(dir.path().join("etc/mkinitcpio.conf")).unwrap();
        assert!(mkinit.contains("BINARIES=(btrfs)"));
        assert!(runner.command_lines().iter().any(|l| l.ends_with("mkinitcpio -P")));
    }
}
