//! The installation phases, in execution order.
//!
//! Each phase is a plain function over [`PhaseContext`]. Order and skip rules
//! live in [`standard_pipeline`]; nothing here decides whether a phase runs.

use std::fs;
use strum::{Display, EnumIter};
use tracing::warn;

use super::PhaseContext;
use super::luks;
use super::pipeline::Pipeline;
use crate::command_executor::{ExecContext, Runner};
use crate::error::{InstallerError, Result};
use crate::types::Shell;

/// btrfs subvolumes created on the root filesystem
pub const SUBVOLUMES: [&str; 4] = ["@", "@home", "@snapshots", "@var_log"];

/// Mount options for every btrfs subvolume
pub const BTRFS_MOUNT_OPTIONS: &str = "noatime,compress=zstd";

/// Filesystem label of the root btrfs volume
pub const ROOT_LABEL: &str = "ArchRoot";

/// Packages handed to pacstrap
pub const BASE_PACKAGES: [&str; 6] = ["base", "linux", "linux-firmware", "sudo", "vim", "btrfs-progs"];

/// Groups the primary user joins
pub const USER_GROUPS: &str = "wheel,audio,video,optical,storage,input";

const SSHD_DROP_IN: &str = "PermitRootLogin no\nPasswordAuthentication no\nPubkeyAuthentication yes\n";

const GNOME_OVERRIDE: &str = "[org.gnome.desktop.interface]
color-scheme='prefer-dark'

[org.gnome.desktop.background]
picture-uri=''
picture-uri-dark=''
primary-color='#231f30'
color-shading-type='solid'
";

const YAY_REPO: &str = "https://aur.archlinux.org/yay.git";

/// Every phase the installer knows, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumIter)]
pub enum PhaseKind {
    #[strum(to_string = "Preparing system")]
    Prepare,
    #[strum(to_string = "Partitioning disk")]
    Partition,
    #[strum(to_string = "Setting up LUKS encryption")]
    Luks,
    #[strum(to_string = "Configuring btrfs subvolumes")]
    Btrfs,
    #[strum(to_string = "Installing base system")]
    BaseInstall,
    #[strum(to_string = "Configuring system")]
    SystemConfig,
    #[strum(to_string = "Setting up ZRAM swap")]
    Swap,
    #[strum(to_string = "Installing bootloader")]
    Bootloader,
    #[strum(to_string = "Enabling services")]
    Services,
    #[strum(to_string = "Configuring SSH server")]
    Sshd,
    #[strum(to_string = "Installing Docker")]
    Docker,
    #[strum(to_string = "Installing desktop environment")]
    Desktop,
    #[strum(to_string = "Installing software")]
    Software,
    #[strum(to_string = "Installing dotfiles")]
    Dotfiles,
}

/// The fixed installation pipeline
pub fn standard_pipeline<R: Runner + 'static>() -> Pipeline<PhaseContext<R>> {
    Pipeline::new()
        .phase(&PhaseKind::Prepare.to_string(), prepare::<R>)
        .phase(&PhaseKind::Partition.to_string(), partition::<R>)
        .phase_unless(&PhaseKind::Luks.to_string(), |c: &PhaseContext<R>| !c.cfg.encrypt, luks::setup::<R>)
        .phase(&PhaseKind::Btrfs.to_string(), configure_btrfs::<R>)
        .phase(&PhaseKind::BaseInstall.to_string(), install_base::<R>)
        .phase(&PhaseKind::SystemConfig.to_string(), configure_system::<R>)
        .phase(&PhaseKind::Swap.to_string(), configure_swap::<R>)
        .phase(&PhaseKind::Bootloader.to_string(), install_bootloader::<R>)
        .phase(&PhaseKind::Services.to_string(), enable_services::<R>)
        .phase_unless(&PhaseKind::Sshd.to_string(), |c: &PhaseContext<R>| !c.cfg.sshd, configure_sshd::<R>)
        .phase_unless(&PhaseKind::Docker.to_string(), |c: &PhaseContext<R>| !c.cfg.docker, install_docker::<R>)
        .phase_unless(
            &PhaseKind::Desktop.to_string(),
            |c: &PhaseContext<R>| c.cfg.desktop.packages().is_empty(),
            install_desktop::<R>,
        )
        .phase(&PhaseKind::Software.to_string(), install_software::<R>)
        .phase_unless(
            &PhaseKind::Dotfiles.to_string(),
            |c: &PhaseContext<R>| c.cfg.dotfiles.is_empty(),
            install_dotfiles::<R>,
        )
}

fn prepare<R: Runner>(ctx: &mut PhaseContext<R>) -> Result<()> {
    ctx.say("Enabling NTP...");
    ctx.host("timedatectl", &["set-ntp", "true"])?;
    Ok(())
}

fn partition<R: Runner>(ctx: &mut PhaseContext<R>) -> Result<()> {
    let cfg = ctx.cfg.clone();
    let device = cfg.target_device()?;
    let dev = device.path();

    ctx.say(&format!("Wiping partition table on {}...", dev));
    ctx.host("sgdisk", &["--zap-all", &dev])?;

    ctx.say(&format!("Creating EFI partition ({})...", cfg.efi_size));
    let efi_spec = format!("1:0:+{}", cfg.efi_size);
    ctx.host("sgdisk", &["-n", &efi_spec, "-t", "1:ef00", &dev])?;

    ctx.say("Creating root partition...");
    ctx.host("sgdisk", &["-n", "2:0:0", "-t", "2:8300", &dev])?;

    ctx.say("Formatting EFI partition...");
    ctx.host("mkfs.fat", &["-F32", &device.efi_partition()])?;

    // The encrypted path formats the mapping once it is open
    if !cfg.encrypt {
        ctx.say("Formatting root partition as btrfs...");
        ctx.host("mkfs.btrfs", &["-f", "-L", ROOT_LABEL, &device.root_partition()])?;
    }
    Ok(())
}

fn configure_btrfs<R: Runner>(ctx: &mut PhaseContext<R>) -> Result<()> {
    let cfg = ctx.cfg.clone();
    let btrfs_dev = cfg.btrfs_device()?;
    let efi_part = cfg.target_device()?.efi_partition();
    let root = ctx.exec.target_root().display().to_string();

    ctx.say("Mounting btrfs root...");
    ctx.host("mount", &[btrfs_dev.as_str(), &root])?;

    for subvol in SUBVOLUMES {
        ctx.say(&format!("Creating subvolume {}...", subvol));
        let path = format!("{}/{}", root, subvol);
        ctx.host("btrfs", &["subvolume", "create", &path])?;
    }

    ctx.say("Unmounting to remount with subvolumes...");
    ctx.host("umount", &[&root])?;

    let opts = format!("{},subvol=@", BTRFS_MOUNT_OPTIONS);
    ctx.host("mount", &["-o", &opts, &btrfs_dev, &root])?;

    for dir in ["boot", "home", "snapshots", "var/log", "etc"] {
        let path = ctx.target_path(dir);
        fs::create_dir_all(&path)
            .map_err(|e| InstallerError::general(format!("mkdir {}: {}", path.display(), e)))?;
    }

    for (subvol, dir) in [("@home", "home"), ("@snapshots", "snapshots"), ("@var_log", "var/log")] {
        let mount_point = format!("{}/{}", root, dir);
        ctx.say(&format!("Mounting {} at {}...", subvol, mount_point));
        let opts = format!("{},subvol={}", BTRFS_MOUNT_OPTIONS, subvol);
        ctx.host("mount", &["-o", &opts, &btrfs_dev, &mount_point])?;
    }

    let boot = format!("{}/boot", root);
    ctx.say(&format!("Mounting EFI partition at {}...", boot));
    ctx.host("mount", &[efi_part.as_str(), &boot])?;

    ctx.say("Generating fstab...");
    ctx.exec
        .shell(ExecContext::Host, &format!("genfstab -U {0} >> {0}/etc/fstab", root))?;
    Ok(())
}

fn install_base<R: Runner>(ctx: &mut PhaseContext<R>) -> Result<()> {
    ctx.say("Installing base system (this may take a while)...");
    let mut args = vec![ctx.exec.target_root().display().to_string()];
    args.extend(BASE_PACKAGES.iter().map(|p| p.to_string()));
    ctx.host("pacstrap", args.as_slice())?;
    Ok(())
}

fn configure_system<R: Runner>(ctx: &mut PhaseContext<R>) -> Result<()> {
    let cfg = ctx.cfg.clone();

    ctx.say(&format!("Setting timezone to {}...", cfg.timezone));
    ctx.chroot_shell(&format!("ln -sf /usr/share/zoneinfo/{} /etc/localtime", cfg.timezone))?;
    ctx.chroot("hwclock", &["--systohc"])?;

    ctx.say("Configuring locale...");
    ctx.chroot_shell("sed -i '/en_US.UTF-8/s/^#//' /etc/locale.gen")?;
    ctx.chroot("locale-gen", &[] as &[&str])?;
    ctx.write_target_file("/etc/locale.conf", "LANG=en_US.UTF-8\n")?;

    ctx.say(&format!("Setting hostname to {}...", cfg.hostname));
    ctx.write_target_file("/etc/hostname", &format!("{}\n", cfg.hostname))?;

    ctx.say("Setting root password...");
    set_password(ctx, "root", &cfg.root_password)?;

    ctx.say(&format!("Creating user {}...", cfg.username));
    ctx.chroot("useradd", &["-m", &cfg.username])?;
    set_password(ctx, &cfg.username, &cfg.user_password)?;
    ctx.chroot("usermod", &["-aG", USER_GROUPS, &cfg.username])?;

    ctx.say("Configuring sudoers...");
    ctx.chroot_shell("sed -i 's/^# %wheel ALL=(ALL:ALL) ALL/%wheel ALL=(ALL:ALL) ALL/' /etc/sudoers")?;

    if cfg.shell_or_default() == Shell::Zsh {
        ctx.say("Installing and setting zsh as default shell...");
        ctx.pacman_install(&["zsh"])?;
        ctx.chroot("chsh", &["-s", "/bin/zsh", &cfg.username])?;
    }
    Ok(())
}

/// `chpasswd` reads `user:password` from stdin so the secret stays out of argv
fn set_password<R: Runner>(ctx: &mut PhaseContext<R>, user: &str, password: &str) -> Result<()> {
    let line = format!("{}:{}\n", user, password);
    ctx.exec
        .run_with_input(ExecContext::Chroot, "chpasswd", &[] as &[&str], &line)?;
    Ok(())
}

/// Contents of `/etc/systemd/zram-generator.conf`
pub fn zram_generator_conf(size: &str) -> String {
    format!(
        "[zram0]\nzram-size = {}\ncompression-algorithm = zstd\nswap-priority = 100\nfs-type = swap\n",
        size
    )
}

fn configure_swap<R: Runner>(ctx: &mut PhaseContext<R>) -> Result<()> {
    ctx.say("Installing zram-generator...");
    ctx.pacman_install(&["zram-generator"])?;

    ctx.say("Writing zram-generator config...");
    let conf = zram_generator_conf(&ctx.cfg.zram_size);
    ctx.write_target_file("/etc/systemd/zram-generator.conf", &conf)
}

fn install_bootloader<R: Runner>(ctx: &mut PhaseContext<R>) -> Result<()> {
    ctx.say("Installing GRUB and efibootmgr...");
    ctx.pacman_install(&["grub", "efibootmgr"])?;

    if ctx.cfg.encrypt {
        luks::configure_boot(ctx)?;
    }

    ctx.say("Installing GRUB to EFI...");
    ctx.chroot(
        "grub-install",
        &["--target=x86_64-efi", "--efi-directory=/boot", "--bootloader-id=GRUB"],
    )?;

    ctx.say("Generating GRUB config...");
    ctx.chroot("grub-mkconfig", &["-o", "/boot/grub/grub.cfg"])?;
    Ok(())
}

/// Whether the live system runs under QEMU/KVM.
///
/// `systemd-detect-virt` exits non-zero on bare metal, so any failure means no.
fn is_qemu<R: Runner>(ctx: &mut PhaseContext<R>) -> bool {
    match ctx.exec.run(ExecContext::Host, "systemd-detect-virt", &[] as &[&str]) {
        Ok(out) => matches!(out.trim(), "kvm" | "qemu"),
        Err(_) => false,
    }
}

fn enable_services<R: Runner>(ctx: &mut PhaseContext<R>) -> Result<()> {
    ctx.say("Installing and enabling NetworkManager...");
    ctx.pacman_install(&["networkmanager"])?;
    ctx.chroot("systemctl", &["enable", "NetworkManager"])?;

    if is_qemu(ctx) {
        ctx.say("QEMU/Proxmox detected, installing guest agents...");
        ctx.pacman_install(&["qemu-guest-agent", "spice-vdagent"])?;
        ctx.chroot("systemctl", &["enable", "qemu-guest-agent"])?;
        ctx.chroot("systemctl", &["enable", "spice-vdagentd.socket"])?;
    }
    Ok(())
}

fn configure_sshd<R: Runner>(ctx: &mut PhaseContext<R>) -> Result<()> {
    let cfg = ctx.cfg.clone();

    ctx.say("Installing openssh...");
    ctx.pacman_install(&["openssh"])?;

    ctx.say("Configuring sshd...");
    ctx.write_target_file("/etc/ssh/sshd_config.d/10-archpilot.conf", SSHD_DROP_IN)?;

    ctx.say("Enabling sshd service...");
    ctx.chroot("systemctl", &["enable", "sshd"])?;

    if !cfg.ssh_pubkey.is_empty() {
        ctx.say(&format!("Installing SSH public key for {}...", cfg.username));
        let ssh_dir = format!("/home/{}/.ssh", cfg.username);
        let keys = format!("{}/authorized_keys", ssh_dir);
        ctx.write_target_file(&keys, &format!("{}\n", cfg.ssh_pubkey))?;
        restrict_permissions(ctx, &ssh_dir, &keys)?;
        ctx.chroot_shell(&format!(
            "chown -R {0}:{0} /home/{0}/.ssh",
            cfg.username
        ))?;
    }
    Ok(())
}

fn restrict_permissions<R: Runner>(ctx: &mut PhaseContext<R>, dir: &str, file: &str) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(ctx.target_path(dir), fs::Permissions::from_mode(0o700))?;
    fs::set_permissions(ctx.target_path(file), fs::Permissions::from_mode(0o600))?;
    Ok(())
}

fn install_docker<R: Runner>(ctx: &mut PhaseContext<R>) -> Result<()> {
    let cfg = ctx.cfg.clone();

    ctx.say("Installing docker...");
    ctx.pacman_install(&["docker"])?;

    ctx.say("Enabling docker service...");
    ctx.chroot("systemctl", &["enable", "docker"])?;

    if cfg.docker_group {
        ctx.say(&format!("Adding {} to the docker group...", cfg.username));
        ctx.chroot("usermod", &["-aG", "docker", &cfg.username])?;
    }
    Ok(())
}

fn install_desktop<R: Runner>(ctx: &mut PhaseContext<R>) -> Result<()> {
    let desktop = ctx.cfg.desktop;

    ctx.say(&format!("Installing {} packages...", desktop));
    ctx.pacman_install(desktop.packages())?;

    if let Some(dm) = desktop.display_manager() {
        ctx.say(&format!("Enabling {}...", dm));
        if ctx.chroot("systemctl", &["enable", dm]).is_err() {
            let unit = format!("{}.service", dm);
            ctx.chroot("systemctl", &["enable", &unit])?;
        }
    }

    if desktop.is_gnome() {
        ctx.say("Applying GNOME settings...");
        ctx.write_target_file(
            "/usr/share/glib-2.0/schemas/99-archpilot.gschema.override",
            GNOME_OVERRIDE,
        )?;
        ctx.chroot("glib-compile-schemas", &["/usr/share/glib-2.0/schemas/"])?;
    }
    Ok(())
}

fn install_software<R: Runner>(ctx: &mut PhaseContext<R>) -> Result<()> {
    let cfg = ctx.cfg.clone();
    let user = cfg.username.as_str();

    ctx.say("Installing base-devel and git...");
    ctx.pacman_install(&["base-devel", "git", "go"])?;

    ctx.say("Installing yay AUR helper...");
    let yay = format!(
        "su - {0} -c 'git clone {1} /tmp/yay && cd /tmp/yay && makepkg --noconfirm' \
         && pacman -U --noconfirm /tmp/yay/yay-*.pkg.tar.zst",
        user, YAY_REPO
    );
    let yay_installed = match ctx.chroot_shell(&yay) {
        Ok(_) => true,
        Err(e) => {
            warn!("yay install failed: {}", e);
            ctx.say("Warning: yay install failed (can be installed manually later)");
            false
        }
    };

    if !cfg.packages.is_empty() {
        ctx.say("Installing additional packages...");
        ctx.pacman_install(cfg.packages.as_slice())?;
    }

    if cfg.aur_packages.is_empty() {
        return Ok(());
    }
    if !yay_installed {
        ctx.say(&format!(
            "Warning: skipping AUR packages (yay not available): {}",
            cfg.aur_packages.join(", ")
        ));
        return Ok(());
    }

    ctx.say("Installing AUR packages...");
    // makepkg refuses to run as root, so the user needs passwordless sudo for the duration
    let sudoer = format!("/etc/sudoers.d/90-archpilot-{}", user);
    ctx.chroot_shell(&format!(
        "echo '{0} ALL=(ALL) NOPASSWD: ALL' > {1} && chmod 440 {1}",
        user, sudoer
    ))?;
    let result = ctx.chroot_shell(&format!(
        "su - {} -c 'yay -S --noconfirm {}'",
        user,
        cfg.aur_packages.join(" ")
    ));
    if ctx.chroot_shell(&format!("rm -f {}", sudoer)).is_err() {
        ctx.say("Warning: failed to remove temporary sudoers file");
    }
    result.map(|_| ())
}

fn install_dotfiles<R: Runner>(ctx: &mut PhaseContext<R>) -> Result<()> {
    let cfg = ctx.cfg.clone();

    for dotfile in &cfg.dotfiles {
        let (dest, user_owned) = dotfile.resolve_dest(&cfg.username);
        let data = fs::read(&dotfile.src).map_err(|e| {
            InstallerError::general(format!("read dotfile {}: {}", dotfile.src.display(), e))
        })?;
        ctx.write_target_file(&dest, &data)?;
        ctx.say(&format!("Installed {} -> {}", dotfile.src.display(), dotfile.dest));

        if user_owned {
            ctx.chroot_shell(&format!("chown {0}:{0} {1}", cfg.username, dest))?;
        }
    }
    Ok(())
}
