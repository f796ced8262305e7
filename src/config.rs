//! Installation configuration
//!
//! `InstallConfig` accumulates every decision made for one installation. It is
//! created with defaults before any UI runs, merged with the declarative file
//! and trusted environment overrides, then edited by the wizard steps. The
//! phase pipeline only ever reads it.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use crate::error::{InstallerError, Result};
use crate::types::{DesktopEnvironment, Shell, WizardMode};

/// Device-mapper name of the opened LUKS container
pub const LUKS_MAPPER_NAME: &str = "cryptroot";

/// Block device path of the opened LUKS container
pub const LUKS_MAPPER_DEVICE: &str = "/dev/mapper/cryptroot";

/// Default EFI system partition size
pub const DEFAULT_EFI_SIZE: &str = "512M";

/// A whole-disk block device reported by `lsblk`
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BlockDevice {
    /// Kernel name, e.g. `sda` or `nvme0n1`
    pub name: String,
    /// Human-readable size, e.g. `500G`
    pub size: String,
    #[serde(default)]
    pub model: String,
}

impl BlockDevice {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// `/dev/<name>`
    pub fn path(&self) -> String {
        format!("/dev/{}", self.name)
    }

    /// Prefix that partition numbers are appended to.
    ///
    /// NVMe and MMC devices separate the partition number with `p`
    /// (`/dev/nvme0n1p1`), everything else appends it directly (`/dev/sda1`).
    pub fn partition_prefix(&self) -> String {
        if self.name.contains("nvme") || self.name.contains("mmcblk") {
            format!("{}p", self.path())
        } else {
            self.path()
        }
    }

    pub fn partition(&self, number: u32) -> String {
        format!("{}{}", self.partition_prefix(), number)
    }

    /// EFI system partition (partition 1)
    pub fn efi_partition(&self) -> String {
        self.partition(1)
    }

    /// Root partition (partition 2)
    pub fn root_partition(&self) -> String {
        self.partition(2)
    }
}

impl fmt::Display for BlockDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}  {}", self.path(), self.size)?;
        if !self.model.is_empty() {
            write!(f, "  {}", self.model)?;
        }
        Ok(())
    }
}

/// A file copied into the installed system
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dotfile {
    /// Source path on the live medium, relative to the working directory
    pub src: PathBuf,
    /// Destination inside the target; a leading `~/` means the user's home
    pub dest: String,
}

impl Dotfile {
    /// Destination path as seen from inside the installed system.
    ///
    /// Returns the path and whether it lives in the user's home (and so must be
    /// chowned to the user).
    pub fn resolve_dest(&self, username: &str) -> (String, bool) {
        match self.dest.strip_prefix("~/") {
            Some(rest) => (format!("/home/{}/{}", username, rest), true),
            None => (self.dest.clone(), false),
        }
    }
}

/// Explicit-set markers
///
/// Only consulted by the wizard skip predicate. A boolean that was explicitly
/// set to `false` in the config file is still "present".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SetMarkers {
    pub encrypt: bool,
    pub desktop: bool,
    pub sshd: bool,
    pub docker: bool,
    /// SSH key was read from the config file and needs operator approval
    pub ssh_pubkey_from_config: bool,
    /// Secrets supplied through the trusted environment channel
    pub user_password_from_env: bool,
    pub root_password_from_env: bool,
    pub passphrase_from_env: bool,
}

/// Every decision made for one installation
#[derive(Debug, Clone, Default)]
pub struct InstallConfig {
    pub mode: WizardMode,
    pub device: Option<BlockDevice>,
    pub efi_size: String,
    pub encrypt: bool,
    pub luks_passphrase: String,
    pub hostname: String,
    pub timezone: String,
    pub username: String,
    pub user_password: String,
    pub root_password: String,
    pub zram_size: String,
    pub desktop: DesktopEnvironment,
    /// `None` until chosen; installs as bash
    pub shell: Option<Shell>,
    pub sshd: bool,
    pub ssh_pubkey: String,
    pub docker: bool,
    pub docker_group: bool,
    pub packages: Vec<String>,
    pub aur_packages: Vec<String>,
    pub dotfiles: Vec<Dotfile>,
    pub marks: SetMarkers,
}

impl InstallConfig {
    /// Defaults applied before the config file and the wizard
    pub fn with_defaults(zram_size: impl Into<String>) -> Self {
        Self {
            efi_size: DEFAULT_EFI_SIZE.to_string(),
            zram_size: zram_size.into(),
            ..Self::default()
        }
    }

    /// The selected target disk
    pub fn target_device(&self) -> Result<&BlockDevice> {
        self.device
            .as_ref()
            .ok_or_else(|| InstallerError::precondition("no target device selected"))
    }

    /// Device that receives the btrfs filesystem: the LUKS mapping when
    /// encrypted, the raw root partition otherwise.
    pub fn btrfs_device(&self) -> Result<String> {
        if self.encrypt {
            Ok(LUKS_MAPPER_DEVICE.to_string())
        } else {
            Ok(self.target_device()?.root_partition())
        }
    }

    pub fn shell_or_default(&self) -> Shell {
        self.shell.unwrap_or_default()
    }

    /// Names of the fields that must be present before the pipeline can run
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.device.is_none() {
            missing.push("device");
        }
        let required = [
            ("efi_size", &self.efi_size),
            ("hostname", &self.hostname),
            ("timezone", &self.timezone),
            ("username", &self.username),
            ("user password", &self.user_password),
            ("root password", &self.root_password),
            ("zram_size", &self.zram_size),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                missing.push(name);
            }
        }
        if self.encrypt && self.luks_passphrase.is_empty() {
            missing.push("passphrase");
        }
        missing
    }

    /// Human-readable summary for the confirm screen. Secrets are masked.
    pub fn summary(&self) -> String {
        let mut lines = Vec::new();
        let device = self
            .device
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_else(|| "(none)".to_string());
        lines.push(format!("Device:       {}", device));
        lines.push(format!("EFI Size:     {}", self.efi_size));
        lines.push(format!("Encryption:   {}", self.encrypt));
        if self.encrypt {
            lines.push(format!("Passphrase:   {}", mask(&self.luks_passphrase)));
        }
        lines.push(format!("Hostname:     {}", self.hostname));
        lines.push(format!("Timezone:     {}", self.timezone));
        lines.push(format!("Username:     {}", self.username));
        lines.push(format!("User Pass:    {}", mask(&self.user_password)));
        lines.push(format!("Root Pass:    {}", mask(&self.root_password)));
        lines.push(format!("ZRAM Size:    {}", self.zram_size));
        lines.push(format!("Desktop:      {}", self.desktop));
        lines.push(format!("Shell:        {}", self.shell_or_default()));
        lines.push(format!("SSH Server:   {}", self.sshd));
        if self.sshd && !self.ssh_pubkey.is_empty() {
            lines.push(format!("SSH Pub Key:  {}", truncate_key(&self.ssh_pubkey)));
        }
        lines.push(format!("Docker:       {}", self.docker));
        if self.docker && self.docker_group {
            lines.push(format!("Docker Group: {}", self.username));
        }
        if !self.packages.is_empty() {
            lines.push(format!("Packages:     {}", self.packages.join(", ")));
        }
        if !self.aur_packages.is_empty() {
            lines.push(format!("AUR Packages: {}", self.aur_packages.join(", ")));
        }
        if !self.dotfiles.is_empty() {
            lines.push(format!("Dotfiles:     {} file(s)", self.dotfiles.len()));
        }
        let mut out = lines.join("\n");
        out.push('\n');
        out
    }
}

fn mask(secret: &str) -> String {
    "*".repeat(secret.chars().count())
}

fn truncate_key(key: &str) -> String {
    if key.chars().count() > 40 {
        let head: String = key.chars().take(40).collect();
        format!("{}...", head)
    } else {
        key.to_string()
    }
}
