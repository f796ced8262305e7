//! Declarative configuration: `archpilot.toml` and trusted environment overrides.
//!
//! The file is optional. Every key that is present is validated against the
//! same rules the wizard enforces and merged into an [`InstallConfig`]; keys
//! that are absent leave the defaults alone. Booleans the wizard would ask
//! about are recorded in [`SetMarkers`](crate::config::SetMarkers) so skip
//! mode can tell "set to false" apart from "not set".

use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info};

use crate::config::{BlockDevice, Dotfile, InstallConfig};
use crate::types::{DesktopEnvironment, Shell, WizardMode};
use crate::validate;

/// File looked up in the working directory when `--config` is not given
pub const CONFIG_FILE_NAME: &str = "archpilot.toml";

pub const ENV_USER_PASSWORD: &str = "ARCHPILOT_USERPW";
pub const ENV_ROOT_PASSWORD: &str = "ARCHPILOT_ROOTPW";
pub const ENV_PASSPHRASE: &str = "ARCHPILOT_PASSPHRASE";

/// One `[[dotfiles]]` table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DotfileEntry {
    #[serde(default)]
    pub src: String,
    #[serde(default)]
    pub dest: String,
}

/// Contents of `archpilot.toml`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InstallationConfig {
    #[serde(default)]
    pub mode: String,
    pub device: Option<String>,
    pub efi_size: Option<String>,
    pub encrypt: Option<bool>,
    pub hostname: Option<String>,
    pub timezone: Option<String>,
    pub username: Option<String>,
    pub zram_size: Option<String>,
    pub desktop: Option<String>,
    pub shell: Option<String>,
    pub sshd: Option<bool>,
    pub ssh_pubkey_file: Option<PathBuf>,
    pub docker: Option<bool>,
    pub docker_group: Option<bool>,
    #[serde(default)]
    pub packages: Vec<String>,
    #[serde(default)]
    pub aur_packages: Vec<String>,
    #[serde(default)]
    pub dotfiles: Vec<DotfileEntry>,
}

fn invalid(key: &str, err: impl std::fmt::Display) -> anyhow::Error {
    anyhow!("{}: {}: {}", CONFIG_FILE_NAME, key, err)
}

/// Non-empty, trimmed value of an optional string key
fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl InstallationConfig {
    pub fn parse(text: &str) -> Result<Self> {
        toml::from_str(text).with_context(|| format!("Failed to parse {}", CONFIG_FILE_NAME))
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config = Self::parse(&text)?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Validate every present key and merge it into `cfg`.
    ///
    /// `disks` and `timezones` are the discovered candidates; `device` and
    /// `timezone` must name one of them.
    pub fn apply(&self, cfg: &mut InstallConfig, disks: &[BlockDevice], timezones: &[String]) -> Result<()> {
        cfg.mode = WizardMode::from_str(self.mode.trim())
            .map_err(|_| anyhow!("{}: invalid mode {:?}: must be \"skip\" or \"prompt\"", CONFIG_FILE_NAME, self.mode))?;

        if let Some(device) = present(&self.device) {
            let found = disks
                .iter()
                .find(|d| d.name == device || d.path() == device)
                .ok_or_else(|| {
                    anyhow!(
                        "{}: device {:?} not found (use lsblk to find available devices)",
                        CONFIG_FILE_NAME,
                        device
                    )
                })?;
            cfg.device = Some(found.clone());
        }

        if let Some(size) = present(&self.efi_size) {
            validate::partition_size(size).map_err(|e| invalid("efi_size", e))?;
            cfg.efi_size = size.to_string();
        }

        if let Some(encrypt) = self.encrypt {
            cfg.encrypt = encrypt;
            cfg.marks.encrypt = true;
        }

        if let Some(hostname) = present(&self.hostname) {
            validate::hostname(hostname).map_err(|e| invalid("hostname", e))?;
            cfg.hostname = hostname.to_string();
        }

        if let Some(zone) = present(&self.timezone) {
            if !timezones.iter().any(|z| z == zone) {
                bail!("{}: timezone {:?} not found", CONFIG_FILE_NAME, zone);
            }
            cfg.timezone = zone.to_string();
        }

        if let Some(username) = present(&self.username) {
            validate::username(username).map_err(|e| invalid("username", e))?;
            cfg.username = username.to_string();
        }

        if let Some(size) = present(&self.zram_size) {
            validate::zram_size(size).map_err(|e| invalid("zram_size", e))?;
            cfg.zram_size = size.to_string();
        }

        if let Some(desktop) = present(&self.desktop) {
            cfg.desktop = DesktopEnvironment::from_str(desktop).map_err(|_| {
                anyhow!(
                    "{}: invalid desktop {:?}: must be one of none, gnome, gnome-minimal, kde, hyprland",
                    CONFIG_FILE_NAME,
                    desktop
                )
            })?;
            cfg.marks.desktop = true;
        }

        if let Some(shell) = present(&self.shell) {
            let parsed = Shell::from_str(shell)
                .map_err(|_| anyhow!("{}: invalid shell {:?}: must be bash or zsh", CONFIG_FILE_NAME, shell))?;
            cfg.shell = Some(parsed);
        }

        if let Some(sshd) = self.sshd {
            cfg.sshd = sshd;
            cfg.marks.sshd = true;
        }

        if let Some(path) = &self.ssh_pubkey_file {
            let key = fs::read_to_string(path)
                .with_context(|| format!("{}: ssh_pubkey_file: reading {}", CONFIG_FILE_NAME, path.display()))?;
            let key = key.trim();
            validate::ssh_pubkey(key).map_err(|e| invalid("ssh_pubkey_file", e))?;
            cfg.ssh_pubkey = key.to_string();
            cfg.marks.ssh_pubkey_from_config = true;
        }

        if let Some(docker) = self.docker {
            cfg.docker = docker;
            cfg.marks.docker = true;
        }
        if let Some(group) = self.docker_group {
            cfg.docker_group = cfg.docker && group;
        }

        cfg.packages = clean_list(&self.packages);
        cfg.aur_packages = clean_list(&self.aur_packages);

        cfg.dotfiles = self
            .dotfiles
            .iter()
            .enumerate()
            .map(|(i, entry)| dotfile(i, entry))
            .collect::<Result<_>>()?;

        debug!("Applied {} to install configuration", CONFIG_FILE_NAME);
        Ok(())
    }
}

fn clean_list(items: &[String]) -> Vec<String> {
    items
        .iter()
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

fn dotfile(index: usize, entry: &DotfileEntry) -> Result<Dotfile> {
    let src = entry.src.trim();
    let dest = entry.dest.trim();
    if src.is_empty() {
        bail!("{}: dotfiles[{}]: src is required", CONFIG_FILE_NAME, index);
    }
    if dest.is_empty() {
        bail!("{}: dotfiles[{}]: dest is required", CONFIG_FILE_NAME, index);
    }
    let src = PathBuf::from(src);
    if !src.exists() {
        bail!("{}: dotfiles[{}]: src {} does not exist", CONFIG_FILE_NAME, index, src.display());
    }
    Ok(Dotfile {
        src,
        dest: dest.to_string(),
    })
}

/// Apply the trusted credential overrides. `lookup` is normally
/// `std::env::var(..).ok()`; empty values are ignored.
pub fn apply_env<F>(cfg: &mut InstallConfig, lookup: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    let value = |name: &str| lookup(name).filter(|v| !v.is_empty());

    if let Some(pw) = value(ENV_USER_PASSWORD) {
        validate::password(&pw).map_err(|e| anyhow!("{}: {}", ENV_USER_PASSWORD, e))?;
        cfg.user_password = pw;
        cfg.marks.user_password_from_env = true;
    }
    if let Some(pw) = value(ENV_ROOT_PASSWORD) {
        validate::password(&pw).map_err(|e| anyhow!("{}: {}", ENV_ROOT_PASSWORD, e))?;
        cfg.root_password = pw;
        cfg.marks.root_password_from_env = true;
    }
    if let Some(pp) = value(ENV_PASSPHRASE) {
        validate::passphrase(&pp).map_err(|e| anyhow!("{}: {}", ENV_PASSPHRASE, e))?;
        cfg.luks_passphrase = pp;
        cfg.marks.passphrase_from_env = true;
    }
    Ok(())
}

/// The file to load: the explicit path, or `archpilot.toml` in the working
/// directory when it exists. An explicit path that does not exist is an error.
pub fn locate(explicit: Option<&Path>) -> Result<Option<PathBuf>> {
    match explicit {
        Some(path) if path.exists() => Ok(Some(path.to_path_buf())),
        Some(path) => bail!("Config file not found: {}", path.display()),
        None => {
            let default = PathBuf::from(CONFIG_FILE_NAME);
            Ok(default.exists().then_some(default))
        }
    }
}

/// Build the starting configuration: defaults, then the file, then the
/// environment.
pub fn load_install_config<F>(
    path: Option<&Path>,
    disks: &[BlockDevice],
    timezones: &[String],
    default_zram_size: &str,
    lookup: F,
) -> Result<InstallConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let mut cfg = InstallConfig::with_defaults(default_zram_size);
    if let Some(path) = path {
        InstallationConfig::load_from_file(path)?.apply(&mut cfg, disks, timezones)?;
    }
    apply_env(&mut cfg, lookup)?;
    Ok(cfg)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn disks() -> Vec<BlockDevice> {
        vec![BlockDevice::new("sda"), BlockDevice::new("nvme0n1")]
    }

    fn zones() -> Vec<String> {
        vec!["UTC".to_string(), "Europe/Berlin".to_string()]
    }

    fn applied(text: &str) -> Result<InstallConfig> {
        let mut cfg = InstallConfig::with_defaults("4G");
        InstallationConfig::parse(text)?.apply(&mut cfg, &disks(), &zones())?;
        Ok(cfg)
    }

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_empty_file_keeps_defaults() {
        let cfg = applied("").unwrap();
        assert_eq!(cfg.mode, WizardMode::Interactive);
        assert_eq!(cfg.efi_size, "512M");
        assert_eq!(cfg.zram_size, "4G");
        assert!(cfg.device.is_none());
        assert_eq!(cfg.marks, Default::default());
    }

    #[test]
    fn test_full_file() {
        let cfg = applied(
            r#"
mode = "skip"
device = "/dev/nvme0n1"
efi_size = "1G"
encrypt = false
hostname = "forge"
timezone = "Europe/Berlin"
username = "alice"
zram_size = "8G"
desktop = "gnome-minimal"
shell = "zsh"
sshd = true
docker = true
docker_group = true
packages = ["git", " ", "neovim"]
aur_packages = ["yay-bin"]
"#,
        )
        .unwrap();

        assert_eq!(cfg.mode, WizardMode::Skip);
        assert_eq!(cfg.device.as_ref().map(|d| d.name.as_str()), Some("nvme0n1"));
        assert_eq!(cfg.efi_size, "1G");
        assert!(!cfg.encrypt);
        assert!(cfg.marks.encrypt);
        assert_eq!(cfg.hostname, "forge");
        assert_eq!(cfg.timezone, "Europe/Berlin");
        assert_eq!(cfg.desktop, DesktopEnvironment::GnomeMinimal);
        assert!(cfg.marks.desktop);
        assert_eq!(cfg.shell, Some(Shell::Zsh));
        assert!(cfg.sshd && cfg.marks.sshd);
        assert!(cfg.docker && cfg.docker_group && cfg.marks.docker);
        assert_eq!(cfg.packages, vec!["git", "neovim"]);
        assert_eq!(cfg.aur_packages, vec!["yay-bin"]);
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        assert!(InstallationConfig::parse("bootloader = \"grub\"").is_err());
    }

    #[test]
    fn test_invalid_mode() {
        let err = applied("mode = \"fast\"").unwrap_err();
        assert!(err.to_string().contains("invalid mode"));
    }

    #[test]
    fn test_unknown_device() {
        let err = applied("device = \"sdz\"").unwrap_err();
        assert!(err.to_string().contains("device \"sdz\" not found"));
    }

    #[test]
    fn test_unknown_timezone() {
        let err = applied("timezone = \"Mars/Olympus\"").unwrap_err();
        assert!(err.to_string().contains("timezone \"Mars/Olympus\" not found"));
    }

    #[test]
    fn test_invalid_values_name_the_key() {
        assert!(applied("hostname = \"-bad\"").unwrap_err().to_string().contains("hostname"));
        assert!(applied("username = \"Root User\"").unwrap_err().to_string().contains("username"));
        assert!(applied("zram_size = \"lots\"").unwrap_err().to_string().contains("zram_size"));
        assert!(applied("desktop = \"xfce\"").unwrap_err().to_string().contains("invalid desktop"));
        assert!(applied("shell = \"fish\"").unwrap_err().to_string().contains("bash or zsh"));
    }

    #[test]
    fn test_docker_group_requires_docker() {
        let cfg = applied("docker = false\ndocker_group = true").unwrap();
        assert!(!cfg.docker_group);
        assert!(cfg.marks.docker);
    }

    #[test]
    fn test_ssh_pubkey_file_is_read_and_marked() {
        let mut key = NamedTempFile::new().unwrap();
        writeln!(key, "ssh-ed25519 AAAAC3NzaC1lZDI1NTE5AAAAIHk alice@laptop").unwrap();
        let text = format!("sshd = true\nssh_pubkey_file = {:?}", key.path().display().to_string());
        let cfg = applied(&text).unwrap();
        assert!(cfg.ssh_pubkey.starts_with("ssh-ed25519 "));
        assert!(!cfg.ssh_pubkey.ends_with('\n'));
        assert!(cfg.marks.ssh_pubkey_from_config);
    }

    #[test]
    fn test_missing_ssh_pubkey_file() {
        assert!(applied("ssh_pubkey_file = \"/nonexistent/id.pub\"").is_err());
    }

    #[test]
    fn test_dotfiles_require_existing_src() {
        let src = NamedTempFile::new().unwrap();
        let text = format!(
            "[[dotfiles]]\nsrc = {:?}\ndest = \"~/.zshrc\"\n",
            src.path().display().to_string()
        );
        let cfg = applied(&text).unwrap();
        assert_eq!(cfg.dotfiles.len(), 1);
        assert_eq!(cfg.dotfiles[0].dest, "~/.zshrc");

        let err = applied("[[dotfiles]]\nsrc = \"/nonexistent/rc\"\ndest = \"~/.rc\"\n").unwrap_err();
        assert!(err.to_string().contains("dotfiles[0]"));
        let err = applied("[[dotfiles]]\ndest = \"~/.rc\"\n").unwrap_err();
        assert!(err.to_string().contains("src is required"));
    }

    #[test]
    fn test_env_overrides_set_markers() {
        let env: HashMap<&str, &str> = [
            (ENV_USER_PASSWORD, "hunter22"),
            (ENV_ROOT_PASSWORD, ""),
            (ENV_PASSPHRASE, "correct horse"),
        ]
        .into_iter()
        .collect();
        let mut cfg = InstallConfig::default();
        apply_env(&mut cfg, |k| env.get(k).map(|v| v.to_string())).unwrap();

        assert_eq!(cfg.user_password, "hunter22");
        assert!(cfg.marks.user_password_from_env);
        assert!(cfg.root_password.is_empty());
        assert!(!cfg.marks.root_password_from_env);
        assert_eq!(cfg.luks_passphrase, "correct horse");
        assert!(cfg.marks.passphrase_from_env);
    }

    #[test]
    fn test_env_override_is_validated() {
        let mut cfg = InstallConfig::default();
        let err = apply_env(&mut cfg, |k| (k == ENV_PASSPHRASE).then(|| "short".to_string())).unwrap_err();
        assert!(err.to_string().contains(ENV_PASSPHRASE));
    }

    #[test]
    fn test_load_install_config_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"hostname = \"forge\"\ndevice = \"sda\"\n").unwrap();
        file.flush().unwrap();

        let cfg = load_install_config(Some(file.path()), &disks(), &zones(), "2G", no_env).unwrap();
        assert_eq!(cfg.hostname, "forge");
        assert_eq!(cfg.zram_size, "2G");
        assert_eq!(cfg.device.map(|d| d.path()), Some("/dev/sda".to_string()));
    }

    #[test]
    fn test_locate() {
        assert!(locate(Some(Path::new("/nonexistent/archpilot.toml"))).is_err());
        let file = NamedTempFile::new().unwrap();
        assert_eq!(locate(Some(file.path())).unwrap(), Some(file.path().to_path_buf()));
    }
}
