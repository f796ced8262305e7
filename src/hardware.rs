//! Host environment discovery
//!
//! Everything the wizard needs to know about the live system before the first
//! step is built: candidate disks, the timezone list, a default ZRAM size and
//! the firmware mode. Discovery runs once; its results are treated as
//! immutable inputs afterwards.
//!
//! # Failure modes
//!
//! - No disks, or `lsblk`/`timedatectl` failing, is a fatal precondition.
//! - An unreadable `/proc/meminfo` falls back to a `4G` ZRAM default.
//! - BIOS firmware is only reported; the installer targets UEFI.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::fmt;
use std::path::Path;
use std::process::Command;
use tracing::{info, warn};

use crate::config::BlockDevice;

/// ZRAM size used when memory cannot be measured
pub const FALLBACK_ZRAM_SIZE: &str = "4G";

/// Detected firmware mode of the system.
///
/// Determined by checking for the existence of `/sys/firmware/efi`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FirmwareMode {
    Uefi,
    Bios,
}

impl FirmwareMode {
    pub fn is_uefi(self) -> bool {
        matches!(self, Self::Uefi)
    }
}

impl fmt::Display for FirmwareMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uefi => write!(f, "UEFI"),
            Self::Bios => write!(f, "BIOS"),
        }
    }
}

/// Aggregated discovery results
#[derive(Debug, Clone)]
pub struct HardwareInfo {
    pub firmware: FirmwareMode,
    pub disks: Vec<BlockDevice>,
    pub timezones: Vec<String>,
    /// Half of physical memory, e.g. `8G`
    pub default_zram_size: String,
}

impl HardwareInfo {
    /// Discover the host. Fails when there is nothing to install onto or the
    /// timezone list cannot be read.
    pub fn detect() -> Result<Self> {
        let firmware = detect_firmware_mode();
        let disks = detect_disks()?;
        if disks.is_empty() {
            bail!("no disks found");
        }
        let timezones = list_timezones()?;
        let default_zram_size = default_zram_size();

        info!(
            "Hardware detection: firmware={}, disks={}, timezones={}, zram={}",
            firmware,
            disks.len(),
            timezones.len(),
            default_zram_size
        );
        if !firmware.is_uefi() {
            warn!("System did not boot in UEFI mode; the installed bootloader targets UEFI");
        }

        Ok(Self {
            firmware,
            disks,
            timezones,
            default_zram_size,
        })
    }
}

impl fmt::Display for HardwareInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Firmware: {}, Disks: {}, Timezones: {}",
            self.firmware,
            self.disks.len(),
            self.timezones.len()
        )
    }
}

// ============================================================================
// Detection Functions
// ============================================================================

/// The kernel exposes `/sys/firmware/efi` only when booted in UEFI mode.
pub fn detect_firmware_mode() -> FirmwareMode {
    if Path::new("/sys/firmware/efi").exists() {
        FirmwareMode::Uefi
    } else {
        FirmwareMode::Bios
    }
}

#[derive(Debug, Deserialize)]
struct LsblkOutput {
    blockdevices: Vec<LsblkDevice>,
}

#[derive(Debug, Deserialize)]
struct LsblkDevice {
    name: String,
    #[serde(default)]
    size: Option<String>,
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    model: Option<String>,
}

/// Whole disks from `lsblk -J -d -o NAME,SIZE,TYPE,MODEL` output
pub fn parse_lsblk(json: &str) -> Result<Vec<BlockDevice>> {
    let parsed: LsblkOutput = serde_json::from_str(json).context("Failed to parse lsblk output")?;
    Ok(parsed
        .blockdevices
        .into_iter()
        .filter(|d| d.kind.as_deref() == Some("disk"))
        .map(|d| BlockDevice {
            name: d.name,
            size: d.size.unwrap_or_default(),
            model: d.model.map(|m| m.trim().to_string()).unwrap_or_default(),
        })
        .collect())
}

pub fn detect_disks() -> Result<Vec<BlockDevice>> {
    let output = Command::new("lsblk")
        .args(["-J", "-d", "-o", "NAME,SIZE,TYPE,MODEL"])
        .output()
        .context("Failed to run lsblk")?;
    if !output.status.success() {
        bail!("lsblk failed: {}", String::from_utf8_lossy(&output.stderr).trim());
    }
    parse_lsblk(&String::from_utf8_lossy(&output.stdout))
}

/// One timezone per non-empty line
pub fn parse_timezones(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn list_timezones() -> Result<Vec<String>> {
    let output = Command::new("timedatectl")
        .arg("list-timezones")
        .output()
        .context("Failed to run timedatectl")?;
    if !output.status.success() {
        bail!(
            "timedatectl list-timezones failed: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }
    Ok(parse_timezones(&String::from_utf8_lossy(&output.stdout)))
}

/// Half of `MemTotal` from `/proc/meminfo` contents: whole gigabytes, or
/// megabytes below 1G.
pub fn zram_size_from_meminfo(meminfo: &str) -> Option<String> {
    let line = meminfo.lines().find(|l| l.starts_with("MemTotal:"))?;
    let kb: u64 = line.split_whitespace().nth(1)?.parse().ok()?;
    let gb = kb / 1024 / 1024 / 2;
    if gb < 1 {
        Some(format!("{}M", kb / 1024 / 2))
    } else {
        Some(format!("{}G", gb))
    }
}

pub fn default_zram_size() -> String {
    std::fs::read_to_string("/proc/meminfo")
        .ok()
        .and_then(|m| zram_size_from_meminfo(&m))
        .unwrap_or_else(|| FALLBACK_ZRAM_SIZE.to_string())
}

/// The installer partitions disks and enters a chroot; it needs root.
pub fn require_root() -> Result<()> {
    if !nix::unistd::geteuid().is_root() {
        bail!("archpilot must be run as root");
    }
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
