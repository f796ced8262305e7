//! Durable installation log
//!
//! Every command the installer runs is appended here with a wall-clock
//! timestamp so a failed run can be diagnosed after the fact. On success the
//! log is copied into the installed system.
//!
//! Opening the log is best-effort: if the file cannot be created the installer
//! still runs, with a warning in the debug log.

use chrono::{Local, SecondsFormat};
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use strum::Display;
use tracing::{debug, warn};

use crate::config::InstallConfig;

/// Fixed location of the durable log on the live medium
pub const DEFAULT_LOG_PATH: &str = "/root/archpilot.log";

/// Path of the copied log, relative to the target root
pub const TARGET_LOG_PATH: &str = "root/archpilot.log";

/// Record kinds written at the start of each log line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "UPPERCASE")]
pub enum LogTag {
    Start,
    Skip,
    Ok,
    Fail,
    Run,
}

pub struct InstallLog {
    path: PathBuf,
    file: Option<File>,
}

impl InstallLog {
    /// Create (truncating) the log at `path` and write the run header.
    pub fn open(path: impl Into<PathBuf>, cfg: &InstallConfig) -> Self {
        let path = path.into();
        let file = match File::create(&path) {
            Ok(f) => Some(f),
            Err(e) => {
                warn!("Cannot open install log {}: {}", path.display(), e);
                None
            }
        };
        let mut log = Self { path, file };
        let device = cfg
            .device
            .as_ref()
            .map(|d| d.path())
            .unwrap_or_default();
        log.write_raw(&format!(
            "archpilot install log - {}\ndevice={} encrypt={} desktop={}\n\n",
            Local::now().to_rfc3339_opts(SecondsFormat::Secs, false),
            device,
            cfg.encrypt,
            cfg.desktop
        ));
        log
    }

    /// A log that discards everything
    pub fn disabled() -> Self {
        Self {
            path: PathBuf::new(),
            file: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_enabled(&self) -> bool {
        self.file.is_some()
    }

    /// Append a tagged record, e.g. `12:00:01 START Partitioning disk`
    pub fn record(&mut self, tag: LogTag, message: &str) {
        self.line(&format!("{:<5} {}", tag.to_string(), message));
    }

    /// Append captured command output, indented under the preceding record
    pub fn output(&mut self, text: &str) {
        let text = text.trim_end();
        if text.is_empty() {
            return;
        }
        self.line(&format!("      {}", text));
    }

    /// Append a free-text timestamped line
    pub fn line(&mut self, text: &str) {
        let stamp = Local::now().format("%H:%M:%S");
        self.write_raw(&format!("{} {}\n", stamp, text));
    }

    fn write_raw(&mut self, text: &str) {
        let Some(file) = self.file.as_mut() else {
            return;
        };
        if let Err(e) = file.write_all(text.as_bytes()) {
            warn!("Install log write failed, disabling: {}", e);
            self.file = None;
        }
    }

    /// Copy the log into the installed system under `target_root`.
    pub fn copy_into(&mut self, target_root: &Path) -> io::Result<PathBuf> {
        let Some(file) = self.file.as_mut() else {
            return Err(io::Error::new(io::ErrorKind::NotFound, "install log is not open"));
        };
        file.flush()?;
        let dest = target_root.join(TARGET_LOG_PATH);
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::copy(&self.path, &dest)?;
        debug!("Copied install log to {}", dest.display());
        Ok(dest)
    }
}
