//! archpilot Library
//!
//! Core of the guided Arch Linux installer: the configuration model, the
//! step-based wizard and the phase pipeline that performs the installation.

pub mod app;
pub mod cli;
pub mod command_executor;
pub mod components;
pub mod config;
pub mod config_file;
pub mod error;
pub mod hardware;
pub mod install_log;
pub mod installer;
pub mod process_guard;
pub mod progress;
pub mod theme;
pub mod types;
pub mod ui;
pub mod validate;
pub mod wizard;

// Re-export main types for convenience
pub use command_executor::{Executor, RecordingRunner, Runner, SystemRunner};
pub use config::{BlockDevice, Dotfile, InstallConfig, SetMarkers};
pub use config_file::InstallationConfig;
pub use error::{InstallerError, Result};
pub use hardware::{FirmwareMode, HardwareInfo};
pub use installer::Installer;
pub use process_guard::{ChildRegistry, CommandProcessGroup, ProcessGuard};
pub use progress::{PhaseUpdate, Poll, ProgressReceiver, ProgressSender};
pub use types::{DesktopEnvironment, Shell, WizardMode};
pub use wizard::{should_skip, SessionEnd, StepKind, Wizard, WizardStep};
