//! Type-safe choice enums for the installer
//!
//! Closed sets of choices are modelled as enums rather than strings so that the
//! declarative config, the wizard and the phases all agree on the spelling.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// Desktop environment selection
///
/// `Display` gives the human label shown in the wizard and summary; parsing
/// accepts the short config-file spelling (`gnome-minimal`, `kde`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[derive(Display, EnumString, EnumIter)]
#[strum(ascii_case_insensitive)]
pub enum DesktopEnvironment {
    #[default]
    #[strum(to_string = "None", serialize = "none")]
    None,
    #[strum(to_string = "GNOME", serialize = "gnome")]
    Gnome,
    #[strum(to_string = "GNOME Minimal", serialize = "gnome-minimal")]
    GnomeMinimal,
    #[strum(to_string = "KDE Plasma", serialize = "kde")]
    Kde,
    #[strum(to_string = "Hyprland", serialize = "hyprland")]
    Hyprland,
}

impl DesktopEnvironment {
    /// Pacman packages that make up this desktop
    pub fn packages(&self) -> &'static [&'static str] {
        match self {
            Self::None => &[],
            Self::Gnome => &["gnome"],
            Self::GnomeMinimal => &["gnome-shell", "gnome-control-center", "gdm"],
            Self::Kde => &["plasma-meta", "kde-applications-meta", "sddm"],
            Self::Hyprland => &["hyprland", "kitty", "wofi", "sddm"],
        }
    }

    /// systemd unit of the display manager, if the desktop ships one
    pub fn display_manager(&self) -> Option<&'static str> {
        match self {
            Self::None => None,
            Self::Gnome | Self::GnomeMinimal => Some("gdm"),
            Self::Kde | Self::Hyprland => Some("sddm"),
        }
    }

    pub fn is_gnome(&self) -> bool {
        matches!(self, Self::Gnome | Self::GnomeMinimal)
    }

    /// One-line description for the selection list
    pub fn description(&self) -> &'static str {
        match self {
            Self::None => "No desktop environment (TTY only)",
            Self::Gnome => "Full GNOME desktop with GDM",
            Self::GnomeMinimal => "GNOME shell and settings with GDM",
            Self::Kde => "KDE Plasma desktop with SDDM",
            Self::Hyprland => "Hyprland tiling compositor with SDDM",
        }
    }
}

/// Login shell for the primary user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[derive(Display, EnumString, EnumIter)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Shell {
    #[default]
    Bash,
    Zsh,
}

/// How the wizard treats values that were already supplied by the config file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[derive(Display, EnumString, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum WizardMode {
    /// Every step is shown; supplied values only pre-fill the inputs
    #[default]
    #[strum(serialize = "")]
    Interactive,
    /// Steps are shown with supplied values pre-filled for review
    Prompt,
    /// Steps whose value is already present are skipped
    Skip,
}
