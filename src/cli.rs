use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Default location of the diagnostic log; the TUI owns the terminal
pub const DEFAULT_DEBUG_LOG: &str = "/tmp/archpilot-debug.log";

/// archpilot - guided Arch Linux installer
#[derive(Parser, Debug)]
#[command(name = "archpilot")]
#[command(about = "Guided Arch Linux installer: btrfs, optional LUKS2, GRUB")]
#[command(version)]
pub struct Cli {
    /// Dry-run mode: record every command the installer would run without
    /// executing any of them.
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Where diagnostics are written (filtered by RUST_LOG, default info)
    #[arg(long, global = true, value_name = "PATH", default_value = DEFAULT_DEBUG_LOG)]
    pub debug_log: PathBuf,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Run the installer (the default)
    Install {
        /// Configuration file (defaults to ./archpilot.toml when present)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Skip the wizard and run the pipeline from the configuration alone
        #[arg(long)]
        headless: bool,
    },
    /// Validate a configuration file against this machine
    Validate {
        /// Configuration file (defaults to ./archpilot.toml)
        config: Option<PathBuf>,
    },
}

impl Cli {
    /// The subcommand to run; no subcommand means an interactive install
    pub fn action(&self) -> Commands {
        self.command.clone().unwrap_or(Commands::Install {
            config: None,
            headless: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_no_subcommand_means_install() {
        let cli = Cli::parse_from(["archpilot"]);
        assert!(!cli.dry_run);
        assert_eq!(cli.debug_log, PathBuf::from(DEFAULT_DEBUG_LOG));
        assert_eq!(
            cli.action(),
            Commands::Install {
                config: None,
                headless: false
            }
        );
    }

    #[test]
    fn test_install_flags() {
        let cli = Cli::parse_from([
            "archpilot",
            "install",
            "--config",
            "/root/archpilot.toml",
            "--headless",
            "--dry-run",
        ]);
        assert!(cli.dry_run);
        assert_eq!(
            cli.action(),
            Commands::Install {
                config: Some(PathBuf::from("/root/archpilot.toml")),
                headless: true
            }
        );
    }

    #[test]
    fn test_validate_takes_optional_path() {
        let cli = Cli::parse_from(["archpilot", "--debug-log", "/tmp/x.log", "validate", "my.toml"]);
        assert_eq!(cli.debug_log, PathBuf::from("/tmp/x.log"));
        assert_eq!(
            cli.action(),
            Commands::Validate {
                config: Some(PathBuf::from("my.toml"))
            }
        );
        assert_eq!(
            Cli::parse_from(["archpilot", "validate"]).action(),
            Commands::Validate { config: None }
        );
    }
}
