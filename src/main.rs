//! archpilot - Main entry point
//!
//! Parses the command line, checks preconditions, then either drives the
//! wizard in the terminal or runs the pipeline headless.

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use archpilot::app::{App, TerminalSession};
use archpilot::cli::{Cli, Commands};
use archpilot::command_executor::{RecordingRunner, Runner, SystemRunner};
use archpilot::config::InstallConfig;
use archpilot::config_file;
use archpilot::hardware::{self, HardwareInfo};
use archpilot::install_log::DEFAULT_LOG_PATH;
use archpilot::installer::{cleanup, Installer, DEFAULT_TARGET_ROOT};
use archpilot::process_guard::{self, ProcessGuard};
use archpilot::progress::ProgressReceiver;
use archpilot::wizard::steps::{self, InstallLauncher};
use archpilot::wizard::{SessionEnd, Wizard};

/// Where the pipeline mounts the target and writes its log
#[derive(Debug, Clone)]
struct Target {
    root: PathBuf,
    log_path: PathBuf,
}

impl Target {
    fn live() -> Self {
        Self {
            root: PathBuf::from(DEFAULT_TARGET_ROOT),
            log_path: PathBuf::from(DEFAULT_LOG_PATH),
        }
    }

    /// A scratch root so a dry run never touches `/mnt`
    fn dry_run() -> Self {
        let base = std::env::temp_dir().join("archpilot-dry-run");
        Self {
            root: base.join("target"),
            log_path: base.join("archpilot.log"),
        }
    }
}

/// Initialize tracing into the debug log file; the TUI owns the terminal
fn init_tracing(path: &Path) -> Result<()> {
    let file = File::create(path).with_context(|| format!("Failed to create debug log {}", path.display()))?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

/// Main application entry point
fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_tracing(&cli.debug_log) {
        eprintln!("warning: {:#}", e);
    }
    info!("archpilot starting up");

    if let Err(e) = process_guard::init_signal_handlers() {
        warn!("Failed to initialize signal handlers: {}", e);
    }
    let _guard = ProcessGuard::new();

    let result = match cli.action() {
        Commands::Validate { config } => validate(config.as_deref()),
        Commands::Install { config, headless } => install(config.as_deref(), headless, cli.dry_run),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Load and check a configuration file against this machine
fn validate(path: Option<&Path>) -> Result<ExitCode> {
    let Some(path) = config_file::locate(path)? else {
        bail!("no configuration file found (expected ./{})", config_file::CONFIG_FILE_NAME);
    };
    info!("Validating configuration file: {}", path.display());

    let hw = HardwareInfo::detect()?;
    let cfg = config_file::load_install_config(
        Some(path.as_path()),
        &hw.disks,
        &hw.timezones,
        &hw.default_zram_size,
        |k| std::env::var(k).ok(),
    )?;

    println!("✓ Configuration file is valid: {}", path.display());
    println!();
    println!("{}", cfg.summary());
    let missing = cfg.missing_fields();
    if !missing.is_empty() {
        println!();
        println!("The wizard will ask for: {}", missing.join(", "));
    }
    Ok(ExitCode::SUCCESS)
}

fn install(config: Option<&Path>, headless: bool, dry_run: bool) -> Result<ExitCode> {
    if dry_run {
        let target = Target::dry_run();
        std::fs::create_dir_all(&target.root)
            .with_context(|| format!("Failed to create dry-run root {}", target.root.display()))?;
        info!("Dry-run mode: commands are recorded, not executed");
        run_install(config, headless, RecordingRunner::new(), target)
    } else {
        hardware::require_root()?;
        run_install(config, headless, SystemRunner, Target::live())
    }
}

fn run_install<R>(config: Option<&Path>, headless: bool, runner: R, target: Target) -> Result<ExitCode>
where
    R: Runner + Clone + 'static,
{
    let hw = HardwareInfo::detect()?;
    debug!("{}", hw);

    let path = config_file::locate(config)?;
    let cfg = config_file::load_install_config(
        path.as_deref(),
        &hw.disks,
        &hw.timezones,
        &hw.default_zram_size,
        |k| std::env::var(k).ok(),
    )?;

    if headless {
        run_headless(cfg, runner, target)
    } else {
        run_tui(cfg, hw, runner, target)
    }
}

/// Arm signal-time cleanup for this run and start the pipeline thread
fn launch<R>(cfg: Arc<InstallConfig>, runner: R, target: &Target) -> archpilot::Result<(ProgressReceiver, JoinHandle<()>)>
where
    R: Runner + Clone + 'static,
{
    info!("Starting installation onto {}", target.root.display());
    process_guard::on_abort(cleanup::abort_hook(runner.clone(), target.root.clone(), cfg.encrypt));
    Installer::new(cfg, runner)
        .with_target_root(&target.root)
        .with_log_path(&target.log_path)
        .spawn()
}

fn run_tui<R>(cfg: InstallConfig, hw: HardwareInfo, runner: R, target: Target) -> Result<ExitCode>
where
    R: Runner + Clone + 'static,
{
    let worker: Arc<Mutex<Option<JoinHandle<()>>>> = Arc::default();
    let slot = Arc::clone(&worker);
    let launcher: InstallLauncher = Box::new(move |cfg: Arc<InstallConfig>| -> archpilot::Result<ProgressReceiver> {
        let (rx, handle) = launch(cfg, runner.clone(), &target)?;
        if let Ok(mut slot) = slot.lock() {
            *slot = Some(handle);
        }
        Ok(rx)
    });

    let wizard = Wizard::new(cfg, steps::build_all(hw.disks, hw.timezones, launcher));
    let mut app = App::new(wizard);
    let end = {
        let mut session = TerminalSession::enter()?;
        app.run(session.terminal())?
    };
    info!("Wizard session ended: {:?}", end);
    // Closes the progress channel so a running pipeline never blocks on a full queue
    drop(app);

    let handle = worker.lock().ok().and_then(|mut slot| slot.take());
    match handle {
        Some(handle) => {
            if !handle.is_finished() {
                println!("Waiting for the installer to finish...");
            }
            if handle.join().is_err() {
                error!("Installer thread panicked");
                return Ok(ExitCode::FAILURE);
            }
        }
        None if end == SessionEnd::Quit => println!("Installation cancelled; no changes were made."),
        None => {}
    }
    Ok(ExitCode::SUCCESS)
}

fn run_headless<R>(cfg: InstallConfig, runner: R, target: Target) -> Result<ExitCode>
where
    R: Runner + Clone + 'static,
{
    let missing = cfg.missing_fields();
    if !missing.is_empty() {
        eprintln!("✗ Configuration incomplete, missing: {}", missing.join(", "));
        return Ok(ExitCode::FAILURE);
    }
    println!("{}", cfg.summary());
    println!();

    let (rx, handle) = launch(Arc::new(cfg), runner, &target)?;
    let mut failed = false;
    let mut completed = false;
    for update in rx {
        if let Some(line) = update.log_line {
            println!("    {}", line);
        } else if let Some(err) = update.error {
            eprintln!("✗ {}: {}", update.description, err);
            failed = true;
        } else if update.done {
            println!("✓ {}", update.description);
            completed = true;
        } else {
            let percent = (update.fraction.unwrap_or(0.0) * 100.0).round() as u32;
            println!("[{:>3}%] {}", percent, update.description);
        }
    }
    if handle.join().is_err() {
        error!("Installer thread panicked");
        failed = true;
    }

    if failed || !completed {
        eprintln!("Installation failed; see {}", target.log_path.display());
        return Ok(ExitCode::FAILURE);
    }
    println!("Remove the installation media and reboot.");
    Ok(ExitCode::SUCCESS)
}
