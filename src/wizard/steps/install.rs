use std::sync::Arc;

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    Frame,
};
use tracing::{info, warn};

use super::{is_enter, key_of};
use crate::config::InstallConfig;
use crate::error::Result;
use crate::progress::{Poll, PhaseUpdate, ProgressReceiver};
use crate::theme::{Styles, UiConstants};
use crate::ui;
use crate::wizard::{StepCommand, StepEvent, StepKind, WizardStep};

/// Starts the phase pipeline in the background and hands back its progress
/// stream. Called once, with a frozen copy of the configuration.
pub type InstallLauncher = Box<dyn FnMut(Arc<InstallConfig>) -> Result<ProgressReceiver>>;

/// Terminal step: runs the installation and streams its progress.
///
/// The step never blocks on the channel. Each tick takes whatever events are
/// queued and returns; a closed channel ends polling.
pub struct InstallStep {
    launcher: InstallLauncher,
    rx: Option<ProgressReceiver>,
    started: bool,
    phase: String,
    fraction: f64,
    logs: Vec<String>,
    done: bool,
    err: Option<String>,
    spinner: usize,
}

impl InstallStep {
    pub fn new(launcher: InstallLauncher) -> Self {
        Self {
            launcher,
            rx: None,
            started: false,
            phase: String::new(),
            fraction: 0.0,
            logs: Vec::new(),
            done: false,
            err: None,
            spinner: 0,
        }
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    pub fn error(&self) -> Option<&str> {
        self.err.as_deref()
    }

    pub fn fraction(&self) -> f64 {
        self.fraction
    }

    pub fn logs(&self) -> &[String] {
        &self.logs
    }

    fn apply(&mut self, update: PhaseUpdate) {
        if !update.description.is_empty() {
            self.phase = update.description;
        }
        if let Some(fraction) = update.fraction {
            self.fraction = fraction;
        }
        if let Some(line) = update.log_line {
            self.logs.push(line);
            let excess = self.logs.len().saturating_sub(UiConstants::LOG_TAIL_LINES);
            self.logs.drain(..excess);
        }
        if let Some(err) = update.error {
            warn!("Installation failed: {}", err);
            self.err = Some(err);
            self.done = true;
        } else if update.done {
            info!("Installation complete");
            self.done = true;
        }
    }

    fn drain(&mut self) {
        while let Some(rx) = &self.rx {
            match rx.poll() {
                Poll::Update(update) => self.apply(update),
                Poll::Pending => return,
                Poll::Closed => {
                    self.rx = None;
                    if !self.done {
                        self.err = Some("installer stopped without reporting an outcome".to_string());
                        self.done = true;
                    }
                }
            }
        }
    }
}

impl WizardStep for InstallStep {
    fn kind(&self) -> StepKind {
        StepKind::Install
    }

    fn init(&mut self, cfg: &InstallConfig) {
        if self.started {
            return;
        }
        self.started = true;
        match (self.launcher)(Arc::new(cfg.clone())) {
            Ok(rx) => self.rx = Some(rx),
            Err(e) => {
                self.err = Some(e.to_string());
                self.done = true;
            }
        }
    }

    fn update(&mut self, event: &StepEvent, _cfg: &mut InstallConfig) -> Option<StepCommand> {
        match event {
            StepEvent::Tick => {
                self.spinner = (self.spinner + 1) % ui::SPINNER_FRAMES.len();
                self.drain();
                None
            }
            _ => {
                let key = key_of(event)?;
                (self.done && is_enter(key)).then_some(StepCommand::Submit)
            }
        }
    }

    /// Stop reading progress. A running pipeline sees the channel close and
    /// carries on without a display.
    fn release(&mut self) {
        if self.rx.take().is_some() && !self.done {
            info!("Display detached; installation continues in the background");
        }
    }

    fn render(&self, f: &mut Frame, area: Rect, _cfg: &InstallConfig) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(2), // Status
                Constraint::Length(2), // Progress bar
                Constraint::Length(2), // Reboot notice
                Constraint::Min(1),    // Log tail
            ])
            .split(area);

        let status: Line = match (&self.err, self.done) {
            (Some(err), _) => Span::styled(format!("Installation failed: {}", err), Styles::error()).into(),
            (None, true) => Span::styled("Installation complete!", Styles::success()).into(),
            (None, false) => Line::from(vec![
                Span::styled(ui::SPINNER_FRAMES[self.spinner], Styles::focused()),
                Span::raw(" "),
                Span::styled(self.phase.clone(), Styles::text()),
            ]),
        };
        ui::render_lines(f, chunks[0], vec![status]);

        let fraction = if self.done && self.err.is_none() { 1.0 } else { self.fraction };
        ui::render_progress_bar(f, chunks[1], fraction, self.err.is_some());

        if self.done && self.err.is_none() {
            ui::render_lines(f, chunks[2], vec![ui::prompt("Remove the installation media and reboot.")]);
        }
        ui::render_lines(f, chunks[3], ui::log_tail(&self.logs));
    }
}
