//! Application module
//!
//! The cooperative UI loop: one thread, one event at a time. Terminal input is
//! polled with a short timeout; when nothing arrives the wizard gets a tick so
//! the install step can drain its progress channel and animate.

use crossterm::event::{self, Event, KeyEventKind};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use std::io::{stdout, Stdout};
use std::time::Duration;
use tracing::{debug, info};

use crate::config::InstallConfig;
use crate::error::{InstallerError, Result};
use crate::wizard::{SessionEnd, Wizard, WizardEvent};

/// Input poll timeout; also the tick interval
pub const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Main application struct
pub struct App {
    wizard: Wizard,
}

impl App {
    pub fn new(wizard: Wizard) -> Self {
        Self { wizard }
    }

    pub fn wizard(&self) -> &Wizard {
        &self.wizard
    }

    pub fn into_config(self) -> InstallConfig {
        self.wizard.into_config()
    }

    /// Translate one terminal event. Key releases are dropped.
    pub fn handle_event(&mut self, event: Event) -> Option<SessionEnd> {
        match event {
            Event::Key(key) if key.kind != KeyEventKind::Release => self.wizard.handle(WizardEvent::Key(key)),
            Event::Resize(width, height) => {
                debug!("Terminal resized to {}x{}", width, height);
                self.wizard.handle(WizardEvent::Resize(width, height))
            }
            _ => self.wizard.ended(),
        }
    }

    pub fn tick(&mut self) -> Option<SessionEnd> {
        self.wizard.handle(WizardEvent::Tick)
    }

    pub fn draw<B: Backend>(&self, terminal: &mut Terminal<B>) -> Result<()> {
        terminal
            .draw(|f| self.wizard.render(f))
            .map_err(|e| InstallerError::terminal(format!("Failed to draw frame: {}", e)))?;
        Ok(())
    }

    /// Run the main application loop until the session ends
    pub fn run<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<SessionEnd> {
        info!("Starting main application loop");
        if let Ok(size) = terminal.size() {
            self.wizard.handle(WizardEvent::Resize(size.width, size.height));
        }
        self.wizard.start();

        loop {
            self.draw(terminal)?;

            if event::poll(POLL_INTERVAL)? {
                if let Some(end) = self.handle_event(event::read()?) {
                    return Ok(end);
                }
            }
            if let Some(end) = self.tick() {
                return Ok(end);
            }
        }
    }
}

/// Owns the raw-mode alternate screen; restores the terminal when dropped
pub struct TerminalSession {
    terminal: Terminal<CrosstermBackend<Stdout>>,
}

impl TerminalSession {
    pub fn enter() -> Result<Self> {
        crossterm::terminal::enable_raw_mode()
            .map_err(|e| InstallerError::terminal(format!("Failed to enable raw mode: {}", e)))?;
        crossterm::execute!(stdout(), crossterm::terminal::EnterAlternateScreen)
            .map_err(|e| InstallerError::terminal(format!("Failed to enter alternate screen: {}", e)))?;
        let terminal = Terminal::new(CrosstermBackend::new(stdout()))
            .map_err(|e| InstallerError::terminal(format!("Failed to create terminal: {}", e)))?;
        Ok(Self { terminal })
    }

    pub fn terminal(&mut self) -> &mut Terminal<CrosstermBackend<Stdout>> {
        &mut self.terminal
    }
}

impl Drop for TerminalSession {
    fn drop(&mut self) {
        let _ = crossterm::terminal::disable_raw_mode();
        let _ = crossterm::execute!(stdout(), crossterm::terminal::LeaveAlternateScreen);
        let _ = self.terminal.show_cursor();
    }
}
