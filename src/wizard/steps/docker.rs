use crossterm::event::KeyCode;
use ratatui::{layout::Rect, Frame};

use super::{is_enter, key_of};
use crate::components::Toggle;
use crate::config::InstallConfig;
use crate::ui;
use crate::wizard::{StepCommand, StepEvent, StepKind, WizardStep};

/// Docker installation and docker group membership as two toggle rows.
/// The group row is only reachable while Docker is enabled.
pub struct DockerStep {
    docker: Toggle,
    group: Toggle,
    row: usize,
}

impl DockerStep {
    pub fn new() -> Self {
        Self {
            docker: Toggle::yes_no(false),
            group: Toggle::yes_no(false),
            row: 0,
        }
    }
}

impl Default for DockerStep {
    fn default() -> Self {
        Self::new()
    }
}

impl WizardStep for DockerStep {
    fn kind(&self) -> StepKind {
        StepKind::Docker
    }

    fn init(&mut self, cfg: &InstallConfig) {
        self.docker.set(cfg.docker);
        self.group.set(cfg.docker_group);
        self.row = 0;
    }

    fn update(&mut self, event: &StepEvent, cfg: &mut InstallConfig) -> Option<StepCommand> {
        let key = key_of(event)?;
        if is_enter(key) {
            cfg.docker = self.docker.is_on();
            cfg.docker_group = self.docker.is_on() && self.group.is_on();
            return Some(StepCommand::Submit);
        }
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => self.row = 0,
            KeyCode::Down | KeyCode::Char('j') if self.docker.is_on() => self.row = 1,
            _ if self.row == 0 => {
                self.docker.handle_key(key);
            }
            _ => {
                self.group.handle_key(key);
            }
        }
        if !self.docker.is_on() {
            self.row = 0;
        }
        None
    }

    fn render(&self, f: &mut Frame, area: Rect, cfg: &InstallConfig) {
        let mut lines = vec![
            ui::prompt("Install Docker?"),
            ui::prompt(""),
            self.docker.line(self.row == 0),
        ];
        if self.docker.is_on() {
            lines.push(ui::prompt(""));
            lines.push(ui::prompt(format!("Add '{}' to docker group?", cfg.username)));
            lines.push(ui::prompt(""));
            lines.push(self.group.line(self.row == 1));
        }
        lines.push(ui::prompt(""));
        lines.push(ui::hint("Use arrow keys or y/n to toggle, up/down to switch rows"));
        ui::render_lines(f, area, lines);
    }
}
