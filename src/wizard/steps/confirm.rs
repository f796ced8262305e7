use ratatui::{layout::Rect, text::Span, Frame};

use super::{is_enter, key_of};
use crate::config::InstallConfig;
use crate::theme::Styles;
use crate::ui;
use crate::wizard::{StepCommand, StepEvent, StepKind, WizardStep};

/// Summary of every choice and the destructive-action warning
pub struct ConfirmStep;

impl WizardStep for ConfirmStep {
    fn kind(&self) -> StepKind {
        StepKind::Confirm
    }

    fn init(&mut self, _cfg: &InstallConfig) {}

    fn update(&mut self, event: &StepEvent, _cfg: &mut InstallConfig) -> Option<StepCommand> {
        key_of(event).filter(|k| is_enter(k)).map(|_| StepCommand::Submit)
    }

    fn render(&self, f: &mut Frame, area: Rect, cfg: &InstallConfig) {
        let mut lines: Vec<_> = cfg.summary().lines().map(|l| ui::prompt(l.to_string())).collect();
        let device = cfg.device.as_ref().map(|d| d.path()).unwrap_or_default();
        lines.push(ui::prompt(""));
        lines.push(Span::styled(format!("WARNING: This will ERASE ALL DATA on {}", device), Styles::danger()).into());
        lines.push(ui::prompt(""));
        lines.push(ui::hint("Press Enter to begin installation, Esc to go back."));
        ui::render_lines(f, area, lines);
    }
}
