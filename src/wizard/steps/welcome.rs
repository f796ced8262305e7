use ratatui::{layout::Rect, Frame};

use super::{is_enter, key_of};
use crate::config::InstallConfig;
use crate::ui;
use crate::wizard::{StepCommand, StepEvent, StepKind, WizardStep};

pub struct WelcomeStep;

impl WizardStep for WelcomeStep {
    fn kind(&self) -> StepKind {
        StepKind::Welcome
    }

    fn init(&mut self, _cfg: &InstallConfig) {}

    fn update(&mut self, event: &StepEvent, _cfg: &mut InstallConfig) -> Option<StepCommand> {
        key_of(event).filter(|k| is_enter(k)).map(|_| StepCommand::Submit)
    }

    fn render(&self, f: &mut Frame, area: Rect, _cfg: &InstallConfig) {
        let lines = vec![
            ui::prompt("Arch Linux Installer"),
            ui::prompt(""),
            ui::prompt("This wizard will guide you through installing Arch Linux."),
            ui::prompt("UEFI boot mode with btrfs subvolumes, optional LUKS encryption."),
            ui::prompt(""),
            ui::hint("Press Enter to begin."),
        ];
        ui::render_lines(f, area, lines);
    }
}
