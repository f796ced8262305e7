use ratatui::{layout::Rect, Frame};

use super::key_of;
use crate::components::{ListEntry, ListEvent, SelectList};
use crate::config::InstallConfig;
use crate::types::DesktopEnvironment;
use crate::wizard::{StepCommand, StepEvent, StepKind, WizardStep};

impl ListEntry for DesktopEnvironment {
    fn label(&self) -> String {
        self.to_string()
    }

    fn description(&self) -> Option<String> {
        Some(DesktopEnvironment::description(self).to_string())
    }
}

/// Desktop environment selection; "None" is listed last
pub struct DesktopStep {
    list: SelectList<DesktopEnvironment>,
}

impl DesktopStep {
    pub fn new() -> Self {
        let choices = vec![
            DesktopEnvironment::Gnome,
            DesktopEnvironment::GnomeMinimal,
            DesktopEnvironment::Kde,
            DesktopEnvironment::Hyprland,
            DesktopEnvironment::None,
        ];
        Self {
            list: SelectList::new("Select desktop environment", choices),
        }
    }
}

impl Default for DesktopStep {
    fn default() -> Self {
        Self::new()
    }
}

impl WizardStep for DesktopStep {
    fn kind(&self) -> StepKind {
        StepKind::Desktop
    }

    fn init(&mut self, cfg: &InstallConfig) {
        if cfg.marks.desktop || cfg.desktop != DesktopEnvironment::None {
            self.list.select_where(|d| *d == cfg.desktop);
        }
    }

    fn update(&mut self, event: &StepEvent, cfg: &mut InstallConfig) -> Option<StepCommand> {
        let key = key_of(event)?;
        if self.list.handle_key(key) != ListEvent::Chosen {
            return None;
        }
        cfg.desktop = *self.list.selected()?;
        Some(StepCommand::Submit)
    }

    fn render(&self, f: &mut Frame, area: Rect, _cfg: &InstallConfig) {
        self.list.render(f, area);
    }
}
