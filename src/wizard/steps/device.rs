use ratatui::{layout::Rect, Frame};

use super::key_of;
use crate::components::{ListEntry, ListEvent, SelectList};
use crate::config::{BlockDevice, InstallConfig};
use crate::wizard::{StepCommand, StepEvent, StepKind, WizardStep};

impl ListEntry for BlockDevice {
    fn label(&self) -> String {
        self.path()
    }

    fn description(&self) -> Option<String> {
        Some(format!("{}  {}", self.size, self.model).trim_end().to_string())
    }
}

/// Target disk selection
pub struct DeviceStep {
    list: SelectList<BlockDevice>,
}

impl DeviceStep {
    pub fn new(disks: Vec<BlockDevice>) -> Self {
        Self {
            list: SelectList::new("Select target disk", disks),
        }
    }
}

impl WizardStep for DeviceStep {
    fn kind(&self) -> StepKind {
        StepKind::Device
    }

    fn init(&mut self, cfg: &InstallConfig) {
        if let Some(current) = &cfg.device {
            self.list.select_where(|d| d.name == current.name);
        }
    }

    fn update(&mut self, event: &StepEvent, cfg: &mut InstallConfig) -> Option<StepCommand> {
        let key = key_of(event)?;
        if self.list.handle_key(key) != ListEvent::Chosen {
            return None;
        }
        cfg.device = self.list.selected().cloned();
        Some(StepCommand::Submit)
    }

    fn render(&self, f: &mut Frame, area: Rect, _cfg: &InstallConfig) {
        self.list.render(f, area);
    }
}
