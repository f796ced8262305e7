use ratatui::{layout::Rect, Frame};

use super::key_of;
use crate::components::{ListEvent, SelectList};
use crate::config::InstallConfig;
use crate::wizard::{StepCommand, StepEvent, StepKind, WizardStep};

/// Filterable timezone list
pub struct TimezoneStep {
    list: SelectList<String>,
}

impl TimezoneStep {
    pub fn new(zones: Vec<String>) -> Self {
        Self {
            list: SelectList::new("Select timezone", zones).filterable(),
        }
    }
}

impl WizardStep for TimezoneStep {
    fn kind(&self) -> StepKind {
        StepKind::Timezone
    }

    fn init(&mut self, cfg: &InstallConfig) {
        if !cfg.timezone.is_empty() {
            self.list.clear_filter();
            self.list.select_where(|z| *z == cfg.timezone);
        }
    }

    fn update(&mut self, event: &StepEvent, cfg: &mut InstallConfig) -> Option<StepCommand> {
        let key = key_of(event)?;
        if self.list.handle_key(key) != ListEvent::Chosen {
            return None;
        }
        cfg.timezone = self.list.selected()?.clone();
        Some(StepCommand::Submit)
    }

    fn render(&self, f: &mut Frame, area: Rect, _cfg: &InstallConfig) {
        self.list.render(f, area);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wizard::steps::test_support::{enter, key, typed};
    use crossterm::event::KeyCode;

    fn step() -> TimezoneStep {
        TimezoneStep::new(vec![
            "America/Chicago".into(),
            "Europe/Berlin".into(),
            "UTC".into(),
        ])
    }

    #[test]
    fn test_enter_while_filtering_does_not_commit() {
        let mut cfg = InstallConfig::default();
        let mut tz = step();
        tz.init(&cfg);
        tz.update(&key(KeyCode::Char('/')), &mut cfg);
        for ev in typed("berl") {
            tz.update(&ev, &mut cfg);
        }
        assert_eq!(tz.update(&enter(), &mut cfg), None);
        assert!(cfg.timezone.is_empty());
        assert_eq!(tz.update(&enter(), &mut cfg), Some(StepCommand::Submit));
        assert_eq!(cfg.timezone, "Europe/Berlin");
    }

    #[test]
    fn test_init_highlights_configured_zone() {
        let mut cfg = InstallConfig::default();
        cfg.timezone = "UTC".into();
        let mut tz = step();
        tz.init(&cfg);
        tz.update(&enter(), &mut cfg);
        assert_eq!(cfg.timezone, "UTC");
    }
}
