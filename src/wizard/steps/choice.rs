use ratatui::{layout::Rect, Frame};

use super::{is_enter, key_of};
use crate::components::Toggle;
use crate::config::InstallConfig;
use crate::types::Shell;
use crate::ui;
use crate::wizard::{StepCommand, StepEvent, StepKind, WizardStep};

/// Binary choice: disk encryption, SSH server or login shell
pub struct ChoiceStep {
    kind: StepKind,
    toggle: Toggle,
}

impl ChoiceStep {
    pub fn new(kind: StepKind) -> Self {
        let toggle = match kind {
            StepKind::Shell => Toggle::labeled(false, "Bash", "Zsh"),
            _ => Toggle::yes_no(false),
        };
        Self { kind, toggle }
    }

    fn current(&self, cfg: &InstallConfig) -> bool {
        match self.kind {
            StepKind::Encrypt => cfg.encrypt,
            StepKind::Sshd => cfg.sshd,
            _ => cfg.shell == Some(Shell::Zsh),
        }
    }

    fn store(&self, cfg: &mut InstallConfig) {
        let on = self.toggle.is_on();
        match self.kind {
            StepKind::Encrypt => cfg.encrypt = on,
            StepKind::Sshd => cfg.sshd = on,
            _ => cfg.shell = Some(if on { Shell::Zsh } else { Shell::Bash }),
        }
    }
}

impl WizardStep for ChoiceStep {
    fn kind(&self) -> StepKind {
        self.kind
    }

    fn init(&mut self, cfg: &InstallConfig) {
        self.toggle.set(self.current(cfg));
    }

    fn update(&mut self, event: &StepEvent, cfg: &mut InstallConfig) -> Option<StepCommand> {
        let key = key_of(event)?;
        if is_enter(key) {
            self.store(cfg);
            return Some(StepCommand::Submit);
        }
        self.toggle.handle_key(key);
        None
    }

    fn render(&self, f: &mut Frame, area: Rect, cfg: &InstallConfig) {
        let mut lines = match self.kind {
            StepKind::Encrypt => vec![ui::prompt("Enable LUKS2 disk encryption?")],
            StepKind::Sshd => vec![ui::prompt("Install and enable SSH server (sshd)?")],
            _ => vec![ui::prompt(format!("Select default shell for '{}':", cfg.username))],
        };
        lines.push(ui::prompt(""));
        lines.push(self.toggle.line(true));
        lines.push(ui::prompt(""));
        match self.kind {
            StepKind::Shell => lines.push(ui::hint("Use arrow keys to toggle")),
            StepKind::Sshd => {
                lines.push(ui::hint("Root login disabled, password auth disabled, pubkey auth only."));
                lines.push(ui::hint("Use arrow keys or y/n to toggle"));
            }
            _ => lines.push(ui::hint("Use arrow keys or y/n to toggle")),
        }
        ui::render_lines(f, area, lines);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wizard::steps::test_support::{enter, key};
    use crossterm::event::KeyCode;

    #[test]
    fn test_encrypt_defaults_to_no() {
        let mut cfg = InstallConfig::default();
        let mut step = ChoiceStep::new(StepKind::Encrypt);
        step.init(&cfg);
        assert_eq!(step.update(&enter(), &mut cfg), Some(StepCommand::Submit));
        assert!(!cfg.encrypt);
    }

    #[test]
    fn test_yes_key_enables_sshd() {
        let mut cfg = InstallConfig::default();
        let mut step = ChoiceStep::new(StepKind::Sshd);
        step.init(&cfg);
        assert_eq!(step.update(&key(KeyCode::Char('y')), &mut cfg), None);
        assert!(!cfg.sshd);
        step.update(&enter(), &mut cfg);
        assert!(cfg.sshd);
    }

    #[test]
    fn test_shell_choice_is_stored_explicitly() {
        let mut cfg = InstallConfig::default();
        let mut step = ChoiceStep::new(StepKind::Shell);
        step.init(&cfg);
        step.update(&enter(), &mut cfg);
        assert_eq!(cfg.shell, Some(Shell::Bash));

        step.init(&cfg);
        step.update(&key(KeyCode::Right), &mut cfg);
        step.update(&enter(), &mut cfg);
        assert_eq!(cfg.shell, Some(Shell::Zsh));
    }

    #[test]
    fn test_init_reflects_config() {
        let mut cfg = InstallConfig::default();
        cfg.encrypt = true;
        let mut step = ChoiceStep::new(StepKind::Encrypt);
        step.init(&cfg);
        assert!(step.toggle.is_on());
    }
}
