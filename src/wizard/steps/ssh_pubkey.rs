use ratatui::{layout::Rect, Frame};

use super::{is_enter, key_of};
use crate::components::TextInput;
use crate::config::InstallConfig;
use crate::ui;
use crate::validate;
use crate::wizard::{StepCommand, StepEvent, StepKind, WizardStep};

/// Word the operator types to keep a key from the config file
pub const APPROVE_WORD: &str = "APPROVE";

const APPROVE_ERROR: &str = "Type APPROVE to install this key, or press Enter with empty input to skip";

/// SSH public key for the primary user.
///
/// A key from the config file is shown for approval instead of being edited:
/// typing `APPROVE` keeps it and empty input drops it. Otherwise the operator
/// pastes a key or leaves the field empty to install none.
pub struct SshPubKeyStep {
    input: TextInput,
    approval: bool,
    err: Option<String>,
}

impl SshPubKeyStep {
    pub fn new() -> Self {
        Self {
            input: TextInput::new(""),
            approval: false,
            err: None,
        }
    }

    fn commit_approval(&mut self, value: &str, cfg: &mut InstallConfig) -> Option<StepCommand> {
        match value {
            "" => cfg.ssh_pubkey.clear(),
            APPROVE_WORD => {}
            _ => {
                self.err = Some(APPROVE_ERROR.to_string());
                return None;
            }
        }
        self.err = None;
        Some(StepCommand::Submit)
    }

    fn commit_key(&mut self, value: &str, cfg: &mut InstallConfig) -> Option<StepCommand> {
        if value.is_empty() {
            cfg.ssh_pubkey.clear();
        } else {
            if let Err(e) = validate::ssh_pubkey(value) {
                self.err = Some(e.to_string());
                return None;
            }
            cfg.ssh_pubkey = value.to_string();
        }
        self.err = None;
        Some(StepCommand::Submit)
    }
}

impl Default for SshPubKeyStep {
    fn default() -> Self {
        Self::new()
    }
}

impl WizardStep for SshPubKeyStep {
    fn kind(&self) -> StepKind {
        StepKind::SshPubKey
    }

    fn init(&mut self, cfg: &InstallConfig) {
        self.approval = cfg.marks.ssh_pubkey_from_config && !cfg.ssh_pubkey.is_empty();
        self.input = if self.approval {
            TextInput::new("Type APPROVE to install, or press Enter to skip").with_char_limit(APPROVE_WORD.len())
        } else {
            let mut input = TextInput::new("ssh-ed25519 AAAA... user@host").with_char_limit(1024);
            input.set_value(cfg.ssh_pubkey.clone());
            input
        };
        self.input.focus();
        self.err = None;
    }

    fn update(&mut self, event: &StepEvent, cfg: &mut InstallConfig) -> Option<StepCommand> {
        let key = key_of(event)?;
        if !is_enter(key) {
            self.input.handle_key(key);
            return None;
        }
        let value = self.input.value().trim().to_string();
        if self.approval {
            self.commit_approval(&value, cfg)
        } else {
            self.commit_key(&value, cfg)
        }
    }

    fn render(&self, f: &mut Frame, area: Rect, cfg: &InstallConfig) {
        let mut lines = Vec::new();
        if self.approval {
            lines.push(ui::prompt("The configuration file specifies an SSH public key to install"));
            lines.push(ui::prompt(format!("for '{}':", cfg.username)));
            lines.push(ui::prompt(""));
            lines.push(ui::hint(cfg.ssh_pubkey.clone()));
            lines.push(ui::prompt(""));
        } else {
            lines.push(ui::prompt(format!("Paste an SSH public key for '{}':", cfg.username)));
            lines.push(ui::prompt(""));
        }
        lines.push(self.input.line());
        ui::push_error(&mut lines, &self.err);
        lines.push(ui::hint(if self.approval {
            "Type APPROVE to install this key, or press Enter to skip."
        } else {
            "Added to ~/.ssh/authorized_keys. Press Enter to skip."
        }));
        ui::render_lines(f, area, lines);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wizard::steps::test_support::{enter, typed};

    const KEY: &str = "ssh-ed25519 AAAAC3NzaC1lZDI1NTE5AAAAIB alice@laptop";

    fn from_config() -> InstallConfig {
        let mut cfg = InstallConfig::default();
        cfg.sshd = true;
        cfg.ssh_pubkey = KEY.into();
        cfg.marks.ssh_pubkey_from_config = true;
        cfg
    }

    fn submit(step: &mut SshPubKeyStep, cfg: &mut InstallConfig, text: &str) -> Option<StepCommand> {
        for ev in typed(text) {
            step.update(&ev, cfg);
        }
        step.update(&enter(), cfg)
    }

    #[test]
    fn test_approve_keeps_config_key() {
        let mut cfg = from_config();
        let mut step = SshPubKeyStep::new();
        step.init(&cfg);
        assert_eq!(submit(&mut step, &mut cfg, "APPROVE"), Some(StepCommand::Submit));
        assert_eq!(cfg.ssh_pubkey, KEY);
    }

    #[test]
    fn test_empty_approval_drops_config_key() {
        let mut cfg = from_config();
        let mut step = SshPubKeyStep::new();
        step.init(&cfg);
        assert_eq!(submit(&mut step, &mut cfg, ""), Some(StepCommand::Submit));
        assert!(cfg.ssh_pubkey.is_empty());
    }

    #[test]
    fn test_other_words_are_refused() {
        let mut cfg = from_config();
        let mut step = SshPubKeyStep::new();
        step.init(&cfg);
        assert_eq!(submit(&mut step, &mut cfg, "yes"), None);
        assert_eq!(step.err.as_deref(), Some(APPROVE_ERROR));
        assert_eq!(cfg.ssh_pubkey, KEY);
    }

    #[test]
    fn test_approval_input_is_limited() {
        let mut cfg = from_config();
        let mut step = SshPubKeyStep::new();
        step.init(&cfg);
        for ev in typed("APPROVED!") {
            step.update(&ev, &mut cfg);
        }
        assert_eq!(step.input.value(), "APPROVE");
    }

    #[test]
    fn test_interactive_key_is_validated() {
        let mut cfg = InstallConfig::default();
        cfg.sshd = true;
        let mut step = SshPubKeyStep::new();
        step.init(&cfg);
        assert_eq!(submit(&mut step, &mut cfg, "not a key"), None);
        assert!(step.err.is_some());

        step.init(&cfg);
        assert_eq!(submit(&mut step, &mut cfg, KEY), Some(StepCommand::Submit));
        assert_eq!(cfg.ssh_pubkey, KEY);
    }

    #[test]
    fn test_interactive_empty_installs_no_key() {
        let mut cfg = InstallConfig::default();
        let mut step = SshPubKeyStep::new();
        step.init(&cfg);
        assert_eq!(submit(&mut step, &mut cfg, ""), Some(StepCommand::Submit));
        assert!(cfg.ssh_pubkey.is_empty());
    }
}
