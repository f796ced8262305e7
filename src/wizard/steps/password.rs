use crossterm::event::KeyCode;
use ratatui::{layout::Rect, Frame};

use super::{is_enter, key_of};
use crate::components::TextInput;
use crate::config::InstallConfig;
use crate::error::Result;
use crate::ui;
use crate::validate;
use crate::wizard::{StepCommand, StepEvent, StepKind, WizardStep};

/// A secret entered twice: LUKS passphrase, user password or root password
pub struct PasswordStep {
    kind: StepKind,
    value: TextInput,
    confirm: TextInput,
    /// 0 = value, 1 = confirmation
    focused: usize,
    err: Option<String>,
}

impl PasswordStep {
    pub fn new(kind: StepKind) -> Self {
        let (value, confirm) = match kind {
            StepKind::Passphrase => ("Passphrase", "Confirm passphrase"),
            StepKind::RootPassword => ("Root password", "Confirm root password"),
            _ => ("Password", "Confirm password"),
        };
        Self {
            kind,
            value: TextInput::new(value).masked().with_char_limit(128),
            confirm: TextInput::new(confirm).masked().with_char_limit(128),
            focused: 0,
            err: None,
        }
    }

    fn validator(&self) -> fn(&str) -> Result<()> {
        match self.kind {
            StepKind::Passphrase => validate::passphrase,
            _ => validate::password,
        }
    }

    fn mismatch_message(&self) -> &'static str {
        match self.kind {
            StepKind::Passphrase => "passphrases do not match",
            _ => "passwords do not match",
        }
    }

    fn store(&self, cfg: &mut InstallConfig, secret: String) {
        match self.kind {
            StepKind::Passphrase => cfg.luks_passphrase = secret,
            StepKind::RootPassword => cfg.root_password = secret,
            _ => cfg.user_password = secret,
        }
    }

    fn switch_focus(&mut self) {
        self.focused = 1 - self.focused;
        if self.focused == 0 {
            self.confirm.blur();
            self.value.focus();
        } else {
            self.value.blur();
            self.confirm.focus();
        }
    }
}

impl WizardStep for PasswordStep {
    fn kind(&self) -> StepKind {
        self.kind
    }

    /// Secrets are never pre-filled
    fn init(&mut self, _cfg: &InstallConfig) {
        self.value.clear();
        self.confirm.clear();
        self.confirm.blur();
        self.value.focus();
        self.focused = 0;
        self.err = None;
    }

    fn update(&mut self, event: &StepEvent, cfg: &mut InstallConfig) -> Option<StepCommand> {
        let key = key_of(event)?;
        if matches!(key.code, KeyCode::Tab | KeyCode::BackTab) {
            self.switch_focus();
            return None;
        }
        if !is_enter(key) {
            if self.focused == 0 {
                self.value.handle_key(key);
            } else {
                self.confirm.handle_key(key);
            }
            return None;
        }

        if self.focused == 0 {
            self.switch_focus();
            return None;
        }
        if let Err(e) = (self.validator())(self.value.value()) {
            self.err = Some(e.to_string());
            return None;
        }
        if self.value.value() != self.confirm.value() {
            self.err = Some(self.mismatch_message().to_string());
            return None;
        }
        self.err = None;
        self.store(cfg, self.value.value().to_string());
        Some(StepCommand::Submit)
    }

    fn render(&self, f: &mut Frame, area: Rect, cfg: &InstallConfig) {
        let prompt = match self.kind {
            StepKind::Passphrase => "Enter encryption passphrase:".to_string(),
            StepKind::RootPassword => "Enter root password:".to_string(),
            _ => format!("Enter password for user '{}':", cfg.username),
        };
        let mut lines = vec![
            ui::prompt(prompt),
            ui::prompt(""),
            self.value.line(),
            self.confirm.line(),
        ];
        ui::push_error(&mut lines, &self.err);
        lines.push(ui::hint("Tab to switch fields"));
        ui::render_lines(f, area, lines);
    }
}
