use ratatui::{layout::Rect, Frame};

use super::{is_enter, key_of};
use crate::components::TextInput;
use crate::config::{InstallConfig, DEFAULT_EFI_SIZE};
use crate::error::Result;
use crate::ui;
use crate::validate;
use crate::wizard::{StepCommand, StepEvent, StepKind, WizardStep};

/// Per-kind wiring of a single text field to the configuration
struct FieldSpec {
    prompt: &'static str,
    placeholder: &'static str,
    get: fn(&InstallConfig) -> &str,
    set: fn(&mut InstallConfig, String),
    validate: fn(&str) -> Result<()>,
}

fn spec_for(kind: StepKind) -> FieldSpec {
    match kind {
        StepKind::PartSize => FieldSpec {
            prompt: "Enter the size of the EFI partition:",
            placeholder: DEFAULT_EFI_SIZE,
            get: |c| c.efi_size.as_str(),
            set: |c, v| c.efi_size = v,
            validate: validate::partition_size,
        },
        StepKind::Hostname => FieldSpec {
            prompt: "Enter a hostname for this machine:",
            placeholder: "archlinux",
            get: |c| c.hostname.as_str(),
            set: |c, v| c.hostname = v,
            validate: validate::hostname,
        },
        StepKind::Username => FieldSpec {
            prompt: "Enter the primary user's username:",
            placeholder: "user",
            get: |c| c.username.as_str(),
            set: |c, v| c.username = v,
            validate: validate::username,
        },
        _ => FieldSpec {
            prompt: "Enter ZRAM swap size (default: half of RAM):",
            placeholder: "",
            get: |c| c.zram_size.as_str(),
            set: |c, v| c.zram_size = v,
            validate: validate::zram_size,
        },
    }
}

/// One validated text field: EFI size, hostname, username or ZRAM size.
///
/// Empty input falls back to a default where one exists: `512M` for the EFI
/// partition, and the size the configuration held when the step was first
/// shown for ZRAM.
pub struct FieldStep {
    kind: StepKind,
    spec: FieldSpec,
    input: TextInput,
    fallback: Option<String>,
    err: Option<String>,
}

impl FieldStep {
    pub fn new(kind: StepKind) -> Self {
        let spec = spec_for(kind);
        let fallback = (kind == StepKind::PartSize).then(|| DEFAULT_EFI_SIZE.to_string());
        Self {
            kind,
            input: TextInput::new(spec.placeholder),
            spec,
            fallback,
            err: None,
        }
    }

    pub fn value(&self) -> &str {
        self.input.value()
    }
}

impl WizardStep for FieldStep {
    fn kind(&self) -> StepKind {
        self.kind
    }

    fn init(&mut self, cfg: &InstallConfig) {
        let current = (self.spec.get)(cfg).to_string();
        if self.kind == StepKind::ZramSize && self.fallback.is_none() && !current.is_empty() {
            self.input.set_placeholder(current.clone());
            self.fallback = Some(current.clone());
        }
        self.input.set_value(current);
        self.input.focus();
        self.err = None;
    }

    fn update(&mut self, event: &StepEvent, cfg: &mut InstallConfig) -> Option<StepCommand> {
        let key = key_of(event)?;
        if !is_enter(key) {
            self.input.handle_key(key);
            return None;
        }

        let mut value = self.input.value().trim().to_string();
        if value.is_empty() {
            if let Some(fallback) = &self.fallback {
                value = fallback.clone();
            }
        }
        if let Err(e) = (self.spec.validate)(&value) {
            self.err = Some(e.to_string());
            return None;
        }
        self.err = None;
        (self.spec.set)(cfg, value);
        Some(StepCommand::Submit)
    }

    fn render(&self, f: &mut Frame, area: Rect, _cfg: &InstallConfig) {
        let mut lines = vec![ui::prompt(self.spec.prompt), ui::prompt(""), self.input.line()];
        ui::push_error(&mut lines, &self.err);
        ui::render_lines(f, area, lines);
    }
}
