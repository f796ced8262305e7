//! Wizard navigation state machine
//!
//! The wizard owns the [`InstallConfig`] and an ordered list of steps, one per
//! [`StepKind`]. Exactly one step is active. Navigation consults
//! [`should_skip`] at every transition, so a step whose value is already
//! determined is passed over in both directions.
//!
//! # Transitions
//!
//! ```text
//! Commit  -> next index whose kind is not skipped, or end the session
//! Back    -> previous non-skipped index, clamped to Welcome (not from Welcome or Install)
//! Resize  -> forwarded to the active step
//! Quit    -> end the session
//! ```

pub mod steps;

use crossterm::event::KeyEvent;
use ratatui::{
    layout::{Margin, Rect},
    text::Span,
    widgets::Paragraph,
    Frame,
};
use strum::{EnumCount, EnumIter};
use tracing::{debug, info};

use crate::components::{KeyAction, KeybindingContext};
use crate::config::InstallConfig;
use crate::theme::{Styles, UiConstants};
use crate::types::WizardMode;
use crate::ui;

/// Every interactive step, in display order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, EnumCount)]
pub enum StepKind {
    Welcome,
    Device,
    PartSize,
    Encrypt,
    Passphrase,
    Hostname,
    Timezone,
    Username,
    UserPassword,
    RootPassword,
    ZramSize,
    Desktop,
    Shell,
    Sshd,
    SshPubKey,
    Docker,
    Confirm,
    Install,
}

impl StepKind {
    /// Heading shown above the step body
    pub fn title(&self) -> &'static str {
        match self {
            Self::Welcome => "Welcome to archpilot",
            Self::Device => "Target Device",
            Self::PartSize => "EFI Partition Size",
            Self::Encrypt => "Disk Encryption",
            Self::Passphrase => "LUKS Passphrase",
            Self::Hostname => "Hostname",
            Self::Timezone => "Timezone",
            Self::Username => "Username",
            Self::UserPassword => "User Password",
            Self::RootPassword => "Root Password",
            Self::ZramSize => "ZRAM Swap Size",
            Self::Desktop => "Desktop Environment",
            Self::Shell => "Shell",
            Self::Sshd => "SSH Server",
            Self::SshPubKey => "SSH Public Key",
            Self::Docker => "Docker",
            Self::Confirm => "Confirm Installation",
            Self::Install => "Installing Arch Linux",
        }
    }

    /// Steps that are never passed over
    pub fn is_fixed(&self) -> bool {
        matches!(self, Self::Welcome | Self::Confirm | Self::Install)
    }
}

/// Whether `kind` should be passed over given the configuration right now.
///
/// Pure function of its inputs. Credentials supplied through the environment
/// are skipped in every mode; everything else is only skipped in
/// [`WizardMode::Skip`] when the value is already present.
pub fn should_skip(kind: StepKind, cfg: &InstallConfig) -> bool {
    match kind {
        StepKind::Welcome | StepKind::Confirm | StepKind::Install => return false,
        StepKind::Passphrase => return !cfg.encrypt || cfg.marks.passphrase_from_env,
        StepKind::UserPassword => return cfg.marks.user_password_from_env,
        StepKind::RootPassword => return cfg.marks.root_password_from_env,
        // A key from the config file still needs the operator's approval
        StepKind::SshPubKey => return !cfg.sshd,
        _ => {}
    }

    if cfg.mode != WizardMode::Skip {
        return false;
    }

    match kind {
        StepKind::Device => cfg.device.is_some(),
        StepKind::PartSize => !cfg.efi_size.is_empty(),
        StepKind::Encrypt => cfg.marks.encrypt,
        StepKind::Hostname => !cfg.hostname.is_empty(),
        StepKind::Timezone => !cfg.timezone.is_empty(),
        StepKind::Username => !cfg.username.is_empty(),
        StepKind::ZramSize => !cfg.zram_size.is_empty(),
        StepKind::Desktop => cfg.marks.desktop,
        StepKind::Shell => cfg.shell.is_some(),
        StepKind::Sshd => cfg.marks.sshd,
        StepKind::Docker => cfg.marks.docker,
        _ => false,
    }
}

/// Input delivered to the active step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepEvent {
    Key(KeyEvent),
    Resize(u16, u16),
    /// One turn of the UI loop with no input
    Tick,
}

/// What a step asks of the wizard after handling an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepCommand {
    /// The step's value is committed; move forward
    Submit,
}

/// One interactive screen.
///
/// Steps receive the configuration on every call instead of holding a
/// reference to it; they write to it only when committing.
pub trait WizardStep {
    fn kind(&self) -> StepKind;

    fn title(&self) -> &str {
        self.kind().title()
    }

    /// Called whenever the step becomes active. Re-reads the configuration.
    fn init(&mut self, cfg: &InstallConfig);

    fn update(&mut self, event: &StepEvent, cfg: &mut InstallConfig) -> Option<StepCommand>;

    fn render(&self, f: &mut Frame, area: Rect, cfg: &InstallConfig);

    /// Called on every step when the session is quit
    fn release(&mut self) {}
}

/// How a session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// Committed past the last step
    Completed,
    /// Operator asked to exit
    Quit,
}

/// Events the wizard itself consumes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WizardEvent {
    Key(KeyEvent),
    Resize(u16, u16),
    Tick,
}

/// Help line for the step at `kind`
pub fn help_text(kind: StepKind) -> String {
    let keys = KeybindingContext::new();
    match kind {
        StepKind::Install => keys.help_line(&[KeyAction::Quit]),
        StepKind::Welcome => keys.help_line(&[KeyAction::Next, KeyAction::Quit]),
        _ => keys.help_line(&[KeyAction::Next, KeyAction::Back, KeyAction::Quit]),
    }
}

/// The navigation state machine
pub struct Wizard {
    steps: Vec<Box<dyn WizardStep>>,
    current: usize,
    cfg: InstallConfig,
    keys: KeybindingContext,
    size: (u16, u16),
    ended: Option<SessionEnd>,
}

impl Wizard {
    /// `steps` must be non-empty and start with a step that is never skipped.
    pub fn new(cfg: InstallConfig, steps: Vec<Box<dyn WizardStep>>) -> Self {
        Self {
            steps,
            current: 0,
            cfg,
            keys: KeybindingContext::new(),
            size: (0, 0),
            ended: None,
        }
    }

    /// Activate the first step
    pub fn start(&mut self) {
        if self.steps.is_empty() {
            self.ended = Some(SessionEnd::Completed);
            return;
        }
        info!("Wizard started in {:?} mode", self.cfg.mode);
        self.steps[0].init(&self.cfg);
    }

    pub fn current(&self) -> usize {
        self.current
    }

    pub fn current_kind(&self) -> Option<StepKind> {
        self.steps.get(self.current).map(|s| s.kind())
    }

    pub fn config(&self) -> &InstallConfig {
        &self.cfg
    }

    pub fn into_config(self) -> InstallConfig {
        self.cfg
    }

    pub fn ended(&self) -> Option<SessionEnd> {
        self.ended
    }

    pub fn size(&self) -> (u16, u16) {
        self.size
    }

    /// Feed one event. Returns the session outcome once it has ended.
    pub fn handle(&mut self, event: WizardEvent) -> Option<SessionEnd> {
        if self.ended.is_some() {
            return self.ended;
        }
        match event {
            WizardEvent::Key(key) => match self.keys.action_for(&key) {
                Some(KeyAction::Quit) => self.quit(),
                Some(KeyAction::Back) => self.back(),
                _ => self.forward(StepEvent::Key(key)),
            },
            WizardEvent::Resize(w, h) => {
                self.size = (w, h);
                self.forward(StepEvent::Resize(w, h));
            }
            WizardEvent::Tick => self.forward(StepEvent::Tick),
        }
        self.ended
    }

    fn forward(&mut self, event: StepEvent) {
        let Some(step) = self.steps.get_mut(self.current) else {
            return;
        };
        if step.update(&event, &mut self.cfg) == Some(StepCommand::Submit) {
            self.commit();
        }
    }

    /// Advance past skipped steps; end the session past the last one
    pub fn commit(&mut self) {
        let mut next = self.current + 1;
        while next < self.steps.len() && should_skip(self.steps[next].kind(), &self.cfg) {
            debug!("Skipping step {:?}", self.steps[next].kind());
            next += 1;
        }
        if next >= self.steps.len() {
            info!("Wizard finished");
            self.ended = Some(SessionEnd::Completed);
            return;
        }
        self.activate(next);
    }

    /// Step back past skipped steps, clamped to the first step
    pub fn back(&mut self) {
        let Some(kind) = self.current_kind() else {
            return;
        };
        if self.current == 0 || kind == StepKind::Install {
            return;
        }
        let mut prev = self.current - 1;
        while prev > 0 && should_skip(self.steps[prev].kind(), &self.cfg) {
            prev -= 1;
        }
        self.activate(prev);
    }

    pub fn quit(&mut self) {
        info!("Wizard quit at step {}", self.current);
        for step in &mut self.steps {
            step.release();
        }
        self.ended = Some(SessionEnd::Quit);
    }

    fn activate(&mut self, index: usize) {
        self.current = index;
        debug!("Entering step {:?}", self.steps[index].kind());
        self.steps[index].init(&self.cfg);
    }

    /// Title, active step body and help line
    pub fn render(&self, f: &mut Frame) {
        let Some(step) = self.steps.get(self.current) else {
            return;
        };
        let area = f.area().inner(Margin {
            horizontal: UiConstants::FRAME_PADDING_X,
            vertical: UiConstants::FRAME_PADDING_Y,
        });
        let [title, body, help] = ui::frame_chunks(area);

        f.render_widget(Paragraph::new(Span::styled(step.title().to_string(), Styles::title())), title);
        step.render(f, body, &self.cfg);
        f.render_widget(
            Paragraph::new(Span::styled(help_text(step.kind()), Styles::nav_hint())),
            help,
        );
    }
}
