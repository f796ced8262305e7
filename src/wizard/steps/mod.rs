//! Concrete wizard steps
//!
//! Steps are grouped by shape rather than one file per screen: single text
//! fields, confirmed secrets and binary choices each share one implementation
//! parameterised by the [`StepKind`] they serve.

mod choice;
mod confirm;
mod desktop;
mod device;
mod docker;
mod field;
mod install;
mod password;
mod ssh_pubkey;
mod timezone;
mod welcome;

pub use choice::ChoiceStep;
pub use confirm::ConfirmStep;
pub use desktop::DesktopStep;
pub use device::DeviceStep;
pub use docker::DockerStep;
pub use field::FieldStep;
pub use install::{InstallLauncher, InstallStep};
pub use password::PasswordStep;
pub use ssh_pubkey::SshPubKeyStep;
pub use timezone::TimezoneStep;
pub use welcome::WelcomeStep;

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind};

use super::{StepEvent, StepKind, WizardStep};
use crate::config::BlockDevice;

/// Every step in [`StepKind`] order
pub fn build_all(
    disks: Vec<BlockDevice>,
    timezones: Vec<String>,
    launcher: InstallLauncher,
) -> Vec<Box<dyn WizardStep>> {
    vec![
        Box::new(WelcomeStep),
        Box::new(DeviceStep::new(disks)),
        Box::new(FieldStep::new(StepKind::PartSize)),
        Box::new(ChoiceStep::new(StepKind::Encrypt)),
        Box::new(PasswordStep::new(StepKind::Passphrase)),
        Box::new(FieldStep::new(StepKind::Hostname)),
        Box::new(TimezoneStep::new(timezones)),
        Box::new(FieldStep::new(StepKind::Username)),
        Box::new(PasswordStep::new(StepKind::UserPassword)),
        Box::new(PasswordStep::new(StepKind::RootPassword)),
        Box::new(FieldStep::new(StepKind::ZramSize)),
        Box::new(DesktopStep::new()),
        Box::new(ChoiceStep::new(StepKind::Shell)),
        Box::new(ChoiceStep::new(StepKind::Sshd)),
        Box::new(SshPubKeyStep::new()),
        Box::new(DockerStep::new()),
        Box::new(ConfirmStep),
        Box::new(InstallStep::new(launcher)),
    ]
}

/// The key in a step event, ignoring release events on terminals that report them
fn key_of(event: &StepEvent) -> Option<&KeyEvent> {
    match event {
        StepEvent::Key(key) if key.kind != KeyEventKind::Release => Some(key),
        _ => None,
    }
}

fn is_enter(key: &KeyEvent) -> bool {
    key.code == KeyCode::Enter
}
