//! Wizard-level keybindings
//!
//! The few keys the wizard itself interprets before a step sees the event,
//! and the help line built from them.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Actions that can be triggered by keybindings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyAction {
    /// Commit the active step (handled by the step itself)
    Next,
    /// Return to the previous step
    Back,
    /// End the session
    Quit,
}

/// A keybinding definition
#[derive(Debug, Clone)]
pub struct Keybinding {
    pub key: KeyCode,
    pub modifiers: KeyModifiers,
    pub action: KeyAction,
    pub display: &'static str,
    pub description: &'static str,
}

impl Keybinding {
    /// Create a new keybinding with no modifiers
    pub const fn new(key: KeyCode, action: KeyAction, display: &'static str, description: &'static str) -> Self {
        Self {
            key,
            modifiers: KeyModifiers::NONE,
            action,
            display,
            description,
        }
    }

    /// Create a keybinding with modifiers
    pub const fn with_modifiers(
        key: KeyCode,
        modifiers: KeyModifiers,
        action: KeyAction,
        display: &'static str,
        description: &'static str,
    ) -> Self {
        Self {
            key,
            modifiers,
            action,
            display,
            description,
        }
    }

    fn matches(&self, event: &KeyEvent) -> bool {
        self.key == event.code && event.modifiers.contains(self.modifiers)
    }
}

/// Keybinding registry for the wizard
#[derive(Debug, Clone)]
pub struct KeybindingContext {
    bindings: Vec<Keybinding>,
}

impl Default for KeybindingContext {
    fn default() -> Self {
        Self::new()
    }
}

impl KeybindingContext {
    pub fn new() -> Self {
        Self {
            bindings: vec![
                Keybinding::new(KeyCode::Enter, KeyAction::Next, "enter", "next"),
                Keybinding::new(KeyCode::Esc, KeyAction::Back, "esc", "back"),
                Keybinding::with_modifiers(
                    KeyCode::Char('c'),
                    KeyModifiers::CONTROL,
                    KeyAction::Quit,
                    "ctrl+c",
                    "quit",
                ),
            ],
        }
    }

    /// Wizard-level action for a key. `Next` is never returned; steps decide
    /// for themselves when Enter commits.
    pub fn action_for(&self, event: &KeyEvent) -> Option<KeyAction> {
        self.bindings
            .iter()
            .filter(|b| b.action != KeyAction::Next)
            .find(|b| b.matches(event))
            .map(|b| b.action)
    }

    /// `key description` pairs for `actions`, joined with bullets
    pub fn help_line(&self, actions: &[KeyAction]) -> String {
        actions
            .iter()
            .filter_map(|action| self.bindings.iter().find(|b| b.action == *action))
            .map(|b| format!("{} {}", b.display, b.description))
            .collect::<Vec<_>>()
            .join(" • ")
    }
}
