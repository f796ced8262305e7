//! Two-state choice rendered as `[ Yes ]   No`

use crossterm::event::{KeyCode, KeyEvent};
use ratatui::text::{Line, Span};

use crate::theme::Styles;

/// A binary choice with custom labels
#[derive(Debug, Clone)]
pub struct Toggle {
    on: bool,
    on_label: &'static str,
    off_label: &'static str,
    /// `y`/`n` set the value directly
    yes_no_keys: bool,
}

impl Toggle {
    /// Yes/No toggle that also answers to `y` and `n`
    pub fn yes_no(on: bool) -> Self {
        Self {
            on,
            on_label: "Yes",
            off_label: "No",
            yes_no_keys: true,
        }
    }

    /// Toggle between two named options; `on` selects `on_label`
    pub fn labeled(on: bool, off_label: &'static str, on_label: &'static str) -> Self {
        Self {
            on,
            on_label,
            off_label,
            yes_no_keys: false,
        }
    }

    pub fn is_on(&self) -> bool {
        self.on
    }

    pub fn set(&mut self, on: bool) {
        self.on = on;
    }

    /// Returns true if the key was consumed
    pub fn handle_key(&mut self, key: &KeyEvent) -> bool {
        match key.code {
            KeyCode::Left | KeyCode::Right | KeyCode::Tab | KeyCode::Char('h') | KeyCode::Char('l') => {
                self.on = !self.on;
            }
            KeyCode::Char('y') if self.yes_no_keys => self.on = true,
            KeyCode::Char('n') if self.yes_no_keys => self.on = false,
            _ => return false,
        }
        true
    }

    /// The chosen option is bracketed; `focused` picks the stronger highlight
    pub fn line(&self, focused: bool) -> Line<'static> {
        let chosen = if focused {
            Styles::focused()
        } else {
            Styles::text_secondary()
        };
        let render = |label: &str, is_chosen: bool| {
            if is_chosen {
                Span::styled(format!("[ {} ]", label), chosen)
            } else {
                Span::styled(format!("  {}  ", label), Styles::unselected())
            }
        };
        // Affirmative option first, the way the prompts read
        let (first, second) = if self.yes_no_keys {
            (render(self.on_label, self.on), render(self.off_label, !self.on))
        } else {
            (render(self.off_label, !self.on), render(self.on_label, self.on))
        };
        Line::from(vec![first, Span::raw("   "), second])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyModifiers;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn text(line: &Line) -> String {
        line.spans.iter().map(|s| s.content.to_string()).collect()
    }

    #[test]
    fn test_arrow_keys_flip() {
        let mut t = Toggle::yes_no(false);
        assert!(t.handle_key(&key(KeyCode::Right)));
        assert!(t.is_on());
        t.handle_key(&key(KeyCode::Tab));
        assert!(!t.is_on());
    }

    #[test]
    fn test_yes_no_keys() {
        let mut t = Toggle::yes_no(false);
        t.handle_key(&key(KeyCode::Char('y')));
        assert!(t.is_on());
        t.handle_key(&key(KeyCode::Char('y')));
        assert!(t.is_on());
        t.handle_key(&key(KeyCode::Char('n')));
        assert!(!t.is_on());

        let mut shell = Toggle::labeled(false, "Bash", "Zsh");
        assert!(!shell.handle_key(&key(KeyCode::Char('y'))));
        assert!(!shell.is_on());
    }

    #[test]
    fn test_rendering_brackets_the_choice() {
        assert_eq!(text(&Toggle::yes_no(true).line(true)), "[ Yes ]     No  ");
        assert_eq!(text(&Toggle::labeled(true, "Bash", "Zsh").line(true)), "  Bash     [ Zsh ]");
    }
}
