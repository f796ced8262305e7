//! Single-line text input with optional masking

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{
    style::Style,
    text::{Line, Span},
};

use crate::theme::Styles;

/// Character used in place of masked input
pub const MASK_CHAR: char = '*';

/// Editable single-line text field
#[derive(Debug, Clone, Default)]
pub struct TextInput {
    value: String,
    /// Cursor position in characters
    cursor: usize,
    placeholder: String,
    masked: bool,
    char_limit: Option<usize>,
    focused: bool,
}

impl TextInput {
    pub fn new(placeholder: impl Into<String>) -> Self {
        Self {
            placeholder: placeholder.into(),
            ..Self::default()
        }
    }

    /// Echo `*` instead of the typed characters
    pub fn masked(mut self) -> Self {
        self.masked = true;
        self
    }

    pub fn with_char_limit(mut self, limit: usize) -> Self {
        self.char_limit = Some(limit);
        self
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn set_value(&mut self, value: impl Into<String>) {
        self.value = value.into();
        if let Some(limit) = self.char_limit {
            self.value = self.value.chars().take(limit).collect();
        }
        self.cursor = self.value.chars().count();
    }

    pub fn set_placeholder(&mut self, placeholder: impl Into<String>) {
        self.placeholder = placeholder.into();
    }

    pub fn clear(&mut self) {
        self.value.clear();
        self.cursor = 0;
    }

    pub fn focus(&mut self) {
        self.focused = true;
    }

    pub fn blur(&mut self) {
        self.focused = false;
    }

    pub fn is_focused(&self) -> bool {
        self.focused
    }

    fn byte_index(&self, char_pos: usize) -> usize {
        self.value
            .char_indices()
            .nth(char_pos)
            .map(|(i, _)| i)
            .unwrap_or(self.value.len())
    }

    /// Apply an editing key. Returns true if the key was consumed.
    pub fn handle_key(&mut self, key: &KeyEvent) -> bool {
        if !self.focused {
            return false;
        }
        let len = self.value.chars().count();
        match key.code {
            KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.clear();
            }
            KeyCode::Char(_) if key.modifiers.contains(KeyModifiers::CONTROL) => return false,
            KeyCode::Char(c) => {
                if self.char_limit.is_some_and(|limit| len >= limit) {
                    return true;
                }
                let at = self.byte_index(self.cursor);
                self.value.insert(at, c);
                self.cursor += 1;
            }
            KeyCode::Backspace => {
                if self.cursor > 0 {
                    let at = self.byte_index(self.cursor - 1);
                    self.value.remove(at);
                    self.cursor -= 1;
                }
            }
            KeyCode::Delete => {
                if self.cursor < len {
                    let at = self.byte_index(self.cursor);
                    self.value.remove(at);
                }
            }
            KeyCode::Left => self.cursor = self.cursor.saturating_sub(1),
            KeyCode::Right => self.cursor = (self.cursor + 1).min(len),
            KeyCode::Home => self.cursor = 0,
            KeyCode::End => self.cursor = len,
            _ => return false,
        }
        true
    }

    /// Text as it should appear on screen
    pub fn display_value(&self) -> String {
        if self.masked {
            MASK_CHAR.to_string().repeat(self.value.chars().count())
        } else {
            self.value.clone()
        }
    }

    /// Prompt, value (or placeholder) and a block cursor when focused
    pub fn line(&self) -> Line<'static> {
        let prompt_style = if self.focused {
            Styles::focused()
        } else {
            Styles::text_muted()
        };
        let mut spans = vec![Span::styled("> ", prompt_style)];

        if self.value.is_empty() {
            if self.focused {
                spans.push(Span::styled(" ", Styles::cursor()));
            }
            spans.push(Span::styled(self.placeholder.clone(), Styles::text_muted()));
            return Line::from(spans);
        }

        let shown: Vec<char> = self.display_value().chars().collect();
        let before: String = shown[..self.cursor.min(shown.len())].iter().collect();
        spans.push(Span::styled(before, Style::default()));
        if self.focused {
            let at: String = shown.get(self.cursor).map(|c| c.to_string()).unwrap_or_else(|| " ".into());
            spans.push(Span::styled(at, Styles::cursor()));
            if self.cursor + 1 < shown.len() {
                let after: String = shown[self.cursor + 1..].iter().collect();
                spans.push(Span::raw(after));
            }
        } else if self.cursor < shown.len() {
            let after: String = shown[self.cursor..].iter().collect();
            spans.push(Span::raw(after));
        }
        Line::from(spans)
    }
}
