//! Scrollable selection list with optional type-to-filter

use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
    Frame,
};

use crate::theme::{Styles, UiConstants};

/// Something that can be shown in a [`SelectList`]
pub trait ListEntry {
    fn label(&self) -> String;

    fn description(&self) -> Option<String> {
        None
    }
}

impl ListEntry for String {
    fn label(&self) -> String {
        self.clone()
    }
}

/// What a key did to the list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListEvent {
    /// Selection or filter changed, or the key was otherwise consumed
    Changed,
    /// Enter pressed on a visible item
    Chosen,
    Ignored,
}

/// Vertical list with a highlighted row. When filtering is enabled, `/` opens
/// a filter prompt; Enter closes it and keeps the filter.
#[derive(Debug, Clone)]
pub struct SelectList<T> {
    title: String,
    items: Vec<T>,
    /// Indices into `items` that match the current filter
    visible: Vec<usize>,
    /// Position within `visible`
    selected: usize,
    filterable: bool,
    filter: String,
    filtering: bool,
}

impl<T: ListEntry> SelectList<T> {
    pub fn new(title: impl Into<String>, items: Vec<T>) -> Self {
        let visible = (0..items.len()).collect();
        Self {
            title: title.into(),
            items,
            visible,
            selected: 0,
            filterable: false,
            filter: String::new(),
            filtering: false,
        }
    }

    pub fn filterable(mut self) -> Self {
        self.filterable = true;
        self
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn filter(&self) -> &str {
        &self.filter
    }

    pub fn is_filtering(&self) -> bool {
        self.filtering
    }

    /// Currently highlighted item, if any is visible
    pub fn selected(&self) -> Option<&T> {
        self.visible.get(self.selected).map(|&i| &self.items[i])
    }

    /// Highlight the first item matching `pred`
    pub fn select_where(&mut self, pred: impl Fn(&T) -> bool) {
        if let Some(pos) = self.visible.iter().position(|&i| pred(&self.items[i])) {
            self.selected = pos;
        }
    }

    pub fn clear_filter(&mut self) {
        self.filter.clear();
        self.filtering = false;
        self.apply_filter();
    }

    fn apply_filter(&mut self) {
        let needle = self.filter.to_lowercase();
        self.visible = self
            .items
            .iter()
            .enumerate()
            .filter(|(_, item)| needle.is_empty() || item.label().to_lowercase().contains(&needle))
            .map(|(i, _)| i)
            .collect();
        self.selected = 0;
    }

    fn move_by(&mut self, delta: isize) {
        if self.visible.is_empty() {
            return;
        }
        let last = self.visible.len() - 1;
        let next = self.selected as isize + delta;
        self.selected = next.clamp(0, last as isize) as usize;
    }

    pub fn handle_key(&mut self, key: &KeyEvent) -> ListEvent {
        if self.filtering {
            match key.code {
                KeyCode::Enter => self.filtering = false,
                KeyCode::Backspace => {
                    self.filter.pop();
                    self.apply_filter();
                }
                KeyCode::Char(c) => {
                    self.filter.push(c);
                    self.apply_filter();
                }
                KeyCode::Up => self.move_by(-1),
                KeyCode::Down => self.move_by(1),
                _ => return ListEvent::Ignored,
            }
            return ListEvent::Changed;
        }

        let page = UiConstants::PAGE_SCROLL_SIZE as isize;
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => self.move_by(-1),
            KeyCode::Down | KeyCode::Char('j') => self.move_by(1),
            KeyCode::PageUp => self.move_by(-page),
            KeyCode::PageDown => self.move_by(page),
            KeyCode::Home | KeyCode::Char('g') => self.selected = 0,
            KeyCode::End | KeyCode::Char('G') => self.move_by(isize::MAX / 2),
            KeyCode::Char('/') if self.filterable => {
                self.filtering = true;
            }
            KeyCode::Enter => {
                return if self.selected().is_some() {
                    ListEvent::Chosen
                } else {
                    ListEvent::Ignored
                };
            }
            _ => return ListEvent::Ignored,
        }
        ListEvent::Changed
    }

    pub fn render(&self, f: &mut Frame, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(3), Constraint::Length(1)])
            .split(area);

        let items: Vec<ListItem> = self
            .visible
            .iter()
            .map(|&i| {
                let item = &self.items[i];
                let mut lines = vec![Line::from(Span::styled(item.label(), Styles::menu_item()))];
                if let Some(desc) = item.description() {
                    lines.push(Line::from(Span::styled(format!("  {}", desc), Styles::menu_desc())));
                }
                ListItem::new(lines)
            })
            .collect();

        let list = List::new(items)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Styles::border_active())
                    .title(Span::styled(format!(" {} ", self.title), Styles::header())),
            )
            .highlight_style(Styles::selected())
            .highlight_symbol("> ");

        let mut state = ListState::default();
        if !self.visible.is_empty() {
            state.select(Some(self.selected));
        }
        f.render_stateful_widget(list, chunks[0], &mut state);

        let status = if self.filtering {
            Line::from(vec![
                Span::styled("Filter: ", Styles::focused()),
                Span::raw(self.filter.clone()),
                Span::styled(" ", Styles::cursor()),
            ])
        } else if !self.filter.is_empty() {
            Line::from(Span::styled(
                format!("{} of {} match \"{}\"", self.visible.len(), self.items.len(), self.filter),
                Styles::text_muted(),
            ))
        } else if self.filterable {
            Line::from(Span::styled(
                format!("{} items  / to filter", self.items.len()),
                Styles::text_muted(),
            ))
        } else {
            Line::from("")
        };
        f.render_widget(Paragraph::new(status), chunks[1]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyModifiers;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn zones() -> SelectList<String> {
        SelectList::new(
            "Select timezone",
            vec!["America/New_York".into(), "Europe/Berlin".into(), "Europe/Paris".into()],
        )
        .filterable()
    }

    #[test]
    fn test_navigation_is_clamped() {
        let mut list = zones();
        list.handle_key(&key(KeyCode::Up));
        assert_eq!(list.selected().unwrap(), "America/New_York");
        for _ in 0..10 {
            list.handle_key(&key(KeyCode::Down));
        }
        assert_eq!(list.selected().unwrap(), "Europe/Paris");
    }

    #[test]
    fn test_filter_narrows_and_enter_chooses() {
        let mut list = zones();
        list.handle_key(&key(KeyCode::Char('/')));
        assert!(list.is_filtering());
        for c in "paris".chars() {
            list.handle_key(&key(KeyCode::Char(c)));
        }
        assert_eq!(list.handle_key(&key(KeyCode::Enter)), ListEvent::Changed);
        assert!(!list.is_filtering());
        assert_eq!(list.handle_key(&key(KeyCode::Enter)), ListEvent::Chosen);
        assert_eq!(list.selected().unwrap(), "Europe/Paris");
    }

    #[test]
    fn test_empty_filter_result_cannot_be_chosen() {
        let mut list = zones();
        list.handle_key(&key(KeyCode::Char('/')));
        list.handle_key(&key(KeyCode::Char('x')));
        list.handle_key(&key(KeyCode::Enter));
        assert!(list.selected().is_none());
        assert_eq!(list.handle_key(&key(KeyCode::Enter)), ListEvent::Ignored);
    }

    #[test]
    fn test_select_where() {
        let mut list = zones();
        list.select_where(|z| z == "Europe/Berlin");
        assert_eq!(list.selected().unwrap(), "Europe/Berlin");
    }

    #[test]
    fn test_slash_is_ignored_without_filtering() {
        let mut list = SelectList::new("x", vec!["a".to_string()]);
        assert_eq!(list.handle_key(&key(KeyCode::Char('/'))), ListEvent::Ignored);
    }
}
