//! Frame composition helpers
//!
//! Steps describe their body as lines of text plus an optional error and hint;
//! these helpers turn that into widgets with the shared theme.

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Gauge, Paragraph, Wrap},
    Frame,
};

use crate::theme::{LogLevel, Styles, Theme, UiConstants};

/// Braille dots, one frame per UI tick
pub const SPINNER_FRAMES: &[&str] = &["⣾", "⣽", "⣻", "⢿", "⡿", "⣟", "⣯", "⣷"];

/// Plain prompt text
pub fn prompt(text: impl Into<String>) -> Line<'static> {
    Line::from(Span::styled(text.into(), Styles::text()))
}

/// Validation failure, shown under the input
pub fn error_line(text: impl Into<String>) -> Line<'static> {
    Line::from(Span::styled(text.into(), Styles::error()))
}

/// Muted usage hint
pub fn hint(text: impl Into<String>) -> Line<'static> {
    Line::from(Span::styled(text.into(), Styles::text_muted()))
}

/// Push the error line when there is one
pub fn push_error(lines: &mut Vec<Line<'static>>, err: &Option<String>) {
    if let Some(err) = err {
        lines.push(error_line(err.clone()));
    }
}

/// Render a step body made of lines
pub fn render_lines(f: &mut Frame, area: Rect, lines: Vec<Line<'static>>) {
    f.render_widget(Paragraph::new(lines).wrap(Wrap { trim: false }), area);
}

/// Split the screen into title, body and help rows
pub fn frame_chunks(area: Rect) -> [Rect; 3] {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2), // Title
            Constraint::Min(1),    // Step body
            Constraint::Length(1), // Help line
        ])
        .split(area);
    [chunks[0], chunks[1], chunks[2]]
}

/// Render progress bar; `failed` freezes it in the error color
pub fn render_progress_bar(f: &mut Frame, area: Rect, fraction: f64, failed: bool) {
    let style = if failed {
        Styles::progress_failed()
    } else {
        Styles::progress()
    };
    let width = area.width.min(UiConstants::PROGRESS_WIDTH);
    let bar_area = Rect { width, ..area };
    let gauge = Gauge::default()
        .gauge_style(style)
        .ratio(fraction.clamp(0.0, 1.0));
    f.render_widget(gauge, bar_area);
}

/// Trailing log lines, styled by level
pub fn log_tail(logs: &[String]) -> Vec<Line<'static>> {
    let start = logs.len().saturating_sub(UiConstants::LOG_TAIL_LINES);
    logs[start..]
        .iter()
        .map(|line| {
            let style = Theme::log_style(LogLevel::of_line(line));
            Line::from(Span::styled(line.clone(), style))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_tail_keeps_last_lines() {
        let logs: Vec<String> = (0..25).map(|i| format!("line {}", i)).collect();
        let tail = log_tail(&logs);
        assert_eq!(tail.len(), UiConstants::LOG_TAIL_LINES);
        assert_eq!(tail[0].spans[0].content, "line 15");
        assert!(log_tail(&[]).is_empty());
    }

    #[test]
    fn test_frame_chunks_fill_area() {
        let [title, body, help] = frame_chunks(Rect::new(0, 0, 80, 24));
        assert_eq!(title.height, 2);
        assert_eq!(help.height, 1);
        assert_eq!(body.height, 21);
    }
}
