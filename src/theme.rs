//! Centralized theme and styling for the TUI
//!
//! Single source of truth for the colors and styles used by the wizard. Steps
//! and components never construct colors inline.
//!
//! # Usage
//! ```rust
//! use archpilot::theme::{Colors, Styles, Theme, LogLevel};
//! use ratatui::style::Style;
//!
//! let style = Style::default().fg(Colors::PRIMARY);
//! let title_style = Styles::title();
//! let warning_style = Theme::log_style(LogLevel::Warning);
//! ```

use ratatui::style::{Color, Modifier, Style};

// =============================================================================
// COLOR PALETTE
// =============================================================================

/// Core color palette for the application
pub struct Colors;

impl Colors {
    // -------------------------------------------------------------------------
    // Base Colors
    // -------------------------------------------------------------------------

    /// Gauge/progress bar background
    pub const BG_GAUGE: Color = Color::Rgb(40, 40, 50);

    /// Default foreground text color
    pub const FG_PRIMARY: Color = Color::White;

    /// Secondary/muted text color
    pub const FG_SECONDARY: Color = Color::Gray;

    /// Disabled/inactive text color
    pub const FG_MUTED: Color = Color::DarkGray;

    // -------------------------------------------------------------------------
    // Accent Colors
    // -------------------------------------------------------------------------

    /// Primary accent color - titles, borders, focused widgets
    pub const PRIMARY: Color = Color::Cyan;

    /// Secondary accent color - selected items
    pub const SECONDARY: Color = Color::Yellow;

    // -------------------------------------------------------------------------
    // Semantic Colors
    // -------------------------------------------------------------------------

    pub const SUCCESS: Color = Color::Green;
    pub const WARNING: Color = Color::Yellow;
    pub const ERROR: Color = Color::Red;

    // -------------------------------------------------------------------------
    // UI Element Colors
    // -------------------------------------------------------------------------

    /// Active border color
    pub const BORDER_ACTIVE: Color = Color::Cyan;

    /// Selected item highlight
    pub const SELECTED_BG: Color = Color::Yellow;

    /// Selected item text (for contrast on yellow bg)
    pub const SELECTED_FG: Color = Color::Black;

    /// Unselected list item
    pub const UNSELECTED: Color = Color::Gray;

    /// Header/title text
    pub const HEADER: Color = Color::Cyan;

    /// Progress bar fill
    pub const PROGRESS: Color = Color::Green;

    /// Navigation hint color
    pub const NAV_HINT: Color = Color::DarkGray;
}

// =============================================================================
// PRE-BUILT STYLES
// =============================================================================

/// Pre-built styles for common UI patterns
pub struct Styles;

impl Styles {
    // -------------------------------------------------------------------------
    // Text Styles
    // -------------------------------------------------------------------------

    /// Default text style
    pub fn text() -> Style {
        Style::default().fg(Colors::FG_PRIMARY)
    }

    /// Muted/secondary text
    pub fn text_muted() -> Style {
        Style::default().fg(Colors::FG_MUTED)
    }

    /// Secondary text (gray)
    pub fn text_secondary() -> Style {
        Style::default().fg(Colors::FG_SECONDARY)
    }

    // -------------------------------------------------------------------------
    // Title/Header Styles
    // -------------------------------------------------------------------------

    /// Step title style (cyan, bold)
    pub fn title() -> Style {
        Style::default()
            .fg(Colors::PRIMARY)
            .add_modifier(Modifier::BOLD)
    }

    /// Section header style
    pub fn header() -> Style {
        Style::default()
            .fg(Colors::HEADER)
            .add_modifier(Modifier::BOLD)
    }

    /// Active border style
    pub fn border_active() -> Style {
        Style::default().fg(Colors::BORDER_ACTIVE)
    }

    // -------------------------------------------------------------------------
    // Selection Styles
    // -------------------------------------------------------------------------

    /// Selected/highlighted list row
    pub fn selected() -> Style {
        Style::default()
            .fg(Colors::SELECTED_FG)
            .bg(Colors::SELECTED_BG)
            .add_modifier(Modifier::BOLD)
    }

    /// Unselected list item
    pub fn unselected() -> Style {
        Style::default().fg(Colors::UNSELECTED)
    }

    /// Focused widget (cyan highlight)
    pub fn focused() -> Style {
        Style::default()
            .fg(Colors::PRIMARY)
            .add_modifier(Modifier::BOLD)
    }

    /// Block cursor in text inputs
    pub fn cursor() -> Style {
        Style::default().add_modifier(Modifier::REVERSED)
    }

    // -------------------------------------------------------------------------
    // Status/Feedback Styles
    // -------------------------------------------------------------------------

    /// Success message style
    pub fn success() -> Style {
        Style::default()
            .fg(Colors::SUCCESS)
            .add_modifier(Modifier::BOLD)
    }

    /// Warning message style
    pub fn warning() -> Style {
        Style::default().fg(Colors::WARNING)
    }

    /// Error message style
    pub fn error() -> Style {
        Style::default().fg(Colors::ERROR)
    }

    /// Destructive-action warning
    pub fn danger() -> Style {
        Style::default()
            .fg(Colors::ERROR)
            .add_modifier(Modifier::BOLD)
    }

    // -------------------------------------------------------------------------
    // Progress/Gauge Styles
    // -------------------------------------------------------------------------

    /// Progress bar style
    pub fn progress() -> Style {
        Style::default()
            .fg(Colors::PROGRESS)
            .bg(Colors::BG_GAUGE)
    }

    /// Progress bar frozen after a failure
    pub fn progress_failed() -> Style {
        Style::default().fg(Colors::ERROR).bg(Colors::BG_GAUGE)
    }

    // -------------------------------------------------------------------------
    // List Item Styles
    // -------------------------------------------------------------------------

    /// List item name
    pub fn menu_item() -> Style {
        Style::default().fg(Colors::FG_PRIMARY)
    }

    /// List item description
    pub fn menu_desc() -> Style {
        Style::default().fg(Colors::FG_SECONDARY)
    }

    /// Help line (keybindings)
    pub fn nav_hint() -> Style {
        Style::default().fg(Colors::NAV_HINT)
    }
}

// =============================================================================
// THEME CONTEXT
// =============================================================================

/// Log level for styling install log lines
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Warning,
    Error,
}

impl LogLevel {
    /// Classify a line emitted by a phase
    pub fn of_line(line: &str) -> Self {
        if line.starts_with("Warning:") {
            Self::Warning
        } else if line.starts_with("Error:") {
            Self::Error
        } else {
            Self::Info
        }
    }
}

/// Theme context providing semantic style lookups
pub struct Theme;

impl Theme {
    /// Get style for a log level
    pub fn log_style(level: LogLevel) -> Style {
        match level {
            LogLevel::Info => Style::default().fg(Colors::FG_MUTED),
            LogLevel::Warning => Style::default().fg(Colors::WARNING),
            LogLevel::Error => Style::default().fg(Colors::ERROR),
        }
    }
}

// =============================================================================
// UI CONSTANTS
// =============================================================================

/// UI dimension and layout constants
pub struct UiConstants;

impl UiConstants {
    /// Horizontal padding around the wizard frame
    pub const FRAME_PADDING_X: u16 = 2;

    /// Vertical padding around the wizard frame
    pub const FRAME_PADDING_Y: u16 = 1;

    /// Trailing install log lines kept on screen
    pub const LOG_TAIL_LINES: usize = 10;

    /// Width of the install progress bar
    pub const PROGRESS_WIDTH: u16 = 50;

    /// Scroll page size (items)
    pub const PAGE_SCROLL_SIZE: usize = 10;
}
