//! Theme and Styling
//!
//! Colors and styles for the upload widget.

use ratatui::style::{Color, Modifier, Style};

/// Application theme
pub struct Theme;

impl Theme {
    // === Primary Colors ===

    /// Primary accent color (cyan/teal)
    pub const ACCENT: Color = Color::Rgb(0, 212, 255);

    /// Success color (green), used for the download control
    pub const SUCCESS: Color = Color::Rgb(34, 197, 94);

    /// Warning color (amber), used for notices
    pub const WARNING: Color = Color::Rgb(251, 191, 36);

    // === Text Colors ===

    /// Primary text color
    pub const TEXT_PRIMARY: Color = Color::Rgb(229, 229, 229);

    /// Secondary text color (muted)
    pub const TEXT_SECONDARY: Color = Color::Rgb(161, 161, 161);

    /// Dimmed text
    pub const TEXT_DIM: Color = Color::Rgb(82, 82, 82);

    // === Border Colors ===

    /// Default border color
    pub const BORDER: Color = Color::Rgb(51, 51, 51);

    /// Focused border color
    pub const BORDER_FOCUSED: Color = Color::Rgb(59, 130, 246);

    // === Styles ===

    /// Default text style
    pub fn text() -> Style {
        Style::default().fg(Self::TEXT_PRIMARY)
    }

    /// Secondary/muted text style
    pub fn text_secondary() -> Style {
        Style::default().fg(Self::TEXT_SECONDARY)
    }

    /// Dimmed text style
    pub fn text_dim() -> Style {
        Style::default().fg(Self::TEXT_DIM)
    }

    /// Title style
    pub fn title() -> Style {
        Style::default()
            .fg(Self::ACCENT)
            .add_modifier(Modifier::BOLD)
    }

    /// Heading style
    pub fn heading() -> Style {
        Style::default()
            .fg(Self::TEXT_PRIMARY)
            .add_modifier(Modifier::BOLD)
    }

    /// Warning style
    pub fn warning() -> Style {
        Style::default().fg(Self::WARNING)
    }

    /// Filled warning banner, like a snackbar
    pub fn notice() -> Style {
        Style::default()
            .fg(Color::Black)
            .bg(Self::WARNING)
            .add_modifier(Modifier::BOLD)
    }

    /// Default border style
    pub fn border() -> Style {
        Style::default().fg(Self::BORDER)
    }

    /// Focused border style
    pub fn border_focused() -> Style {
        Style::default().fg(Self::BORDER_FOCUSED)
    }

    /// Primary button (upload)
    pub fn button_primary() -> Style {
        Style::default()
            .fg(Color::Black)
            .bg(Self::ACCENT)
            .add_modifier(Modifier::BOLD)
    }

    /// Success button (download)
    pub fn button_success() -> Style {
        Style::default()
            .fg(Color::Black)
            .bg(Self::SUCCESS)
            .add_modifier(Modifier::BOLD)
    }

    /// Link text
    pub fn link() -> Style {
        Style::default()
            .fg(Self::ACCENT)
            .add_modifier(Modifier::UNDERLINED)
    }

    /// Keyboard shortcut style
    pub fn shortcut_key() -> Style {
        Style::default()
            .fg(Self::ACCENT)
            .add_modifier(Modifier::BOLD)
    }

    /// Shortcut description style
    pub fn shortcut_desc() -> Style {
        Style::default().fg(Self::TEXT_SECONDARY)
    }

    /// Active/in-progress indicator
    pub fn active() -> Style {
        Style::default()
            .fg(Self::WARNING)
            .add_modifier(Modifier::BOLD)
    }
}

/// Glyphs
pub struct Icons;

impl Icons {
    pub const UPLOAD: &'static str = "⇪";
    pub const DOWNLOAD: &'static str = "⇩";
    pub const WARNING: &'static str = "⚠";
    pub const SPINNER: [&'static str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];
}
