//! UI Rendering
//!
//! Layout for the upload widget: header, panel, notice, status bar.

use crate::tui::app::{App, StatusLine, View};
use crate::tui::theme::Theme;
use crate::tui::widgets;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

/// Render the main UI
pub fn render(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(8),    // Upload panel
            Constraint::Length(3), // Notice
            Constraint::Length(1), // Status bar
        ])
        .split(frame.area());

    render_header(frame, chunks[0], app);
    widgets::render_upload_panel(frame, chunks[1], app);
    widgets::render_notice(frame, chunks[2], app.controller.notice());
    render_status_bar(frame, chunks[3], app);

    if app.view == View::Help {
        render_help(frame);
    }
}

/// Render the header with the endpoint in use
fn render_header(frame: &mut Frame, area: Rect, app: &App) {
    let title = Paragraph::new(Line::from(vec![
        Span::styled("CSV Uploader", Theme::title()),
        Span::raw("  "),
        Span::styled(app.config.endpoint.as_str(), Theme::text_dim()),
    ]))
    .alignment(Alignment::Center)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Theme::border()),
    );

    frame.render_widget(title, area);
}

/// Render the status bar
fn render_status_bar(frame: &mut Frame, area: Rect, app: &App) {
    let status = match &app.status {
        Some(StatusLine::Info(text)) => Span::styled(text.clone(), Theme::text_secondary()),
        Some(StatusLine::Warning(text)) => Span::styled(text.clone(), Theme::warning()),
        None if app.controller.is_loading() => Span::styled("Uploading...", Theme::active()),
        None => Span::styled("Ready", Theme::text_secondary()),
    };

    let shortcuts = vec![
        Span::styled(" [Enter]", Theme::shortcut_key()),
        Span::styled(" Upload ", Theme::shortcut_desc()),
        Span::styled("[Esc]", Theme::shortcut_key()),
        Span::styled(" Dismiss ", Theme::shortcut_desc()),
        Span::styled("[Ctrl+Q]", Theme::shortcut_key()),
        Span::styled(" Quit ", Theme::shortcut_desc()),
        Span::styled("[F1]", Theme::shortcut_key()),
        Span::styled(" Help", Theme::shortcut_desc()),
    ];

    let line = Line::from(
        std::iter::once(status)
            .chain(std::iter::once(Span::raw(" │ ")))
            .chain(shortcuts)
            .collect::<Vec<_>>(),
    );

    frame.render_widget(Paragraph::new(line), area);
}

/// Render the help modal
fn render_help(frame: &mut Frame) {
    let area = centered_rect(60, 50, frame.area());
    frame.render_widget(Clear, area);

    let help_lines = vec![
        Line::from(Span::styled("Keyboard Shortcuts", Theme::heading())),
        Line::from(""),
        Line::from(vec![
            Span::styled("Enter        ", Theme::shortcut_key()),
            Span::styled("Upload the file / take the output", Theme::text()),
        ]),
        Line::from(vec![
            Span::styled("Esc          ", Theme::shortcut_key()),
            Span::styled("Dismiss notice / close help", Theme::text()),
        ]),
        Line::from(vec![
            Span::styled("Ctrl+Q       ", Theme::shortcut_key()),
            Span::styled("Quit application", Theme::text()),
        ]),
        Line::from(vec![
            Span::styled("Ctrl+C       ", Theme::shortcut_key()),
            Span::styled("Force quit", Theme::text()),
        ]),
        Line::from(vec![
            Span::styled("F1           ", Theme::shortcut_key()),
            Span::styled("Show this help", Theme::text()),
        ]),
        Line::from(""),
        Line::from(Span::styled(
            "Only files declared as text/csv are uploaded.",
            Theme::text_secondary(),
        )),
        Line::from(""),
        Line::from(Span::styled("Press any key to close", Theme::text_dim())),
    ];

    let paragraph = Paragraph::new(help_lines).block(
        Block::default()
            .title(" Help ")
            .borders(Borders::ALL)
            .border_style(Theme::border_focused()),
    );

    frame.render_widget(paragraph, area);
}

/// Helper to create a centered rect
pub fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
