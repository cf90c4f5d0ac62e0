//! Upload Panel
//!
//! The widget body. Shows exactly one of: the upload prompt, the loading
//! spinner, or the download control.

use crate::models::{has_csv_extension, OutputLink, WorkflowState};
use crate::tui::app::App;
use crate::tui::theme::{Icons, Theme};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

/// Render the panel for the controller's current state
pub fn render_upload_panel(frame: &mut Frame, area: Rect, app: &App) {
    let block = Block::default()
        .title(" Upload ")
        .borders(Borders::ALL)
        .border_style(Theme::border_focused());

    let inner = block.inner(area);
    frame.render_widget(block, area);

    match app.controller.state() {
        WorkflowState::Loading => render_loading(frame, inner, app),
        WorkflowState::Succeeded(link) => render_download(frame, inner, link),
        WorkflowState::Idle | WorkflowState::Failed(_) => render_prompt(frame, inner, app),
    }
}

fn render_prompt(frame: &mut Frame, area: Rect, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2), // Button
            Constraint::Length(3), // Path input
            Constraint::Length(1), // Hint
            Constraint::Min(0),
        ])
        .split(area);

    let button = Paragraph::new(Line::from(Span::styled(
        format!(" {} Upload File ", Icons::UPLOAD),
        Theme::button_primary(),
    )))
    .alignment(Alignment::Center);
    frame.render_widget(button, chunks[0]);

    let input_block = Block::default()
        .title(" File ")
        .borders(Borders::ALL)
        .border_style(Theme::border());
    let input_area = input_block.inner(chunks[1]);
    frame.render_widget(input_block, chunks[1]);
    frame.render_widget(&app.input, input_area);

    // Advisory only; the controller decides on the declared type
    let path = app.input_path();
    let hint = if !path.is_empty() && !has_csv_extension(&path) {
        Span::styled("Not a .csv file", Theme::warning())
    } else {
        Span::styled("Accepted: .csv", Theme::text_dim())
    };
    frame.render_widget(
        Paragraph::new(Line::from(hint)).alignment(Alignment::Center),
        chunks[2],
    );
}

fn render_loading(frame: &mut Frame, area: Rect, app: &App) {
    let spinner = Icons::SPINNER[app.spinner_frame % Icons::SPINNER.len()];
    let name = app.uploading.as_deref().unwrap_or("file");

    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(spinner, Theme::active())),
        Line::from(Span::styled(format!("Uploading {}", name), Theme::text_secondary())),
    ];

    frame.render_widget(Paragraph::new(lines).alignment(Alignment::Center), area);
}

fn render_download(frame: &mut Frame, area: Rect, link: &OutputLink) {
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            format!(" {} Download Output File ", Icons::DOWNLOAD),
            Theme::button_success(),
        )),
        Line::from(""),
        Line::from(Span::styled(link.to_string(), Theme::link())),
        Line::from(""),
        Line::from(vec![
            Span::styled("[Enter]", Theme::shortcut_key()),
            Span::styled(" take the output", Theme::shortcut_desc()),
        ]),
    ];

    frame.render_widget(
        Paragraph::new(lines)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true }),
        area,
    );
}
