//! Notice Widget
//!
//! Bottom banner for the controller's transient notice.

use crate::tui::theme::{Icons, Theme};
use crate::upload::Notice;
use ratatui::{
    layout::{Alignment, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

/// Render the notice, or leave the area blank when there is none
pub fn render_notice(frame: &mut Frame, area: Rect, notice: Option<&Notice>) {
    let Some(notice) = notice else {
        return;
    };

    frame.render_widget(Clear, area);

    let line = Line::from(vec![
        Span::styled(format!(" {} ", Icons::WARNING), Theme::notice()),
        Span::styled(format!("{} ", notice.message), Theme::notice()),
        Span::raw("  "),
        Span::styled("[Esc]", Theme::shortcut_key()),
        Span::styled(" dismiss", Theme::shortcut_desc()),
    ]);

    let paragraph = Paragraph::new(line).alignment(Alignment::Center).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Theme::warning()),
    );

    frame.render_widget(paragraph, area);
}
