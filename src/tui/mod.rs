//! Terminal User Interface Module
//!
//! Interactive front end for the upload workflow, built with Ratatui.
//!
//! # Layout
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                CSV Uploader  https://endpoint                   │
//! ├─ Upload ────────────────────────────────────────────────────────┤
//! │                      [ ⇪ Upload File ]                          │
//! │  ┌─ File ───────────────────────────────────────────────────┐   │
//! │  │ ./patents.csv                                            │   │
//! │  └──────────────────────────────────────────────────────────┘   │
//! ├─────────────────────────────────────────────────────────────────┤
//! │            ⚠ Please upload a CSV file.   [Esc] dismiss          │
//! └─────────────────────────────────────────────────────────────────┘
//!  Ready │ [Enter] Upload [Esc] Dismiss [Ctrl+Q] Quit [F1] Help
//! ```
//!
//! The panel swaps between the prompt, a spinner, and the download control
//! as the controller moves through its states.

pub mod app;
pub mod event;
pub mod theme;
pub mod ui;
pub mod widgets;

pub use app::{App, AppEvent, StatusLine, View};
pub use event::{AppAction, EventHandler};

use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use std::io::{self, Stdout};
use tracing::{error, info};

/// Type alias for our terminal backend
pub type Tui = Terminal<CrosstermBackend<Stdout>>;

/// Initialize the terminal for TUI mode
pub fn init_terminal() -> anyhow::Result<Tui> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend)?;
    Ok(terminal)
}

/// Restore the terminal to its original state
pub fn restore_terminal(terminal: &mut Tui) -> anyhow::Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

/// Run the TUI application
pub async fn run(config: crate::config::Config) -> anyhow::Result<()> {
    info!(endpoint = %config.endpoint, "Starting TUI mode");

    let mut app = App::new(config)?;

    let mut terminal = init_terminal()?;
    let mut events = EventHandler::new(std::time::Duration::from_millis(100));

    let result = run_app(&mut terminal, &mut app, &mut events).await;

    if let Err(e) = restore_terminal(&mut terminal) {
        error!("Failed to restore terminal: {}", e);
    }

    result
}

/// Main application loop
async fn run_app(
    terminal: &mut Tui,
    app: &mut App,
    events: &mut EventHandler,
) -> anyhow::Result<()> {
    while !app.should_quit {
        terminal.draw(|frame| ui::render(frame, app))?;

        // Results from the upload task
        app.poll_events();

        // Ticks arrive every 100ms, so this never blocks for long
        match events.next().await {
            Some(action) => app.handle_action(action).await,
            None => break,
        }
    }

    info!("TUI exited normally");
    Ok(())
}
