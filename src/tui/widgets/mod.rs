//! TUI Widgets
//!
//! Custom widgets for the upload screen.

mod notification;
mod upload_panel;

pub use notification::render_notice;
pub use upload_panel::render_upload_panel;
