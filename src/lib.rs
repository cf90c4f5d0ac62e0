// CSV Uploader - presigned upload client for the CSV normalization service

pub mod config;
pub mod models;
pub mod types;
pub mod upload;
pub mod utils;
pub mod tui;       // Terminal User Interface

// Re-exports for convenience
pub use config::Config;
pub use models::{OutputLink, SelectedFile, WorkflowState};
pub use upload::{HttpBackend, UploadBackend, UploadController};
