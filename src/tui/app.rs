//! Application State
//!
//! Owns the upload controller and the path input, and bridges the
//! background upload task back into the event loop.

use crate::config::Config;
use crate::models::{OutputLink, SelectedFile};
use crate::tui::event::AppAction;
use crate::types::{AppError, WorkflowError};
use crate::upload::{self, HttpBackend, PendingUpload, Selection, UploadBackend, UploadController};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tracing::{info, warn};
use tui_textarea::TextArea;

const INPUT_PLACEHOLDER: &str = "Path to a .csv file, then Enter";

/// Current view/screen
#[derive(Debug, Clone, PartialEq, Default)]
pub enum View {
    #[default]
    Upload,
    Help,
}

/// Events from background tasks
#[derive(Debug)]
pub enum AppEvent {
    /// The upload workflow ended, successfully or not
    UploadFinished(Result<OutputLink, WorkflowError>),
    /// The output file download ended
    DownloadFinished(Result<PathBuf, String>),
}

/// One-line status shown above the shortcuts
#[derive(Debug, Clone, PartialEq)]
pub enum StatusLine {
    Info(String),
    Warning(String),
}

/// Main application state
pub struct App {
    pub config: Config,

    // UI State
    pub view: View,
    pub should_quit: bool,
    pub input: TextArea<'static>,
    pub spinner_frame: usize,
    pub status: Option<StatusLine>,

    // Upload State
    pub controller: UploadController,
    /// Name of the file currently uploading
    pub uploading: Option<String>,
    client: reqwest::Client,

    // Async communication
    event_rx: mpsc::Receiver<AppEvent>,
    event_tx: mpsc::Sender<AppEvent>,
}

impl App {
    /// Create the application against the configured endpoint
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let backend = HttpBackend::from_config(&config)?;
        let client = backend.client().clone();
        Ok(Self::with_backend(config, Arc::new(backend), client))
    }

    pub fn with_backend(
        config: Config,
        backend: Arc<dyn UploadBackend>,
        client: reqwest::Client,
    ) -> Self {
        let (tx, rx) = mpsc::channel(16);
        let controller = UploadController::new(backend, config.notice_timeout());

        Self {
            config,
            view: View::Upload,
            should_quit: false,
            input: new_input(),
            spinner_frame: 0,
            status: None,
            controller,
            uploading: None,
            client,
            event_rx: rx,
            event_tx: tx,
        }
    }

    /// Current contents of the path field
    pub fn input_path(&self) -> String {
        self.input.lines().join("").trim().to_string()
    }

    /// Drain events from background tasks
    pub fn poll_events(&mut self) {
        while let Ok(event) = self.event_rx.try_recv() {
            self.handle_event(event);
        }
    }

    fn handle_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::UploadFinished(result) => {
                self.uploading = None;
                self.controller.finish(result);
            }
            AppEvent::DownloadFinished(Ok(path)) => {
                self.status = Some(StatusLine::Info(format!("Saved {}", path.display())));
            }
            AppEvent::DownloadFinished(Err(e)) => {
                warn!(error = %e, "Output download failed");
                self.status = Some(StatusLine::Warning(e));
            }
        }
    }

    /// Handle a user action
    pub async fn handle_action(&mut self, action: AppAction) {
        match action {
            AppAction::Quit | AppAction::ForceQuit => {
                self.should_quit = true;
            }
            AppAction::Submit => {
                if self.view == View::Help {
                    self.view = View::Upload;
                } else {
                    self.submit().await;
                }
            }
            AppAction::ToggleHelp => {
                self.view = if self.view == View::Help {
                    View::Upload
                } else {
                    View::Help
                };
            }
            AppAction::Escape => {
                if self.view != View::Upload {
                    self.view = View::Upload;
                } else {
                    self.controller.dismiss_notice();
                    self.status = None;
                }
            }
            AppAction::Input(key) => {
                if self.view == View::Help {
                    self.view = View::Upload;
                } else if self.accepts_input() {
                    self.input.input(key);
                }
            }
            AppAction::Tick => {
                self.spinner_frame = self.spinner_frame.wrapping_add(1);
                self.controller.expire_notice(Instant::now());
            }
        }
    }

    /// The path field is only shown on the upload prompt
    pub fn accepts_input(&self) -> bool {
        !self.controller.is_loading() && self.controller.state().output_link().is_none()
    }

    async fn submit(&mut self) {
        if self.controller.is_loading() {
            return;
        }

        if self.controller.state().output_link().is_some() {
            self.take_download();
            return;
        }

        let path = self.input_path();
        let selection = if path.is_empty() {
            None
        } else {
            match SelectedFile::from_path(&path).await {
                Ok(file) => Some(file),
                Err(e) => {
                    warn!(path = %path, error = %e, "Could not read selected file");
                    self.status = Some(StatusLine::Warning(e.to_string()));
                    return;
                }
            }
        };

        match self.controller.begin(selection) {
            Selection::Started(pending) => {
                self.status = None;
                self.uploading = Some(pending.file().name.clone());
                self.input = new_input();
                spawn_upload(pending, self.event_tx.clone());
            }
            Selection::Ignored | Selection::Busy | Selection::Invalid => {}
        }
    }

    /// The download click: consume the link and return to the prompt
    fn take_download(&mut self) {
        let Some(link) = self.controller.dismiss_result() else {
            return;
        };

        match self.config.download_dir.clone() {
            Some(dir) => {
                self.status = Some(StatusLine::Info(format!("Downloading {}", link)));
                let client = self.client.clone();
                let tx = self.event_tx.clone();
                tokio::spawn(async move {
                    let result = upload::download_output(&client, &link, &dir)
                        .await
                        .map_err(|e| match e {
                            AppError::Download(_) => e.to_string(),
                            other => format!("Download failed: {}", other),
                        });
                    tx.send(AppEvent::DownloadFinished(result)).await.ok();
                });
            }
            None => {
                info!(output_link = %link, "Output link taken");
                self.status = Some(StatusLine::Info(format!("Output file: {}", link)));
            }
        }
    }
}

/// Run the workflow on its own task. A panic inside the steps still reports
/// back, so the loading state is always released.
fn spawn_upload(pending: PendingUpload, tx: mpsc::Sender<AppEvent>) {
    tokio::spawn(async move {
        let result = match tokio::spawn(pending.run()).await {
            Ok(result) => result,
            Err(e) => Err(WorkflowError::Aborted(e.to_string())),
        };
        tx.send(AppEvent::UploadFinished(result)).await.ok();
    });
}

fn new_input() -> TextArea<'static> {
    let mut input = TextArea::default();
    input.set_cursor_line_style(ratatui::style::Style::default());
    input.set_placeholder_text(INPUT_PLACEHOLDER);
    input
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::WorkflowState;
    use crate::types::StepFailure;
    use crate::upload::{GENERIC_FAILURE_MESSAGE, INVALID_TYPE_MESSAGE};
    use async_trait::async_trait;
    use std::time::Duration;

    struct FixedBackend {
        fail: bool,
        output_link: String,
    }

    #[async_trait]
    impl UploadBackend for FixedBackend {
        async fn presigned_url(&self, _key: &str) -> Result<String, StepFailure> {
            if self.fail {
                return Err(StepFailure::Decode("no presigned_url".to_string()));
            }
            Ok("https://s3/x?sig=abc".to_string())
        }

        async fn upload(&self, _url: &str, _file: &SelectedFile) -> Result<(), StepFailure> {
            Ok(())
        }

        async fn process(&self, _object_url: &str) -> Result<OutputLink, StepFailure> {
            Ok(OutputLink::new(self.output_link.clone()))
        }
    }

    fn app(fail: bool) -> App {
        app_with(Config::default(), fail, "https://out/y")
    }

    fn app_with(config: Config, fail: bool, output_link: &str) -> App {
        let backend = FixedBackend {
            fail,
            output_link: output_link.to_string(),
        };
        App::with_backend(config, Arc::new(backend), reqwest::Client::new())
    }

    async fn settle(app: &mut App) {
        for _ in 0..200 {
            app.poll_events();
            if !app.controller.is_loading() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("upload did not finish");
    }

    async fn wait_for_download(app: &mut App) -> StatusLine {
        for _ in 0..200 {
            app.poll_events();
            match &app.status {
                Some(StatusLine::Info(text)) if text.starts_with("Downloading") => {}
                Some(status) => return status.clone(),
                None => {}
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("download did not finish");
    }

    fn write_file(dir: &tempfile::TempDir, name: &str) -> String {
        let path = dir.path().join(name);
        std::fs::write(&path, "patent_id,organization,city,country\n").unwrap();
        path.display().to_string()
    }

    #[tokio::test]
    async fn test_upload_then_download_click() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut app = app(false);
        app.input.insert_str(write_file(&dir, "patents.csv"));

        app.handle_action(AppAction::Submit).await;
        assert!(app.controller.is_loading());
        assert_eq!(app.uploading.as_deref(), Some("patents.csv"));
        assert!(!app.accepts_input());

        settle(&mut app).await;
        assert_eq!(
            app.controller.state(),
            &WorkflowState::Succeeded(OutputLink::new("https://out/y"))
        );
        assert!(app.uploading.is_none());

        app.handle_action(AppAction::Submit).await;
        assert_eq!(app.controller.state(), &WorkflowState::Idle);
        assert_eq!(
            app.status,
            Some(StatusLine::Info("Output file: https://out/y".to_string()))
        );
        assert!(app.accepts_input());
    }

    #[tokio::test]
    async fn test_download_click_saves_into_download_dir() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/results/patents_normalized.csv")
            .with_status(200)
            .with_body("patent_id,organization\nUS1,ACME\n")
            .create_async()
            .await;

        let input_dir = tempfile::TempDir::new().unwrap();
        let download_dir = tempfile::TempDir::new().unwrap();
        let config = Config {
            download_dir: Some(download_dir.path().to_path_buf()),
            ..Config::default()
        };
        let link = format!("{}/results/patents_normalized.csv", server.url());
        let mut app = app_with(config, false, &link);
        app.input.insert_str(write_file(&input_dir, "patents.csv"));

        app.handle_action(AppAction::Submit).await;
        settle(&mut app).await;
        app.handle_action(AppAction::Submit).await;
        assert_eq!(app.controller.state(), &WorkflowState::Idle);
        assert_eq!(
            app.status,
            Some(StatusLine::Info(format!("Downloading {}", link)))
        );

        let saved = download_dir.path().join("patents_normalized.csv");
        assert_eq!(
            wait_for_download(&mut app).await,
            StatusLine::Info(format!("Saved {}", saved.display()))
        );
        assert_eq!(
            std::fs::read_to_string(&saved).unwrap(),
            "patent_id,organization\nUS1,ACME\n"
        );
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_download_click_reports_missing_output() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/results/gone.csv")
            .with_status(404)
            .create_async()
            .await;

        let input_dir = tempfile::TempDir::new().unwrap();
        let download_dir = tempfile::TempDir::new().unwrap();
        let config = Config {
            download_dir: Some(download_dir.path().to_path_buf()),
            ..Config::default()
        };
        let link = format!("{}/results/gone.csv", server.url());
        let mut app = app_with(config, false, &link);
        app.input.insert_str(write_file(&input_dir, "patents.csv"));

        app.handle_action(AppAction::Submit).await;
        settle(&mut app).await;
        app.handle_action(AppAction::Submit).await;

        match wait_for_download(&mut app).await {
            StatusLine::Warning(text) => {
                assert!(text.starts_with("Download failed: "), "{text}");
                assert_eq!(text.matches("Download failed").count(), 1, "{text}");
                assert!(text.contains("404"), "{text}");
            }
            other => panic!("unexpected status {other:?}"),
        }
        assert!(!download_dir.path().join("gone.csv").exists());
        assert!(app.accepts_input());
    }

    #[tokio::test]
    async fn test_submit_ignored_while_loading() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut app = app(false);
        app.input.insert_str(write_file(&dir, "patents.csv"));

        app.handle_action(AppAction::Submit).await;
        assert!(app.controller.is_loading());
        app.handle_action(AppAction::Submit).await;
        assert!(app.controller.is_loading());

        settle(&mut app).await;
        assert!(app.controller.state().output_link().is_some());
    }

    #[tokio::test]
    async fn test_wrong_type_shows_notice() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut app = app(false);
        app.input.insert_str(write_file(&dir, "notes.txt"));

        app.handle_action(AppAction::Submit).await;

        assert!(!app.controller.is_loading());
        assert_eq!(
            app.controller.notice().map(|n| n.message.as_str()),
            Some(INVALID_TYPE_MESSAGE)
        );

        app.handle_action(AppAction::Escape).await;
        assert!(app.controller.notice().is_none());
    }

    #[tokio::test]
    async fn test_failed_upload_returns_to_prompt() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut app = app(true);
        app.input.insert_str(write_file(&dir, "patents.csv"));

        app.handle_action(AppAction::Submit).await;
        settle(&mut app).await;

        assert_eq!(
            app.controller.notice().map(|n| n.message.as_str()),
            Some(GENERIC_FAILURE_MESSAGE)
        );
        assert!(app.accepts_input());
    }

    #[tokio::test]
    async fn test_empty_path_is_noop_and_missing_file_warns() {
        let mut app = app(false);
        app.handle_action(AppAction::Submit).await;
        assert_eq!(app.controller.state(), &WorkflowState::Idle);
        assert!(app.status.is_none());

        app.input.insert_str("/no/such/file.csv");
        app.handle_action(AppAction::Submit).await;
        assert_eq!(app.controller.state(), &WorkflowState::Idle);
        assert!(matches!(app.status, Some(StatusLine::Warning(_))));
    }

    #[tokio::test]
    async fn test_help_toggle() {
        let mut app = app(false);
        app.handle_action(AppAction::ToggleHelp).await;
        assert_eq!(app.view, View::Help);
        app.handle_action(AppAction::Escape).await;
        assert_eq!(app.view, View::Upload);
        app.handle_action(AppAction::Quit).await;
        assert!(app.should_quit);
    }
}
