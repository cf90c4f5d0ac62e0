//! Upload Workflow Controller
//!
//! Drives one upload from file selection to output link:
//!
//! ```text
//! Idle ──select──▶ Loading ──GET──▶ PUT ──▶ POST ──▶ Succeeded(link)
//!   ▲                 │                               │
//!   │                 └──────── any failure ──────▶ Failed(message)
//!   └──────────── dismiss / next selection ───────────┘
//! ```
//!
//! The controller owns the widget state (loading, output link, notice). Steps
//! run strictly in sequence, each awaiting the previous response. Every failure
//! is logged with its originating step and shown to the user as one generic
//! message.

use crate::models::{OutputLink, SelectedFile, WorkflowState};
use crate::types::WorkflowError;
use crate::upload::backend::UploadBackend;
use crate::upload::schema::inspect_header;
use crate::upload::{canonical_object_url, GENERIC_FAILURE_MESSAGE, INVALID_TYPE_MESSAGE};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Outcome of handing a selection to the controller
#[derive(Debug)]
pub enum Selection {
    /// No file was selected
    Ignored,
    /// A workflow is already in flight
    Busy,
    /// Rejected by client-side validation
    Invalid,
    /// Validation passed and the state is now `Loading`
    Started(PendingUpload),
}

/// A validated upload, ready to run. Holds everything the steps need, so it
/// can be moved onto another task.
pub struct PendingUpload {
    backend: Arc<dyn UploadBackend>,
    file: SelectedFile,
}

impl std::fmt::Debug for PendingUpload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingUpload")
            .field("file", &self.file.name)
            .field("bytes", &self.file.len())
            .finish()
    }
}

impl PendingUpload {
    pub fn file(&self) -> &SelectedFile {
        &self.file
    }

    /// Run GET → PUT → POST. Does not touch controller state.
    pub async fn run(self) -> Result<OutputLink, WorkflowError> {
        let PendingUpload { backend, file } = self;

        let presigned_url = backend
            .presigned_url(&file.name)
            .await
            .map_err(WorkflowError::PresignedUrl)?;

        backend
            .upload(&presigned_url, &file)
            .await
            .map_err(WorkflowError::Upload)?;

        let object_url = canonical_object_url(&presigned_url);
        debug!(object_url = %object_url, "File stored, requesting processing");

        backend
            .process(object_url)
            .await
            .map_err(WorkflowError::OutputLink)
    }
}

/// Transient user-facing notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub message: String,
    pub raised_at: Instant,
}

pub struct UploadController {
    backend: Arc<dyn UploadBackend>,
    state: WorkflowState,
    notice: Option<Notice>,
    notice_timeout: Duration,
}

impl UploadController {
    pub fn new(backend: Arc<dyn UploadBackend>, notice_timeout: Duration) -> Self {
        Self {
            backend,
            state: WorkflowState::Idle,
            notice: None,
            notice_timeout,
        }
    }

    pub fn state(&self) -> &WorkflowState {
        &self.state
    }

    pub fn is_loading(&self) -> bool {
        self.state.is_loading()
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    /// Validate a selection and, if accepted, enter `Loading`.
    ///
    /// No network activity happens here.
    pub fn begin(&mut self, selection: Option<SelectedFile>) -> Selection {
        let Some(file) = selection else {
            return Selection::Ignored;
        };

        if self.state.is_loading() {
            warn!(file = %file.name, "Upload already in progress, ignoring selection");
            return Selection::Busy;
        }

        if !file.is_csv() {
            info!(file = %file.name, content_type = %file.content_type, "Rejected non-CSV file");
            self.state = WorkflowState::Failed(INVALID_TYPE_MESSAGE.to_string());
            self.raise(INVALID_TYPE_MESSAGE);
            return Selection::Invalid;
        }

        if file.is_empty() {
            warn!(file = %file.name, "Selected file is empty, uploading anyway");
        } else {
            let report = inspect_header(&file.bytes);
            if !report.matches() {
                warn!(
                    file = %file.name,
                    missing = ?report.missing,
                    unexpected = ?report.unexpected,
                    unreadable = ?report.unreadable,
                    "CSV header differs from the documented columns, uploading anyway"
                );
            }
        }

        info!(file = %file.name, bytes = file.len(), "Starting upload");
        self.state = WorkflowState::Loading;

        Selection::Started(PendingUpload {
            backend: Arc::clone(&self.backend),
            file,
        })
    }

    /// Record the outcome of a run. Always leaves `Loading`.
    pub fn finish(&mut self, result: Result<OutputLink, WorkflowError>) {
        if !self.state.is_loading() {
            warn!(state = ?self.state, "Upload finished while not loading");
        }

        match result {
            Ok(link) => {
                info!(output_link = %link, "Upload processed");
                self.state = WorkflowState::Succeeded(link);
            }
            Err(e) => {
                error!(
                    step = ?e.step(),
                    status = ?e.status(),
                    error = %e,
                    cause = ?std::error::Error::source(&e).map(|s| s.to_string()),
                    "Upload workflow failed"
                );
                self.state = WorkflowState::Failed(GENERIC_FAILURE_MESSAGE.to_string());
                self.raise(GENERIC_FAILURE_MESSAGE);
            }
        }
    }

    /// Run a whole workflow inline: validate, run every step, record the result
    pub async fn handle_selection(&mut self, selection: Option<SelectedFile>) -> &WorkflowState {
        if let Selection::Started(pending) = self.begin(selection) {
            let result = pending.run().await;
            self.finish(result);
        }
        &self.state
    }

    /// Take the output link (the download click) and go back to the prompt
    pub fn dismiss_result(&mut self) -> Option<OutputLink> {
        match std::mem::take(&mut self.state) {
            WorkflowState::Succeeded(link) => Some(link),
            other => {
                self.state = other;
                None
            }
        }
    }

    pub fn dismiss_notice(&mut self) {
        self.notice = None;
    }

    /// Hide the notice once it has been visible for the configured timeout
    pub fn expire_notice(&mut self, now: Instant) {
        let expired = self
            .notice
            .as_ref()
            .is_some_and(|n| now.saturating_duration_since(n.raised_at) >= self.notice_timeout);
        if expired {
            self.notice = None;
        }
    }

    fn raise(&mut self, message: &str) {
        self.notice = Some(Notice {
            message: message.to_string(),
            raised_at: Instant::now(),
        });
    }
}
