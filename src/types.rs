// Error types and shared enums

use reqwest::StatusCode;

/// One of the three network steps of an upload workflow
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadStep {
    /// GET the presigned write URL
    PresignedUrl,
    /// PUT the raw file bytes to the presigned URL
    Upload,
    /// POST the canonical object URL and read back the output link
    OutputLink,
}

impl std::fmt::Display for UploadStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UploadStep::PresignedUrl => write!(f, "presigned_url"),
            UploadStep::Upload => write!(f, "upload"),
            UploadStep::OutputLink => write!(f, "output_link"),
        }
    }
}

/// Why a single HTTP exchange failed
#[derive(Debug, thiserror::Error)]
pub enum StepFailure {
    #[error("request failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("unexpected status {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("malformed response body: {0}")]
    Decode(String),
}

/// Failure of an upload workflow, tagged with the step it came from.
///
/// The display text is developer-facing only. Users are always shown
/// [`crate::upload::GENERIC_FAILURE_MESSAGE`].
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("Failed to fetch presigned URL")]
    PresignedUrl(#[source] StepFailure),

    #[error("Failed to upload file")]
    Upload(#[source] StepFailure),

    #[error("Failed to fetch output link")]
    OutputLink(#[source] StepFailure),

    #[error("Upload task aborted: {0}")]
    Aborted(String),
}

impl WorkflowError {
    /// The step that produced this error, if it came from one
    pub fn step(&self) -> Option<UploadStep> {
        match self {
            WorkflowError::PresignedUrl(_) => Some(UploadStep::PresignedUrl),
            WorkflowError::Upload(_) => Some(UploadStep::Upload),
            WorkflowError::OutputLink(_) => Some(UploadStep::OutputLink),
            WorkflowError::Aborted(_) => None,
        }
    }

    /// HTTP status of the failing response, when the backend answered at all
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            WorkflowError::PresignedUrl(StepFailure::Status { status, .. })
            | WorkflowError::Upload(StepFailure::Status { status, .. })
            | WorkflowError::OutputLink(StepFailure::Status { status, .. }) => Some(*status),
            _ => None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Could not read {path}: {source}")]
    ReadFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Download failed: {0}")]
    Download(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}

pub type AppResult<T> = std::result::Result<T, AppError>;
