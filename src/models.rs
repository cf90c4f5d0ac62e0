use crate::types::{AppError, AppResult};
use bytes::Bytes;
use std::path::Path;

// Transient upload models. Nothing here outlives a single upload attempt.

/// A file picked by the user, as handed to the upload workflow
#[derive(Debug, Clone)]
pub struct SelectedFile {
    pub name: String,
    /// Declared MIME type (what a browser would report as `File.type`)
    pub content_type: String,
    pub bytes: Bytes,
}

impl SelectedFile {
    pub fn new(
        name: impl Into<String>,
        content_type: impl Into<String>,
        bytes: impl Into<Bytes>,
    ) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            bytes: bytes.into(),
        }
    }

    /// Read a file from disk, declaring its MIME type from the extension.
    ///
    /// Unknown extensions are declared as `application/octet-stream`.
    pub async fn from_path(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await.map_err(|source| AppError::ReadFile {
            path: path.display().to_string(),
            source,
        })?;

        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload.csv")
            .to_string();

        let content_type = mime_guess::from_path(path)
            .first_or_octet_stream()
            .essence_str()
            .to_string();

        Ok(Self::new(name, content_type, bytes))
    }

    /// Replace the declared MIME type
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }

    /// The only type the workflow accepts, compared exactly
    pub fn is_csv(&self) -> bool {
        self.content_type == mime::TEXT_CSV.as_ref()
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Advisory `.csv` extension filter. Not a validation boundary.
pub fn has_csv_extension(path: impl AsRef<Path>) -> bool {
    path.as_ref()
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"))
}

/// Link to the processed output returned by the backend
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct OutputLink(String);

impl OutputLink {
    pub fn new(link: impl Into<String>) -> Self {
        Self(link.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for OutputLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// State of the upload widget, driven only by the controller
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum WorkflowState {
    /// Showing the upload prompt
    #[default]
    Idle,
    /// A workflow is in flight
    Loading,
    /// The backend produced an output file
    Succeeded(OutputLink),
    /// The last attempt failed; carries the user-facing message
    Failed(String),
}

impl WorkflowState {
    pub fn is_loading(&self) -> bool {
        matches!(self, WorkflowState::Loading)
    }

    pub fn output_link(&self) -> Option<&OutputLink> {
        match self {
            WorkflowState::Succeeded(link) => Some(link),
            _ => None,
        }
    }
}

// Wire types for the backend endpoint

/// `GET {endpoint}?key=...` response
#[derive(Debug, Clone, serde::Deserialize)]
pub struct PresignedUrlResponse {
    pub presigned_url: String,
}

/// `POST {endpoint}` request body
#[derive(Debug, Clone, serde::Serialize)]
pub struct ProcessRequest<'a> {
    pub link: &'a str,
}

/// `POST {endpoint}` response
#[derive(Debug, Clone, serde::Deserialize)]
pub struct ProcessResponse {
    pub output_link: OutputLink,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_csv_type_is_exact() {
        let file = SelectedFile::new("patents.csv", "text/csv", b"a,b\n".to_vec());
        assert!(file.is_csv());

        let with_params = file.clone().with_content_type("text/csv; charset=utf-8");
        assert!(!with_params.is_csv());

        let excel = file.with_content_type("application/vnd.ms-excel");
        assert!(!excel.is_csv());
    }

    #[test]
    fn test_has_csv_extension() {
        assert!(has_csv_extension("data/patents.csv"));
        assert!(has_csv_extension("PATENTS.CSV"));
        assert!(!has_csv_extension("image.png"));
        assert!(!has_csv_extension("csv"));
    }

    #[tokio::test]
    async fn test_from_path_declares_type_from_extension() {
        let dir = tempfile::TempDir::new().unwrap();

        let csv_path = dir.path().join("patents.csv");
        tokio::fs::write(&csv_path, "patent_id,organization,city,country\n")
            .await
            .unwrap();
        let file = SelectedFile::from_path(&csv_path).await.unwrap();
        assert_eq!(file.name, "patents.csv");
        assert_eq!(file.content_type, "text/csv");
        assert_eq!(file.len(), 36);
        assert!(!file.is_empty());

        let png_path = dir.path().join("image.png");
        tokio::fs::write(&png_path, [0x89, b'P', b'N', b'G']).await.unwrap();
        let file = SelectedFile::from_path(&png_path).await.unwrap();
        assert_eq!(file.content_type, "image/png");
        assert!(!file.is_csv());
    }

    #[tokio::test]
    async fn test_from_path_missing_file() {
        let err = SelectedFile::from_path("/definitely/not/here.csv")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ReadFile { .. }));
    }

    #[test]
    fn test_wire_types() {
        let body = serde_json::to_value(ProcessRequest { link: "https://s3/x" }).unwrap();
        assert_eq!(body, serde_json::json!({ "link": "https://s3/x" }));

        let response: ProcessResponse =
            serde_json::from_str(r#"{"output_link":"https://out/y"}"#).unwrap();
        assert_eq!(response.output_link, OutputLink::new("https://out/y"));

        assert!(serde_json::from_str::<PresignedUrlResponse>(r#"{"url":"x"}"#).is_err());
    }
}
