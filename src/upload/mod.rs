//! Upload Workflow
//!
//! Client side of the CSV normalization service: validate the selected file,
//! obtain a presigned write URL, PUT the bytes there, notify the backend, and
//! surface the output link it returns.

pub mod backend;
pub mod controller;
pub mod download;
pub mod schema;

pub use backend::{HttpBackend, UploadBackend};
pub use controller::{Notice, PendingUpload, Selection, UploadController};
pub use download::download_output;
pub use schema::{inspect_header, SchemaReport, EXPECTED_COLUMNS};

/// Shown when the selected file is not declared as `text/csv`
pub const INVALID_TYPE_MESSAGE: &str = "Please upload a CSV file.";

/// Shown for every failure after validation
pub const GENERIC_FAILURE_MESSAGE: &str = "Something went wrong. Please try again.";

/// Strip the query string (from the first `?`) off a presigned URL, leaving
/// the URL that identifies the stored object.
///
/// Assumes the signed URL's path never contains a literal `?`.
pub fn canonical_object_url(presigned_url: &str) -> &str {
    presigned_url
        .split_once('?')
        .map_or(presigned_url, |(object_url, _)| object_url)
}
