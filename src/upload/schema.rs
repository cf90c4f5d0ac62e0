// Advisory header check for uploaded CSVs.
// The backend owns parsing; this only reports drift from the documented columns.

use csv::ReaderBuilder;

/// Columns the processing backend documents for its input
pub const EXPECTED_COLUMNS: [&str; 4] = ["patent_id", "organization", "city", "country"];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaReport {
    pub missing: Vec<String>,
    pub unexpected: Vec<String>,
    /// Set when the header record could not be read at all
    pub unreadable: Option<String>,
}

impl SchemaReport {
    pub fn matches(&self) -> bool {
        self.missing.is_empty() && self.unexpected.is_empty() && self.unreadable.is_none()
    }
}

/// Compare the first record of `data` against [`EXPECTED_COLUMNS`].
/// Names are trimmed and compared case-insensitively; order is ignored.
pub fn inspect_header(data: &[u8]) -> SchemaReport {
    let mut reader = ReaderBuilder::new().has_headers(true).from_reader(data);

    let headers: Vec<String> = match reader.headers() {
        Ok(record) => record
            .iter()
            .map(|h| h.trim().trim_start_matches('\u{feff}').to_ascii_lowercase())
            .filter(|h| !h.is_empty())
            .collect(),
        Err(e) => {
            return SchemaReport {
                unreadable: Some(e.to_string()),
                ..Default::default()
            }
        }
    };

    let missing = EXPECTED_COLUMNS
        .iter()
        .filter(|expected| !headers.iter().any(|h| h.as_str() == **expected))
        .map(|s| s.to_string())
        .collect();

    let unexpected = headers
        .iter()
        .filter(|h| !EXPECTED_COLUMNS.contains(&h.as_str()))
        .cloned()
        .collect();

    SchemaReport {
        missing,
        unexpected,
        unreadable: None,
    }
}
