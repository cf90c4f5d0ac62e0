use anyhow::Result;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Backend that hands out presigned URLs and triggers processing.
/// The same URL serves both the GET and the POST.
pub const DEFAULT_ENDPOINT: &str = "https://ng6zxnwl5xa6n3vhm2bbcv46tu0yvhii.lambda-url.us-east-1.on.aws";

/// Environment variable prefix, e.g. `CSV_UPLOADER_ENDPOINT`
pub const ENV_PREFIX: &str = "CSV_UPLOADER";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub endpoint: String,
    /// No timeout unless set
    pub request_timeout_secs: Option<u64>,
    pub notice_timeout_ms: u64,
    pub download_dir: Option<PathBuf>,
    pub log_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            request_timeout_secs: None,
            notice_timeout_ms: 4000,
            download_dir: None,
            log_dir: default_log_dir(),
        }
    }
}

impl Config {
    /// Load `.env`, then layer defaults, the optional file, and the environment.
    pub fn from_env(file: Option<&Path>) -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::load(file)
    }

    pub fn load(file: Option<&Path>) -> Result<Self> {
        Self::load_with(
            file,
            config::Environment::with_prefix(ENV_PREFIX).try_parsing(true),
        )
    }

    fn load_with(file: Option<&Path>, env: config::Environment) -> Result<Self> {
        let defaults = Self::default();

        let mut builder = config::Config::builder()
            .set_default("endpoint", defaults.endpoint)?
            .set_default("notice_timeout_ms", defaults.notice_timeout_ms)?
            .set_default("log_dir", defaults.log_dir.display().to_string())?;

        if let Some(path) = file {
            builder = builder.add_source(config::File::from(path).required(true));
        }

        let config: Config = builder.add_source(env).build()?.try_deserialize()?;
        Ok(config)
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }

    pub fn notice_timeout(&self) -> Duration {
        Duration::from_millis(self.notice_timeout_ms)
    }
}

fn default_log_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("csv-uploader")
        .join("logs")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn no_env() -> config::Environment {
        config::Environment::with_prefix(ENV_PREFIX).source(Some(HashMap::new()))
    }

    #[test]
    fn test_defaults() {
        let config = Config::load_with(None, no_env()).unwrap();
        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(config.request_timeout(), None);
        assert_eq!(config.notice_timeout(), Duration::from_millis(4000));
        assert!(config.download_dir.is_none());
    }

    #[test]
    fn test_file_then_env_layering() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("uploader.toml");
        std::fs::write(
            &path,
            "endpoint = \"http://localhost:9000\"\nnotice_timeout_ms = 1500\ndownload_dir = \"/tmp/out\"\n",
        )
        .unwrap();

        let config = Config::load_with(Some(&path), no_env()).unwrap();
        assert_eq!(config.endpoint, "http://localhost:9000");
        assert_eq!(config.notice_timeout_ms, 1500);
        assert_eq!(config.download_dir, Some(PathBuf::from("/tmp/out")));

        let env = config::Environment::with_prefix(ENV_PREFIX).source(Some(HashMap::from([
            ("CSV_UPLOADER_ENDPOINT".to_string(), "http://override:1".to_string()),
            ("CSV_UPLOADER_REQUEST_TIMEOUT_SECS".to_string(), "30".to_string()),
        ])));
        let config = Config::load_with(Some(&path), env.try_parsing(true)).unwrap();
        assert_eq!(config.endpoint, "http://override:1");
        assert_eq!(config.request_timeout(), Some(Duration::from_secs(30)));
        assert_eq!(config.notice_timeout_ms, 1500);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let result = Config::load_with(Some(Path::new("/nope/uploader.toml")), no_env());
        assert!(result.is_err());
    }
}
