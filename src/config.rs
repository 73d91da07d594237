//! Configuration types for catalog-harvest
//!
//! The on-disk format is JSON. Every field has a default, so a config file only needs
//! the keys it wants to change:
//!
//! ```json
//! {
//!   "search_keywords": "food safety",
//!   "target": "standards",
//!   "pagination": { "min_page_delay": 1000, "max_page_delay": 4000 }
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::types::SearchTarget;

/// HTTP client settings for the catalog endpoints
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Scheme and host of the catalog (default: "https://std.samr.gov.cn")
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout (default: 30 seconds)
    #[serde(default = "default_timeout", with = "duration_serde")]
    pub timeout: Duration,

    /// User-Agent header sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Skip TLS certificate validation (default: false)
    ///
    /// The catalog has at times served an incomplete certificate chain. Turning this on
    /// is an explicit opt-in and is logged as a warning when the client is built.
    #[serde(default)]
    pub danger_accept_invalid_certs: bool,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout: default_timeout(),
            user_agent: default_user_agent(),
            danger_accept_invalid_certs: false,
        }
    }
}

/// Page sequencing, checkpoint cadence and inter-page pacing
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PaginationConfig {
    /// Safety bound on the number of pages fetched in one run (default: 1500)
    ///
    /// The full standards corpus is just under 70 000 entries, i.e. fewer than
    /// 1500 pages of 50.
    #[serde(default = "default_max_pages")]
    pub max_pages: u32,

    /// Write a checkpoint snapshot every this many pages (default: 10)
    #[serde(default = "default_checkpoint_every")]
    pub checkpoint_every: u32,

    /// Lower bound of the randomized delay between pages (default: 500 ms)
    #[serde(default = "default_min_page_delay", with = "duration_ms_serde")]
    pub min_page_delay: Duration,

    /// Upper bound of the randomized delay between pages (default: 8000 ms)
    #[serde(default = "default_max_page_delay", with = "duration_ms_serde")]
    pub max_page_delay: Duration,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            max_pages: default_max_pages(),
            checkpoint_every: default_checkpoint_every(),
            min_page_delay: default_min_page_delay(),
            max_page_delay: default_max_page_delay(),
        }
    }
}

/// Per-page retry budget and the blocked-state wait protocol
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Consecutive failures on one page before it is abandoned (default: 5)
    #[serde(default = "default_threshold")]
    pub threshold: u32,

    /// Length of one cool-down interval while blocked (default: 60 seconds)
    #[serde(default = "default_block_wait_interval", with = "duration_serde")]
    pub block_wait_interval: Duration,

    /// Cool-down intervals to sit out before giving up on a block (default: 10)
    #[serde(default = "default_block_wait_rounds")]
    pub block_wait_rounds: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
            block_wait_interval: default_block_wait_interval(),
            block_wait_rounds: default_block_wait_rounds(),
        }
    }
}

/// Main configuration for a harvest run
///
/// Treated as immutable for the lifetime of a run.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    /// Keywords passed to the catalog search (empty = whole catalog)
    #[serde(default)]
    pub search_keywords: String,

    /// Which catalog to search
    #[serde(default = "default_target")]
    pub target: SearchTarget,

    /// Root directory for snapshots (default: "./result")
    #[serde(default = "default_results_dir")]
    pub results_dir: PathBuf,

    /// HTTP client settings
    #[serde(default)]
    pub http: HttpConfig,

    /// Pagination settings
    #[serde(default)]
    pub pagination: PaginationConfig,

    /// Retry settings
    #[serde(default)]
    pub retry: RetryConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            search_keywords: String::new(),
            target: default_target(),
            results_dir: default_results_dir(),
            http: HttpConfig::default(),
            pagination: PaginationConfig::default(),
            retry: RetryConfig::default(),
        }
    }
}

/// What [`Config::load_or_bootstrap`] found on disk
#[derive(Debug)]
pub enum Bootstrap {
    /// An existing config file was loaded
    Loaded(Config),
    /// No file existed; a default one was written at this path
    Created(PathBuf),
}

impl Config {
    /// Parse a config from JSON text and validate it
    pub fn from_json(text: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(text).map_err(|e| Error::Config {
            message: format!("invalid config file: {e}"),
            key: None,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a config file
    pub async fn load(path: &Path) -> Result<Self> {
        let text = tokio::fs::read_to_string(path).await.map_err(|e| {
            Error::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to read config file '{}': {}", path.display(), e),
            ))
        })?;
        let config = Self::from_json(&text)?;
        debug!(path = %path.display(), ?config, "Loaded config");
        Ok(config)
    }

    /// Load the config at `path`, or write a default one there if it does not exist
    ///
    /// A freshly written file is not returned as usable config: the keywords and
    /// target are empty placeholders the user is expected to fill in first.
    pub async fn load_or_bootstrap(path: &Path) -> Result<Bootstrap> {
        if tokio::fs::try_exists(path).await? {
            return Ok(Bootstrap::Loaded(Self::load(path).await?));
        }

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let text = serde_json::to_string_pretty(&Config::default())?;
        tokio::fs::write(path, text).await?;
        info!(path = %path.display(), "Wrote default config");
        Ok(Bootstrap::Created(path.to_path_buf()))
    }

    /// Check cross-field constraints serde cannot express
    pub fn validate(&self) -> Result<()> {
        let base = url::Url::parse(&self.http.base_url).map_err(|e| {
            Error::config("http.base_url", format!("invalid base URL '{}': {e}", self.http.base_url))
        })?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(Error::config(
                "http.base_url",
                format!("unsupported scheme '{}'", base.scheme()),
            ));
        }
        if self.results_dir.as_os_str().is_empty() {
            return Err(Error::config("results_dir", "results directory must not be empty"));
        }
        if self.pagination.max_pages == 0 {
            return Err(Error::config("pagination.max_pages", "must be at least 1"));
        }
        if self.pagination.checkpoint_every == 0 {
            return Err(Error::config("pagination.checkpoint_every", "must be at least 1"));
        }
        if self.pagination.min_page_delay > self.pagination.max_page_delay {
            return Err(Error::config(
                "pagination.min_page_delay",
                format!(
                    "minimum page delay ({:?}) exceeds maximum ({:?})",
                    self.pagination.min_page_delay, self.pagination.max_page_delay
                ),
            ));
        }
        if self.retry.threshold == 0 {
            return Err(Error::config("retry.threshold", "must be at least 1"));
        }
        if self.retry.block_wait_rounds == 0 {
            return Err(Error::config("retry.block_wait_rounds", "must be at least 1"));
        }
        Ok(())
    }
}

fn default_base_url() -> String {
    "https://std.samr.gov.cn".to_string()
}

fn default_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_user_agent() -> String {
    concat!("catalog-harvest/", env!("CARGO_PKG_VERSION")).to_string()
}

fn default_max_pages() -> u32 {
    1500
}

fn default_checkpoint_every() -> u32 {
    10
}

fn default_min_page_delay() -> Duration {
    Duration::from_millis(500)
}

fn default_max_page_delay() -> Duration {
    Duration::from_millis(8000)
}

fn default_threshold() -> u32 {
    5
}

fn default_block_wait_interval() -> Duration {
    Duration::from_secs(60)
}

fn default_block_wait_rounds() -> u32 {
    10
}

fn default_target() -> SearchTarget {
    SearchTarget::Standards
}

fn default_results_dir() -> PathBuf {
    PathBuf::from("./result")
}

// Duration serialization helper (whole seconds)
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

// Duration serialization helper (milliseconds, for sub-second pacing)
mod duration_ms_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn defaults_match_catalog_behavior() {
        let config = Config::default();
        assert_eq!(config.target, SearchTarget::Standards);
        assert_eq!(config.pagination.max_pages, 1500);
        assert_eq!(config.pagination.checkpoint_every, 10);
        assert_eq!(config.pagination.min_page_delay, Duration::from_millis(500));
        assert_eq!(config.pagination.max_page_delay, Duration::from_secs(8));
        assert_eq!(config.retry.threshold, 5);
        assert_eq!(config.retry.block_wait_interval, Duration::from_secs(60));
        assert_eq!(config.retry.block_wait_rounds, 10);
        assert!(
            !config.http.danger_accept_invalid_certs,
            "TLS verification must be on unless explicitly disabled"
        );
        config.validate().expect("default config must validate");
    }

    #[test]
    fn minimal_json_fills_defaults() {
        let config = Config::from_json(r#"{"search_keywords": "rice", "target": "Plans"}"#)
            .expect("parse failed");
        assert_eq!(config.search_keywords, "rice");
        assert_eq!(config.target, SearchTarget::Plans);
        assert_eq!(config.results_dir, PathBuf::from("./result"));
        assert_eq!(config.http.base_url, "https://std.samr.gov.cn");
    }

    #[test]
    fn unknown_target_is_rejected() {
        let err = Config::from_json(r#"{"target": "drafts"}"#).unwrap_err();
        assert!(err.is_fatal());
        assert!(
            err.to_string().contains("unknown retrieval target"),
            "got: {err}"
        );
    }

    #[test]
    fn durations_use_seconds_and_milliseconds() {
        let json = serde_json::to_value(Config::default()).expect("serialize failed");
        assert_eq!(json["http"]["timeout"], 30);
        assert_eq!(json["retry"]["block_wait_interval"], 60);
        assert_eq!(json["pagination"]["min_page_delay"], 500);
        assert_eq!(json["pagination"]["max_page_delay"], 8000);

        let config = Config::from_json(
            r#"{"pagination": {"min_page_delay": 5, "max_page_delay": 10}, "retry": {"block_wait_interval": 2}}"#,
        )
        .expect("parse failed");
        assert_eq!(config.pagination.min_page_delay, Duration::from_millis(5));
        assert_eq!(config.retry.block_wait_interval, Duration::from_secs(2));
    }

    #[test]
    fn duration_serde_rejects_string_instead_of_integer() {
        let err = Config::from_json(r#"{"http": {"timeout": "thirty"}}"#).unwrap_err();
        match err {
            Error::Config { message, .. } => assert!(
                message.contains("invalid type"),
                "serde error should describe the type mismatch, got: {message}"
            ),
            other => panic!("expected Config error, got {other:?}"),
        }
    }

    #[test]
    fn validate_rejects_inverted_delay_range() {
        let mut config = Config::default();
        config.pagination.min_page_delay = Duration::from_secs(9);
        match config.validate().unwrap_err() {
            Error::Config { key, .. } => {
                assert_eq!(key.as_deref(), Some("pagination.min_page_delay"))
            }
            other => panic!("expected Config error, got {other:?}"),
        }
    }

    #[test]
    fn validate_rejects_zero_budgets() {
        let cases: [(&str, fn(&mut Config)); 4] = [
            ("retry.threshold", |c| c.retry.threshold = 0),
            ("retry.block_wait_rounds", |c| c.retry.block_wait_rounds = 0),
            ("pagination.max_pages", |c| c.pagination.max_pages = 0),
            ("pagination.checkpoint_every", |c| c.pagination.checkpoint_every = 0),
        ];
        for (expected_key, mutate) in cases {
            let mut config = Config::default();
            mutate(&mut config);
            match config.validate() {
                Err(Error::Config { key, .. }) => assert_eq!(key.as_deref(), Some(expected_key)),
                other => panic!("{expected_key}: expected Config error, got {other:?}"),
            }
        }
    }

    #[test]
    fn validate_rejects_bad_base_url() {
        let mut config = Config::default();
        config.http.base_url = "not a url".to_string();
        assert!(config.validate().is_err());

        config.http.base_url = "ftp://std.samr.gov.cn".to_string();
        assert!(config.validate().is_err());
    }

    #[tokio::test]
    async fn bootstrap_writes_default_then_loads_it() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        match Config::load_or_bootstrap(&path).await.unwrap() {
            Bootstrap::Created(written) => assert_eq!(written, path),
            Bootstrap::Loaded(_) => panic!("nothing existed, should have bootstrapped"),
        }
        assert!(path.exists());

        match Config::load_or_bootstrap(&path).await.unwrap() {
            Bootstrap::Loaded(config) => {
                assert_eq!(config.pagination.max_pages, 1500);
                assert_eq!(config.target, SearchTarget::Standards);
            }
            Bootstrap::Created(_) => panic!("file exists, should have loaded it"),
        }
    }

    #[tokio::test]
    async fn load_reports_missing_file_path() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("absent.json");
        let err = Config::load(&path).await.unwrap_err();
        assert!(err.to_string().contains("absent.json"), "got: {err}");
    }
}
