//! Test configuration helpers

use catalog_harvest::{Config, HttpConfig, PaginationConfig, RetryConfig, SearchTarget};
use std::path::Path;
use std::time::Duration;

/// Config with millisecond-scale pacing and waits, writing under `results_dir`
pub fn fast_config(base_url: &str, results_dir: &Path, target: SearchTarget) -> Config {
    Config {
        search_keywords: "food safety".to_string(),
        target,
        results_dir: results_dir.to_path_buf(),
        http: HttpConfig {
            base_url: base_url.to_string(),
            timeout: Duration::from_secs(5),
            ..HttpConfig::default()
        },
        pagination: PaginationConfig {
            max_pages: 50,
            checkpoint_every: 10,
            min_page_delay: Duration::ZERO,
            max_page_delay: Duration::from_millis(2),
        },
        retry: RetryConfig {
            threshold: 5,
            block_wait_interval: Duration::from_millis(2),
            block_wait_rounds: 10,
        },
    }
}
